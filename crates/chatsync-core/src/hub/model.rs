//! Hub domain model.

use crate::record::{Record, now_millis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata of a file grouped under a hub. File content is never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub file_type: String,
    /// Location in external storage
    pub path: String,
    pub size: u64,
}

/// A named collection grouping sessions and file references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub id: String,
    pub name: String,
    pub file_references: Vec<FileReference>,
    /// Sessions grouped under this hub, in insertion order without duplicates
    pub chat_session_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hub {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            file_references: Vec::new(),
            chat_session_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a session id. Returns false if it was already present.
    pub fn add_session(&mut self, session_id: &str) -> bool {
        if self.chat_session_ids.iter().any(|id| id == session_id) {
            return false;
        }
        self.chat_session_ids.push(session_id.to_string());
        true
    }

    /// Removes a session id. Returns false if it was not present.
    pub fn remove_session(&mut self, session_id: &str) -> bool {
        let before = self.chat_session_ids.len();
        self.chat_session_ids.retain(|id| id != session_id);
        self.chat_session_ids.len() != before
    }

    /// Adds or replaces the file reference with the same path.
    pub fn upsert_file(&mut self, file: FileReference) {
        match self.file_references.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.file_references.push(file),
        }
    }

    /// Removes the file reference at `path`. Returns false if absent.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let before = self.file_references.len();
        self.file_references.retain(|f| f.path != path);
        self.file_references.len() != before
    }
}

impl Record for Hub {
    const ENTITY_TYPE: &'static str = "Hub";

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_deduplicated() {
        let mut hub = Hub::new("Research");
        assert!(hub.add_session("s1"));
        assert!(!hub.add_session("s1"));
        assert!(hub.add_session("s2"));
        assert_eq!(hub.chat_session_ids, vec!["s1", "s2"]);

        assert!(hub.remove_session("s1"));
        assert!(!hub.remove_session("s1"));
    }

    #[test]
    fn test_upsert_file_replaces_by_path() {
        let mut hub = Hub::new("Docs");
        hub.upsert_file(FileReference {
            name: "a.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            path: "uploads/a.pdf".to_string(),
            size: 10,
        });
        hub.upsert_file(FileReference {
            name: "a.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            path: "uploads/a.pdf".to_string(),
            size: 20,
        });
        assert_eq!(hub.file_references.len(), 1);
        assert_eq!(hub.file_references[0].size, 20);
        assert!(hub.remove_file("uploads/a.pdf"));
    }
}
