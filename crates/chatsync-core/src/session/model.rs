//! Session domain model.
//!
//! This module contains the core Session entity that represents
//! one chat conversation in the application's domain layer.

use super::message::Message;
use crate::record::{Record, now_millis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Assistant configuration embedded in a session, overriding the default bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    /// System instructions prepended to every request.
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Lineage of a branched session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchOrigin {
    /// The session this one was forked from.
    pub parent_session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Number of parent messages copied at branch time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branched_at: Option<usize>,
}

/// Represents a chat session in the application's domain layer.
///
/// This is the "pure" domain model that business logic operates on,
/// independent of any specific storage format or version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format), generated client-side
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Ordered conversation history
    pub messages: Vec<Message>,
    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last write
    pub updated_at: DateTime<Utc>,
    /// Set when this session was forked from another one
    pub branch: Option<BranchOrigin>,
    /// Per-session assistant override
    pub bot: Option<BotConfig>,
    /// Hub this session is grouped under
    pub hub_id: Option<String>,
}

impl Session {
    /// Creates an empty session with a fresh id.
    pub fn new(title: impl Into<String>, bot: Option<BotConfig>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            branch: None,
            bot,
            hub_id: None,
        }
    }

    /// Returns true if this session was forked from another session.
    pub fn is_branch(&self) -> bool {
        self.branch.is_some()
    }

    pub fn parent_session_id(&self) -> Option<&str> {
        self.branch.as_ref().map(|b| b.parent_session_id.as_str())
    }

    /// Forks the first `upto` messages into a new session.
    ///
    /// `upto` is clamped to the number of messages. The branch copies the
    /// parent's bot and hub and gets its own id and timestamps.
    pub fn branch(&self, upto: usize, branch_name: Option<String>) -> Session {
        let upto = upto.min(self.messages.len());
        let now = now_millis();
        let title = match &branch_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{} (branch)", self.title),
        };

        Session {
            id: Uuid::new_v4().to_string(),
            title,
            messages: self.messages[..upto].to_vec(),
            created_at: now,
            updated_at: now,
            branch: Some(BranchOrigin {
                parent_session_id: self.id.clone(),
                branch_name,
                branched_at: Some(upto),
            }),
            bot: self.bot.clone(),
            hub_id: self.hub_id.clone(),
        }
    }
}

impl Record for Session {
    const ENTITY_TYPE: &'static str = "Session";

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
