//! Error types for chatsync.

use thiserror::Error;

/// A shared error type for the whole chatsync workspace.
///
/// Remote failures are normally absorbed by the repositories and reported as a
/// degraded [`WriteOutcome`](crate::outcome::WriteOutcome); the variants here
/// reach callers only when no durable write happened.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatsyncError {
    #[error("{entity_type} '{id}' not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The remote store could not be reached or refused the request.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
    },

    /// Local file system failure.
    #[error("IO error: {message}")]
    Io { message: String },

    /// The local document store could not be opened or queried.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Input rejected before anything was written.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored document could not be brought up to the current schema.
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Several independent steps failed, e.g. both stores rejected a write.
    #[error("Multiple errors occurred ({} total)", .0.len())]
    Multiple(Vec<ChatsyncError>),
}

impl ChatsyncError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
        }
    }

    /// Transport error for a non-success HTTP response.
    pub fn transport_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for transport failures, including each member of a `Multiple`
    /// whose first error was a transport failure.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Multiple(errors) => errors.first().is_some_and(Self::is_transport),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status of a transport failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChatsyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatsyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatsyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ChatsyncError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<version_migrate::MigrationError> for ChatsyncError {
    fn from(err: version_migrate::MigrationError) -> Self {
        use version_migrate::MigrationError;

        match err {
            MigrationError::EntityNotFound(id) => Self::not_found("Document", id),
            MigrationError::DeserializationError(_) | MigrationError::SerializationError(_) => {
                Self::Serialization {
                    format: "versioned document".to_string(),
                    message: err.to_string(),
                }
            }
            MigrationError::IoError { .. } => Self::io(err.to_string()),
            _ => Self::Migration(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ChatsyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ChatsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_status() {
        let err = ChatsyncError::transport_status(503, "unavailable");
        assert!(err.is_transport());
        assert_eq!(err.status(), Some(503));
        assert_eq!(ChatsyncError::transport("offline").status(), None);
        assert!(!ChatsyncError::validation("bad").is_transport());
    }

    #[test]
    fn test_multiple_display() {
        let err = ChatsyncError::Multiple(vec![
            ChatsyncError::transport("offline"),
            ChatsyncError::io("disk full"),
        ]);
        assert_eq!(err.to_string(), "Multiple errors occurred (2 total)");
        assert!(err.is_transport());
    }

    #[test]
    fn test_not_found_display() {
        let err = ChatsyncError::not_found("Session", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Session 'abc' not found");
    }
}
