//! Session DTOs and migrations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigratesTo, Versioned};

use chatsync_core::session::{BotConfig, BranchOrigin, Message, Session};

use super::{datetime_to_millis, millis_to_datetime};

// ============================================================================
// Session DTOs
// ============================================================================

/// Represents V1.0.0 of the local session document.
/// Original browser-store shape: flat branch fields, no update stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct SessionV1_0_0 {
    /// Unique session identifier
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Conversation history
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time as epoch milliseconds
    pub created_at: i64,
    /// Whether the session was forked from another one
    #[serde(default)]
    pub is_branch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Per-session assistant override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotConfig>,
}

/// Represents V1.1.0 of the local session document.
/// Added hub_id for grouping sessions under a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.1.0")]
pub struct SessionV1_1_0 {
    /// Unique session identifier
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Conversation history
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time as epoch milliseconds
    pub created_at: i64,
    /// Whether the session was forked from another one
    #[serde(default)]
    pub is_branch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Per-session assistant override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotConfig>,
    /// Hub this session belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}

/// Branch lineage as stored from V2.0.0 on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchOriginV2_0_0 {
    pub parent_session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branched_at: Option<usize>,
}

/// Represents V2.0.0 of the local session document.
/// Stores updated_at explicitly and groups the branch fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "2.0.0")]
pub struct SessionV2_0_0 {
    /// Unique session identifier
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Conversation history
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time as epoch milliseconds
    pub created_at: i64,
    /// Last write time as epoch milliseconds
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchOriginV2_0_0>,
    /// Per-session assistant override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotConfig>,
    /// Hub this session belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}

// ============================================================================
// Migration implementations
// ============================================================================

/// Migration from SessionV1_0_0 to SessionV1_1_0.
/// Sessions written before hubs existed belong to no hub.
impl MigratesTo<SessionV1_1_0> for SessionV1_0_0 {
    fn migrate(self) -> SessionV1_1_0 {
        SessionV1_1_0 {
            id: self.id,
            title: self.title,
            messages: self.messages,
            created_at: self.created_at,
            is_branch: self.is_branch,
            parent_session_id: self.parent_session_id,
            branch_name: self.branch_name,
            bot: self.bot,
            hub_id: None,
        }
    }
}

/// Migration from SessionV1_1_0 to SessionV2_0_0.
///
/// The last write time of a legacy document is unknown, so it is taken to be
/// the creation time. A branch flag without a parent id carries no usable
/// lineage and is dropped.
impl MigratesTo<SessionV2_0_0> for SessionV1_1_0 {
    fn migrate(self) -> SessionV2_0_0 {
        let branch = match (self.is_branch, self.parent_session_id) {
            (_, Some(parent_session_id)) => Some(BranchOriginV2_0_0 {
                parent_session_id,
                branch_name: self.branch_name,
                branched_at: None,
            }),
            (true, None) => {
                tracing::debug!(
                    "Dropping branch flag without parent for session '{}'",
                    self.id
                );
                None
            }
            (false, None) => None,
        };

        SessionV2_0_0 {
            id: self.id,
            title: self.title,
            messages: self.messages,
            created_at: self.created_at,
            updated_at: self.created_at,
            branch,
            bot: self.bot,
            hub_id: self.hub_id,
        }
    }
}

// ============================================================================
// Domain model conversions
// ============================================================================

/// Convert SessionV2_0_0 DTO to domain model.
impl IntoDomain<Session> for SessionV2_0_0 {
    fn into_domain(self) -> Session {
        let created_at: DateTime<Utc> = millis_to_datetime(self.created_at);
        // A stamp older than the creation time can only come from a clock skew.
        let updated_at = millis_to_datetime(self.updated_at).max(created_at);

        Session {
            id: self.id,
            title: self.title,
            messages: self.messages,
            created_at,
            updated_at,
            branch: self.branch.map(|b| BranchOrigin {
                parent_session_id: b.parent_session_id,
                branch_name: b.branch_name,
                branched_at: b.branched_at,
            }),
            bot: self.bot,
            hub_id: self.hub_id,
        }
    }
}

/// Convert domain model to SessionV2_0_0 DTO for persistence.
impl FromDomain<Session> for SessionV2_0_0 {
    fn from_domain(session: Session) -> Self {
        let Session {
            id,
            title,
            messages,
            created_at,
            updated_at,
            branch,
            bot,
            hub_id,
        } = session;

        SessionV2_0_0 {
            id,
            title,
            messages,
            created_at: datetime_to_millis(created_at),
            updated_at: datetime_to_millis(updated_at),
            branch: branch.map(|b| BranchOriginV2_0_0 {
                parent_session_id: b.parent_session_id,
                branch_name: b.branch_name,
                branched_at: b.branched_at,
            }),
            bot,
            hub_id,
        }
    }
}

// ============================================================================
// Migrator factory
// ============================================================================

/// Creates and configures a Migrator instance for Session entities.
///
/// # Migration Path
///
/// - V1.0.0 → V1.1.0: Adds `hub_id` field with default value None
/// - V1.1.0 → V2.0.0: Adds `updated_at` (= `created_at`), groups branch fields
/// - V2.0.0 → Session: Converts DTO to domain model
///
/// # Example
///
/// ```ignore
/// let migrator = create_session_migrator();
/// let session: Session = migrator.load_flat_from("session", json_value)?;
/// ```
pub fn create_session_migrator() -> version_migrate::Migrator {
    let mut migrator = version_migrate::Migrator::builder().build();

    // Register migration path: V1.0.0 -> V1.1.0 -> V2.0.0 -> Session
    let session_path = version_migrate::Migrator::define("session")
        .from::<SessionV1_0_0>()
        .step::<SessionV1_1_0>()
        .step::<SessionV2_0_0>()
        .into_with_save::<Session>();

    migrator
        .register(session_path)
        .expect("Failed to register session migration path");

    migrator
}
