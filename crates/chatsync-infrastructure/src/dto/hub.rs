//! Hub DTOs and migrations

use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, Versioned};

use chatsync_core::hub::{FileReference, Hub};

use super::{datetime_to_millis, millis_to_datetime};

/// Hub V1.0.0 (initial version).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct HubV1_0_0 {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub file_references: Vec<FileReference>,
    #[serde(default)]
    pub chat_session_ids: Vec<String>,
    /// Creation time as epoch milliseconds
    pub created_at: i64,
    /// Last write time as epoch milliseconds; absent in documents written
    /// before stamps were tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

// ============================================================================
// Domain model conversions
// ============================================================================

impl IntoDomain<Hub> for HubV1_0_0 {
    fn into_domain(self) -> Hub {
        let created_at = millis_to_datetime(self.created_at);
        let updated_at = self
            .updated_at
            .map(millis_to_datetime)
            .unwrap_or(created_at)
            .max(created_at);

        Hub {
            id: self.id,
            name: self.name,
            file_references: self.file_references,
            chat_session_ids: self.chat_session_ids,
            created_at,
            updated_at,
        }
    }
}

impl FromDomain<Hub> for HubV1_0_0 {
    fn from_domain(hub: Hub) -> Self {
        HubV1_0_0 {
            id: hub.id,
            name: hub.name,
            file_references: hub.file_references,
            chat_session_ids: hub.chat_session_ids,
            created_at: datetime_to_millis(hub.created_at),
            updated_at: Some(datetime_to_millis(hub.updated_at)),
        }
    }
}

// ============================================================================
// Migrator factory
// ============================================================================

/// Creates and configures a Migrator instance for Hub entities.
///
/// # Migration Path
///
/// - V1.0.0 → Hub: Converts DTO to domain model
pub fn create_hub_migrator() -> version_migrate::Migrator {
    let mut migrator = version_migrate::Migrator::builder().build();

    let hub_path = version_migrate::Migrator::define("hub")
        .from::<HubV1_0_0>()
        .into_with_save::<Hub>();

    migrator
        .register(hub_path)
        .expect("Failed to register hub migration path");

    migrator
}
