//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the versioned schema of local documents, the rows of
//! the remote tables, and the backup export format. They are private to the
//! infrastructure layer and handle the evolution of each format over time.
//!
//! ## Schema Versioning (Semantic Versioning)
//!
//! - **MAJOR (X.0.0)**: Breaking changes (field removal, type changes)
//! - **MINOR (1.X.0)**: Backward-compatible additions (new optional fields)
//!
//! ### Session Version History
//! - **1.0.0**: Initial browser-store shape (flat branch fields, no update stamp)
//! - **1.1.0**: Added `hub_id`
//! - **2.0.0**: Explicit `updated_at`, grouped `branch` lineage
//!
//! ### Hub Version History
//! - **1.0.0**: Initial schema

use chrono::{DateTime, SubsecRound, Utc};

mod export;
mod hub;
mod remote;
mod session;

pub use export::{SessionExport, decode_sessions, encode_sessions};
pub use hub::{HubV1_0_0, create_hub_migrator};
pub use remote::{HubRow, SessionRow};
pub use session::{
    BranchOriginV2_0_0, SessionV1_0_0, SessionV1_1_0, SessionV2_0_0, create_session_migrator,
};

/// Converts stored epoch milliseconds to a timestamp.
///
/// Out-of-range values collapse to the Unix epoch rather than failing the load.
pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub(crate) fn datetime_to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Drops precision below a millisecond, which is all local documents keep.
///
/// Every stamp entering from the remote or an import passes through here,
/// otherwise a cached copy never compares equal to its source.
pub(crate) fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}
