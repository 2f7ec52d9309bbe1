//! Typed results for writes that may land on either backend.

use serde::{Deserialize, Serialize};

/// Where a write ended up.
///
/// Failure is the `Err` side of the surrounding `Result`; this type only
/// describes writes that are durable somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Saved to the remote store for the authenticated user.
    Remote,
    /// Saved locally; no user was authenticated or no remote is configured.
    Local,
    /// The remote write failed and the data was saved locally instead.
    Degraded { reason: String },
}

impl WriteOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// True when the data reached the backend it was meant for.
    pub fn is_authoritative(&self) -> bool {
        !self.is_degraded()
    }
}

/// A written value together with where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Written<T> {
    pub value: T,
    pub outcome: WriteOutcome,
}

impl<T> Written<T> {
    pub fn new(value: T, outcome: WriteOutcome) -> Self {
        Self { value, outcome }
    }
}
