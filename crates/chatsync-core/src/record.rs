//! Shared contract for records that live in both a local and a remote store.

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// A persisted entity identified by a stable id and stamped on every write.
///
/// Stores and the sync reconciler are generic over this trait, so sessions and
/// hubs share one storage and merge implementation.
pub trait Record: Clone + PartialEq + Send + Sync + 'static {
    /// Entity name used in logs and errors ("Session", "Hub").
    const ENTITY_TYPE: &'static str;

    /// Stable identifier, unique within a store.
    fn id(&self) -> &str;

    /// Time of the last write; the reconciler's conflict key.
    fn updated_at(&self) -> DateTime<Utc>;

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Stamps the record for a new write.
    ///
    /// The stamp never goes backwards for the same record, even when two writes
    /// land within the same millisecond.
    fn touch(&mut self) {
        let stamp = next_stamp(self.updated_at());
        self.set_updated_at(stamp);
    }
}

/// Current time truncated to millisecond precision.
///
/// Local documents store timestamps as epoch milliseconds, so every stamp is
/// taken at that precision to survive a round trip unchanged.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Returns a stamp strictly greater than `previous`.
pub fn next_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_millis();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}
