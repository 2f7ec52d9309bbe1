//! Store traits.
//!
//! Both backends expose the same four primitives. The remote store takes the
//! authenticated user on every call and scopes each query by it; the local
//! store is single-user by construction.

use crate::auth::UserIdentity;
use crate::error::Result;
use crate::record::Record;
use async_trait::async_trait;

/// An embedded, single-user store holding records on this device.
///
/// Implementations should handle schema migration on read and must treat a
/// delete of a missing id as success.
#[async_trait]
pub trait LocalStore<T: Record>: Send + Sync {
    /// Inserts or fully replaces the record with the same id.
    async fn put(&self, record: &T) -> Result<()>;

    /// Loads every stored record.
    async fn get_all(&self) -> Result<Vec<T>>;

    /// Removes a record. Missing ids are not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Removes every record.
    async fn clear(&self) -> Result<()>;
}

/// A hosted store shared across devices, partitioned by user.
#[async_trait]
pub trait RemoteStore<T: Record>: Send + Sync {
    /// Upserts the record into the user's partition.
    async fn put(&self, user: &UserIdentity, record: &T) -> Result<()>;

    /// Loads every record in the user's partition.
    async fn get_all(&self, user: &UserIdentity) -> Result<Vec<T>>;

    /// Removes a record from the user's partition. Missing ids are not an error.
    async fn delete(&self, user: &UserIdentity, id: &str) -> Result<()>;

    /// Removes every record in the user's partition.
    async fn clear(&self, user: &UserIdentity) -> Result<()>;
}
