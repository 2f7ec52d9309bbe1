//! Process-local stores.
//!
//! Used for ephemeral runs and as test doubles. Both stores can be told to
//! fail every call, which is how fallback paths are exercised. The local store
//! can also be limited to a number of successful puts.

use async_trait::async_trait;
use chatsync_core::UserIdentity;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::record::Record;
use chatsync_core::store::{LocalStore, RemoteStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory [`LocalStore`].
pub struct InMemoryLocalStore<T: Record> {
    records: RwLock<BTreeMap<String, T>>,
    failing: AtomicBool,
    puts: AtomicUsize,
    put_limit: AtomicUsize,
}

impl<T: Record> InMemoryLocalStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            failing: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
            put_limit: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.id().to_string(), r))
            .collect();
        Self {
            records: RwLock::new(map),
            ..Self::new()
        }
    }

    /// Makes every subsequent call fail with an I/O error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Lets `n` more puts succeed; every put after that fails.
    pub fn fail_puts_after(&self, n: usize) {
        let limit = self.put_count().saturating_add(n);
        self.put_limit.store(limit, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> BTreeMap<String, T> {
        self.records.read().await.clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatsyncError::io("local store unavailable"));
        }
        Ok(())
    }
}

impl<T: Record> Default for InMemoryLocalStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> LocalStore<T> for InMemoryLocalStore<T> {
    async fn put(&self, record: &T) -> Result<()> {
        self.check()?;
        if self.put_count() >= self.put_limit.load(Ordering::SeqCst) {
            return Err(ChatsyncError::io("local store is full"));
        }
        self.records
            .write()
            .await
            .insert(record.id().to_string(), record.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        self.check()?;
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check()?;
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.records.write().await.clear();
        Ok(())
    }
}

/// In-memory [`RemoteStore`], partitioned by user id.
pub struct InMemoryRemoteStore<T: Record> {
    partitions: RwLock<HashMap<String, BTreeMap<String, T>>>,
    failing: AtomicBool,
    puts: AtomicUsize,
}

impl<T: Record> InMemoryRemoteStore<T> {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    /// Makes every subsequent call fail as if the network were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Records stored for `user_id`.
    pub async fn snapshot(&self, user_id: &str) -> BTreeMap<String, T> {
        self.partitions
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Seeds a user's partition directly, bypassing the failure switch.
    pub async fn seed(&self, user_id: &str, records: impl IntoIterator<Item = T>) {
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(user_id.to_string()).or_default();
        for record in records {
            partition.insert(record.id().to_string(), record);
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChatsyncError::transport("remote store unreachable"));
        }
        Ok(())
    }
}

impl<T: Record> Default for InMemoryRemoteStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> RemoteStore<T> for InMemoryRemoteStore<T> {
    async fn put(&self, user: &UserIdentity, record: &T) -> Result<()> {
        self.check()?;
        self.partitions
            .write()
            .await
            .entry(user.user_id.clone())
            .or_default()
            .insert(record.id().to_string(), record.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_all(&self, user: &UserIdentity) -> Result<Vec<T>> {
        self.check()?;
        Ok(self
            .partitions
            .read()
            .await
            .get(&user.user_id)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, user: &UserIdentity, id: &str) -> Result<()> {
        self.check()?;
        if let Some(partition) = self.partitions.write().await.get_mut(&user.user_id) {
            partition.remove(id);
        }
        Ok(())
    }

    async fn clear(&self, user: &UserIdentity) -> Result<()> {
        self.check()?;
        self.partitions.write().await.remove(&user.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_core::session::Session;

    #[tokio::test]
    async fn test_remote_partitions_are_isolated() {
        let store = InMemoryRemoteStore::<Session>::new();
        let alice = UserIdentity::new("alice", "t1");
        let bob = UserIdentity::new("bob", "t2");

        store.put(&alice, &Session::new("Alice's", None)).await.unwrap();
        assert_eq!(store.get_all(&alice).await.unwrap().len(), 1);
        assert!(store.get_all(&bob).await.unwrap().is_empty());

        store.clear(&bob).await.unwrap();
        assert_eq!(store.get_all(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let local = InMemoryLocalStore::<Session>::new();
        local.set_failing(true);
        assert!(local.put(&Session::new("x", None)).await.is_err());
        assert_eq!(local.put_count(), 0);

        let remote = InMemoryRemoteStore::<Session>::new();
        remote.set_failing(true);
        let err = remote
            .get_all(&UserIdentity::new("u", "t"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_put_limit() {
        let local = InMemoryLocalStore::<Session>::new();
        local.put(&Session::new("a", None)).await.unwrap();
        local.fail_puts_after(1);

        local.put(&Session::new("b", None)).await.unwrap();
        assert!(local.put(&Session::new("c", None)).await.is_err());
        assert_eq!(local.snapshot().await.len(), 2);
        // Reads and deletes are unaffected.
        assert_eq!(local.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_local_put_replaces_by_id() {
        let mut session = Session::new("v1", None);
        let local = InMemoryLocalStore::with_records([session.clone()]);
        session.title = "v2".to_string();
        local.put(&session).await.unwrap();

        let all = local.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "v2");
        assert_eq!(local.put_count(), 1);
    }
}
