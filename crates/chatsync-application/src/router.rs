//! Backend selection with local fallback.
//!
//! [`StoreRouter`] decides per call whether a record goes to the remote store
//! (a user is authenticated and a remote is configured) or to the local store.
//! Remote failures are absorbed here: the write is retried locally and the
//! caller receives [`WriteOutcome::Degraded`] instead of an error.

use crate::auth::AuthContext;
use chatsync_core::UserIdentity;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::notify::{Notice, Notifier};
use chatsync_core::outcome::WriteOutcome;
use chatsync_core::record::Record;
use chatsync_core::store::{LocalStore, RemoteStore};
use std::sync::Arc;

/// The pair of stores a record type lives in.
pub struct Backends<T: Record> {
    pub local: Arc<dyn LocalStore<T>>,
    pub remote: Option<Arc<dyn RemoteStore<T>>>,
}

impl<T: Record> Backends<T> {
    pub fn new(local: Arc<dyn LocalStore<T>>, remote: Option<Arc<dyn RemoteStore<T>>>) -> Self {
        Self { local, remote }
    }

    pub fn local_only(local: Arc<dyn LocalStore<T>>) -> Self {
        Self::new(local, None)
    }
}

impl<T: Record> Clone for Backends<T> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            remote: self.remote.clone(),
        }
    }
}

pub struct StoreRouter<T: Record> {
    backends: Backends<T>,
    auth: Arc<AuthContext>,
    notifier: Arc<dyn Notifier>,
}

impl<T: Record> StoreRouter<T> {
    pub fn new(backends: Backends<T>, auth: Arc<AuthContext>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backends,
            auth,
            notifier,
        }
    }

    pub fn local(&self) -> &Arc<dyn LocalStore<T>> {
        &self.backends.local
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteStore<T>>> {
        self.backends.remote.as_ref()
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// The remote store and user to route to, if remote routing applies.
    fn remote_target(&self) -> Option<(&Arc<dyn RemoteStore<T>>, UserIdentity)> {
        let remote = self.backends.remote.as_ref()?;
        let user = self.auth.current()?;
        Some((remote, user))
    }

    fn degrade(&self, action: &str, id: &str, error: &ChatsyncError) -> WriteOutcome {
        tracing::warn!(
            "[StoreRouter] Remote {} failed for {} '{}', using local store: {}",
            action,
            T::ENTITY_TYPE,
            id,
            error
        );
        self.notifier.notify(Notice::warning(format!(
            "Could not reach the server; {} saved on this device only",
            T::ENTITY_TYPE.to_lowercase()
        )));
        WriteOutcome::Degraded {
            reason: error.to_string(),
        }
    }

    /// Writes a record to the authoritative backend.
    ///
    /// Errors only when no durable write happened at all.
    pub async fn put(&self, record: &T) -> Result<WriteOutcome> {
        let Some((remote, user)) = self.remote_target() else {
            self.backends.local.put(record).await?;
            return Ok(WriteOutcome::Local);
        };

        let remote_err = match remote.put(&user, record).await {
            Ok(()) => return Ok(WriteOutcome::Remote),
            Err(e) => e,
        };

        match self.backends.local.put(record).await {
            Ok(()) => Ok(self.degrade("write", record.id(), &remote_err)),
            Err(local_err) => {
                tracing::error!(
                    "[StoreRouter] Both stores rejected {} '{}'",
                    T::ENTITY_TYPE,
                    record.id()
                );
                self.notifier.notify(Notice::error(format!(
                    "Failed to save {}",
                    T::ENTITY_TYPE.to_lowercase()
                )));
                Err(ChatsyncError::Multiple(vec![remote_err, local_err]))
            }
        }
    }

    /// Deletes a record. Missing ids are a no-op.
    ///
    /// While authenticated the remote copy is authoritative, but the local
    /// cache is pruned as well so a later merge cannot bring the record back.
    pub async fn delete(&self, id: &str) -> Result<WriteOutcome> {
        let Some((remote, user)) = self.remote_target() else {
            self.backends.local.delete(id).await?;
            return Ok(WriteOutcome::Local);
        };

        match remote.delete(&user, id).await {
            Ok(()) => {
                if let Err(e) = self.backends.local.delete(id).await {
                    tracing::warn!(
                        "[StoreRouter] Failed to prune local cache for {} '{}': {}",
                        T::ENTITY_TYPE,
                        id,
                        e
                    );
                }
                Ok(WriteOutcome::Remote)
            }
            Err(remote_err) => match self.backends.local.delete(id).await {
                Ok(()) => Ok(self.degrade("delete", id, &remote_err)),
                Err(local_err) => Err(ChatsyncError::Multiple(vec![remote_err, local_err])),
            },
        }
    }

    /// Loads every record from the authoritative backend.
    ///
    /// A failing remote falls back to the local cache.
    pub async fn load_all(&self) -> Result<(Vec<T>, WriteOutcome)> {
        let Some((remote, user)) = self.remote_target() else {
            return Ok((self.backends.local.get_all().await?, WriteOutcome::Local));
        };

        match remote.get_all(&user).await {
            Ok(records) => Ok((records, WriteOutcome::Remote)),
            Err(remote_err) => {
                tracing::warn!(
                    "[StoreRouter] Remote load of {} records failed, reading local cache: {}",
                    T::ENTITY_TYPE,
                    remote_err
                );
                self.notifier.notify(Notice::warning(
                    "Could not reach the server; showing data stored on this device",
                ));
                let records = self
                    .backends
                    .local
                    .get_all()
                    .await
                    .map_err(|local_err| ChatsyncError::Multiple(vec![remote_err.clone(), local_err]))?;
                Ok((
                    records,
                    WriteOutcome::Degraded {
                        reason: remote_err.to_string(),
                    },
                ))
            }
        }
    }

    /// Wipes the local store and, when authenticated, the user's remote partition.
    pub async fn clear(&self) -> Result<WriteOutcome> {
        self.backends.local.clear().await?;

        let Some((remote, user)) = self.remote_target() else {
            return Ok(WriteOutcome::Local);
        };

        match remote.clear(&user).await {
            Ok(()) => Ok(WriteOutcome::Remote),
            Err(e) => Ok(self.degrade("clear", "*", &e)),
        }
    }
}

/// Folds several outcomes into one: any degradation wins, then remote.
pub fn combine_outcomes(outcomes: impl IntoIterator<Item = WriteOutcome>) -> WriteOutcome {
    let mut combined = WriteOutcome::Local;
    for outcome in outcomes {
        if combined.is_degraded() {
            break;
        }
        if outcome != WriteOutcome::Local {
            combined = outcome;
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelNotifier;
    use chatsync_core::notify::NoticeLevel;
    use chatsync_core::session::Session;
    use chatsync_infrastructure::{InMemoryLocalStore, InMemoryRemoteStore};

    struct Fixture {
        local: Arc<InMemoryLocalStore<Session>>,
        remote: Arc<InMemoryRemoteStore<Session>>,
        router: StoreRouter<Session>,
        notices: tokio::sync::mpsc::UnboundedReceiver<Notice>,
    }

    fn fixture(authenticated: bool) -> Fixture {
        let local = Arc::new(InMemoryLocalStore::new());
        let remote = Arc::new(InMemoryRemoteStore::new());
        let auth = Arc::new(AuthContext::new());
        if authenticated {
            auth.set(Some(UserIdentity::new("user-1", "token")));
        }
        let (notifier, notices) = ChannelNotifier::channel();
        let router = StoreRouter::new(
            Backends::new(local.clone(), Some(remote.clone())),
            auth,
            Arc::new(notifier),
        );
        Fixture {
            local,
            remote,
            router,
            notices,
        }
    }

    #[tokio::test]
    async fn test_put_routes_by_auth_state() {
        let f = fixture(false);
        let session = Session::new("offline", None);
        assert_eq!(f.router.put(&session).await.unwrap(), WriteOutcome::Local);
        assert!(f.local.snapshot().await.contains_key(&session.id));

        let f = fixture(true);
        assert_eq!(f.router.put(&session).await.unwrap(), WriteOutcome::Remote);
        assert!(f.remote.snapshot("user-1").await.contains_key(&session.id));
        assert!(f.local.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_put_falls_back_to_local_and_notifies() {
        let mut f = fixture(true);
        f.remote.set_failing(true);

        let session = Session::new("degraded", None);
        let outcome = f.router.put(&session).await.unwrap();

        assert!(outcome.is_degraded());
        assert!(f.local.snapshot().await.contains_key(&session.id));
        assert_eq!(f.notices.try_recv().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_put_fails_when_both_stores_fail() {
        let f = fixture(true);
        f.remote.set_failing(true);
        f.local.set_failing(true);

        let err = f.router.put(&Session::new("lost", None)).await.unwrap_err();
        match err {
            ChatsyncError::Multiple(errors) => {
                assert!(errors[0].is_transport());
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticated_delete_prunes_local_cache() {
        let f = fixture(true);
        let session = Session::new("cached", None);
        f.local.put(&session).await.unwrap();
        f.remote.seed("user-1", [session.clone()]).await;

        assert_eq!(f.router.delete(&session.id).await.unwrap(), WriteOutcome::Remote);
        assert!(f.local.snapshot().await.is_empty());
        assert!(f.remote.snapshot("user-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_degrades_when_remote_fails() {
        let mut f = fixture(true);
        let session = Session::new("cached", None);
        f.local.put(&session).await.unwrap();
        f.remote.seed("user-1", [session.clone()]).await;
        f.remote.set_failing(true);

        let outcome = f.router.delete(&session.id).await.unwrap();

        assert!(outcome.is_degraded());
        assert!(f.local.snapshot().await.is_empty());
        assert!(f.remote.snapshot("user-1").await.contains_key(&session.id));
        assert_eq!(f.notices.try_recv().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_load_all_falls_back_to_local() {
        let f = fixture(true);
        let session = Session::new("cached", None);
        f.local.put(&session).await.unwrap();
        f.remote.set_failing(true);

        let (records, outcome) = f.router.load_all().await.unwrap();
        assert_eq!(records, vec![session]);
        assert!(outcome.is_degraded());
    }

    #[test]
    fn test_combine_outcomes() {
        assert_eq!(combine_outcomes(Vec::new()), WriteOutcome::Local);
        assert_eq!(
            combine_outcomes([WriteOutcome::Local, WriteOutcome::Remote]),
            WriteOutcome::Remote
        );
        let degraded = WriteOutcome::Degraded {
            reason: "offline".to_string(),
        };
        assert_eq!(
            combine_outcomes([WriteOutcome::Remote, degraded.clone(), WriteOutcome::Remote]),
            degraded
        );
    }
}
