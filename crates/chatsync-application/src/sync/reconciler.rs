//! Login-time merge of the local and remote stores.

use crate::state::recency_order;
use chatsync_core::UserIdentity;
use chatsync_core::error::Result;
use chatsync_core::notify::{Notice, Notifier};
use chatsync_core::record::Record;
use chatsync_core::store::{LocalStore, RemoteStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Which write of the merge failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Pushing the winning copy to the remote store.
    Upload,
    /// Refreshing the local cache with the winning copy.
    CacheLocal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub id: String,
    pub stage: SyncStage,
    pub message: String,
}

/// What a reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Local-only records pushed to the remote store.
    pub uploaded: usize,
    /// Remote-only records cached locally.
    pub downloaded: usize,
    /// Records where the local copy was newer.
    pub local_wins: usize,
    /// Records where the remote copy was kept over a differing local one.
    pub remote_wins: usize,
    /// Records already identical in both stores.
    pub unchanged: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.uploaded + self.downloaded + self.local_wins + self.remote_wins + self.unchanged
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The merged set together with the run's report.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T: Record> {
    /// One copy per id, most recently updated first.
    pub merged: Vec<T>,
    pub report: SyncReport,
}

/// One-shot last-writer-wins merge between a local and a remote store.
///
/// For every id the copy with the strictly greater `updated_at` wins; equal
/// stamps keep the remote copy. Each store is written only where its copy
/// differs from the winner, so a second run over unchanged stores writes
/// nothing. Write failures are collected, not fatal, and nothing is rolled back.
pub struct Reconciler<T: Record> {
    local: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteStore<T>>,
    notifier: Arc<dyn Notifier>,
}

enum Resolution<T> {
    Unchanged(T),
    LocalWins(T),
    RemoteWins(T),
    Upload(T),
    Download(T),
}

/// Picks the surviving copy for one id.
fn resolve<T: Record>(local: Option<T>, remote: Option<T>) -> Option<Resolution<T>> {
    match (local, remote) {
        (Some(local), Some(remote)) => Some(if local == remote {
            Resolution::Unchanged(remote)
        } else if local.updated_at() > remote.updated_at() {
            Resolution::LocalWins(local)
        } else {
            Resolution::RemoteWins(remote)
        }),
        (Some(local), None) => Some(Resolution::Upload(local)),
        (None, Some(remote)) => Some(Resolution::Download(remote)),
        (None, None) => None,
    }
}

impl<T: Record> Reconciler<T> {
    pub fn new(
        local: Arc<dyn LocalStore<T>>,
        remote: Arc<dyn RemoteStore<T>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            local,
            remote,
            notifier,
        }
    }

    /// Runs the merge for `user`.
    ///
    /// Fails without writing anything if either store cannot be read.
    pub async fn reconcile(&self, user: &UserIdentity) -> Result<Reconciled<T>> {
        let local = self.local.get_all().await?;
        let remote = self.remote.get_all(user).await?;
        tracing::info!(
            "[Reconciler] Merging {} records: {} local, {} remote",
            T::ENTITY_TYPE,
            local.len(),
            remote.len()
        );

        let mut local: BTreeMap<String, T> = local
            .into_iter()
            .map(|r| (r.id().to_string(), r))
            .collect();
        let mut remote: BTreeMap<String, T> = remote
            .into_iter()
            .map(|r| (r.id().to_string(), r))
            .collect();
        let ids: BTreeSet<String> = local.keys().chain(remote.keys()).cloned().collect();

        let mut report = SyncReport::default();
        let mut merged = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(resolution) = resolve(local.remove(&id), remote.remove(&id)) else {
                continue;
            };

            let winner = match resolution {
                Resolution::Unchanged(record) => {
                    report.unchanged += 1;
                    record
                }
                Resolution::LocalWins(record) => {
                    report.local_wins += 1;
                    self.upload(user, &record, &mut report).await;
                    record
                }
                Resolution::Upload(record) => {
                    report.uploaded += 1;
                    self.upload(user, &record, &mut report).await;
                    record
                }
                Resolution::RemoteWins(record) => {
                    report.remote_wins += 1;
                    self.cache(&record, &mut report).await;
                    record
                }
                Resolution::Download(record) => {
                    report.downloaded += 1;
                    self.cache(&record, &mut report).await;
                    record
                }
            };
            merged.push(winner);
        }

        merged.sort_by(recency_order);
        self.announce(&report);

        Ok(Reconciled { merged, report })
    }

    async fn upload(&self, user: &UserIdentity, record: &T, report: &mut SyncReport) {
        if let Err(e) = self.remote.put(user, record).await {
            tracing::warn!(
                "[Reconciler] Failed to upload {} '{}': {}",
                T::ENTITY_TYPE,
                record.id(),
                e
            );
            report.failures.push(SyncFailure {
                id: record.id().to_string(),
                stage: SyncStage::Upload,
                message: e.to_string(),
            });
        }
    }

    async fn cache(&self, record: &T, report: &mut SyncReport) {
        if let Err(e) = self.local.put(record).await {
            tracing::warn!(
                "[Reconciler] Failed to cache {} '{}' locally: {}",
                T::ENTITY_TYPE,
                record.id(),
                e
            );
            report.failures.push(SyncFailure {
                id: record.id().to_string(),
                stage: SyncStage::CacheLocal,
                message: e.to_string(),
            });
        }
    }

    fn announce(&self, report: &SyncReport) {
        tracing::info!(
            "[Reconciler] {} sync done: {} uploaded, {} downloaded, {} local wins, {} remote wins, {} unchanged, {} failures",
            T::ENTITY_TYPE,
            report.uploaded,
            report.downloaded,
            report.local_wins,
            report.remote_wins,
            report.unchanged,
            report.failures.len()
        );

        if !report.is_clean() {
            self.notifier.notify(Notice::warning(format!(
                "{} of {} {} records could not be synced",
                report.failures.len(),
                report.total(),
                T::ENTITY_TYPE.to_lowercase()
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingNotifier;
    use chatsync_core::session::Session;
    use chatsync_infrastructure::{InMemoryLocalStore, InMemoryRemoteStore};
    use chrono::Duration;

    fn user() -> UserIdentity {
        UserIdentity::new("user-1", "token")
    }

    fn setup() -> (
        Arc<InMemoryLocalStore<Session>>,
        Arc<InMemoryRemoteStore<Session>>,
        Reconciler<Session>,
    ) {
        let local = Arc::new(InMemoryLocalStore::new());
        let remote = Arc::new(InMemoryRemoteStore::new());
        let reconciler = Reconciler::new(local.clone(), remote.clone(), Arc::new(TracingNotifier));
        (local, remote, reconciler)
    }

    #[test]
    fn test_resolve_prefers_newer_and_ties_to_remote() {
        let base = Session::new("base", None);
        let mut newer = base.clone();
        newer.title = "newer".to_string();
        newer.updated_at = base.updated_at + Duration::milliseconds(1);

        match resolve(Some(newer.clone()), Some(base.clone())) {
            Some(Resolution::LocalWins(r)) => assert_eq!(r, newer),
            _ => panic!("newer local copy should win"),
        }
        match resolve(Some(base.clone()), Some(newer.clone())) {
            Some(Resolution::RemoteWins(r)) => assert_eq!(r, newer),
            _ => panic!("newer remote copy should win"),
        }

        let mut same_stamp = base.clone();
        same_stamp.title = "local edit".to_string();
        match resolve(Some(same_stamp), Some(base.clone())) {
            Some(Resolution::RemoteWins(r)) => assert_eq!(r.title, "base"),
            _ => panic!("equal stamps should keep the remote copy"),
        }
    }

    #[tokio::test]
    async fn test_union_uploads_and_downloads() {
        let (local, remote, reconciler) = setup();
        let local_only = Session::new("local only", None);
        let remote_only = Session::new("remote only", None);
        local.put(&local_only).await.unwrap();
        remote.seed("user-1", [remote_only.clone()]).await;

        let result = reconciler.reconcile(&user()).await.unwrap();

        assert_eq!(result.merged.len(), 2);
        assert_eq!(result.report.uploaded, 1);
        assert_eq!(result.report.downloaded, 1);
        assert!(remote.snapshot("user-1").await.contains_key(&local_only.id));
        assert!(local.snapshot().await.contains_key(&remote_only.id));
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let (local, remote, reconciler) = setup();
        local.put(&Session::new("a", None)).await.unwrap();
        remote.seed("user-1", [Session::new("b", None)]).await;

        let first = reconciler.reconcile(&user()).await.unwrap();
        let local_puts = local.put_count();
        let remote_puts = remote.put_count();

        let second = reconciler.reconcile(&user()).await.unwrap();
        assert_eq!(second.merged, first.merged);
        assert_eq!(second.report.unchanged, 2);
        assert_eq!(local.put_count(), local_puts);
        assert_eq!(remote.put_count(), remote_puts);
    }

    #[tokio::test]
    async fn test_load_failure_aborts_before_writing() {
        let (local, remote, reconciler) = setup();
        local.put(&Session::new("a", None)).await.unwrap();
        remote.set_failing(true);

        let err = reconciler.reconcile(&user()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(local.put_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_failures_are_collected() {
        let local = Arc::new(InMemoryLocalStore::new());
        let remote = Arc::new(InMemoryRemoteStore::new());
        let session = Session::new("stuck", None);
        local.put(&session).await.unwrap();

        // Reads succeed, writes fail.
        struct ReadOnlyRemote(Arc<InMemoryRemoteStore<Session>>);

        #[async_trait::async_trait]
        impl RemoteStore<Session> for ReadOnlyRemote {
            async fn put(&self, _user: &UserIdentity, _record: &Session) -> Result<()> {
                Err(chatsync_core::ChatsyncError::transport_status(403, "forbidden"))
            }
            async fn get_all(&self, user: &UserIdentity) -> Result<Vec<Session>> {
                self.0.get_all(user).await
            }
            async fn delete(&self, user: &UserIdentity, id: &str) -> Result<()> {
                self.0.delete(user, id).await
            }
            async fn clear(&self, user: &UserIdentity) -> Result<()> {
                self.0.clear(user).await
            }
        }

        let reconciler = Reconciler::new(
            local.clone(),
            Arc::new(ReadOnlyRemote(remote)),
            Arc::new(TracingNotifier),
        );

        let result = reconciler.reconcile(&user()).await.unwrap();
        assert_eq!(result.merged, vec![session.clone()]);
        assert_eq!(
            result.report.failures,
            vec![SyncFailure {
                id: session.id.clone(),
                stage: SyncStage::Upload,
                message: "Transport error: forbidden".to_string(),
            }]
        );
    }
}
