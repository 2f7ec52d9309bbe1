//! Session repository façade.
//!
//! The single entry point for session CRUD. Callers never see which backend
//! served a call; they get the data plus a [`WriteOutcome`] saying where it
//! landed.

use crate::router::{StoreRouter, combine_outcomes};
use crate::state::{SessionAction, SessionSnapshot, SessionStateStore};
use crate::sync::{Reconciler, SyncReport};
use crate::updater::RecordUpdater;
use chatsync_core::UserIdentity;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::notify::Notice;
use chatsync_core::outcome::{WriteOutcome, Written};
use chatsync_core::record::Record;
use chatsync_core::session::{BotConfig, DEFAULT_SESSION_TITLE, Message, Session};
use chatsync_infrastructure::dto::{decode_sessions, encode_sessions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::watch;

/// Result of populating the in-memory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub count: usize,
    /// Which backend the records came from.
    pub source: WriteOutcome,
}

pub struct SessionRepository {
    router: StoreRouter<Session>,
    state: SessionStateStore,
    default_title: String,
}

impl SessionRepository {
    pub fn new(router: StoreRouter<Session>) -> Self {
        Self {
            router,
            state: SessionStateStore::new(),
            default_title: DEFAULT_SESSION_TITLE.to_string(),
        }
    }

    /// Title given to new sessions.
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    pub fn router(&self) -> &StoreRouter<Session> {
        &self.router
    }

    fn updater(&self) -> RecordUpdater<'_, Session> {
        RecordUpdater::new(&self.router, &self.state)
    }

    // ============================================================================
    // Reads
    // ============================================================================

    /// Replaces the in-memory state with the authoritative backend's contents.
    pub async fn load(&self) -> Result<LoadReport> {
        let (sessions, source) = self.router.load_all().await?;
        let count = sessions.len();
        self.state.dispatch(SessionAction::Loaded(sessions));

        tracing::info!("[SessionRepository] Loaded {} sessions ({:?})", count, source);
        Ok(LoadReport { count, source })
    }

    /// Looks a session up in memory. Never touches a store.
    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.state.get(id)
    }

    /// All sessions, most recently updated first.
    pub fn list_sessions(&self) -> Vec<Session> {
        self.state.list()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    /// Observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    // ============================================================================
    // Writes
    // ============================================================================

    /// Creates an empty session with the default title.
    pub async fn create_session(&self, bot: Option<BotConfig>) -> Result<Written<Session>> {
        let session = Session::new(self.default_title.clone(), bot);
        let outcome = self.router.put(&session).await?;
        self.state.dispatch(SessionAction::Upserted(session.clone()));

        tracing::info!(
            "[SessionRepository] Created session '{}' ({:?})",
            session.id,
            outcome
        );
        Ok(Written::new(session, outcome))
    }

    /// Overwrites the whole session document.
    ///
    /// Returns `None` without writing when the session is not in memory,
    /// so a late write cannot bring back a deleted session.
    pub async fn update_session(
        &self,
        id: &str,
        mut session: Session,
    ) -> Result<Option<WriteOutcome>> {
        if session.id != id {
            return Err(ChatsyncError::validation(format!(
                "Session id mismatch: '{}' does not match '{}'",
                session.id, id
            )));
        }

        let Some(current) = self.state.get(id) else {
            tracing::debug!("[SessionRepository] Ignoring update of unknown session '{}'", id);
            return Ok(None);
        };
        // Never stamp below the copy being replaced.
        if current.updated_at > session.updated_at {
            session.updated_at = current.updated_at;
        }
        session.touch();

        let outcome = self.router.put(&session).await?;
        self.state.dispatch(SessionAction::Upserted(session));
        Ok(Some(outcome))
    }

    pub async fn append_message(
        &self,
        id: &str,
        message: Message,
    ) -> Result<Option<Written<Session>>> {
        self.updater()
            .update(id, |session| session.messages.push(message))
            .await
    }

    /// Replaces the message history, e.g. after a regenerate or an edit.
    pub async fn replace_messages(
        &self,
        id: &str,
        messages: Vec<Message>,
    ) -> Result<Option<Written<Session>>> {
        self.updater()
            .update(id, |session| session.messages = messages)
            .await
    }

    pub async fn rename_session(
        &self,
        id: &str,
        title: impl Into<String>,
    ) -> Result<Option<Written<Session>>> {
        let title = title.into();
        self.updater()
            .update(id, |session| session.title = title)
            .await
    }

    pub async fn assign_hub(
        &self,
        id: &str,
        hub_id: Option<String>,
    ) -> Result<Option<Written<Session>>> {
        self.updater()
            .update(id, |session| session.hub_id = hub_id)
            .await
    }

    /// Forks the first `upto` messages of `parent_id` into a new session.
    pub async fn branch_session(
        &self,
        parent_id: &str,
        upto: usize,
        branch_name: Option<String>,
    ) -> Result<Option<Written<Session>>> {
        let Some(parent) = self.state.get(parent_id) else {
            return Ok(None);
        };

        let branch = parent.branch(upto, branch_name);
        let outcome = self.router.put(&branch).await?;
        self.state.dispatch(SessionAction::Upserted(branch.clone()));

        tracing::info!(
            "[SessionRepository] Branched '{}' from '{}' at {}",
            branch.id,
            parent_id,
            branch.messages.len()
        );
        Ok(Some(Written::new(branch, outcome)))
    }

    /// Deletes a session. Unknown ids are a no-op.
    pub async fn delete_session(&self, id: &str) -> Result<WriteOutcome> {
        let outcome = self.router.delete(id).await?;
        self.state.dispatch(SessionAction::Removed(vec![id.to_string()]));
        Ok(outcome)
    }

    /// Deletes several sessions.
    ///
    /// Every id is attempted; sessions that were deleted leave the state even
    /// if others failed, in which case the errors are returned together.
    pub async fn delete_sessions(&self, ids: &[String]) -> Result<WriteOutcome> {
        let mut removed = Vec::new();
        let mut outcomes = Vec::new();
        let mut errors = Vec::new();

        for id in ids {
            match self.router.delete(id).await {
                Ok(outcome) => {
                    removed.push(id.clone());
                    outcomes.push(outcome);
                }
                Err(e) => errors.push(e),
            }
        }

        if !removed.is_empty() {
            self.state.dispatch(SessionAction::Removed(removed));
        }

        match errors.len() {
            0 => Ok(combine_outcomes(outcomes)),
            1 => Err(errors.remove(0)),
            _ => Err(ChatsyncError::Multiple(errors)),
        }
    }

    /// Removes every session from the local store and, when authenticated,
    /// from the user's remote partition.
    pub async fn clear_all_sessions(&self) -> Result<WriteOutcome> {
        let outcome = self.router.clear().await?;
        self.state.dispatch(SessionAction::Cleared);
        tracing::info!("[SessionRepository] Cleared all sessions ({:?})", outcome);
        Ok(outcome)
    }

    // ============================================================================
    // Backup
    // ============================================================================

    /// Serializes every session in memory to the export format.
    pub fn export_all_sessions(&self) -> Result<String> {
        encode_sessions(&self.state.list())
    }

    /// Replaces the whole collection with an export.
    ///
    /// The input is fully validated before anything is written. Every
    /// imported session is written first; sessions missing from the export
    /// are removed only once all of those writes landed. On any failure the
    /// in-memory state is reloaded from the stores and the errors are
    /// returned. Imported sessions keep their timestamps.
    pub async fn import_all_sessions(&self, json: &str) -> Result<WriteOutcome> {
        let sessions = match decode_sessions(json) {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!("[SessionRepository] Rejected import: {}", e);
                self.router
                    .notifier()
                    .notify(Notice::error(format!("Import failed: {}", e)));
                return Err(e);
            }
        };

        let mut outcomes = Vec::with_capacity(sessions.len());
        let mut errors = Vec::new();
        for session in &sessions {
            match self.router.put(session).await {
                Ok(outcome) => {
                    // Keep the device copy in step with the remote one.
                    if outcome == WriteOutcome::Remote {
                        if let Err(e) = self.router.local().put(session).await {
                            tracing::warn!(
                                "[SessionRepository] Failed to cache imported session '{}': {}",
                                session.id,
                                e
                            );
                        }
                    }
                    outcomes.push(outcome);
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            let keep: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
            errors.extend(self.prune_except(&keep).await);
        }

        if !errors.is_empty() {
            let error = match errors.len() {
                1 => errors.remove(0),
                _ => ChatsyncError::Multiple(errors),
            };
            tracing::error!("[SessionRepository] Import incomplete: {}", error);
            if let Err(e) = self.load().await {
                tracing::warn!("[SessionRepository] Reload after failed import failed: {}", e);
            }
            self.router
                .notifier()
                .notify(Notice::error(format!("Import failed: {}", error)));
            return Err(error);
        }

        let count = sessions.len();
        self.state.dispatch(SessionAction::Loaded(sessions));
        self.router
            .notifier()
            .notify(Notice::info(format!("Imported {} sessions", count)));

        Ok(combine_outcomes(outcomes))
    }

    /// Deletes every stored session whose id is not in `keep`.
    ///
    /// Both stores are pruned. While authenticated a remote failure is an
    /// error here rather than a degraded outcome, since a stale remote row
    /// would come back on the next merge.
    async fn prune_except(&self, keep: &HashSet<&str>) -> Vec<ChatsyncError> {
        let mut errors = Vec::new();

        match self.router.local().get_all().await {
            Ok(stored) => {
                for session in stored.iter().filter(|s| !keep.contains(s.id.as_str())) {
                    if let Err(e) = self.router.local().delete(&session.id).await {
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(e),
        }

        let (Some(remote), Some(user)) = (self.router.remote(), self.router.auth().current())
        else {
            return errors;
        };
        match remote.get_all(&user).await {
            Ok(stored) => {
                for session in stored.iter().filter(|s| !keep.contains(s.id.as_str())) {
                    if let Err(e) = remote.delete(&user, &session.id).await {
                        errors.push(e);
                    }
                }
            }
            Err(e) => errors.push(e),
        }
        errors
    }

    // ============================================================================
    // Sync
    // ============================================================================

    /// Merges the local store with `user`'s remote partition and adopts the
    /// merged set.
    pub async fn reconcile(&self, user: &UserIdentity) -> Result<SyncReport> {
        let remote = self
            .router
            .remote()
            .ok_or_else(|| ChatsyncError::config("No remote store configured"))?;

        let reconciler = Reconciler::new(
            self.router.local().clone(),
            remote.clone(),
            self.router.notifier().clone(),
        );
        let reconciled = reconciler.reconcile(user).await?;
        self.state.dispatch(SessionAction::Loaded(reconciled.merged));
        Ok(reconciled.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::notify::ChannelNotifier;
    use crate::router::Backends;
    use chatsync_core::notify::NoticeLevel;
    use chatsync_core::LocalStore;
    use chatsync_infrastructure::{InMemoryLocalStore, InMemoryRemoteStore};
    use std::sync::Arc;

    struct Fixture {
        local: Arc<InMemoryLocalStore<Session>>,
        remote: Arc<InMemoryRemoteStore<Session>>,
        auth: Arc<AuthContext>,
        repository: SessionRepository,
        notices: tokio::sync::mpsc::UnboundedReceiver<Notice>,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(InMemoryLocalStore::new());
        let remote = Arc::new(InMemoryRemoteStore::new());
        let auth = Arc::new(AuthContext::new());
        let (notifier, notices) = ChannelNotifier::channel();
        let router = StoreRouter::new(
            Backends::new(local.clone(), Some(remote.clone())),
            auth.clone(),
            Arc::new(notifier),
        );
        Fixture {
            local,
            remote,
            auth,
            repository: SessionRepository::new(router),
            notices,
        }
    }

    #[tokio::test]
    async fn test_create_session_defaults() {
        let f = fixture();
        let written = f.repository.create_session(None).await.unwrap();

        assert_eq!(written.outcome, WriteOutcome::Local);
        assert_eq!(written.value.title, "New Chat");
        assert!(written.value.messages.is_empty());
        assert_eq!(f.repository.get_session(&written.value.id), Some(written.value));
    }

    #[tokio::test]
    async fn test_custom_default_title() {
        let f = fixture();
        let repository = f.repository.with_default_title("Untitled");
        let written = repository.create_session(None).await.unwrap();
        assert_eq!(written.value.title, "Untitled");
    }

    #[tokio::test]
    async fn test_update_session_rejects_id_mismatch() {
        let f = fixture();
        let created = f.repository.create_session(None).await.unwrap().value;

        let err = f
            .repository
            .update_session("other-id", created)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_update_session_stamps_and_persists() {
        let f = fixture();
        let mut session = f.repository.create_session(None).await.unwrap().value;
        let before = session.updated_at;
        session.title = "Edited".to_string();

        f.repository
            .update_session(&session.id.clone(), session.clone())
            .await
            .unwrap();

        let stored = f.local.snapshot().await[&session.id].clone();
        assert_eq!(stored.title, "Edited");
        assert!(stored.updated_at > before);
        assert_eq!(f.repository.get_session(&session.id), Some(stored));
    }

    #[tokio::test]
    async fn test_mutators_return_none_for_unknown_ids() {
        let f = fixture();
        assert!(f
            .repository
            .append_message("missing", Message::user("hi"))
            .await
            .unwrap()
            .is_none());
        assert!(f
            .repository
            .rename_session("missing", "x")
            .await
            .unwrap()
            .is_none());
        assert!(f
            .repository
            .branch_session("missing", 1, None)
            .await
            .unwrap()
            .is_none());
        assert_eq!(f.local.put_count(), 0);
    }

    #[tokio::test]
    async fn test_append_and_replace_messages() {
        let f = fixture();
        let id = f.repository.create_session(None).await.unwrap().value.id;

        f.repository
            .append_message(&id, Message::user("first"))
            .await
            .unwrap();
        let written = f
            .repository
            .append_message(&id, Message::assistant("second"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(written.value.messages.len(), 2);

        let replaced = f
            .repository
            .replace_messages(&id, vec![Message::user("regenerated")])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.value.messages.len(), 1);
        assert_eq!(
            f.local.snapshot().await[&id].messages[0].content,
            "regenerated"
        );
    }

    #[tokio::test]
    async fn test_remote_failure_degrades_to_local() {
        let mut f = fixture();
        f.auth.set(Some(UserIdentity::new("user-1", "token")));
        f.remote.set_failing(true);

        let written = f.repository.create_session(None).await.unwrap();
        assert!(written.outcome.is_degraded());
        assert!(f.local.snapshot().await.contains_key(&written.value.id));
        assert_eq!(f.notices.try_recv().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_delete_sessions_and_clear() {
        let f = fixture();
        let a = f.repository.create_session(None).await.unwrap().value;
        let b = f.repository.create_session(None).await.unwrap().value;
        let c = f.repository.create_session(None).await.unwrap().value;

        f.repository
            .delete_sessions(&[a.id.clone(), "missing".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(f.repository.list_sessions(), vec![c.clone()]);

        f.repository.delete_session(&c.id).await.unwrap();
        f.repository.delete_session(&c.id).await.unwrap();
        assert!(f.repository.list_sessions().is_empty());

        f.repository.create_session(None).await.unwrap();
        f.repository.clear_all_sessions().await.unwrap();
        assert!(f.repository.list_sessions().is_empty());
        assert!(f.local.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_import_leaves_data_untouched() {
        let mut f = fixture();
        let kept = f.repository.create_session(None).await.unwrap().value;

        let err = f
            .repository
            .import_all_sessions("[{\"id\": \"\"}]")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.repository.list_sessions(), vec![kept.clone()]);
        assert!(f.local.snapshot().await.contains_key(&kept.id));
        assert_eq!(f.notices.try_recv().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_failed_import_keeps_memory_in_step_with_store() {
        let mut f = fixture();
        let kept_a = f.repository.create_session(None).await.unwrap().value;
        let kept_b = f.repository.create_session(None).await.unwrap().value;

        let payload = encode_sessions(&[Session::new("one", None), Session::new("two", None)])
            .unwrap();
        f.local.fail_puts_after(1);

        let err = f.repository.import_all_sessions(&payload).await.unwrap_err();
        assert!(matches!(err, ChatsyncError::Io { .. }));

        let stored = f.local.snapshot().await;
        let mut in_memory: Vec<String> =
            f.repository.list_sessions().into_iter().map(|s| s.id).collect();
        in_memory.sort();
        assert_eq!(stored.keys().cloned().collect::<Vec<_>>(), in_memory);
        // Nothing that existed before the import was lost.
        assert!(stored.contains_key(&kept_a.id));
        assert!(stored.contains_key(&kept_b.id));
        assert_eq!(stored.len(), 3);

        let mut levels = Vec::new();
        while let Ok(notice) = f.notices.try_recv() {
            levels.push(notice.level);
        }
        assert!(levels.contains(&NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_authenticated_import_replaces_both_stores() {
        let f = fixture();
        let user = UserIdentity::new("user-1", "token");
        let stale_remote = Session::new("stale remote", None);
        let stale_local = Session::new("stale local", None);
        f.remote.seed("user-1", [stale_remote.clone()]).await;
        f.local.put(&stale_local).await.unwrap();
        f.auth.set(Some(user));

        let imported = Session::new("imported", None);
        let outcome = f
            .repository
            .import_all_sessions(&encode_sessions(&[imported.clone()]).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Remote);
        let remote = f.remote.snapshot("user-1").await;
        let local = f.local.snapshot().await;
        assert_eq!(remote.keys().collect::<Vec<_>>(), vec![&imported.id]);
        assert_eq!(local.keys().collect::<Vec<_>>(), vec![&imported.id]);
        assert_eq!(
            f.repository.list_sessions().into_iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![imported.id]
        );
    }

    #[tokio::test]
    async fn test_update_after_delete_does_not_resurrect() {
        let f = fixture();
        let session = f.repository.create_session(None).await.unwrap().value;
        f.repository.delete_session(&session.id).await.unwrap();
        let puts = f.local.put_count();

        let mut late = session.clone();
        late.title = "Late stream result".to_string();
        let outcome = f.repository.update_session(&session.id, late).await.unwrap();

        assert!(outcome.is_none());
        assert!(f.repository.get_session(&session.id).is_none());
        assert!(f.local.snapshot().await.is_empty());
        assert_eq!(f.local.put_count(), puts);
    }

    #[tokio::test]
    async fn test_update_session_falls_back_when_remote_fails() {
        let mut f = fixture();
        f.auth.set(Some(UserIdentity::new("user-1", "token")));
        let mut session = f.repository.create_session(None).await.unwrap().value;
        f.remote.set_failing(true);
        // Drop the notice from anything before the failure.
        while f.notices.try_recv().is_ok() {}

        session.title = "Written offline".to_string();
        let outcome = f
            .repository
            .update_session(&session.id.clone(), session.clone())
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(f.local.snapshot().await[&session.id].title, "Written offline");
        assert_eq!(f.remote.snapshot("user-1").await[&session.id].title, "New Chat");
        assert_eq!(
            f.repository.get_session(&session.id).unwrap().title,
            "Written offline"
        );
        assert_eq!(f.notices.try_recv().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let f = fixture();
        let older = f.repository.create_session(None).await.unwrap().value;
        let newer = f.repository.create_session(None).await.unwrap().value;

        let mut touched = older.clone();
        touched.updated_at = newer.updated_at + chrono::Duration::seconds(1);
        f.repository.update_session(&older.id, touched).await.unwrap();

        let ids: Vec<String> = f
            .repository
            .list_sessions()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn test_reconcile_without_remote_is_config_error() {
        let local: Arc<InMemoryLocalStore<Session>> = Arc::new(InMemoryLocalStore::new());
        let router = StoreRouter::new(
            Backends::local_only(local),
            Arc::new(AuthContext::new()),
            Arc::new(crate::notify::TracingNotifier),
        );
        let repository = SessionRepository::new(router);

        let err = repository
            .reconcile(&UserIdentity::new("user-1", "token"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatsyncError::Config(_)));
    }
}
