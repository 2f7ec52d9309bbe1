//! Hub repository façade.
//!
//! Same routing, fallback and merge rules as sessions.

use crate::router::StoreRouter;
use crate::session::LoadReport;
use crate::state::{HubSnapshot, HubStateStore, StateAction};
use crate::sync::{Reconciler, SyncReport};
use crate::updater::RecordUpdater;
use chatsync_core::UserIdentity;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::hub::{FileReference, Hub};
use chatsync_core::outcome::{WriteOutcome, Written};
use tokio::sync::watch;

pub struct HubRepository {
    router: StoreRouter<Hub>,
    state: HubStateStore,
}

impl HubRepository {
    pub fn new(router: StoreRouter<Hub>) -> Self {
        Self {
            router,
            state: HubStateStore::new(),
        }
    }

    pub fn router(&self) -> &StoreRouter<Hub> {
        &self.router
    }

    fn updater(&self) -> RecordUpdater<'_, Hub> {
        RecordUpdater::new(&self.router, &self.state)
    }

    pub async fn load(&self) -> Result<LoadReport> {
        let (hubs, source) = self.router.load_all().await?;
        let count = hubs.len();
        self.state.dispatch(StateAction::Loaded(hubs));

        tracing::info!("[HubRepository] Loaded {} hubs ({:?})", count, source);
        Ok(LoadReport { count, source })
    }

    pub fn get_hub(&self, id: &str) -> Option<Hub> {
        self.state.get(id)
    }

    pub fn list_hubs(&self) -> Vec<Hub> {
        self.state.list()
    }

    pub fn subscribe(&self) -> watch::Receiver<HubSnapshot> {
        self.state.subscribe()
    }

    pub async fn create_hub(&self, name: impl Into<String>) -> Result<Written<Hub>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ChatsyncError::validation("Hub name must not be empty"));
        }

        let hub = Hub::new(name);
        let outcome = self.router.put(&hub).await?;
        self.state.dispatch(StateAction::Upserted(hub.clone()));
        Ok(Written::new(hub, outcome))
    }

    pub async fn rename_hub(
        &self,
        id: &str,
        name: impl Into<String>,
    ) -> Result<Option<Written<Hub>>> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ChatsyncError::validation("Hub name must not be empty"));
        }
        self.updater().update(id, |hub| hub.name = name).await
    }

    /// Adds a session to the hub. Adding a member twice still stamps the hub.
    pub async fn add_session(&self, id: &str, session_id: &str) -> Result<Option<Written<Hub>>> {
        self.updater()
            .update(id, |hub| {
                hub.add_session(session_id);
            })
            .await
    }

    pub async fn remove_session(
        &self,
        id: &str,
        session_id: &str,
    ) -> Result<Option<Written<Hub>>> {
        self.updater()
            .update(id, |hub| {
                hub.remove_session(session_id);
            })
            .await
    }

    /// Adds a file reference, replacing any with the same path.
    pub async fn upsert_file(&self, id: &str, file: FileReference) -> Result<Option<Written<Hub>>> {
        self.updater().update(id, |hub| hub.upsert_file(file)).await
    }

    pub async fn remove_file(&self, id: &str, path: &str) -> Result<Option<Written<Hub>>> {
        self.updater()
            .update(id, |hub| {
                hub.remove_file(path);
            })
            .await
    }

    pub async fn delete_hub(&self, id: &str) -> Result<WriteOutcome> {
        let outcome = self.router.delete(id).await?;
        self.state.dispatch(StateAction::Removed(vec![id.to_string()]));
        Ok(outcome)
    }

    pub async fn clear_all_hubs(&self) -> Result<WriteOutcome> {
        let outcome = self.router.clear().await?;
        self.state.dispatch(StateAction::Cleared);
        Ok(outcome)
    }

    pub async fn reconcile(&self, user: &UserIdentity) -> Result<SyncReport> {
        let remote = self
            .router
            .remote()
            .ok_or_else(|| ChatsyncError::config("No remote store configured"))?;

        let reconciled = Reconciler::new(
            self.router.local().clone(),
            remote.clone(),
            self.router.notifier().clone(),
        )
        .reconcile(user)
        .await?;
        self.state.dispatch(StateAction::Loaded(reconciled.merged));
        Ok(reconciled.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::notify::TracingNotifier;
    use crate::router::Backends;
    use chatsync_infrastructure::{InMemoryLocalStore, InMemoryRemoteStore};
    use std::sync::Arc;

    fn repository() -> (Arc<InMemoryLocalStore<Hub>>, HubRepository) {
        let local = Arc::new(InMemoryLocalStore::new());
        let remote: Arc<InMemoryRemoteStore<Hub>> = Arc::new(InMemoryRemoteStore::new());
        let router = StoreRouter::new(
            Backends::new(local.clone(), Some(remote)),
            Arc::new(AuthContext::new()),
            Arc::new(TracingNotifier),
        );
        (local, HubRepository::new(router))
    }

    #[tokio::test]
    async fn test_hub_lifecycle() {
        let (local, repository) = repository();
        let hub = repository.create_hub("Research").await.unwrap().value;

        repository.add_session(&hub.id, "s1").await.unwrap();
        repository.add_session(&hub.id, "s1").await.unwrap();
        repository.add_session(&hub.id, "s2").await.unwrap();
        repository.remove_session(&hub.id, "s1").await.unwrap();
        repository
            .upsert_file(
                &hub.id,
                FileReference {
                    name: "data.csv".to_string(),
                    file_type: "text/csv".to_string(),
                    path: "research/data.csv".to_string(),
                    size: 10,
                },
            )
            .await
            .unwrap();
        let renamed = repository
            .rename_hub(&hub.id, "Research 2024")
            .await
            .unwrap()
            .unwrap()
            .value;

        assert_eq!(renamed.chat_session_ids, vec!["s2".to_string()]);
        assert_eq!(renamed.file_references.len(), 1);
        assert!(renamed.updated_at > hub.updated_at);
        assert_eq!(local.snapshot().await[&hub.id], renamed);

        repository
            .remove_file(&hub.id, "research/data.csv")
            .await
            .unwrap();
        repository.delete_hub(&hub.id).await.unwrap();
        assert!(repository.get_hub(&hub.id).is_none());
        assert!(local.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let (local, repository) = repository();
        assert!(repository.create_hub("  ").await.unwrap_err().is_validation());
        assert_eq!(local.put_count(), 0);
    }
}
