//! AsyncDirStorage-based local hub store.

use crate::async_dir_session_store::clear_json_documents;
use crate::dto::create_hub_migrator;
use crate::storage::is_not_found;
use async_trait::async_trait;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::hub::Hub;
use chatsync_core::store::LocalStore;
use std::path::{Path, PathBuf};
use tokio::fs;
use version_migrate::{
    AppPaths, AsyncDirStorage, DirStorageStrategy, FilenameEncoding, FormatStrategy, PathStrategy,
};

const ENTITY: &str = "hub";

/// Directory-backed [`LocalStore`] for hubs, stored under `base_dir/hubs/`.
pub struct AsyncDirHubStore {
    storage: AsyncDirStorage,
    base_dir: PathBuf,
}

impl AsyncDirHubStore {
    pub async fn default_location() -> Result<Self> {
        let base_dir = crate::paths::ChatsyncPaths::data_dir()?;
        Self::new(base_dir).await
    }

    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir).await?;

        let paths =
            AppPaths::new("chatsync").data_strategy(PathStrategy::CustomBase(base_dir.clone()));
        let strategy = DirStorageStrategy::default()
            .with_format(FormatStrategy::Json)
            .with_filename_encoding(FilenameEncoding::Direct);

        let storage = AsyncDirStorage::new(paths, "hubs", create_hub_migrator(), strategy)
            .await
            .map_err(|e| ChatsyncError::storage(format!("Failed to open hub storage: {}", e)))?;

        Ok(Self { storage, base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn hubs_dir(&self) -> &Path {
        self.storage.base_path()
    }

    pub async fn find_by_id(&self, hub_id: &str) -> Result<Option<Hub>> {
        match self.storage.load::<Hub>(ENTITY, hub_id).await {
            Ok(hub) => Ok(Some(hub)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl LocalStore<Hub> for AsyncDirHubStore {
    async fn put(&self, hub: &Hub) -> Result<()> {
        self.storage.save(ENTITY, &hub.id, hub).await?;
        tracing::debug!("[AsyncDirHubStore] Saved hub '{}'", hub.id);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Hub>> {
        let all = self.storage.load_all::<Hub>(ENTITY).await?;
        Ok(all.into_iter().map(|(_id, hub)| hub).collect())
    }

    async fn delete(&self, hub_id: &str) -> Result<()> {
        match self.storage.delete(hub_id).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        clear_json_documents(self.hubs_dir()).await
    }
}
