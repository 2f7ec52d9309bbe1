//! AsyncDirStorage-based local session store.
//!
//! One versioned JSON document per session. Documents written by older
//! releases are migrated to the current schema when read.

use crate::dto::create_session_migrator;
use crate::storage::is_not_found;
use async_trait::async_trait;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::session::Session;
use chatsync_core::store::LocalStore;
use std::path::{Path, PathBuf};
use tokio::fs;
use version_migrate::{
    AppPaths, AsyncDirStorage, DirStorageStrategy, FilenameEncoding, FormatStrategy, PathStrategy,
};

const ENTITY: &str = "session";

/// Directory-backed [`LocalStore`] for sessions.
///
/// Directory structure:
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <session-id-1>.json
///     └── <session-id-2>.json
/// ```
pub struct AsyncDirSessionStore {
    storage: AsyncDirStorage,
    base_dir: PathBuf,
}

impl AsyncDirSessionStore {
    /// Opens the store under the platform data directory.
    pub async fn default_location() -> Result<Self> {
        let base_dir = crate::paths::ChatsyncPaths::data_dir()?;
        Self::new(base_dir).await
    }

    /// Opens the store under `base_dir`, creating directories as needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir).await?;

        let paths =
            AppPaths::new("chatsync").data_strategy(PathStrategy::CustomBase(base_dir.clone()));
        let strategy = DirStorageStrategy::default()
            .with_format(FormatStrategy::Json)
            .with_filename_encoding(FilenameEncoding::Direct);

        let storage = AsyncDirStorage::new(paths, "sessions", create_session_migrator(), strategy)
            .await
            .map_err(|e| {
                ChatsyncError::storage(format!("Failed to open session storage: {}", e))
            })?;

        Ok(Self { storage, base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the session documents.
    pub fn sessions_dir(&self) -> &Path {
        self.storage.base_path()
    }

    /// Loads a single session, `None` if it does not exist.
    pub async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        match self.storage.load::<Session>(ENTITY, session_id).await {
            Ok(session) => Ok(Some(session)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl LocalStore<Session> for AsyncDirSessionStore {
    async fn put(&self, session: &Session) -> Result<()> {
        self.storage.save(ENTITY, &session.id, session).await?;
        tracing::debug!("[AsyncDirSessionStore] Saved session '{}'", session.id);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Session>> {
        let all = self.storage.load_all::<Session>(ENTITY).await?;
        Ok(all.into_iter().map(|(_id, session)| session).collect())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        match self.storage.delete(session_id).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        clear_json_documents(self.sessions_dir()).await
    }
}

/// Removes every `.json` document in `dir`. A missing directory is already clear.
pub(crate) async fn clear_json_documents(dir: &Path) -> Result<()> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0usize;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            fs::remove_file(&path).await?;
            removed += 1;
        }
    }

    tracing::debug!("Removed {} documents from {}", removed, dir.display());
    Ok(())
}
