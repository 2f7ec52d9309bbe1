//! Configuration service.
//!
//! Loads `config.toml` (by default `~/.config/chatsync/config.toml`), applies
//! environment overrides and caches the result.

use crate::paths::ChatsyncPaths;
use crate::storage::AtomicTomlFile;
use chatsync_core::config::{ChatsyncConfig, RemoteConfig};
use chatsync_core::error::{ChatsyncError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Overrides `[remote] base_url`.
pub const ENV_REMOTE_URL: &str = "CHATSYNC_REMOTE_URL";
/// Overrides `[remote] api_key`.
pub const ENV_REMOTE_API_KEY: &str = "CHATSYNC_REMOTE_API_KEY";

/// Loads and caches the configuration file.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<AtomicTomlFile<ChatsyncConfig>>,
    config: Arc<RwLock<Option<ChatsyncConfig>>>,
}

impl ConfigService {
    /// Service for the platform config file.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ChatsyncPaths::config_file()?))
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicTomlFile::new(path)),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the effective configuration, loading it on first access.
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// on top of whatever the file says.
    pub fn get_config(&self) -> Result<ChatsyncConfig> {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let from_file = self.file.load()?.unwrap_or_default();
        let effective = apply_overrides(from_file, |key| std::env::var(key).ok())?;

        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(effective.clone());
        Ok(effective)
    }

    /// Writes a default configuration file unless one exists.
    ///
    /// Returns false when the file was already present.
    pub fn init(&self) -> Result<bool> {
        let created = self.file.locked(|current| {
            Ok(match current {
                Some(_) => (None, false),
                None => (Some(ChatsyncConfig::default()), true),
            })
        })?;
        if created {
            tracing::info!("[ConfigService] Wrote default config to {}", self.path().display());
        }
        Ok(created)
    }

    /// Persists `config` and refreshes the cache.
    pub fn save(&self, config: &ChatsyncConfig) -> Result<()> {
        self.file.save(config)?;
        self.invalidate_cache();
        Ok(())
    }

    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
    }
}

/// Applies environment overrides to a loaded configuration.
///
/// Setting only one of the two remote variables is enough to change that field
/// of an existing `[remote]` section, but creating the section from the
/// environment requires both.
pub fn apply_overrides(
    mut config: ChatsyncConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ChatsyncConfig> {
    let url = lookup(ENV_REMOTE_URL).filter(|v| !v.trim().is_empty());
    let key = lookup(ENV_REMOTE_API_KEY).filter(|v| !v.trim().is_empty());

    if let Some(remote) = config.remote.as_mut() {
        if let Some(url) = url {
            remote.base_url = url;
        }
        if let Some(key) = key {
            remote.api_key = key;
        }
        return Ok(config);
    }

    match (url, key) {
        (Some(url), Some(key)) => config.remote = Some(RemoteConfig::new(url, key)),
        (Some(_), None) => {
            return Err(ChatsyncError::config(format!(
                "{} is set but {} is missing",
                ENV_REMOTE_URL, ENV_REMOTE_API_KEY
            )));
        }
        (None, _) => {}
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_patch_existing_remote() {
        let mut config = ChatsyncConfig::default();
        config.remote = Some(RemoteConfig::new("https://old.example.com", "old-key"));

        let config = apply_overrides(config, env(&[(ENV_REMOTE_URL, "https://new.example.com")]))
            .unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.base_url, "https://new.example.com");
        assert_eq!(remote.api_key, "old-key");
    }

    #[test]
    fn test_overrides_create_remote_from_env() {
        let config = apply_overrides(
            ChatsyncConfig::default(),
            env(&[
                (ENV_REMOTE_URL, "https://db.example.com/rest/v1"),
                (ENV_REMOTE_API_KEY, "anon"),
            ]),
        )
        .unwrap();
        assert_eq!(config.remote.unwrap().sessions_table, "chat_sessions");
    }

    #[test]
    fn test_url_without_key_is_config_error() {
        let result = apply_overrides(
            ChatsyncConfig::default(),
            env(&[(ENV_REMOTE_URL, "https://db.example.com")]),
        );
        assert!(matches!(result, Err(ChatsyncError::Config(_))));
    }

    #[test]
    fn test_init_writes_defaults_once() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));

        assert!(service.init().unwrap());
        assert!(!service.init().unwrap());
        assert!(service.path().exists());
    }

    #[test]
    fn test_save_invalidates_cache() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));
        let mut config = service.get_config().unwrap();
        config.session.default_title = "Untitled".to_string();

        service.save(&config).unwrap();
        assert_eq!(service.get_config().unwrap().session.default_title, "Untitled");
    }
}
