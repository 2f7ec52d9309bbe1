//! Unified path management for chatsync.
//!
//! All paths are resolved via `AppPaths` from the version-migrate crate, the
//! same resolver `AsyncDirStorage` uses, so they agree on every platform.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/chatsync/          # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/chatsync/     # Data directory (overridable in config.toml)
//! ├── sessions/                # Session documents (AsyncDirStorage)
//! └── hubs/                    # Hub documents (AsyncDirStorage)
//! ```

use chatsync_core::config::ChatsyncConfig;
use chatsync_core::error::{ChatsyncError, Result};
use std::path::PathBuf;
use version_migrate::AppPaths;

pub struct ChatsyncPaths;

impl ChatsyncPaths {
    fn app_paths() -> AppPaths {
        AppPaths::new("chatsync")
    }

    /// Returns the chatsync configuration directory (e.g. `~/.config/chatsync/`).
    pub fn config_dir() -> Result<PathBuf> {
        Self::app_paths()
            .config_dir()
            .map_err(|e| ChatsyncError::config(format!("Cannot resolve config directory: {}", e)))
    }

    /// Returns the platform data directory (e.g. `~/.local/share/chatsync/`).
    pub fn data_dir() -> Result<PathBuf> {
        Self::app_paths()
            .data_dir()
            .map_err(|e| ChatsyncError::config(format!("Cannot resolve data directory: {}", e)))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Data directory honouring `[storage] data_dir` from the configuration.
    pub fn resolve_data_dir(config: &ChatsyncConfig) -> Result<PathBuf> {
        match &config.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_config_dir() {
        let config_dir = ChatsyncPaths::config_dir().unwrap();
        assert_eq!(ChatsyncPaths::config_file().unwrap(), config_dir.join("config.toml"));
    }

    #[test]
    fn test_configured_data_dir_wins() {
        let mut config = ChatsyncConfig::default();
        config.storage.data_dir = Some(PathBuf::from("/srv/chatsync"));
        assert_eq!(
            ChatsyncPaths::resolve_data_dir(&config).unwrap(),
            PathBuf::from("/srv/chatsync")
        );
    }
}
