//! Configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer; every section is
//! optional and falls back to its defaults.

use crate::session::DEFAULT_SESSION_TITLE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default timeout for remote requests.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ChatsyncConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Remote store; when absent the application runs local-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_title")]
    pub default_title: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_title: default_title(),
        }
    }
}

fn default_title() -> String {
    DEFAULT_SESSION_TITLE.to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// PostgREST endpoint, e.g. `https://project.supabase.co/rest/v1`
    pub base_url: String,
    /// Public API key sent as the `apikey` header
    pub api_key: String,
    #[serde(default = "default_sessions_table")]
    pub sessions_table: String,
    #[serde(default = "default_hubs_table")]
    pub hubs_table: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            sessions_table: default_sessions_table(),
            hubs_table: default_hubs_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_sessions_table() -> String {
    "chat_sessions".to_string()
}

fn default_hubs_table() -> String {
    "chat_hubs".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ChatsyncConfig = toml::from_str("").unwrap();
        assert_eq!(config.session.default_title, "New Chat");
        assert!(config.remote.is_none());
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_remote_section_defaults() {
        let config: ChatsyncConfig = toml::from_str(
            r#"
[remote]
base_url = "https://example.supabase.co/rest/v1"
api_key = "anon"
"#,
        )
        .unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.sessions_table, "chat_sessions");
        assert_eq!(remote.hubs_table, "chat_hubs");
        assert_eq!(remote.timeout_secs, 30);
    }
}
