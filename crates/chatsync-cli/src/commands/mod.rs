use anyhow::{Context, Result};
use chatsync_application::ChatsyncService;
use chatsync_core::config::ChatsyncConfig;
use chatsync_core::outcome::WriteOutcome;

pub mod config;
pub mod sessions;
pub mod sync;

pub async fn open_service(config: &ChatsyncConfig) -> Result<ChatsyncService> {
    ChatsyncService::from_config_default(config)
        .await
        .context("Failed to open session storage")
}

/// One-line description of where a write landed.
pub fn describe(outcome: &WriteOutcome) -> String {
    match outcome {
        WriteOutcome::Remote => "saved to server".to_string(),
        WriteOutcome::Local => "saved on this device".to_string(),
        WriteOutcome::Degraded { reason } => {
            format!("saved on this device only (server unavailable: {})", reason)
        }
    }
}
