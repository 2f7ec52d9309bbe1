//! Row shapes of the remote tables.
//!
//! Columns mirror the hosted schema exactly, including the camelCase lineage
//! columns of `chat_sessions`. Rows written before `updated_at` existed come
//! back with a null stamp and are read as `created_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::truncate_to_millis;

use chatsync_core::UserIdentity;
use chatsync_core::hub::{FileReference, Hub};
use chatsync_core::session::{BotConfig, BranchOrigin, Message, Session};

/// One row of `chat_sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub bot: Option<BotConfig>,
    #[serde(rename = "parentSessionId", default)]
    pub parent_session_id: Option<String>,
    #[serde(rename = "branchName", default)]
    pub branch_name: Option<String>,
    #[serde(rename = "branchedAt", default)]
    pub branched_at: Option<usize>,
    #[serde(rename = "hubId", default)]
    pub hub_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    pub fn from_domain(user: &UserIdentity, session: &Session) -> Self {
        let branch = session.branch.as_ref();
        Self {
            id: session.id.clone(),
            user_id: user.user_id.clone(),
            title: session.title.clone(),
            messages: Some(session.messages.clone()),
            bot: session.bot.clone(),
            parent_session_id: branch.map(|b| b.parent_session_id.clone()),
            branch_name: branch.and_then(|b| b.branch_name.clone()),
            branched_at: branch.and_then(|b| b.branched_at),
            hub_id: session.hub_id.clone(),
            created_at: session.created_at,
            updated_at: Some(session.updated_at),
        }
    }

    /// Normalises a row into the domain model.
    pub fn into_domain(self) -> Session {
        let created_at = truncate_to_millis(self.created_at);
        let updated_at = self
            .updated_at
            .map_or(created_at, truncate_to_millis)
            .max(created_at);

        Session {
            id: self.id,
            title: self.title,
            messages: self.messages.unwrap_or_default(),
            created_at,
            updated_at,
            branch: self.parent_session_id.map(|parent_session_id| BranchOrigin {
                parent_session_id,
                branch_name: self.branch_name,
                branched_at: self.branched_at,
            }),
            bot: self.bot,
            hub_id: self.hub_id,
        }
    }
}

/// One row of `chat_hubs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub file_references: Option<Vec<FileReference>>,
    #[serde(default)]
    pub chat_session_ids: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl HubRow {
    pub fn from_domain(user: &UserIdentity, hub: &Hub) -> Self {
        Self {
            id: hub.id.clone(),
            user_id: user.user_id.clone(),
            name: hub.name.clone(),
            file_references: Some(hub.file_references.clone()),
            chat_session_ids: Some(hub.chat_session_ids.clone()),
            created_at: hub.created_at,
            updated_at: Some(hub.updated_at),
        }
    }

    pub fn into_domain(self) -> Hub {
        let created_at = truncate_to_millis(self.created_at);
        let updated_at = self
            .updated_at
            .map_or(created_at, truncate_to_millis)
            .max(created_at);

        Hub {
            id: self.id,
            name: self.name,
            file_references: self.file_references.unwrap_or_default(),
            chat_session_ids: self.chat_session_ids.unwrap_or_default(),
            created_at,
            updated_at,
        }
    }
}
