//! Backup export format.
//!
//! A JSON array of sessions with camelCase keys and ISO-8601 timestamps.
//! `decode_sessions` is the exact inverse of `encode_sessions`; it also accepts
//! exports written before `updatedAt` existed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::truncate_to_millis;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::session::{Attachment, BotConfig, BranchOrigin, Message, MessageRole, Session};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageExport {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<MessageExport>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_branch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branched_at: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}

impl From<&Message> for MessageExport {
    fn from(message: &Message) -> Self {
        MessageExport {
            id: message.id.clone(),
            role: message.role,
            content: message.content.clone(),
            attachments: message.attachments.clone(),
            annotations: message.annotations.clone(),
            created_at: message.created_at,
        }
    }
}

impl From<MessageExport> for Message {
    fn from(dto: MessageExport) -> Self {
        Message {
            id: dto.id,
            role: dto.role,
            content: dto.content,
            attachments: dto.attachments,
            annotations: dto.annotations,
            created_at: dto.created_at,
        }
    }
}

impl From<&Session> for SessionExport {
    fn from(session: &Session) -> Self {
        let branch = session.branch.as_ref();
        SessionExport {
            id: session.id.clone(),
            title: session.title.clone(),
            messages: session.messages.iter().map(MessageExport::from).collect(),
            created_at: session.created_at,
            updated_at: Some(session.updated_at),
            is_branch: session.is_branch(),
            parent_session_id: branch.map(|b| b.parent_session_id.clone()),
            branch_name: branch.and_then(|b| b.branch_name.clone()),
            branched_at: branch.and_then(|b| b.branched_at),
            bot: session.bot.clone(),
            hub_id: session.hub_id.clone(),
        }
    }
}

impl From<SessionExport> for Session {
    fn from(dto: SessionExport) -> Self {
        let created_at = truncate_to_millis(dto.created_at);
        let updated_at = dto
            .updated_at
            .map_or(created_at, truncate_to_millis)
            .max(created_at);
        let branch = dto.parent_session_id.map(|parent_session_id| BranchOrigin {
            parent_session_id,
            branch_name: dto.branch_name,
            branched_at: dto.branched_at,
        });

        Session {
            id: dto.id,
            title: dto.title,
            messages: dto.messages.into_iter().map(Message::from).collect(),
            created_at,
            updated_at,
            branch,
            bot: dto.bot,
            hub_id: dto.hub_id,
        }
    }
}

/// Serializes sessions to the export format.
pub fn encode_sessions(sessions: &[Session]) -> Result<String> {
    let exported: Vec<SessionExport> = sessions.iter().map(SessionExport::from).collect();
    Ok(serde_json::to_string_pretty(&exported)?)
}

/// Parses and validates an export.
///
/// Every problem is reported as a `Validation` error, so callers can reject the
/// import before touching any store.
pub fn decode_sessions(json: &str) -> Result<Vec<Session>> {
    let exported: Vec<SessionExport> = serde_json::from_str(json)
        .map_err(|e| ChatsyncError::validation(format!("Malformed session export: {}", e)))?;

    let mut seen = HashSet::new();
    for (index, session) in exported.iter().enumerate() {
        validate_id(&session.id)
            .map_err(|reason| ChatsyncError::validation(format!("Session #{}: {}", index, reason)))?;
        if !seen.insert(session.id.as_str()) {
            return Err(ChatsyncError::validation(format!(
                "Duplicate session id '{}'",
                session.id
            )));
        }
    }

    Ok(exported.into_iter().map(Session::from).collect())
}

/// Ids double as local file names, so they must be usable as one.
fn validate_id(id: &str) -> std::result::Result<(), String> {
    if id.trim().is_empty() {
        return Err("empty id".to_string());
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(format!("id '{}' is not a valid identifier", id));
    }
    Ok(())
}
