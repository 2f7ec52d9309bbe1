//! Remote stores backed by a PostgREST endpoint.
//!
//! Talks to the hosted `chat_sessions` / `chat_hubs` tables over HTTP. Every
//! request carries the project API key plus the user's access token, and every
//! query is filtered by `user_id` in addition to whatever row-level security the
//! server enforces.

use crate::dto::{HubRow, SessionRow};
use async_trait::async_trait;
use chatsync_core::UserIdentity;
use chatsync_core::config::RemoteConfig;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::hub::Hub;
use chatsync_core::session::Session;
use chatsync_core::store::RemoteStore;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Upsert on the primary key instead of failing on conflict.
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// Thin HTTP client for the PostgREST table API.
pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
}

impl PostgrestClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ChatsyncError::config("remote.base_url is required"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| ChatsyncError::config(format!("invalid remote.api_key: {}", e)))?,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ChatsyncError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// Inserts or replaces `row`, keyed by `id`.
    pub async fn upsert<R: Serialize + ?Sized>(
        &self,
        table: &str,
        user: &UserIdentity,
        row: &R,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.table_url(table))
            .bearer_auth(&user.access_token)
            .header("Prefer", PREFER_UPSERT)
            .query(&[("on_conflict", "id")])
            .json(row)
            .send()
            .await
            .map_err(request_failed)?;

        check_status(response).await.map(|_| ())
    }

    /// Fetches every row owned by the user, newest first.
    pub async fn select_all<R: DeserializeOwned>(
        &self,
        table: &str,
        user: &UserIdentity,
    ) -> Result<Vec<R>> {
        let response = self
            .http
            .get(self.table_url(table))
            .bearer_auth(&user.access_token)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user.user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await
            .map_err(request_failed)?;

        check_status(response)
            .await?
            .json::<Vec<R>>()
            .await
            .map_err(|e| ChatsyncError::Serialization {
                format: "JSON".to_string(),
                message: format!("failed to parse {} rows: {}", table, e),
            })
    }

    /// Deletes the user's rows, optionally restricted to one id.
    ///
    /// Deleting rows that do not exist succeeds.
    pub async fn delete(&self, table: &str, user: &UserIdentity, id: Option<&str>) -> Result<()> {
        let mut filters = vec![("user_id", format!("eq.{}", user.user_id))];
        if let Some(id) = id {
            filters.push(("id", format!("eq.{}", id)));
        }

        let response = self
            .http
            .delete(self.table_url(table))
            .bearer_auth(&user.access_token)
            .query(&filters)
            .send()
            .await
            .map_err(request_failed)?;

        check_status(response).await.map(|_| ())
    }
}

fn request_failed(error: reqwest::Error) -> ChatsyncError {
    if error.is_timeout() {
        ChatsyncError::transport(format!("remote request timed out: {}", error))
    } else {
        ChatsyncError::transport(format!("remote request failed: {}", error))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    Err(ChatsyncError::transport_status(
        status.as_u16(),
        format!("remote API error ({}): {}", status, body),
    ))
}

/// [`RemoteStore`] for sessions over `chat_sessions`.
pub struct PostgrestSessionStore {
    client: Arc<PostgrestClient>,
    table: String,
}

impl PostgrestSessionStore {
    pub fn new(client: Arc<PostgrestClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(PostgrestClient::new(config)?),
            config.sessions_table.clone(),
        ))
    }
}

#[async_trait]
impl RemoteStore<Session> for PostgrestSessionStore {
    async fn put(&self, user: &UserIdentity, session: &Session) -> Result<()> {
        let row = SessionRow::from_domain(user, session);
        self.client.upsert(&self.table, user, &row).await
    }

    async fn get_all(&self, user: &UserIdentity) -> Result<Vec<Session>> {
        let rows: Vec<SessionRow> = self.client.select_all(&self.table, user).await?;
        Ok(rows.into_iter().map(SessionRow::into_domain).collect())
    }

    async fn delete(&self, user: &UserIdentity, id: &str) -> Result<()> {
        self.client.delete(&self.table, user, Some(id)).await
    }

    async fn clear(&self, user: &UserIdentity) -> Result<()> {
        self.client.delete(&self.table, user, None).await
    }
}

/// [`RemoteStore`] for hubs over `chat_hubs`.
pub struct PostgrestHubStore {
    client: Arc<PostgrestClient>,
    table: String,
}

impl PostgrestHubStore {
    pub fn new(client: Arc<PostgrestClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(PostgrestClient::new(config)?),
            config.hubs_table.clone(),
        ))
    }
}

#[async_trait]
impl RemoteStore<Hub> for PostgrestHubStore {
    async fn put(&self, user: &UserIdentity, hub: &Hub) -> Result<()> {
        let row = HubRow::from_domain(user, hub);
        self.client.upsert(&self.table, user, &row).await
    }

    async fn get_all(&self, user: &UserIdentity) -> Result<Vec<Hub>> {
        let rows: Vec<HubRow> = self.client.select_all(&self.table, user).await?;
        Ok(rows.into_iter().map(HubRow::into_domain).collect())
    }

    async fn delete(&self, user: &UserIdentity, id: &str) -> Result<()> {
        self.client.delete(&self.table, user, Some(id)).await
    }

    async fn clear(&self, user: &UserIdentity) -> Result<()> {
        self.client.delete(&self.table, user, None).await
    }
}
