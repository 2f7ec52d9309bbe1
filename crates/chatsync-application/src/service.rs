//! Application entry point tying auth, repositories and sync together.

use crate::auth::AuthContext;
use crate::hub::HubRepository;
use crate::notify::TracingNotifier;
use crate::router::{Backends, StoreRouter};
use crate::session::SessionRepository;
use crate::sync::SyncReport;
use chatsync_core::UserIdentity;
use chatsync_core::config::ChatsyncConfig;
use chatsync_core::error::{ChatsyncError, Result};
use chatsync_core::hub::Hub;
use chatsync_core::notify::{Notice, Notifier};
use chatsync_core::outcome::WriteOutcome;
use chatsync_core::session::Session;
use chatsync_infrastructure::{
    AsyncDirHubStore, AsyncDirSessionStore, ChatsyncPaths, PostgrestClient, PostgrestHubStore,
    PostgrestSessionStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginReport {
    pub user_id: String,
    pub sessions: SyncReport,
    pub hubs: SyncReport,
}

pub struct ChatsyncService {
    auth: Arc<AuthContext>,
    sessions: SessionRepository,
    hubs: HubRepository,
    notifier: Arc<dyn Notifier>,
}

impl ChatsyncService {
    pub fn new(
        sessions: Backends<Session>,
        hubs: Backends<Hub>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let auth = Arc::new(AuthContext::new());
        Self {
            sessions: SessionRepository::new(StoreRouter::new(
                sessions,
                auth.clone(),
                notifier.clone(),
            )),
            hubs: HubRepository::new(StoreRouter::new(hubs, auth.clone(), notifier.clone())),
            auth,
            notifier,
        }
    }

    /// Wires the file-backed local stores and, if configured, the PostgREST
    /// remote stores.
    pub async fn from_config(config: &ChatsyncConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let data_dir = ChatsyncPaths::resolve_data_dir(config)?;
        tracing::info!("[ChatsyncService] Using data directory {}", data_dir.display());

        let local_sessions = Arc::new(AsyncDirSessionStore::new(&data_dir).await?);
        let local_hubs = Arc::new(AsyncDirHubStore::new(&data_dir).await?);

        let (sessions, hubs) = match &config.remote {
            Some(remote) => {
                let client = Arc::new(PostgrestClient::new(remote)?);
                tracing::info!("[ChatsyncService] Remote store at {}", remote.base_url);
                (
                    Backends::new(
                        local_sessions,
                        Some(Arc::new(PostgrestSessionStore::new(
                            client.clone(),
                            remote.sessions_table.clone(),
                        ))),
                    ),
                    Backends::new(
                        local_hubs,
                        Some(Arc::new(PostgrestHubStore::new(
                            client,
                            remote.hubs_table.clone(),
                        ))),
                    ),
                )
            }
            None => (
                Backends::local_only(local_sessions),
                Backends::local_only(local_hubs),
            ),
        };

        let service = Self::new(sessions, hubs, notifier);
        Ok(Self {
            sessions: service
                .sessions
                .with_default_title(config.session.default_title.clone()),
            ..service
        })
    }

    /// Service with tracing notices, for headless use.
    pub async fn from_config_default(config: &ChatsyncConfig) -> Result<Self> {
        Self::from_config(config, Arc::new(TracingNotifier)).await
    }

    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn hubs(&self) -> &HubRepository {
        &self.hubs
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.auth.current()
    }

    pub fn has_remote(&self) -> bool {
        self.sessions.router().remote().is_some()
    }

    /// Loads sessions and hubs from whichever backend is authoritative now.
    pub async fn load(&self) -> Result<()> {
        self.sessions.load().await?;
        self.hubs.load().await?;
        Ok(())
    }

    /// Authenticates `user` and merges their local and remote data.
    ///
    /// The user stays logged in even if a merge aborts; the affected
    /// repository then serves whatever `load` can reach and the error is
    /// returned after both merges were attempted.
    pub async fn login(&self, user: UserIdentity) -> Result<LoginReport> {
        if !self.has_remote() {
            return Err(ChatsyncError::config(
                "Cannot log in: no remote store configured",
            ));
        }

        tracing::info!("[ChatsyncService] Logging in user '{}'", user.user_id);
        self.auth.set(Some(user.clone()));

        let mut errors = Vec::new();
        let sessions = match self.sessions.reconcile(&user).await {
            Ok(report) => report,
            Err(e) => {
                self.report_sync_error("sessions", &e);
                if let Err(load_err) = self.sessions.load().await {
                    tracing::warn!(
                        "[ChatsyncService] Could not reload sessions after failed sync: {}",
                        load_err
                    );
                }
                errors.push(e);
                SyncReport::default()
            }
        };
        let hubs = match self.hubs.reconcile(&user).await {
            Ok(report) => report,
            Err(e) => {
                self.report_sync_error("hubs", &e);
                if let Err(load_err) = self.hubs.load().await {
                    tracing::warn!(
                        "[ChatsyncService] Could not reload hubs after failed sync: {}",
                        load_err
                    );
                }
                errors.push(e);
                SyncReport::default()
            }
        };

        match errors.len() {
            0 => Ok(LoginReport {
                user_id: user.user_id,
                sessions,
                hubs,
            }),
            1 => Err(errors.remove(0)),
            _ => Err(ChatsyncError::Multiple(errors)),
        }
    }

    fn report_sync_error(&self, what: &str, error: &ChatsyncError) {
        tracing::warn!("[ChatsyncService] Sync of {} aborted: {}", what, error);
        self.notifier
            .notify(Notice::error(format!("Could not sync {}: {}", what, error)));
    }

    /// Forgets the user and falls back to the local stores.
    pub async fn logout(&self) -> Result<()> {
        if let Some(user) = self.auth.current() {
            tracing::info!("[ChatsyncService] Logging out user '{}'", user.user_id);
        }
        self.auth.set(None);
        self.load().await
    }

    /// Moves a session into `hub_id`, or out of any hub with `None`.
    ///
    /// Keeps `Session::hub_id` and the hubs' member lists in agreement.
    pub async fn move_session_to_hub(&self, session_id: &str, hub_id: Option<&str>) -> Result<()> {
        let session = self
            .sessions
            .get_session(session_id)
            .ok_or_else(|| ChatsyncError::not_found("Session", session_id))?;
        if let Some(hub_id) = hub_id {
            if self.hubs.get_hub(hub_id).is_none() {
                return Err(ChatsyncError::not_found("Hub", hub_id));
            }
        }

        if let Some(previous) = session.hub_id.as_deref() {
            if Some(previous) != hub_id {
                self.hubs.remove_session(previous, session_id).await?;
            }
        }
        if let Some(hub_id) = hub_id {
            self.hubs.add_session(hub_id, session_id).await?;
        }
        self.sessions
            .assign_hub(session_id, hub_id.map(str::to_string))
            .await?;
        Ok(())
    }

    /// Deletes a session and drops it from the hub that lists it.
    ///
    /// Unknown ids are a no-op, like [`SessionRepository::delete_session`].
    pub async fn delete_session(&self, session_id: &str) -> Result<WriteOutcome> {
        if let Some(hub_id) = self
            .sessions
            .get_session(session_id)
            .and_then(|session| session.hub_id)
        {
            self.hubs.remove_session(&hub_id, session_id).await?;
        }
        self.sessions.delete_session(session_id).await
    }
}
