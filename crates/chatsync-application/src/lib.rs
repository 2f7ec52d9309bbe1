//! Application layer for chatsync.
//!
//! Coordinates the local and remote stores: routes writes with fallback,
//! keeps the in-memory state that views subscribe to, and runs the
//! login-time merge.

pub mod auth;
pub mod hub;
pub mod notify;
pub mod router;
pub mod service;
pub mod session;
pub mod state;
pub mod sync;
pub mod updater;

pub use auth::AuthContext;
pub use hub::HubRepository;
pub use notify::{ChannelNotifier, TracingNotifier};
pub use router::{Backends, StoreRouter};
pub use service::{ChatsyncService, LoginReport};
pub use session::{LoadReport, SessionRepository};
pub use state::{Snapshot, StateAction, StateStore};
pub use sync::{Reconciled, Reconciler, SyncFailure, SyncReport, SyncStage};
