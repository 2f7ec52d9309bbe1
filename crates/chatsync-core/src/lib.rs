//! Domain layer for chatsync.
//!
//! Holds the session and hub models, the store contracts both backends
//! implement, and the shared error type.

pub mod auth;
pub mod config;
pub mod error;
pub mod hub;
pub mod notify;
pub mod outcome;
pub mod record;
pub mod session;
pub mod store;

// Re-export common types
pub use auth::UserIdentity;
pub use error::ChatsyncError;
pub use outcome::{WriteOutcome, Written};
pub use record::Record;
pub use store::{LocalStore, RemoteStore};
