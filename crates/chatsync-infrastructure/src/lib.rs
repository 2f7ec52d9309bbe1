pub mod async_dir_hub_store;
pub mod async_dir_session_store;
pub mod config_service;
pub mod dto;
pub mod memory_store;
pub mod paths;
pub mod postgrest_store;
pub mod storage;

pub use crate::async_dir_hub_store::AsyncDirHubStore;
pub use crate::async_dir_session_store::AsyncDirSessionStore;
pub use crate::config_service::ConfigService;
pub use crate::dto::{decode_sessions, encode_sessions};
pub use crate::memory_store::{InMemoryLocalStore, InMemoryRemoteStore};
pub use crate::paths::ChatsyncPaths;
pub use crate::postgrest_store::{PostgrestClient, PostgrestHubStore, PostgrestSessionStore};
