//! Session domain module.
//!
//! This module contains all session-related domain models.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `BotConfig`, `BranchOrigin`)
//! - `message`: Message types (`MessageRole`, `Message`, `Attachment`)
//!
//! # Usage
//!
//! ```ignore
//! use chatsync_core::session::{Session, Message, MessageRole};
//! ```

mod message;
mod model;

// Re-export public API
pub use message::{Attachment, Message, MessageRole};
pub use model::{BotConfig, BranchOrigin, DEFAULT_SESSION_TITLE, Session};
