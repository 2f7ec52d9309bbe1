//! Session application services.

mod repository;

pub use repository::{LoadReport, SessionRepository};
