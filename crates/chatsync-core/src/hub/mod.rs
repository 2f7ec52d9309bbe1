//! Hub domain module.
//!
//! A hub groups sessions and file references under a name. Hubs share the
//! session persistence model: local/remote duality and timestamp merge.

mod model;

pub use model::{FileReference, Hub};
