//! Login-time synchronisation between the local and remote stores.

mod reconciler;

pub use reconciler::{Reconciled, Reconciler, SyncFailure, SyncReport, SyncStage};
