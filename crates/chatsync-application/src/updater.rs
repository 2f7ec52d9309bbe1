//! Record updater helper for the common "find → update → save" pattern.

use crate::router::StoreRouter;
use crate::state::{StateAction, StateStore};
use chatsync_core::error::Result;
use chatsync_core::outcome::Written;
use chatsync_core::record::Record;

/// Applies an in-place change to a record held in memory and persists it.
///
/// The pattern is:
/// 1. Look the record up in the in-memory state
/// 2. Apply the update closure
/// 3. Stamp `updated_at`
/// 4. Write through the router and publish the new version
pub struct RecordUpdater<'a, T: Record> {
    router: &'a StoreRouter<T>,
    state: &'a StateStore<T>,
}

impl<'a, T: Record> RecordUpdater<'a, T> {
    pub fn new(router: &'a StoreRouter<T>, state: &'a StateStore<T>) -> Self {
        Self { router, state }
    }

    /// Updates the record with `id`, returning `None` if it is unknown.
    ///
    /// The in-memory state only changes once the write is durable somewhere.
    pub async fn update<F>(&self, id: &str, updater: F) -> Result<Option<Written<T>>>
    where
        F: FnOnce(&mut T),
    {
        let Some(mut record) = self.state.get(id) else {
            tracing::debug!("[RecordUpdater] {} '{}' not found", T::ENTITY_TYPE, id);
            return Ok(None);
        };

        updater(&mut record);
        record.touch();

        let outcome = self.router.put(&record).await?;
        tracing::debug!(
            "[RecordUpdater] Saved {} '{}' ({:?})",
            T::ENTITY_TYPE,
            id,
            outcome
        );

        self.state.dispatch(StateAction::Upserted(record.clone()));
        Ok(Some(Written::new(record, outcome)))
    }
}
