//! In-memory record state.
//!
//! Each repository owns one [`StateStore`]. Every change goes through
//! [`StateStore::dispatch`], which applies a [`StateAction`] with a single
//! reducer and publishes the new snapshot to subscribers.

use chatsync_core::hub::Hub;
use chatsync_core::record::Record;
use chatsync_core::session::Session;
use std::cmp::Ordering;
use tokio::sync::watch;

/// Immutable view of the records held by a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T: Record> {
    /// Most recently updated first; ties ordered by id.
    pub records: Vec<T>,
    /// Incremented on every dispatched action.
    pub revision: u64,
}

impl<T: Record> Snapshot<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Record> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            revision: 0,
        }
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum StateAction<T: Record> {
    /// Replace everything with a freshly loaded or merged set.
    Loaded(Vec<T>),
    /// Insert or replace one record.
    Upserted(T),
    /// Drop records by id. Unknown ids are ignored.
    Removed(Vec<String>),
    Cleared,
}

pub type SessionSnapshot = Snapshot<Session>;
pub type SessionAction = StateAction<Session>;
pub type SessionStateStore = StateStore<Session>;
pub type HubSnapshot = Snapshot<Hub>;
pub type HubStateStore = StateStore<Hub>;

/// Newest first, then by id, so listings are deterministic.
pub fn recency_order<T: Record>(a: &T, b: &T) -> Ordering {
    b.updated_at()
        .cmp(&a.updated_at())
        .then_with(|| a.id().cmp(b.id()))
}

/// Applies `action` to `records`, keeping them in recency order.
pub fn reduce<T: Record>(records: &mut Vec<T>, action: StateAction<T>) {
    match action {
        StateAction::Loaded(loaded) => *records = loaded,
        StateAction::Upserted(record) => {
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        }
        StateAction::Removed(ids) => records.retain(|r| !ids.iter().any(|id| id == r.id())),
        StateAction::Cleared => records.clear(),
    }
    records.sort_by(recency_order);
}

/// Owner of a repository's in-memory state.
pub struct StateStore<T: Record> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T: Record> StateStore<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    /// Applies an action and notifies subscribers.
    pub fn dispatch(&self, action: StateAction<T>) {
        self.tx.send_modify(|snapshot| {
            reduce(&mut snapshot.records, action);
            snapshot.revision += 1;
        });
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.tx.borrow().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.tx.borrow().records.clone()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }
}

impl<T: Record> Default for StateStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
