//! Session storage.
//!
//! Stores keep sessions newest first and announce every append to their
//! subscribers instead of being polled.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::Result;
use crate::session::{Session, SessionId};

/// Change notification sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Appended { id: SessionId },
}

pub trait SessionStore {
    /// Adds a session at the front of the collection.
    ///
    /// Fails with [`Error::DuplicateSession`](crate::Error::DuplicateSession)
    /// when the id is already stored.
    fn append(&mut self, session: Session) -> Result<()>;

    /// Appends `sessions` in order, all or nothing
    fn append_all(&mut self, sessions: Vec<Session>) -> Result<()>;

    /// Every session, newest first
    fn get_all(&self) -> Result<Vec<Session>>;

    /// Receives a [`StoreEvent`] for each later append
    fn subscribe(&mut self) -> Receiver<StoreEvent>;
}

/// Fan-out list of subscriber channels shared by the store implementations
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Vec<Sender<StoreEvent>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber, forgetting the ones that hung up
    pub(crate) fn notify(&mut self, event: StoreEvent) {
        self.senders.retain(|tx| tx.send(event).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
