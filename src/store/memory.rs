use std::collections::HashSet;
use std::sync::mpsc::Receiver;

use tracing::debug;

use super::{SessionStore, StoreEvent, Subscribers};
use crate::error::{Error, Result};
use crate::session::{Session, SessionId};

/// Transient store living for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Vec<Session>,
    subscribers: Subscribers,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn contains(&self, id: SessionId) -> bool {
        self.sessions.iter().any(|s| s.id() == id)
    }

    fn push_front(&mut self, session: Session) {
        let id = session.id();
        self.sessions.insert(0, session);
        debug!(%id, total = self.sessions.len(), "session appended");
        self.subscribers.notify(StoreEvent::Appended { id });
    }
}

impl SessionStore for MemorySessionStore {
    fn append(&mut self, session: Session) -> Result<()> {
        if self.contains(session.id()) {
            return Err(Error::DuplicateSession(session.id()));
        }
        self.push_front(session);
        Ok(())
    }

    fn append_all(&mut self, sessions: Vec<Session>) -> Result<()> {
        let mut ids: HashSet<SessionId> = self.sessions.iter().map(Session::id).collect();
        if let Some(dup) = sessions.iter().map(Session::id).find(|id| !ids.insert(*id)) {
            return Err(Error::DuplicateSession(dup));
        }
        for session in sessions {
            self.push_front(session);
        }
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.clone())
    }

    fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.subscribers.subscribe()
    }
}
