use thiserror::Error;

use crate::session::SessionId;
use crate::timer::TimerPhase;

/// Errors surfaced by the session store, the timer and the import/export paths.
///
/// The statistics functions never fail; everything here comes from state
/// transitions that are not allowed or from I/O at the edges.
#[derive(Debug, Error)]
pub enum Error {
    /// `log_session` was called while the timer was not paused with time on it
    #[error("cannot log a session while the timer is {phase}")]
    NotLoggable { phase: TimerPhase },

    /// A duration string did not match `m:ss`
    #[error("invalid duration '{0}', expected minutes:seconds")]
    InvalidDuration(String),

    /// An imported record could not be turned into a session
    #[error("invalid session record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// Session ids are unique within a store
    #[error("session {0} already exists")]
    DuplicateSession(SessionId),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
