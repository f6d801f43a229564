use std::path::Path;
use std::sync::mpsc::Receiver;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, ErrorCode};
use tracing::{debug, info};

use super::{SessionStore, StoreEvent, Subscribers};
use crate::error::{Error, Result};
use crate::session::{Session, SessionId};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL UNIQUE,
        date TEXT NOT NULL,
        duration_secs INTEGER NOT NULL,
        temperature REAL NOT NULL,
        heart_rate INTEGER,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);
"#;

/// Session store persisted to a local SQLite database
#[derive(Debug)]
pub struct SqliteSessionStore {
    conn: Connection,
    subscribers: Subscribers,
}

impl SqliteSessionStore {
    /// Opens (or creates) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(path = %path.display(), "opening session database");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            subscribers: Subscribers::default(),
        })
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Removes every session (for testing or reset purposes)
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }
}

/// Inserts one row; the only constraint a complete row can break is the unique id
fn insert(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO sessions (id, date, duration_secs, temperature, heart_rate)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            session.id().0,
            session.date().to_rfc3339(),
            session.duration_secs(),
            session.temperature(),
            session.heart_rate(),
        ],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => Error::DuplicateSession(session.id()),
        _ => Error::Database(e),
    })?;
    debug!(id = %session.id(), "session stored");
    Ok(())
}

impl SessionStore for SqliteSessionStore {
    fn append(&mut self, session: Session) -> Result<()> {
        insert(&self.conn, &session)?;
        self.subscribers.notify(StoreEvent::Appended { id: session.id() });
        Ok(())
    }

    fn append_all(&mut self, sessions: Vec<Session>) -> Result<()> {
        let tx = self.conn.transaction()?;
        for session in &sessions {
            insert(&tx, session)?;
        }
        tx.commit()?;

        for session in &sessions {
            self.subscribers.notify(StoreEvent::Appended { id: session.id() });
        }
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, date, duration_secs, temperature, heart_rate
            FROM sessions
            ORDER BY seq DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let date_str: String = row.get(1)?;
            let date = DateTime::parse_from_rfc3339(&date_str)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Local);

            Ok(Session::new(
                SessionId(row.get(0)?),
                date,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for session in rows {
            sessions.push(session?);
        }
        Ok(sessions)
    }

    fn subscribe(&mut self) -> Receiver<StoreEvent> {
        self.subscribers.subscribe()
    }
}
