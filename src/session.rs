use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a logged session: milliseconds since the epoch at creation,
/// bumped forward when two sessions are created within the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing, time based session ids.
#[derive(Debug, Default, Clone)]
pub struct SessionIdGenerator {
    last: Option<i64>,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, now: DateTime<Local>) -> SessionId {
        let candidate = now.timestamp_millis();
        let id = match self.last {
            Some(last) if candidate <= last => last + 1,
            _ => candidate,
        };
        self.last = Some(id);
        SessionId(id)
    }
}

/// A completed cold-exposure session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    date: DateTime<Local>,
    duration_secs: u64,
    temperature: f64,
    heart_rate: Option<u32>,
}

impl Session {
    pub fn new(
        id: SessionId,
        date: DateTime<Local>,
        duration_secs: u64,
        temperature: f64,
        heart_rate: Option<u32>,
    ) -> Self {
        Self {
            id,
            date,
            duration_secs,
            temperature,
            heart_rate,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn date(&self) -> DateTime<Local> {
        self.date
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Temperature in degrees Fahrenheit
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Heart rate in beats per minute, when one was recorded
    pub fn heart_rate(&self) -> Option<u32> {
        self.heart_rate
    }

    /// Duration rendered as `m:ss`
    pub fn duration(&self) -> String {
        format_duration(self.duration_secs)
    }
}

/// Formats whole seconds as `m:ss`, e.g. `65` -> `1:05`.
pub fn format_duration(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Parses an `m:ss` duration into seconds.
///
/// Minutes are unbounded, seconds must be two digits below 60.
pub fn parse_duration(s: &str) -> Result<u64> {
    let invalid = || Error::InvalidDuration(s.to_string());

    let (mins, secs) = s.trim().split_once(':').ok_or_else(invalid)?;
    if mins.is_empty() || secs.len() != 2 {
        return Err(invalid());
    }
    if !mins.chars().all(|c| c.is_ascii_digit()) || !secs.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let mins: u64 = mins.parse().map_err(|_| invalid())?;
    let secs: u64 = secs.parse().map_err(|_| invalid())?;
    if secs >= 60 {
        return Err(invalid());
    }

    Ok(mins * 60 + secs)
}
