//! Import of session lists exported by the earlier mobile app, which kept
//! durations as `m:ss` strings and readings as display text.

use std::io::Read;

use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::session::{parse_duration, Session, SessionId};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySession {
    pub id: i64,
    pub date: String,
    pub duration: String,
    pub temperature: String,
    #[serde(default)]
    pub heart_rate: Option<String>,
}

impl TryFrom<LegacySession> for Session {
    type Error = Error;

    fn try_from(record: LegacySession) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidRecord {
            id: record.id.to_string(),
            reason,
        };

        let date = DateTime::parse_from_rfc3339(&record.date)
            .map_err(|e| invalid(format!("date '{}': {e}", record.date)))?
            .with_timezone(&Local);
        let duration_secs = parse_duration(&record.duration)?;
        let temperature: f64 = record
            .temperature
            .trim()
            .parse()
            .map_err(|_| invalid(format!("temperature '{}'", record.temperature)))?;
        // "72 bpm"
        let heart_rate = match record.heart_rate.as_deref() {
            Some(text) => {
                let digits: String = text.trim().chars().take_while(char::is_ascii_digit).collect();
                Some(
                    digits
                        .parse()
                        .map_err(|_| invalid(format!("heart rate '{text}'")))?,
                )
            }
            None => None,
        };

        Ok(Session::new(
            SessionId(record.id),
            date,
            duration_secs,
            temperature,
            heart_rate,
        ))
    }
}

/// Reads a JSON array of legacy records, newest first, rejecting the whole
/// import when any record is malformed.
pub fn read_json<R: Read>(reader: R) -> Result<Vec<Session>> {
    let records: Vec<LegacySession> = serde_json::from_reader(reader)?;
    records
        .into_iter()
        .map(|record| {
            let id = record.id;
            Session::try_from(record).inspect_err(|e| warn!(id, error = %e, "rejected record"))
        })
        .collect()
}
