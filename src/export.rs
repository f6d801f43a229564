use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::session::Session;

#[derive(Serialize)]
struct CsvRow {
    id: i64,
    date: String,
    duration: String,
    temperature: f64,
    heart_rate: Option<u32>,
}

impl From<&Session> for CsvRow {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id().0,
            date: s.date().to_rfc3339(),
            duration: s.duration(),
            temperature: s.temperature(),
            heart_rate: s.heart_rate(),
        }
    }
}

/// Writes `sessions` as CSV with an `id,date,duration,temperature,heart_rate` header
pub fn write_csv<W: Write>(sessions: &[Session], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if sessions.is_empty() {
        wtr.write_record(["id", "date", "duration", "temperature", "heart_rate"])?;
    }
    for session in sessions {
        wtr.serialize(CsvRow::from(session))?;
    }
    wtr.flush()?;
    Ok(())
}
