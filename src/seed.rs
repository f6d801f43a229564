use chrono::{DateTime, Duration, Local};
use rand::Rng;

use crate::session::{Session, SessionId};

/// How far back generated sessions may go
pub const SEED_HISTORY_DAYS: i64 = 60;

/// Generates `count` plausible sessions over the last [`SEED_HISTORY_DAYS`]
/// days, oldest first so they can be appended in order.
pub fn synthetic_sessions<R: Rng>(count: usize, now: DateTime<Local>, rng: &mut R) -> Vec<Session> {
    let mut dates: Vec<DateTime<Local>> = (0..count)
        .map(|_| {
            let days_back = rng.gen_range(0..SEED_HISTORY_DAYS);
            let minutes_back = rng.gen_range(0..24 * 60);
            now - Duration::days(days_back) - Duration::minutes(minutes_back)
        })
        .collect();
    dates.sort();

    let mut last_id = i64::MIN;
    dates
        .into_iter()
        .map(|date| {
            // mostly short dips with the odd long one
            let duration_secs = if rng.gen_bool(0.15) {
                rng.gen_range(300..=900)
            } else {
                rng.gen_range(45..300)
            };
            let temperature = f64::from(rng.gen_range(350..=550)) / 10.0;
            let heart_rate = rng.gen_range(60..=100);

            let id = date.timestamp_millis().max(last_id + 1);
            last_id = id;
            Session::new(SessionId(id), date, duration_secs, temperature, Some(heart_rate))
        })
        .collect()
}
