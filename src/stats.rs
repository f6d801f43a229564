use std::collections::HashSet;

use chrono::{DateTime, Duration, Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::session::{format_duration, Session};
use crate::util::{mean, round_half_up};

/// Average temperature reported when there are no sessions to average
pub const DEFAULT_AVG_TEMPERATURE: i64 = 41;

/// Reporting window used to bucket sessions
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Period {
    #[default]
    Week,
    Month,
    Year,
}

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Year => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Week => "This Week",
            Period::Month => "This Month",
            Period::Year => "This Year",
        }
    }

    /// Current and previous windows ending at `now`.
    ///
    /// The previous window ends exactly where the current one starts.
    pub fn windows(self, now: DateTime<Local>) -> (PeriodWindow, PeriodWindow) {
        let span = Duration::days(self.days());
        let current_start = now - span;
        let current = PeriodWindow {
            start: current_start,
            end: None,
        };
        let previous = PeriodWindow {
            start: current_start - span,
            end: Some(current_start),
        };
        (current, previous)
    }
}

/// Half-open time window `(start, end]`; an open end admits anything after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub start: DateTime<Local>,
    pub end: Option<DateTime<Local>>,
}

impl PeriodWindow {
    pub fn contains(&self, date: DateTime<Local>) -> bool {
        date > self.start && self.end.map_or(true, |end| date <= end)
    }

    pub fn filter<'a>(&self, sessions: &'a [Session]) -> Vec<&'a Session> {
        sessions.iter().filter(|s| self.contains(s.date())).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AverageStats {
    pub avg_duration_secs: u64,
    /// Degrees Fahrenheit
    pub avg_temperature: i64,
}

impl AverageStats {
    pub fn avg_duration(&self) -> String {
        format_duration(self.avg_duration_secs)
    }
}

impl Default for AverageStats {
    fn default() -> Self {
        Self {
            avg_duration_secs: 0,
            avg_temperature: DEFAULT_AVG_TEMPERATURE,
        }
    }
}

/// Average duration and temperature across `sessions`.
///
/// An empty set yields `0:00` and 41°F rather than an error.
pub fn average_stats<'a, I>(sessions: I) -> AverageStats
where
    I: IntoIterator<Item = &'a Session>,
{
    let (durations, temperatures): (Vec<f64>, Vec<f64>) = sessions
        .into_iter()
        .map(|s| (s.duration_secs() as f64, s.temperature()))
        .unzip();

    match (mean(&durations), mean(&temperatures)) {
        (Some(avg_duration), Some(avg_temperature)) => AverageStats {
            avg_duration_secs: round_half_up(avg_duration).max(0) as u64,
            avg_temperature: round_half_up(avg_temperature),
        },
        _ => AverageStats::default(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodStats {
    pub current: AverageStats,
    pub previous: AverageStats,
    pub total_sessions: usize,
    pub previous_sessions: usize,
}

/// Percentage changes between the current and the previous window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodComparison {
    pub sessions: i64,
    pub avg_duration: i64,
    pub avg_temperature: i64,
}

impl PeriodStats {
    pub fn comparison(&self) -> PeriodComparison {
        PeriodComparison {
            sessions: percentage_change(self.total_sessions as f64, self.previous_sessions as f64),
            avg_duration: percentage_change(
                self.current.avg_duration_secs as f64,
                self.previous.avg_duration_secs as f64,
            ),
            avg_temperature: percentage_change(
                self.current.avg_temperature as f64,
                self.previous.avg_temperature as f64,
            ),
        }
    }
}

pub fn period_stats(sessions: &[Session], period: Period, now: DateTime<Local>) -> PeriodStats {
    let (current_window, previous_window) = period.windows(now);
    let current = current_window.filter(sessions);
    let previous = previous_window.filter(sessions);

    PeriodStats {
        current: average_stats(current.iter().copied()),
        previous: average_stats(previous.iter().copied()),
        total_sessions: current.len(),
        previous_sessions: previous.len(),
    }
}

/// Whole-percent change from `previous` to `current`.
///
/// A zero baseline reports 100 when anything happened and 0 otherwise.
pub fn percentage_change(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return if current > 0.0 { 100 } else { 0 };
    }
    round_half_up((current - previous) / previous * 100.0)
}

/// Consecutive calendar days, counting back from today, with at least one session.
///
/// The walk never looks further back than the period length.
pub fn current_streak(sessions: &[Session], period: Period, now: DateTime<Local>) -> u32 {
    let active_days: HashSet<NaiveDate> = sessions.iter().map(|s| s.date().date_naive()).collect();
    let today = now.date_naive();

    let mut streak = 0;
    for offset in 0..period.days() {
        let day = today - Duration::days(offset);
        if !active_days.contains(&day) {
            break;
        }
        streak += 1;
    }
    streak
}

/// Activity overview: lifetime totals plus figures for the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySummary {
    pub lifetime_secs: u64,
    pub total_sessions: usize,
    pub avg_duration_secs: u64,
    pub longest_duration_secs: u64,
    pub total_secs: u64,
    pub current_streak: u32,
}

pub fn history_summary(sessions: &[Session], period: Period, now: DateTime<Local>) -> HistorySummary {
    let (current_window, _) = period.windows(now);
    let in_period = current_window.filter(sessions);

    HistorySummary {
        lifetime_secs: sessions.iter().map(Session::duration_secs).sum(),
        total_sessions: in_period.len(),
        avg_duration_secs: average_stats(in_period.iter().copied()).avg_duration_secs,
        longest_duration_secs: in_period
            .iter()
            .map(|s| s.duration_secs())
            .max()
            .unwrap_or(0),
        total_secs: in_period.iter().map(|s| s.duration_secs()).sum(),
        current_streak: current_streak(sessions, period, now),
    }
}

/// Renders accumulated time on whole minutes: `45 min`, `1h 5m`, `2h`.
pub fn format_total_time(total_secs: u64) -> String {
    let minutes = total_secs / 60;
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining > 0 {
        format!("{hours}h {remaining}m")
    } else {
        format!("{hours}h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn session(id: i64, date: DateTime<Local>, duration_secs: u64, temperature: f64) -> Session {
        Session::new(SessionId(id), date, duration_secs, temperature, Some(72))
    }

    fn days_ago(days: i64) -> DateTime<Local> {
        now() - Duration::days(days)
    }

    #[test]
    fn test_average_stats_empty() {
        let stats = average_stats(&[]);
        assert_eq!(stats.avg_duration_secs, 0);
        assert_eq!(stats.avg_duration(), "0:00");
        assert_eq!(stats.avg_temperature, 41);
    }

    #[test]
    fn test_average_stats_rounds_to_nearest() {
        let sessions = vec![
            session(1, now(), 60, 40.0),
            session(2, now(), 90, 41.0),
            session(3, now(), 91, 42.5),
        ];
        // (60 + 90 + 91) / 3 = 80.33, (40 + 41 + 42.5) / 3 = 41.17
        let stats = average_stats(&sessions);
        assert_eq!(stats.avg_duration_secs, 80);
        assert_eq!(stats.avg_duration(), "1:20");
        assert_eq!(stats.avg_temperature, 41);
    }

    #[test]
    fn test_average_stats_half_rounds_up() {
        let sessions = vec![session(1, now(), 60, 40.0), session(2, now(), 61, 41.0)];
        let stats = average_stats(&sessions);
        assert_eq!(stats.avg_duration_secs, 61);
        assert_eq!(stats.avg_temperature, 41);
    }

    #[test]
    fn test_average_stats_matches_round_of_mean() {
        let durations = [12u64, 300, 187, 45, 0, 601];
        let temps = [39.0, 41.5, 50.0, 33.3, 45.0, 38.8];
        let sessions: Vec<Session> = durations
            .iter()
            .zip(temps.iter())
            .enumerate()
            .map(|(i, (&d, &t))| session(i as i64, now(), d, t))
            .collect();

        for n in 1..=sessions.len() {
            let slice = &sessions[..n];
            let stats = average_stats(slice);
            let dur_sum: u64 = durations[..n].iter().sum();
            let temp_sum: f64 = temps[..n].iter().sum();
            assert_eq!(
                stats.avg_duration_secs as i64,
                round_half_up(dur_sum as f64 / n as f64)
            );
            assert_eq!(stats.avg_temperature, round_half_up(temp_sum / n as f64));
        }
    }

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(0.0, 0.0), 0);
        assert_eq!(percentage_change(5.0, 0.0), 100);
        assert_eq!(percentage_change(8.0, 4.0), 100);
        assert_eq!(percentage_change(3.0, 6.0), -50);
        assert_eq!(percentage_change(4.0, 4.0), 0);
        assert_eq!(percentage_change(1.0, 3.0), -67);
    }

    #[test]
    fn test_percentage_change_negative_half_rounds_up() {
        // -0.5% rounds toward zero, like the dashboard always did
        assert_eq!(percentage_change(199.0, 200.0), 0);
        assert_eq!(percentage_change(-1.0, 0.0), 0);
    }

    #[test]
    fn test_period_days() {
        assert_eq!(Period::Week.days(), 7);
        assert_eq!(Period::Month.days(), 30);
        assert_eq!(Period::Year.days(), 365);
        assert_eq!(Period::Month.to_string(), "month");
    }

    #[test]
    fn test_period_windows_are_contiguous() {
        for period in [Period::Week, Period::Month, Period::Year] {
            let (current, previous) = period.windows(now());
            assert_eq!(previous.end, Some(current.start));
            assert_eq!(current.end, None);
            assert_eq!(current.start - previous.start, Duration::days(period.days()));

            // the boundary instant belongs to the previous window only
            assert!(previous.contains(current.start));
            assert!(!current.contains(current.start));
        }
    }

    #[test]
    fn test_period_stats_buckets_sessions() {
        let sessions = vec![
            session(1, days_ago(1), 120, 40.0),
            session(2, days_ago(3), 60, 42.0),
            session(3, days_ago(7), 300, 50.0), // boundary: previous week
            session(4, days_ago(10), 180, 38.0),
            session(5, days_ago(14), 600, 30.0), // boundary: excluded from both
            session(6, days_ago(30), 600, 30.0),
        ];

        let stats = period_stats(&sessions, Period::Week, now());
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.previous_sessions, 2);
        assert_eq!(stats.current.avg_duration_secs, 90);
        assert_eq!(stats.current.avg_temperature, 41);
        assert_eq!(stats.previous.avg_duration_secs, 240);
        assert_eq!(stats.previous.avg_temperature, 44);

        let comparison = stats.comparison();
        assert_eq!(comparison.sessions, 0);
        assert_eq!(comparison.avg_duration, -62);
        assert_eq!(comparison.avg_temperature, -7);
    }

    #[test]
    fn test_period_stats_empty_previous() {
        let sessions = vec![session(1, days_ago(2), 65, 41.0)];
        let stats = period_stats(&sessions, Period::Month, now());
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.previous_sessions, 0);
        assert_eq!(stats.previous, AverageStats::default());
        assert_eq!(stats.comparison().sessions, 100);
        // default 41°F on the empty side compares as no change
        assert_eq!(stats.comparison().avg_temperature, 0);
    }

    #[test]
    fn test_current_streak_stops_at_gap() {
        let sessions = vec![
            session(1, now(), 60, 41.0),
            session(2, days_ago(1), 60, 41.0),
            session(3, days_ago(3), 60, 41.0),
        ];
        assert_eq!(current_streak(&sessions, Period::Week, now()), 2);
    }

    #[test]
    fn test_current_streak_requires_today() {
        let sessions = vec![session(1, days_ago(1), 60, 41.0)];
        assert_eq!(current_streak(&sessions, Period::Week, now()), 0);
        assert_eq!(current_streak(&[], Period::Year, now()), 0);
    }

    #[test]
    fn test_current_streak_counts_days_not_sessions() {
        let morning = Local.with_ymd_and_hms(2024, 6, 15, 6, 0, 0).unwrap();
        let sessions = vec![
            session(1, now(), 60, 41.0),
            session(2, morning, 60, 41.0),
            session(3, days_ago(1), 60, 41.0),
        ];
        assert_eq!(current_streak(&sessions, Period::Week, now()), 2);
    }

    #[test]
    fn test_current_streak_capped_by_period() {
        let sessions: Vec<Session> = (0..10).map(|d| session(d, days_ago(d), 60, 41.0)).collect();
        assert_eq!(current_streak(&sessions, Period::Week, now()), 7);
        assert_eq!(current_streak(&sessions, Period::Month, now()), 10);
    }

    #[test]
    fn test_history_summary() {
        let sessions = vec![
            session(1, now(), 300, 41.0),
            session(2, days_ago(1), 120, 41.0),
            session(3, days_ago(20), 3600, 41.0),
        ];
        let summary = history_summary(&sessions, Period::Week, now());
        assert_eq!(summary.lifetime_secs, 4020);
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.avg_duration_secs, 210);
        assert_eq!(summary.longest_duration_secs, 300);
        assert_eq!(summary.total_secs, 420);
        assert_eq!(summary.current_streak, 2);
    }

    #[test]
    fn test_history_summary_empty() {
        let summary = history_summary(&[], Period::Year, now());
        assert_eq!(summary.lifetime_secs, 0);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.longest_duration_secs, 0);
        assert_eq!(summary.current_streak, 0);
    }

    #[test]
    fn test_format_total_time() {
        assert_eq!(format_total_time(0), "0 min");
        assert_eq!(format_total_time(59 * 60 + 59), "59 min");
        assert_eq!(format_total_time(3600), "1h");
        assert_eq!(format_total_time(65 * 60), "1h 5m");
        assert_eq!(format_total_time(2 * 3600 + 30), "2h");
    }
}
