use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::stats::Period;

/// Weekly time goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub minutes_per_session: u32,
    pub sessions_per_week: u32,
}

impl Default for Goal {
    fn default() -> Self {
        Self {
            minutes_per_session: 5,
            sessions_per_week: 5,
        }
    }
}

impl Goal {
    pub fn session_secs(&self) -> u64 {
        u64::from(self.minutes_per_session) * 60
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Minutes, {} Times a Week",
            self.minutes_per_session, self.sessions_per_week
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    /// Sessions in the last week at least as long as the goal
    pub qualifying: usize,
    pub target: u32,
    /// `qualifying / target`, capped at 1
    pub fraction: f64,
}

impl GoalProgress {
    pub fn is_met(&self) -> bool {
        self.qualifying >= self.target as usize
    }
}

pub fn goal_progress(sessions: &[Session], goal: Goal, now: DateTime<Local>) -> GoalProgress {
    let (week, _) = Period::Week.windows(now);
    let qualifying = week
        .filter(sessions)
        .into_iter()
        .filter(|s| s.duration_secs() >= goal.session_secs())
        .count();

    let fraction = if goal.sessions_per_week == 0 {
        1.0
    } else {
        (qualifying as f64 / goal.sessions_per_week as f64).min(1.0)
    };

    GoalProgress {
        qualifying,
        target: goal.sessions_per_week,
        fraction,
    }
}

/// Suggests one more minute per session once the current weekly goal is met.
pub fn recommended_goal(sessions: &[Session], goal: Goal, now: DateTime<Local>) -> Goal {
    if goal_progress(sessions, goal, now).is_met() {
        Goal {
            minutes_per_session: goal.minutes_per_session + 1,
            ..goal
        }
    } else {
        goal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn session(days_ago: i64, duration_secs: u64) -> Session {
        Session::new(
            SessionId(days_ago),
            now() - Duration::days(days_ago),
            duration_secs,
            41.0,
            Some(72),
        )
    }

    #[test]
    fn test_goal_display() {
        assert_eq!(Goal::default().to_string(), "5 Minutes, 5 Times a Week");
    }

    #[test]
    fn test_goal_progress_counts_long_enough_sessions_this_week() {
        let sessions = vec![
            session(0, 300),
            session(1, 299),
            session(2, 600),
            session(9, 900), // outside the week
        ];
        let progress = goal_progress(&sessions, Goal::default(), now());
        assert_eq!(progress.qualifying, 2);
        assert_eq!(progress.target, 5);
        assert!((progress.fraction - 0.4).abs() < f64::EPSILON);
        assert!(!progress.is_met());
    }

    #[test]
    fn test_goal_progress_caps_fraction() {
        let sessions: Vec<Session> = (0..6).map(|d| session(d, 400)).collect();
        let goal = Goal {
            minutes_per_session: 5,
            sessions_per_week: 3,
        };
        let progress = goal_progress(&sessions, goal, now());
        assert_eq!(progress.qualifying, 6);
        assert_eq!(progress.fraction, 1.0);
        assert!(progress.is_met());
    }

    #[test]
    fn test_recommended_goal() {
        let goal = Goal::default();
        let few = vec![session(0, 300)];
        assert_eq!(recommended_goal(&few, goal, now()), goal);

        let plenty: Vec<Session> = (0..5).map(|d| session(d, 360)).collect();
        let next = recommended_goal(&plenty, goal, now());
        assert_eq!(next.minutes_per_session, 6);
        assert_eq!(next.sessions_per_week, 5);
    }
}
