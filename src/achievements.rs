use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use itertools::Itertools;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Category {
    Milestones,
    Duration,
    Consistency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Total number of logged sessions
    Sessions(usize),
    /// A single session at least this many seconds long
    SessionLength(u64),
    /// Sessions started before `before_hour` local time
    Mornings { count: usize, before_hour: u32 },
    /// At least one session on a Saturday and one on a Sunday
    Weekend,
    /// Consecutive calendar days with a session
    Streak(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: Category,
    pub requirement: Requirement,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first-plunge",
        title: "First Plunge",
        description: "Complete your first ice bath session",
        icon: "🧊",
        category: Category::Milestones,
        requirement: Requirement::Sessions(1),
    },
    Achievement {
        id: "ice-master",
        title: "Ice Master",
        description: "Complete 50 ice bath sessions",
        icon: "❄️",
        category: Category::Milestones,
        requirement: Requirement::Sessions(50),
    },
    Achievement {
        id: "endurance-1",
        title: "Endurance I",
        description: "Complete a 5-minute session",
        icon: "⏱️",
        category: Category::Duration,
        requirement: Requirement::SessionLength(5 * 60),
    },
    Achievement {
        id: "endurance-2",
        title: "Endurance II",
        description: "Complete a 10-minute session",
        icon: "🏔️",
        category: Category::Duration,
        requirement: Requirement::SessionLength(10 * 60),
    },
    Achievement {
        id: "early-bird",
        title: "Early Bird",
        description: "Complete 3 morning sessions",
        icon: "🌅",
        category: Category::Consistency,
        requirement: Requirement::Mornings {
            count: 3,
            before_hour: 9,
        },
    },
    Achievement {
        id: "weekend-warrior",
        title: "Weekend Warrior",
        description: "Complete sessions on Saturday and Sunday",
        icon: "⚔️",
        category: Category::Consistency,
        requirement: Requirement::Weekend,
    },
    Achievement {
        id: "consistency-king",
        title: "Consistency King",
        description: "Complete sessions 5 days in a row",
        icon: "👑",
        category: Category::Consistency,
        requirement: Requirement::Streak(5),
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementStatus {
    pub achievement: &'static Achievement,
    /// 0.0 ..= 1.0
    pub progress: f64,
    pub unlocked_at: Option<DateTime<Local>>,
}

impl AchievementStatus {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }

    /// Short nudge towards a locked achievement, e.g. `2 more sessions to unlock`
    pub fn hint(&self, sessions: &[Session]) -> Option<String> {
        if self.is_unlocked() {
            return None;
        }
        let hint = match self.achievement.requirement {
            Requirement::Sessions(n) => {
                let left = n.saturating_sub(sessions.len());
                format!("{} more {} to unlock", left, plural(left, "session"))
            }
            Requirement::SessionLength(secs) => {
                let best = sessions.iter().map(Session::duration_secs).max().unwrap_or(0);
                let left = (secs.saturating_sub(best) + 59) / 60;
                format!(
                    "{} {} away from the {}-minute milestone",
                    left,
                    plural(left as usize, "minute"),
                    secs / 60
                )
            }
            Requirement::Mornings { count, .. } => {
                let left = count - (self.progress * count as f64).round() as usize;
                format!("{} more morning {}", left, plural(left, "session"))
            }
            Requirement::Weekend => "Complete 1 more weekend session".to_string(),
            Requirement::Streak(days) => {
                let left = days - (self.progress * days as f64).round() as usize;
                format!("{} more {} in a row", left, plural(left, "day"))
            }
        };
        Some(hint)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Evaluates the whole catalogue against a session history in any order
pub fn evaluate(sessions: &[Session]) -> Vec<AchievementStatus> {
    let chronological: Vec<&Session> = sessions
        .iter()
        .sorted_by_key(|s| (s.date(), s.id()))
        .collect();

    ACHIEVEMENTS
        .iter()
        .map(|achievement| {
            let (progress, unlocked_at) = check(achievement.requirement, &chronological);
            AchievementStatus {
                achievement,
                progress: progress.clamp(0.0, 1.0),
                unlocked_at,
            }
        })
        .collect()
}

fn ratio(have: usize, need: usize) -> f64 {
    if need == 0 {
        1.0
    } else {
        have as f64 / need as f64
    }
}

/// Progress towards `requirement` and the moment it was first satisfied
fn check(requirement: Requirement, chronological: &[&Session]) -> (f64, Option<DateTime<Local>>) {
    match requirement {
        Requirement::Sessions(n) => {
            let unlocked = n.checked_sub(1).and_then(|i| chronological.get(i)).map(|s| s.date());
            (ratio(chronological.len(), n), unlocked)
        }
        Requirement::SessionLength(secs) => {
            let best = chronological.iter().map(|s| s.duration_secs()).max().unwrap_or(0);
            let unlocked = chronological
                .iter()
                .find(|s| s.duration_secs() >= secs)
                .map(|s| s.date());
            (if secs == 0 { 1.0 } else { best as f64 / secs as f64 }, unlocked)
        }
        Requirement::Mornings { count, before_hour } => {
            let mornings: Vec<&&Session> = chronological
                .iter()
                .filter(|s| s.date().hour() < before_hour)
                .collect();
            let unlocked = count
                .checked_sub(1)
                .and_then(|i| mornings.get(i))
                .map(|s| s.date());
            (ratio(mornings.len(), count), unlocked)
        }
        Requirement::Weekend => {
            let mut saturday = None;
            let mut sunday = None;
            for s in chronological {
                match s.date().weekday() {
                    Weekday::Sat => saturday = saturday.or(Some(s.date())),
                    Weekday::Sun => sunday = sunday.or(Some(s.date())),
                    _ => {}
                }
            }
            let seen = usize::from(saturday.is_some()) + usize::from(sunday.is_some());
            let unlocked = saturday.zip(sunday).map(|(a, b)| a.max(b));
            (ratio(seen, 2), unlocked)
        }
        Requirement::Streak(days) => {
            let mut best = 0;
            let mut run = 0;
            let mut unlocked = None;
            let mut previous_day = None;

            for (day, mut group) in &chronological.iter().chunk_by(|s| s.date().date_naive()) {
                run = match previous_day {
                    Some(prev) if day.pred_opt() == Some(prev) => run + 1,
                    _ => 1,
                };
                best = usize::max(best, run);
                if run == days && unlocked.is_none() {
                    unlocked = group.next().map(|s| s.date());
                }
                previous_day = Some(day);
            }
            (ratio(best, days), unlocked)
        }
    }
}
