use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::session::{Session, SessionIdGenerator};
use crate::store::SessionStore;

pub const DEFAULT_GOAL_SECS: u64 = 180;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const MILESTONE_DISPLAY: Duration = Duration::from_secs(3);
/// Shortest accepted tick interval
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);
pub const GOAL_ACHIEVED: &str = "🎯 Goal Achieved!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneKind {
    Info,
    Success,
}

/// Transient notification shown over the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub message: String,
    pub kind: MilestoneKind,
}

impl Milestone {
    pub fn new(message: impl Into<String>, kind: MilestoneKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// Snapshot of the live session
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub elapsed_secs: u64,
    pub is_running: bool,
    pub goal_secs: u64,
    pub milestone: Option<Milestone>,
}

/// Reading taken from the (mocked) wearable when a session is logged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthReading {
    /// Degrees Fahrenheit
    pub temperature: f64,
    pub heart_rate: u32,
}

pub trait HealthSensor {
    fn read(&self) -> HealthReading;
}

/// Fixed readings until a real sensor integration exists
#[derive(Debug, Clone, Copy)]
pub struct MockHealthSensor {
    reading: HealthReading,
}

impl MockHealthSensor {
    pub fn new(temperature: f64, heart_rate: u32) -> Self {
        Self {
            reading: HealthReading {
                temperature,
                heart_rate,
            },
        }
    }
}

impl Default for MockHealthSensor {
    fn default() -> Self {
        Self::new(41.0, 72)
    }
}

impl HealthSensor for MockHealthSensor {
    fn read(&self) -> HealthReading {
        self.reading
    }
}

/// Timer for one in-progress session.
///
/// Two independent countdowns hang off the timer: the repeating tick while
/// running, and the one-shot clear of the current milestone. Wall-clock time
/// is fed in through [`SessionTimer::advance`], which fires whatever falls due
/// in chronological order. Pausing cancels the tick countdown and setting a
/// milestone re-arms the clear, so neither can fire against stale state.
#[derive(Debug)]
pub struct SessionTimer {
    state: TimerState,
    tick_interval: Duration,
    milestone_display: Duration,
    next_tick_in: Option<Duration>,
    milestone_clear_in: Option<Duration>,
    ids: SessionIdGenerator,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new(DEFAULT_GOAL_SECS)
    }
}

impl SessionTimer {
    pub fn new(goal_secs: u64) -> Self {
        Self::with_intervals(goal_secs, TICK_INTERVAL, MILESTONE_DISPLAY)
    }

    /// Timer with custom pacing. `tick_interval` is raised to [`MIN_TICK_INTERVAL`].
    pub fn with_intervals(goal_secs: u64, tick_interval: Duration, milestone_display: Duration) -> Self {
        Self {
            state: TimerState {
                elapsed_secs: 0,
                is_running: false,
                goal_secs,
                milestone: None,
            },
            tick_interval: tick_interval.max(MIN_TICK_INTERVAL),
            milestone_display,
            next_tick_in: None,
            milestone_clear_in: None,
            ids: SessionIdGenerator::new(),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.state.elapsed_secs
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn goal_secs(&self) -> u64 {
        self.state.goal_secs
    }

    pub fn milestone(&self) -> Option<&Milestone> {
        self.state.milestone.as_ref()
    }

    pub fn phase(&self) -> TimerPhase {
        if self.state.is_running {
            TimerPhase::Running
        } else if self.state.elapsed_secs > 0 {
            TimerPhase::Paused
        } else {
            TimerPhase::Idle
        }
    }

    /// Whether a log action is currently available
    pub fn is_loggable(&self) -> bool {
        self.phase() == TimerPhase::Paused
    }

    /// Fraction of the goal reached, capped at 1
    pub fn progress(&self) -> f64 {
        if self.state.goal_secs == 0 {
            return 1.0;
        }
        (self.state.elapsed_secs as f64 / self.state.goal_secs as f64).min(1.0)
    }

    pub fn start(&mut self) {
        if self.state.is_running {
            return;
        }
        debug!(elapsed = self.state.elapsed_secs, "timer started");
        self.state.is_running = true;
        self.next_tick_in = Some(self.tick_interval);
    }

    pub fn pause(&mut self) {
        if !self.state.is_running {
            return;
        }
        debug!(elapsed = self.state.elapsed_secs, "timer paused");
        self.state.is_running = false;
        self.next_tick_in = None;
    }

    /// Play/pause button
    pub fn toggle(&mut self) {
        if self.state.is_running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// One second of running time. Ignored unless running.
    pub fn tick(&mut self) {
        if !self.state.is_running {
            return;
        }
        self.state.elapsed_secs += 1;
        if self.state.elapsed_secs == self.state.goal_secs {
            info!(goal_secs = self.state.goal_secs, "goal reached");
            self.set_milestone(GOAL_ACHIEVED, MilestoneKind::Success);
        }
    }

    /// Shows a milestone, replacing any current one and restarting its display time.
    pub fn set_milestone(&mut self, message: impl Into<String>, kind: MilestoneKind) {
        self.state.milestone = Some(Milestone::new(message, kind));
        self.milestone_clear_in = Some(self.milestone_display);
    }

    pub fn clear_milestone(&mut self) {
        self.state.milestone = None;
        self.milestone_clear_in = None;
    }

    /// Feeds `dt` of wall-clock time into the timer
    pub fn advance(&mut self, dt: Duration) {
        let mut remaining = dt;

        loop {
            let due = match (self.next_tick_in, self.milestone_clear_in) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => return,
            };

            if due > remaining {
                self.elapse(remaining);
                return;
            }

            self.elapse(due);
            remaining -= due;

            // a clear due at the same instant as a tick goes first, so a
            // milestone raised by that tick survives
            if self.milestone_clear_in == Some(Duration::ZERO) {
                self.clear_milestone();
            }
            if self.next_tick_in == Some(Duration::ZERO) {
                self.next_tick_in = Some(self.tick_interval);
                self.tick();
            }
        }
    }

    fn elapse(&mut self, by: Duration) {
        if let Some(left) = self.next_tick_in.as_mut() {
            *left = left.saturating_sub(by);
        }
        if let Some(left) = self.milestone_clear_in.as_mut() {
            *left = left.saturating_sub(by);
        }
    }

    /// Turns the paused time into a session and resets to idle.
    ///
    /// Only allowed while paused with time on the clock.
    pub fn log_session(&mut self, clock: &dyn Clock, sensor: &dyn HealthSensor) -> Result<Session> {
        let session = self.build_session(clock, sensor)?;
        self.reset();
        Ok(session)
    }

    /// Like [`SessionTimer::log_session`], also appending the session to `store`.
    ///
    /// The timer keeps its time when the store rejects the session.
    pub fn log_into(
        &mut self,
        store: &mut dyn SessionStore,
        clock: &dyn Clock,
        sensor: &dyn HealthSensor,
    ) -> Result<Session> {
        let session = self.build_session(clock, sensor)?;
        store.append(session.clone())?;
        self.reset();
        Ok(session)
    }

    fn build_session(&mut self, clock: &dyn Clock, sensor: &dyn HealthSensor) -> Result<Session> {
        let phase = self.phase();
        if phase != TimerPhase::Paused {
            return Err(Error::NotLoggable { phase });
        }

        let now = clock.now();
        let reading = sensor.read();
        let session = Session::new(
            self.ids.next_id(now),
            now,
            self.state.elapsed_secs,
            reading.temperature,
            Some(reading.heart_rate),
        );
        info!(id = %session.id(), duration = %session.duration(), "session logged");
        Ok(session)
    }

    fn reset(&mut self) {
        self.state.elapsed_secs = 0;
        self.state.is_running = false;
        self.next_tick_in = None;
    }
}
