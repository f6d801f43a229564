use std::cell::Cell;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::store::SessionStore;
use crate::timer::{HealthSensor, SessionTimer};

/// Input to the timer loop
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Anything the runner can wait on for input
pub trait TimerEventSource {
    /// Waits at most `timeout` for the next event
    fn recv_timeout(&self, timeout: Duration) -> std::result::Result<TimerEvent, RecvTimeoutError>;
}

/// Events delivered over an mpsc channel. Tests feed it directly;
/// [`terminal_events`] feeds it from the terminal.
pub struct ChannelEventSource {
    rx: Receiver<TimerEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl TimerEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> std::result::Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

fn translate(event: CtEvent) -> Option<TimerEvent> {
    match event {
        // some terminals also report releases
        CtEvent::Key(key) if key.kind != KeyEventKind::Release => Some(TimerEvent::Key(key)),
        CtEvent::Resize(..) => Some(TimerEvent::Resize),
        _ => None,
    }
}

/// Spawns a reader thread that forwards terminal input until the receiving
/// side is dropped.
pub fn terminal_events() -> io::Result<ChannelEventSource> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("terminal-events".into())
        .spawn(move || loop {
            let event = match event::read() {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "terminal event reader stopped");
                    return;
                }
            };
            if let Some(ev) = translate(event) {
                if tx.send(ev).is_err() {
                    return;
                }
            }
        })?;
    Ok(ChannelEventSource::new(rx))
}

/// Turns an event source into a stream of events interleaved with ticks.
///
/// Ticks keep a steady cadence: an event arriving mid-interval does not
/// push the next tick back.
pub struct Runner<E: TimerEventSource> {
    events: E,
    interval: Duration,
    next_tick: Cell<Instant>,
}

impl<E: TimerEventSource> Runner<E> {
    pub fn new(events: E, interval: Duration) -> Self {
        Self {
            events,
            interval,
            next_tick: Cell::new(Instant::now() + interval),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Next event, or `Tick` once the tick is due
    pub fn step(&self) -> TimerEvent {
        let wait = self
            .next_tick
            .get()
            .saturating_duration_since(Instant::now());
        match self.events.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(err) => {
                if err == RecvTimeoutError::Disconnected {
                    // input is gone, keep ticking at the same cadence
                    thread::sleep(wait);
                }
                self.next_tick.set(self.next_tick.get() + self.interval);
                TimerEvent::Tick
            }
        }
    }
}

/// What a key press asks the timer to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerCommand {
    Toggle,
    Log,
    Quit,
}

pub fn command_for(key: &KeyEvent) -> Option<TimerCommand> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TimerCommand::Quit)
        }
        KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Enter => Some(TimerCommand::Toggle),
        KeyCode::Char('l') => Some(TimerCommand::Log),
        KeyCode::Char('q') | KeyCode::Esc => Some(TimerCommand::Quit),
        _ => None,
    }
}

/// Everything the timer loop needs besides the timer itself
pub struct TimerContext<'a> {
    pub store: &'a mut dyn SessionStore,
    pub clock: &'a dyn Clock,
    pub sensor: &'a dyn HealthSensor,
}

/// Notification passed to the display callback
#[derive(Debug)]
pub enum TimerUpdate<'a> {
    Changed,
    Logged(&'a Session),
    Rejected(&'a Error),
}

/// Runs the interactive timer until a quit command, returning the sessions it logged.
///
/// Every tick feeds one runner interval of wall time into `timer`.
pub fn run_timer<E, F>(
    runner: &Runner<E>,
    timer: &mut SessionTimer,
    mut ctx: TimerContext<'_>,
    mut on_update: F,
) -> Result<Vec<Session>>
where
    E: TimerEventSource,
    F: FnMut(&SessionTimer, TimerUpdate<'_>) -> Result<()>,
{
    let mut logged = Vec::new();
    on_update(timer, TimerUpdate::Changed)?;

    loop {
        match runner.step() {
            TimerEvent::Tick => {
                timer.advance(runner.interval());
                on_update(timer, TimerUpdate::Changed)?;
            }
            TimerEvent::Resize => on_update(timer, TimerUpdate::Changed)?,
            TimerEvent::Key(key) => match command_for(&key) {
                Some(TimerCommand::Toggle) => {
                    timer.toggle();
                    on_update(timer, TimerUpdate::Changed)?;
                }
                Some(TimerCommand::Log) => {
                    match timer.log_into(&mut *ctx.store, ctx.clock, ctx.sensor) {
                        Ok(session) => {
                            on_update(timer, TimerUpdate::Logged(&session))?;
                            logged.push(session);
                        }
                        Err(e @ Error::NotLoggable { .. }) => {
                            debug!(error = %e, "log ignored");
                            on_update(timer, TimerUpdate::Rejected(&e))?;
                        }
                        Err(e) => return Err(e),
                    }
                }
                Some(TimerCommand::Quit) => break,
                None => {}
            },
        }
    }

    Ok(logged)
}
