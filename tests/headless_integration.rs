use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use plunge::clock::ManualClock;
use plunge::runtime::{run_timer, ChannelEventSource, Runner, TimerContext, TimerEvent, TimerUpdate};
use plunge::store::{MemorySessionStore, SessionStore, SqliteSessionStore, StoreEvent};
use plunge::timer::{MockHealthSensor, SessionTimer, GOAL_ACHIEVED};

fn key(c: char) -> TimerEvent {
    TimerEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Spawns a producer that starts the timer, waits until `min_elapsed` timer
// seconds have been reported, then pauses, logs and quits.
fn drive(min_elapsed: u64, elapsed: Arc<AtomicU64>) -> (ChannelEventSource, thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        tx.send(key(' ')).unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        while elapsed.load(Ordering::SeqCst) < min_elapsed && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        tx.send(key(' ')).unwrap();
        tx.send(key('l')).unwrap();
        tx.send(key('q')).unwrap();
    });
    (ChannelEventSource::new(rx), handle)
}

// Headless flow through Runner/ChannelEventSource without a TTY: start, run past
// the goal, pause, log, quit.
#[test]
fn headless_timer_flow_logs_session() {
    // one timer "second" per millisecond keeps the test fast
    let mut timer = SessionTimer::with_intervals(3, Duration::from_millis(1), Duration::from_millis(2));
    let elapsed = Arc::new(AtomicU64::new(0));
    let (es, producer) = drive(5, Arc::clone(&elapsed));
    let runner = Runner::new(es, Duration::from_millis(1));

    let mut store = MemorySessionStore::new();
    let clock = ManualClock::new(chrono::Local::now());
    let sensor = MockHealthSensor::new(39.0, 80);
    let saw_goal = AtomicBool::new(false);

    let logged = run_timer(
        &runner,
        &mut timer,
        TimerContext {
            store: &mut store,
            clock: &clock,
            sensor: &sensor,
        },
        |t, update| {
            elapsed.store(t.elapsed_secs(), Ordering::SeqCst);
            if t.milestone().is_some_and(|m| m.message == GOAL_ACHIEVED) {
                saw_goal.store(true, Ordering::SeqCst);
            }
            if let TimerUpdate::Rejected(e) = update {
                panic!("log rejected: {e}");
            }
            Ok(())
        },
    )
    .unwrap();
    producer.join().unwrap();

    assert_eq!(logged.len(), 1);
    assert!(logged[0].duration_secs() >= 5);
    assert_eq!(logged[0].temperature(), 39.0);
    assert_eq!(logged[0].heart_rate(), Some(80));
    assert!(saw_goal.load(Ordering::SeqCst), "goal milestone should have been shown");

    // timer is back to idle and the store holds the session
    assert_eq!(timer.elapsed_secs(), 0);
    assert!(!timer.is_running());
    assert_eq!(store.get_all().unwrap(), logged);
}

#[test]
fn logged_session_reaches_sqlite_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteSessionStore::open(dir.path().join("sessions.db")).unwrap();
    let events = store.subscribe();

    let mut timer = SessionTimer::with_intervals(60, Duration::from_millis(1), Duration::from_millis(2));
    let elapsed = Arc::new(AtomicU64::new(0));
    let (es, producer) = drive(2, Arc::clone(&elapsed));
    let runner = Runner::new(es, Duration::from_millis(1));
    let clock = ManualClock::new(chrono::Local::now());

    let logged = run_timer(
        &runner,
        &mut timer,
        TimerContext {
            store: &mut store,
            clock: &clock,
            sensor: &MockHealthSensor::default(),
        },
        |t, _| {
            elapsed.store(t.elapsed_secs(), Ordering::SeqCst);
            Ok(())
        },
    )
    .unwrap();
    producer.join().unwrap();

    assert_eq!(logged.len(), 1);
    assert_eq!(events.try_recv().unwrap(), StoreEvent::Appended { id: logged[0].id() });
    assert!(events.try_recv().is_err());

    // survives a reopen
    drop(store);
    let reopened = SqliteSessionStore::open(dir.path().join("sessions.db")).unwrap();
    assert_eq!(reopened.get_all().unwrap(), logged);
}

#[test]
fn quit_while_running_logs_nothing() {
    let (tx, rx) = mpsc::channel();
    tx.send(key(' ')).unwrap();
    tx.send(key('q')).unwrap();

    let runner = Runner::new(ChannelEventSource::new(rx), Duration::from_millis(1));
    let mut timer = SessionTimer::default();
    let mut store = MemorySessionStore::new();

    let logged = run_timer(
        &runner,
        &mut timer,
        TimerContext {
            store: &mut store,
            clock: &ManualClock::new(chrono::Local::now()),
            sensor: &MockHealthSensor::default(),
        },
        |_, _| Ok(()),
    )
    .unwrap();

    assert!(logged.is_empty());
    assert!(timer.is_running());
    assert!(store.is_empty());
}
