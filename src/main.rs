use std::collections::HashSet;
use std::fs::File;
use std::io::{self, stdin, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    cursor, execute, queue,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
    tty::IsTty,
};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use time_humanize::{Accuracy, HumanTime, Tense};
use tracing::info;

use plunge::achievements;
use plunge::app_dirs::AppDirs;
use plunge::clock::{Clock, SystemClock};
use plunge::config::{Config, ConfigStore, FileConfigStore};
use plunge::export;
use plunge::goals::{goal_progress, recommended_goal, Goal};
use plunge::legacy;
use plunge::logging;
use plunge::runtime::{run_timer, terminal_events, Runner, TimerContext, TimerUpdate};
use plunge::seed;
use plunge::session::{format_duration, parse_duration, SessionIdGenerator};
use plunge::stats::{self, Period};
use plunge::store::{MemorySessionStore, SessionStore, SqliteSessionStore, StoreEvent};
use plunge::timer::{MilestoneKind, MockHealthSensor, SessionTimer};
use plunge::Session;

const TICK_RATE_MS: u64 = 100;

/// cold-exposure session tracker
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Time ice bath sessions against a goal, then review averages, streaks, period-over-period changes, goals and achievements."
)]
pub struct Cli {
    /// keep sessions in memory for this run only
    #[clap(long, global = true)]
    memory: bool,

    /// session database to use instead of the default location
    #[clap(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// more log output (-v info, -vv debug); RUST_LOG overrides
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the interactive session timer (space: start/pause, l: log, q: quit)
    Timer,

    /// averages and changes against the previous period
    Stats {
        /// reporting window, defaults to the configured period
        #[clap(short, long, value_enum)]
        period: Option<Period>,
    },

    /// activity overview and recent sessions
    History {
        #[clap(short, long, value_enum)]
        period: Option<Period>,

        /// number of sessions to list
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// log a session without running the timer
    Add {
        /// elapsed time as minutes:seconds, e.g. 3:15
        #[clap(short, long, value_parser = parse_duration_arg)]
        duration: u64,

        /// water temperature in °F, defaults to the mock reading
        #[clap(short, long)]
        temperature: Option<f64>,

        /// heart rate in bpm, defaults to the mock reading
        #[clap(long)]
        heart_rate: Option<u32>,
    },

    /// show or change the weekly time goal
    Goal {
        /// target minutes per session
        #[clap(short, long)]
        minutes: Option<u32>,

        /// target sessions per week
        #[clap(short = 'w', long)]
        per_week: Option<u32>,

        /// switch to the recommended goal
        #[clap(long, conflicts_with_all = ["minutes", "per_week"])]
        adopt: bool,
    },

    /// unlocked and upcoming achievements
    Achievements,

    /// write the session history as CSV
    Export {
        /// output file, stdout when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// import sessions from a JSON export of the mobile app
    Import { file: PathBuf },

    /// fill the store with synthetic sessions
    Seed {
        #[clap(short = 'n', long, default_value_t = 30)]
        count: usize,

        /// rng seed for reproducible data
        #[clap(long)]
        seed: Option<u64>,
    },
}

fn parse_duration_arg(s: &str) -> Result<u64, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = config_store.load();
    let mut store = open_store(&cli)?;
    let clock = SystemClock;

    match cli.command {
        Command::Timer => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            timer_command(&config, store.as_mut(), &clock)
        }
        Command::Stats { period } => {
            print_stats(store.as_ref(), period.unwrap_or(config.default_period), clock.now())
        }
        Command::History { period, limit } => print_history(
            store.as_ref(),
            period.unwrap_or(config.default_period),
            limit,
            clock.now(),
        ),
        Command::Add {
            duration,
            temperature,
            heart_rate,
        } => {
            let now = clock.now();
            let reading = config.mock_reading();
            let session = Session::new(
                SessionIdGenerator::new().next_id(now),
                now,
                duration,
                temperature.unwrap_or(reading.temperature),
                Some(heart_rate.unwrap_or(reading.heart_rate)),
            );
            store.append(session.clone()).context("failed to store session")?;
            println!("Logged {} session", session.duration());
            Ok(())
        }
        Command::Goal {
            minutes,
            per_week,
            adopt,
        } => goal(&config_store, config, store.as_ref(), minutes, per_week, adopt, clock.now()),
        Command::Achievements => print_achievements(store.as_ref(), clock.now()),
        Command::Export { output } => {
            let sessions = store.get_all()?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    export::write_csv(&sessions, file)?;
                    println!("Exported {} sessions to {}", sessions.len(), path.display());
                }
                None => export::write_csv(&sessions, io::stdout().lock())?,
            }
            Ok(())
        }
        Command::Import { file } => import(store.as_mut(), &file),
        Command::Seed { count, seed: rng_seed } => {
            let mut rng = rng_seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let sessions = seed::synthetic_sessions(count, clock.now(), &mut rng);
            store.append_all(sessions)?;
            println!("Added {count} synthetic sessions");
            Ok(())
        }
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<Box<dyn SessionStore>> {
    if cli.memory {
        return Ok(Box::new(MemorySessionStore::new()));
    }
    let path = match &cli.db {
        Some(path) => path.clone(),
        None => AppDirs::db_path().unwrap_or_else(|| PathBuf::from("plunge_sessions.db")),
    };
    let store = SqliteSessionStore::open(&path)
        .with_context(|| format!("cannot open session database {}", path.display()))?;
    Ok(Box::new(store))
}

/// Leaves raw mode however the timer loop ends
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn timer_command(config: &Config, store: &mut dyn SessionStore, clock: &dyn Clock) -> anyhow::Result<()> {
    let (current, _) = Period::Week.windows(clock.now());
    let mut this_week = current.filter(&store.get_all()?).len();
    let events = store.subscribe();

    let sensor = MockHealthSensor::new(config.mock_temperature, config.mock_heart_rate);
    let mut timer = SessionTimer::with_intervals(
        config.goal_secs,
        plunge::timer::TICK_INTERVAL,
        Duration::from_secs(config.milestone_secs),
    );
    let runner = Runner::new(
        terminal_events().context("cannot read terminal input")?,
        Duration::from_millis(TICK_RATE_MS),
    );

    println!("space: start/pause   l: log session   q: quit");
    let guard = RawModeGuard::enable()?;
    let mut stdout = io::stdout();

    let logged = run_timer(
        &runner,
        &mut timer,
        TimerContext {
            store,
            clock,
            sensor: &sensor,
        },
        |timer, update| {
            while let Ok(StoreEvent::Appended { .. }) = events.try_recv() {
                this_week += 1;
            }
            let note = match update {
                TimerUpdate::Changed => None,
                TimerUpdate::Logged(session) => {
                    Some(format!("logged {} session", session.duration()))
                }
                TimerUpdate::Rejected(e) => Some(e.to_string()),
            };
            if let Some(note) = note {
                queue!(stdout, Clear(ClearType::CurrentLine), cursor::MoveToColumn(0))?;
                write!(stdout, "{note}\r\n")?;
            }
            queue!(stdout, Clear(ClearType::CurrentLine), cursor::MoveToColumn(0))?;
            write!(stdout, "{}", status_line(timer, this_week))?;
            stdout.flush()?;
            Ok(())
        },
    );

    drop(guard);
    execute!(io::stdout(), cursor::MoveToColumn(0))?;
    println!();
    let logged = logged?;
    info!(count = logged.len(), "timer closed");
    Ok(())
}

fn status_line(timer: &SessionTimer, this_week: usize) -> String {
    const WIDTH: usize = 20;
    let filled = (timer.progress() * WIDTH as f64).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(WIDTH - filled));
    let milestone = timer
        .milestone()
        .map(|m| match m.kind {
            MilestoneKind::Success => format!("  {}", m.message),
            MilestoneKind::Info => format!("  ({})", m.message),
        })
        .unwrap_or_default();

    format!(
        "{} / {} [{}] {:<7} {} this week{}",
        format_duration(timer.elapsed_secs()),
        format_duration(timer.goal_secs()),
        bar,
        timer.phase().to_string(),
        this_week,
        milestone
    )
}

fn signed_percent(change: i64) -> String {
    match change {
        0 => String::new(),
        c if c > 0 => format!("+{c}%"),
        c => format!("{c}%"),
    }
}

fn print_stats(store: &dyn SessionStore, period: Period, now: DateTime<Local>) -> anyhow::Result<()> {
    let sessions = store.get_all()?;
    let report = stats::period_stats(&sessions, period, now);
    let change = report.comparison();

    println!("{}", period.label());
    println!(
        "  {:<16}{:>8}  {}",
        "Sessions",
        report.total_sessions,
        signed_percent(change.sessions)
    );
    println!(
        "  {:<16}{:>8}  {}",
        "Avg. Duration",
        report.current.avg_duration(),
        signed_percent(change.avg_duration)
    );
    println!(
        "  {:<16}{:>8}  {}",
        "Avg. Temp",
        format!("{}°F", report.current.avg_temperature),
        signed_percent(change.avg_temperature)
    );
    println!(
        "  {:<16}{:>8}",
        "Current Streak",
        stats::current_streak(&sessions, period, now)
    );
    Ok(())
}

fn relative(date: DateTime<Local>, now: DateTime<Local>) -> String {
    let ago = (now - date).to_std().unwrap_or_default();
    HumanTime::from(ago).to_text_en(Accuracy::Rough, Tense::Past)
}

fn print_history(
    store: &dyn SessionStore,
    period: Period,
    limit: usize,
    now: DateTime<Local>,
) -> anyhow::Result<()> {
    let sessions = store.get_all()?;
    let summary = stats::history_summary(&sessions, period, now);

    println!("Total Time in Ice: {}", stats::format_total_time(summary.lifetime_secs));
    println!();
    println!("{}", period.label());
    println!("  Total Ice Baths   {}", summary.total_sessions);
    println!("  Average Duration  {}", format_duration(summary.avg_duration_secs));
    println!("  Longest Duration  {}", format_duration(summary.longest_duration_secs));
    println!("  Total Time        {}", stats::format_total_time(summary.total_secs));
    println!("  Current Streak    {}", summary.current_streak);

    let (window, _) = period.windows(now);
    let recent = window.filter(&sessions);
    if recent.is_empty() {
        return Ok(());
    }
    println!();
    println!("Recent Sessions");
    for session in recent.into_iter().take(limit) {
        let date = session.date();
        println!(
            "  {} {}  {:>6}  {:>5.1}°F  {:>7}  ({})",
            date.format("%B %-d, %Y"),
            date.format("%-I:%M %p"),
            session.duration(),
            session.temperature(),
            session
                .heart_rate()
                .map(|bpm| format!("{bpm} bpm"))
                .unwrap_or_default(),
            relative(date, now)
        );
    }
    Ok(())
}

fn goal(
    config_store: &FileConfigStore,
    mut config: Config,
    store: &dyn SessionStore,
    minutes: Option<u32>,
    per_week: Option<u32>,
    adopt: bool,
    now: DateTime<Local>,
) -> anyhow::Result<()> {
    let sessions = store.get_all()?;

    let updated = if adopt {
        Some(recommended_goal(&sessions, config.goal, now))
    } else if minutes.is_some() || per_week.is_some() {
        Some(Goal {
            minutes_per_session: minutes.unwrap_or(config.goal.minutes_per_session),
            sessions_per_week: per_week.unwrap_or(config.goal.sessions_per_week),
        })
    } else {
        None
    };

    if let Some(goal) = updated {
        if goal.minutes_per_session == 0 || goal.sessions_per_week == 0 {
            bail!("goal minutes and sessions per week must be at least 1");
        }
        config.goal = goal;
        config_store
            .save(&config)
            .with_context(|| format!("cannot save {}", config_store.path().display()))?;
        info!(%goal, "goal updated");
    }

    let progress = goal_progress(&sessions, config.goal, now);
    let recommended = recommended_goal(&sessions, config.goal, now);
    println!("Your Current Time Goal: {}", config.goal);
    println!(
        "  {}/{} this week ({:.0}%)",
        progress.qualifying,
        progress.target,
        progress.fraction * 100.0
    );
    if recommended != config.goal {
        println!(
            "Recommended Time Goal: {} Minutes per Session (run with --adopt)",
            recommended.minutes_per_session
        );
    }
    Ok(())
}

fn print_achievements(store: &dyn SessionStore, now: DateTime<Local>) -> anyhow::Result<()> {
    let sessions = store.get_all()?;
    let statuses = achievements::evaluate(&sessions);

    for (category, group) in &statuses.iter().chunk_by(|s| s.achievement.category) {
        println!("{category}");
        for status in group {
            let a = status.achievement;
            match status.unlocked_at {
                Some(at) => println!("  {} {:<18} unlocked {}", a.icon, a.title, relative(at, now)),
                None => println!(
                    "  {} {:<18} {:>3.0}%  {}",
                    a.icon,
                    a.title,
                    status.progress * 100.0,
                    status.hint(&sessions).unwrap_or_else(|| a.description.to_string())
                ),
            }
        }
    }
    Ok(())
}

fn import(store: &mut dyn SessionStore, file: &Path) -> anyhow::Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("cannot open {}", file.display()))?,
    );
    let imported = legacy::read_json(reader)
        .with_context(|| format!("cannot import {}", file.display()))?;

    let mut known: HashSet<_> = store.get_all()?.iter().map(Session::id).collect();
    let mut fresh: Vec<Session> = imported
        .into_iter()
        .filter(|session| {
            let new = known.insert(session.id());
            if !new {
                info!(id = %session.id(), "skipping already known session");
            }
            new
        })
        .collect();
    // records are newest first; append oldest first to keep that order
    fresh.reverse();

    let added = fresh.len();
    store
        .append_all(fresh)
        .with_context(|| format!("cannot import {}", file.display()))?;
    println!("Imported {added} sessions");
    Ok(())
}
