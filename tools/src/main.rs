//! city-runner: headless driver for the smart-city registry.
//!
//! Usage:
//!   city-runner --seed 12345 --run-secs 60 --data-file city.json
//!   city-runner --config sim.json --ipc-mode
//!
//! In IPC mode, one JSON command per stdin line; one JSON reply per line.
//! Every reply, success or error, carries the notifications raised since
//! the previous reply.
//!
//! On exit, unsaved changes go to the data file. Services still responding
//! are saved as `Responding` and resume their recovery on the next load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use smartcity_core::{
    command::{CityCommand, CommandOutcome},
    config::SimConfig,
    engine::{RefreshSignal, SimEngine},
    event::Notification,
    sample_data::{load_or_initialize, StartupSource},
    City, CityState,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

#[derive(Deserialize)]
#[serde(untagged)]
enum IpcRequest {
    Quit { quit: bool },
    Command(CityCommand),
}

#[derive(Serialize)]
struct IpcReply<'a> {
    #[serde(flatten)]
    outcome: CommandOutcome,
    notifications: &'a [Notification],
}

#[derive(Serialize)]
struct IpcError<'a> {
    error: String,
    notifications: &'a [Notification],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = flag_value(&args, "--seed") {
        config.seed = Some(seed.parse().with_context(|| format!("bad --seed '{seed}'"))?);
    }
    if let Some(path) = flag_value(&args, "--data-file") {
        config.snapshot_path = path.to_string();
    }
    let run_secs = parse_arg(&args, "--run-secs", 30u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_file = PathBuf::from(&config.snapshot_path);

    if !ipc_mode {
        println!("Smart City Resource Management: city-runner");
        println!("  data file: {}", data_file.display());
        println!("  run secs:  {run_secs}");
        println!();
    }

    let city = City::new(&config);
    match city.with(|s| load_or_initialize(s, &data_file))? {
        StartupSource::Snapshot { count } => log::info!("Loaded {count} resources"),
        StartupSource::SampleData { reason } => log::info!("Using sample data ({reason})"),
    }

    let (tx, rx) = mpsc::channel();
    let engine = SimEngine::start(city.clone(), &config, tx)?;

    if ipc_mode {
        drop(rx);
        run_ipc_loop(&city)?;
    } else {
        watch(&city, &rx, Duration::from_secs(run_secs));
    }

    engine.stop();
    city.with(|s| save_if_dirty(s, &data_file));
    if !ipc_mode {
        city.with(print_summary);
    }
    Ok(())
}

/// Print fresh notifications and the status line after every worker pass.
fn watch(city: &City, refresh: &Receiver<RefreshSignal>, run_for: Duration) {
    let deadline = Instant::now() + run_for;
    let mut cursor = city.with(|s| s.notifications.len() as u64);

    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match refresh.recv_timeout(left) {
            Ok(signal) => {
                log::trace!("refresh from {} pass {}", signal.worker, signal.pass);
                city.with(|s| {
                    for note in s.notifications.since(cursor) {
                        println!("  {}", note.message());
                    }
                    cursor = s.notifications.len() as u64;
                    println!("{}", s.metrics.status_line());
                });
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_ipc_loop(city: &City) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut cursor = city.with(|s| s.notifications.len() as u64);

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let command = match serde_json::from_str(&buffer) {
            Ok(IpcRequest::Quit { quit: true }) => break,
            Ok(IpcRequest::Quit { quit: false }) => continue,
            Ok(IpcRequest::Command(c)) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let line = city.with(|s| reply_line(s, command, &mut cursor))?;
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Apply one command and render the reply, advancing `cursor` past the
/// notifications it carries.
fn reply_line(state: &mut CityState, command: CityCommand, cursor: &mut u64) -> Result<String> {
    let line = match state.apply(command) {
        Ok(outcome) => serde_json::to_string(&IpcReply {
            outcome,
            notifications: state.notifications.since(*cursor),
        })?,
        Err(e) => serde_json::to_string(&IpcError {
            error: e.to_string(),
            notifications: state.notifications.since(*cursor),
        })?,
    };
    *cursor = state.notifications.len() as u64;
    Ok(line)
}

fn save_if_dirty(state: &mut CityState, path: &Path) {
    if !state.has_unsaved_changes() {
        return;
    }
    if let Err(e) = state.save_snapshot(path) {
        log::error!("Could not save {}: {e}", path.display());
    }
}

fn print_summary(state: &mut CityState) {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  resources:      {}", state.repository.len());
    println!("  notifications:  {}", state.notifications.len());
    println!("  outages:        {}", state.notifications.count_of("outage_scenario"));
    println!("  dispatches:     {}", state.notifications.count_of("emergency_dispatched"));
    println!();
    print!("{}", state.city_report());
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
