//! # GC Enabler
//!
//! Enable a GameCube-style USB controller and optionally forward it as a
//! virtual Xbox 360 controller.
//!
//! # Commands
//!
//! - `monitor [--json]`: connect and print live controller state
//! - `emulate [--json]`: forward input to a virtual Xbox 360 pad while
//!   printing live controller state
//! - `init`: run only the USB handshake
//! - `config show|save|path`: inspect or write the settings file
//!
//! Ctrl+C stops cleanly: the virtual pad is reset and the device closed.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;

use gc_enabler::config::{Config, LoggingConfig};
use gc_enabler::controller::report::ControllerState;
use gc_enabler::display::{render_line, DisplayRecord, StatePublisher};
use gc_enabler::session::{Session, SystemBackend};
use gc_enabler::status::{StatusReporter, STATUS_TARGET};
use gc_enabler::usb;

/// How often the main loop checks whether the input loop died
const REAP_INTERVAL_MS: u64 = 100;

/// Log file name prefix inside `logging.directory`
const LOG_FILE_PREFIX: &str = "gc-enabler.log";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Connect and print live controller state
    Monitor {
        /// One JSON record per update instead of text
        #[arg(long)]
        json: bool,
    },
    /// Connect and forward input to a virtual Xbox 360 controller
    Emulate {
        /// One JSON record per update instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run only the USB initialization handshake
    Init,
    /// Inspect or write the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigAction {
    /// Print the effective settings as TOML
    Show,
    /// Write the effective settings to the settings file
    Save,
    /// Print the settings file location
    Path,
}

/// What the main loop prints for each state update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Text,
    Json,
}

impl Output {
    fn new(json: bool) -> Self {
        if json {
            Output::Json
        } else {
            Output::Text
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = settings_path(cli.config.as_ref())?;
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let _log_guard = init_logging(&config.logging);
    info!("GC Enabler v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Monitor { json } => run_session(config, false, Output::new(json)).await,
        Command::Emulate { json } => run_session(config, true, Output::new(json)).await,
        Command::Init => {
            let (reporter, _status_rx) = StatusReporter::channel();
            tokio::task::block_in_place(|| usb::initialize(&config.device, &reporter))?;
            Ok(())
        }
        Command::Config { action } => run_config(action, &config, &config_path),
    }
}

/// Explicit path, or the platform default.
fn settings_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.clone()),
        None => Config::default_path().ok_or_else(|| anyhow!("Cannot find config directory")),
    }
}

/// Initialize logging to stderr, or to a daily file when a directory is set.
///
/// With a log file, status messages are still echoed to stderr.
/// The returned guard flushes the file writer on drop.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match logging.directory() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_filter(filter),
                )
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_filter(console_status_filter()),
                )
                .init();
            Some(guard)
        }
        None => {
            // stdout carries display output
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

/// Passes only status messages, for the terminal next to a log file.
fn console_status_filter() -> Targets {
    Targets::new().with_target(STATUS_TARGET, LevelFilter::INFO)
}

fn run_config(action: ConfigAction, config: &Config, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", config.to_toml()?),
        ConfigAction::Save => {
            config.save(path)?;
            println!("Settings saved to {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

/// Connect, optionally start emulation, and run until Ctrl+C or disconnect.
async fn run_session(config: Config, emulate: bool, output: Output) -> Result<()> {
    let (reporter, _status_rx) = StatusReporter::channel();
    let (publisher, mut state_rx) = StatePublisher::channel();
    let mut session = Session::new(SystemBackend, config, reporter, publisher);

    tokio::task::block_in_place(|| session.connect())?;

    if emulate {
        if let Err(e) = tokio::task::block_in_place(|| session.start_emulation()) {
            tokio::task::block_in_place(|| session.disconnect());
            return Err(e.into());
        }
    }

    info!("Press Ctrl+C to exit");

    let mut reap_interval = interval(Duration::from_millis(REAP_INTERVAL_MS));
    let mut result = Ok(());

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                print_state(&state, output)?;
            }

            _ = reap_interval.tick() => {
                if session.reap() {
                    result = Err(anyhow!("Controller disconnected"));
                    break;
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    tokio::task::block_in_place(|| session.disconnect());
    result
}

fn print_state(state: &ControllerState, output: Output) -> Result<()> {
    match output {
        Output::Text => println!("{}", render_line(state)),
        Output::Json => println!("{}", DisplayRecord::now(*state).to_json()?),
    }
    Ok(())
}
