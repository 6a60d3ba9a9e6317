//! # Joypad Bridge
//!
//! Drive the keyboard and mouse with a joystick or gamepad on Linux.
//!
//! Usage: `joypad-bridge [CONFIG]` (default `config/default.toml`; a missing
//! file means built-in defaults).

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use joypad_bridge::config::{Config, LoggingConfig};
use joypad_bridge::runtime;

/// Config file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix of the daily rolling log files
const LOG_FILE_PREFIX: &str = "joypad-bridge.log";

/// Initialize logging
///
/// `RUST_LOG` overrides `logging.level`. When `logging.log_dir` is set,
/// everything is also written to a daily rolling file there; the returned
/// guard must live until exit so buffered lines are flushed.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

/// Main entry point for Joypad Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument or `config/default.toml`)
///    - Set up logging
///
/// 2. **Main Loop** (see [`runtime::run`])
///    - Open every configured or discovered joystick
///    - Translate input to keyboard/mouse output every tick
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration is invalid
/// - No joystick could be opened
/// - The synthetic output device cannot be created or written
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);
    info!("Joypad Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = runtime::run(&config).await {
        error!("{}", e);
        return Err(e.into());
    }

    info!("Joypad Bridge stopped");
    Ok(())
}
