//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::translator::timing::{Timing, DEFAULT_CYCLE_TICKS, DEFAULT_MOUSE_SCALE, DEFAULT_TICK_MS};

/// Longest name uinput accepts (`UINPUT_MAX_NAME_SIZE` minus the NUL).
const MAX_DEVICE_NAME_LEN: usize = 79;

/// Accepted values for `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub devices: DevicesConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Physical device selection
#[derive(Debug, Deserialize, Clone)]
pub struct DevicesConfig {
    /// Explicit device nodes; when empty, `scan_dir` is scanned
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    #[serde(default = "default_scan_dir")]
    pub scan_dir: PathBuf,

    #[serde(default = "default_scan_prefix")]
    pub scan_prefix: String,
}

/// Layout file location
#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    #[serde(default = "default_layout_path")]
    pub path: PathBuf,
}

/// Tick and duty-cycle settings
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_cycle_ticks")]
    pub cycle_ticks: u32,

    #[serde(default = "default_mouse_scale")]
    pub mouse_scale: f32,
}

/// Synthetic device settings
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_release_on_disconnect")]
    pub release_on_disconnect: bool,
}

/// Logging settings
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

// Default value functions
fn default_scan_dir() -> PathBuf { PathBuf::from("/dev/input") }
fn default_scan_prefix() -> String { "js".to_string() }

fn default_layout_path() -> PathBuf { PathBuf::from("config/layout.lyt") }

fn default_tick_ms() -> u64 { DEFAULT_TICK_MS }
fn default_cycle_ticks() -> u32 { DEFAULT_CYCLE_TICKS }
fn default_mouse_scale() -> f32 { DEFAULT_MOUSE_SCALE }

fn default_device_name() -> String { "Joypad Bridge Virtual Input".to_string() }
fn default_release_on_disconnect() -> bool { true }

fn default_log_level() -> String { "info".to_string() }

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            scan_dir: default_scan_dir(),
            scan_prefix: default_scan_prefix(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            path: default_layout_path(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            cycle_ticks: default_cycle_ticks(),
            mouse_scale: default_mouse_scale(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            release_on_disconnect: default_release_on_disconnect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration; defaults if
    ///   the file does not exist
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File exists but cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joypad_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Config::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Duty-cycle timing derived from `[timing]`.
    #[must_use]
    pub fn timing(&self) -> Timing {
        Timing {
            tick: Duration::from_millis(self.timing.tick_ms),
            cycle_ticks: self.timing.cycle_ticks,
            mouse_scale: self.timing.mouse_scale,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.devices.paths.is_empty() && self.devices.scan_prefix.is_empty() {
            return Err(invalid("scan_prefix cannot be empty when no device paths are given"));
        }

        if self.layout.path.as_os_str().is_empty() {
            return Err(invalid("layout path cannot be empty"));
        }

        if !(1..=1000).contains(&self.timing.tick_ms) {
            return Err(invalid("tick_ms must be between 1 and 1000"));
        }

        if !(1..=100).contains(&self.timing.cycle_ticks) {
            return Err(invalid("cycle_ticks must be between 1 and 100"));
        }

        // Negated so NaN is rejected too
        if !(self.timing.mouse_scale > 0.0 && self.timing.mouse_scale <= 100.0) {
            return Err(invalid("mouse_scale must be greater than 0 and at most 100"));
        }

        let name_len = self.output.device_name.len();
        if name_len == 0 || name_len > MAX_DEVICE_NAME_LEN {
            return Err(invalid(format!(
                "device_name must be 1 to {} bytes long",
                MAX_DEVICE_NAME_LEN
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self
            .logging
            .log_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        Ok(())
    }
}
