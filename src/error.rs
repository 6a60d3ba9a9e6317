//! # Error Types
//!
//! Custom error types for Joypad Bridge using `thiserror`.
//!
//! Only the two I/O boundaries can fail: opening/reading a physical device and
//! creating/writing the output device. Coalescing and translation are total.

use thiserror::Error;

/// Main error type for Joypad Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Open or read failure on a physical joystick device
    #[error("device unavailable: {path}: {reason}")]
    DeviceUnavailable { path: String, reason: String },

    /// No joystick device could be found or opened
    #[error("no joystick device found: {0}")]
    NoDevice(String),

    /// Malformed layout file or out-of-range binding value
    #[error("invalid layout (line {line}): {message}")]
    ConfigInvalid { line: usize, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Synthetic output device or windowing-server failure
    #[error("output device failure: {0}")]
    OutputDeviceFatal(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Builds a [`BridgeError::ConfigInvalid`] for the given layout line.
    pub fn layout(line: usize, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            line,
            message: message.into(),
        }
    }

    /// Returns `true` when the error must terminate the process.
    ///
    /// Output failures are never degraded silently; everything else only
    /// disables the device or mapping it came from.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutputDeviceFatal(_))
    }
}

/// Result type alias for Joypad Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
