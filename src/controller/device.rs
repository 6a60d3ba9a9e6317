//! # Joystick Device Module
//!
//! Opens a joystick node, detects which kernel input API it speaks, and hands
//! out normalized [`RawEvent`]s regardless of the API underneath.
//!
//! ## API Detection
//!
//! The legacy joystick name query (`JSIOCGNAME`) is tried first. If the node
//! rejects it, the node is reopened as an evdev device. Either way the caller
//! gets the same capability counts and event model.
//!
//! ## Failure Policy
//!
//! A read error is reported exactly once; the device then stops reading and
//! every later read returns an empty batch. The handle stays open until
//! [`close`](JoystickDevice::close), so a descriptor registered with a reactor
//! is never closed underneath it. A failed or closed device is never reopened.

use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::coalescer::RawEvent;
use super::event_device::EvdevHandle;
use super::joydev::JoydevHandle;
use crate::error::{BridgeError, Result};

/// Which kernel input API a device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    /// `/dev/input/jsN` joydev interface
    Legacy,
    /// `/dev/input/eventN` evdev interface
    Evdev,
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKind::Legacy => write!(f, "joydev"),
            ApiKind::Evdev => write!(f, "evdev"),
        }
    }
}

#[derive(Debug)]
enum Backend {
    Legacy(JoydevHandle),
    Evdev(EvdevHandle),
    Closed,
}

/// An open physical joystick or gamepad.
///
/// # Examples
///
/// ```no_run
/// use joypad_bridge::controller::device::JoystickDevice;
///
/// let mut device = JoystickDevice::open("/dev/input/js0")?;
/// println!("{} ({} axes, {} buttons)", device.identity(), device.axis_count(), device.button_count());
/// for event in device.read_raw()? {
///     println!("{:?}", event);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct JoystickDevice {
    path: PathBuf,
    identity: String,
    api: ApiKind,
    axis_count: usize,
    button_count: usize,
    backend: Backend,
    /// Raw descriptor captured at open; stays valid until `close()`.
    fd: RawFd,
    failed: bool,
}

impl JoystickDevice {
    /// Opens a device node, probing the legacy API before evdev.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` if the node cannot be opened or speaks neither API.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| BridgeError::DeviceUnavailable {
            path: path.display().to_string(),
            reason,
        };

        let legacy = JoydevHandle::probe(path).map_err(|e| unavailable(e.to_string()))?;
        let device = match legacy {
            Some(handle) => Self {
                path: path.to_path_buf(),
                identity: handle.name().to_string(),
                api: ApiKind::Legacy,
                axis_count: handle.axis_count(),
                button_count: handle.button_count(),
                fd: handle.as_raw_fd(),
                backend: Backend::Legacy(handle),
                failed: false,
            },
            None => {
                let handle = EvdevHandle::open(path)
                    .map_err(|e| unavailable(format!("not a joystick device: {}", e)))?;
                Self {
                    path: path.to_path_buf(),
                    identity: handle.name().to_string(),
                    api: ApiKind::Evdev,
                    axis_count: handle.table().axis_count(),
                    button_count: handle.table().button_count(),
                    fd: handle.as_raw_fd(),
                    backend: Backend::Evdev(handle),
                    failed: false,
                }
            }
        };

        info!(
            "Opened {} via {} API: \"{}\" ({} axes, {} buttons)",
            device.path.display(),
            device.api,
            device.identity,
            device.axis_count,
            device.button_count
        );
        Ok(device)
    }

    /// Wraps an already-open joydev stream.
    #[cfg(test)]
    pub(crate) fn from_joydev(path: &str, handle: JoydevHandle) -> Self {
        Self {
            path: PathBuf::from(path),
            identity: handle.name().to_string(),
            api: ApiKind::Legacy,
            axis_count: handle.axis_count(),
            button_count: handle.button_count(),
            fd: handle.as_raw_fd(),
            backend: Backend::Legacy(handle),
            failed: false,
        }
    }

    /// Device node path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity string (device name reported by the kernel).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// API this device was opened with.
    pub fn api(&self) -> ApiKind {
        self.api
    }

    /// Number of logical axes.
    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    /// Number of logical buttons.
    pub fn button_count(&self) -> usize {
        self.button_count
    }

    /// Returns `true` once the device has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.backend, Backend::Closed)
    }

    /// Returns `true` once a read has failed.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Drains every event currently queued by the kernel without blocking.
    ///
    /// # Returns
    ///
    /// Zero or more events in arrival order. A failed or closed device
    /// always returns an empty batch.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` the first time a read fails. The handle is kept
    /// open until [`close`](Self::close).
    pub fn read_raw(&mut self) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();
        if self.failed {
            return Ok(events);
        }
        let result = match &mut self.backend {
            Backend::Legacy(handle) => handle.read_events(&mut events),
            Backend::Evdev(handle) => handle.read_events(&mut events),
            Backend::Closed => return Ok(events),
        };

        match result {
            Ok(()) => {
                debug!("{}: drained {} events", self.path.display(), events.len());
                Ok(events)
            }
            Err(e) => {
                warn!("Read error on {}, disabling device: {}", self.path.display(), e);
                self.failed = true;
                Err(BridgeError::DeviceUnavailable {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Releases the underlying handle. Safe to call repeatedly.
    pub fn close(&mut self) {
        if !self.is_closed() {
            debug!("Closing {}", self.path.display());
            self.backend = Backend::Closed;
            self.fd = -1;
        }
    }
}

impl AsRawFd for JoystickDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

/// Lists device nodes in `dir` whose file name starts with `prefix`, sorted.
///
/// Sorting keeps device numbering deterministic when several controllers are
/// connected.
///
/// # Errors
///
/// `NoDevice` if the directory cannot be read.
pub fn discover<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .map_err(|e| BridgeError::NoDevice(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with(prefix))
        })
        .collect();
    paths.sort();
    Ok(paths)
}
