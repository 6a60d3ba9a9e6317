//! # Evdev Input API
//!
//! Access to `/dev/input/eventN` nodes through the `evdev` crate.
//!
//! Raw key and absolute-axis codes are translated into logical indices with a
//! [`CodeTable`] built from this device's own capability bits, and absolute
//! values are rescaled into the joystick range (-32767 to 32767) so both APIs
//! feed the translator identical numbers.
//!
//! The kernel only reports changes on this API, so the state of every mapped
//! control is read at open and handed out by the first drain. Triggers that
//! rest at one end of their range therefore start where they really are.

use evdev::{Device, InputEventKind};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use tracing::debug;

use super::code_table::{AxisRange, CodeTable, JOY_MAX, JOY_MIN};
use super::coalescer::RawEvent;

/// An open evdev node together with its code table.
pub struct EvdevHandle {
    device: Device,
    table: CodeTable,
    name: String,
    /// Snapshot taken at open, returned by the first drain.
    pending: Vec<RawEvent>,
}

impl std::fmt::Debug for EvdevHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevHandle")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl EvdevHandle {
    /// Opens `path` as an evdev device and builds its code table.
    ///
    /// # Errors
    ///
    /// Returns the error from the evdev capability queries, or from switching
    /// the descriptor to non-blocking mode.
    pub fn open(path: &Path) -> io::Result<Self> {
        let device = Device::open(path)?;
        set_nonblocking(device.as_raw_fd())?;

        let name = device.name().unwrap_or("Unknown").to_string();
        let keys = device.supported_keys();
        let absolute = device.supported_absolute_axes();
        let abs_state = device.get_abs_state().ok();
        let key_state = device.get_key_state().ok();

        let table = CodeTable::build(
            |code| keys.map_or(false, |keys| keys.contains(evdev::Key::new(code))),
            |code| {
                let supported = absolute.map_or(false, |axes| {
                    axes.contains(evdev::AbsoluteAxisType(code))
                });
                if !supported {
                    return None;
                }
                let info = abs_state
                    .as_ref()
                    .and_then(|state| state.get(usize::from(code)));
                Some(info.map_or(AxisRange::new(JOY_MIN, JOY_MAX), |info| {
                    AxisRange::new(info.minimum, info.maximum)
                }))
            },
        );

        let pending = table.initial_state(
            |code| {
                abs_state
                    .as_ref()
                    .and_then(|state| state.get(usize::from(code)))
                    .map(|info| info.value)
            },
            |code| {
                key_state
                    .as_ref()
                    .map_or(false, |held| held.contains(evdev::Key::new(code)))
            },
        );

        debug!(
            "{}: {} axes, {} buttons mapped",
            path.display(),
            table.axis_count(),
            table.button_count()
        );

        Ok(Self {
            device,
            table,
            name,
            pending,
        })
    }

    /// Name reported by the device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This device's code table.
    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Reads every queued event without blocking.
    ///
    /// The first call starts with the state captured at open. Key and
    /// absolute events with codes outside the table are skipped;
    /// synchronization and all other event types are ignored.
    ///
    /// # Errors
    ///
    /// Any read error other than `WouldBlock`, which ends the drain.
    pub fn read_events(&mut self, out: &mut Vec<RawEvent>) -> io::Result<()> {
        out.append(&mut self.pending);
        loop {
            let events = match self.device.fetch_events() {
                Ok(events) => events,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            let before = out.len();
            let mut fetched = 0usize;
            for event in events {
                fetched += 1;
                match event.kind() {
                    InputEventKind::Key(key) => {
                        if let Some(index) = self.table.button_index(key.code()) {
                            out.push(RawEvent::button(index, event.value()));
                        }
                    }
                    InputEventKind::AbsAxis(axis) => {
                        if let Some(index) = self.table.axis_index(axis.0) {
                            let value = self.table.normalize(index, event.value());
                            out.push(RawEvent::axis(index, value));
                        }
                    }
                    _ => {}
                }
            }
            debug!("evdev batch: {} fetched, {} kept", fetched, out.len() - before);

            if fetched == 0 {
                return Ok(());
            }
        }
    }
}

impl AsRawFd for EvdevHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }
}

/// Switches a descriptor to non-blocking reads, preserving other flags.
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    use nix::fcntl::{fcntl, FcntlArg, OFlag};

    let current = fcntl(fd, FcntlArg::F_GETFL).map_err(io::Error::from)?;
    let flags = OFlag::from_bits_truncate(current) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(io::Error::from)?;
    Ok(())
}
