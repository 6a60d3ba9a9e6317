//! # Legacy Joystick API
//!
//! Access to `/dev/input/jsN` nodes through the kernel's joydev interface.
//!
//! The kernel already numbers axes and buttons densely, so event numbers are
//! used as logical indices directly. Each read yields 8-byte `js_event`
//! records:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | timestamp (ms) |
//! | 4 | 2 | value (signed) |
//! | 6 | 1 | type (`JS_EVENT_*`) |
//! | 7 | 1 | number |

use bytes::Buf;
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use tracing::debug;

use super::coalescer::RawEvent;

/// Size of one `js_event` record.
pub const JS_EVENT_SIZE: usize = 8;

/// Button pressed or released.
pub const JS_EVENT_BUTTON: u8 = 0x01;
/// Joystick moved.
pub const JS_EVENT_AXIS: u8 = 0x02;
/// Initial state of the device (OR-ed into the type).
pub const JS_EVENT_INIT: u8 = 0x80;

/// Events read per `read(2)` call.
const READ_BATCH: usize = 64;

mod ioctl {
    nix::ioctl_read!(jsiocgaxes, b'j', 0x11, u8);
    nix::ioctl_read!(jsiocgbuttons, b'j', 0x12, u8);
    nix::ioctl_read_buf!(jsiocgname, b'j', 0x13, u8);
}

/// An open legacy joystick node.
#[derive(Debug)]
pub struct JoydevHandle {
    file: File,
    name: String,
    axes: u8,
    buttons: u8,
}

impl JoydevHandle {
    /// Opens `path` and probes it with `JSIOCGNAME`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(handle))` - The node speaks the joydev API
    /// * `Ok(None)` - The node opened but rejected the joydev query
    ///
    /// # Errors
    ///
    /// Returns the `open(2)` error if the node cannot be opened at all.
    pub fn probe(path: &Path) -> io::Result<Option<Self>> {
        let file = File::options()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        let fd = file.as_raw_fd();

        let mut name = [0u8; 128];
        // SAFETY: the buffer outlives the call and its length is encoded in the request.
        if let Err(errno) = unsafe { ioctl::jsiocgname(fd, &mut name) } {
            debug!("{} rejected JSIOCGNAME: {}", path.display(), errno);
            return Ok(None);
        }

        let mut axes = 0u8;
        let mut buttons = 0u8;
        // SAFETY: both requests write a single byte into the provided location.
        unsafe {
            if let Err(errno) = ioctl::jsiocgaxes(fd, &mut axes) {
                debug!("JSIOCGAXES failed on {}: {}", path.display(), errno);
            }
            if let Err(errno) = ioctl::jsiocgbuttons(fd, &mut buttons) {
                debug!("JSIOCGBUTTONS failed on {}: {}", path.display(), errno);
            }
        }

        Ok(Some(Self {
            file,
            name: c_name(&name),
            axes,
            buttons,
        }))
    }

    /// Wraps an already-open non-blocking stream of `js_event` records.
    #[cfg(test)]
    pub(crate) fn from_file(file: File, name: &str, axes: u8, buttons: u8) -> Self {
        Self {
            file,
            name: name.to_string(),
            axes,
            buttons,
        }
    }

    /// Name reported by the driver.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of axes reported by `JSIOCGAXES`.
    pub fn axis_count(&self) -> usize {
        usize::from(self.axes)
    }

    /// Number of buttons reported by `JSIOCGBUTTONS`.
    pub fn button_count(&self) -> usize {
        usize::from(self.buttons)
    }

    /// Reads every queued event without blocking.
    ///
    /// # Errors
    ///
    /// Any read error other than `WouldBlock`/`Interrupted`, or end-of-file,
    /// which the kernel reports once the device is unplugged.
    pub fn read_events(&mut self, out: &mut Vec<RawEvent>) -> io::Result<()> {
        let mut buf = [0u8; JS_EVENT_SIZE * READ_BATCH];
        loop {
            match self.file.read(&mut buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "joystick device closed",
                    ))
                }
                Ok(n) => decode_js_events(&buf[..n], out),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl AsRawFd for JoydevHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Decodes packed `js_event` records, ignoring a trailing partial record.
///
/// # Examples
///
/// ```
/// use joypad_bridge::controller::joydev::{decode_js_events, JS_EVENT_AXIS};
///
/// let mut record = Vec::new();
/// record.extend_from_slice(&0u32.to_ne_bytes());
/// record.extend_from_slice(&(-1200i16).to_ne_bytes());
/// record.push(JS_EVENT_AXIS);
/// record.push(2);
///
/// let mut out = Vec::new();
/// decode_js_events(&record, &mut out);
/// assert_eq!(out[0].index, 2);
/// assert_eq!(out[0].value, -1200);
/// ```
pub fn decode_js_events(mut bytes: &[u8], out: &mut Vec<RawEvent>) {
    while bytes.remaining() >= JS_EVENT_SIZE {
        let _time = bytes.get_u32_ne();
        let value = i32::from(bytes.get_i16_ne());
        let kind = bytes.get_u8() & !JS_EVENT_INIT;
        let number = usize::from(bytes.get_u8());

        match kind {
            JS_EVENT_AXIS => out.push(RawEvent::axis(number, value)),
            JS_EVENT_BUTTON => out.push(RawEvent::button(number, value)),
            other => debug!("Ignoring js_event type 0x{:02x}", other),
        }
    }
}

/// Packs one `js_event` record in native byte order.
#[cfg(test)]
pub(crate) fn encode_js_event(value: i16, kind: u8, number: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(JS_EVENT_SIZE);
    bytes.extend_from_slice(&1234u32.to_ne_bytes());
    bytes.extend_from_slice(&value.to_ne_bytes());
    bytes.push(kind);
    bytes.push(number);
    bytes
}

fn c_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}
