//! X11 pointer channel using the XTest extension.
//!
//! Used for absolute pointer placement and for mouse buttons the kernel has
//! no key code for (wheel buttons 4 to 7 and anything above 9).

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT, MOTION_NOTIFY_EVENT};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;
use tracing::info;

use super::sink::PointerServer;
use crate::error::{BridgeError, Result};

/// Connection to the default X display with its root window.
pub struct XTestPointer {
    conn: RustConnection,
    root: u32,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for XTestPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XTestPointer")
            .field("root", &self.root)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

fn fatal(step: &str, e: impl std::fmt::Display) -> BridgeError {
    BridgeError::OutputDeviceFatal(format!("{}: {}", step, e))
}

impl XTestPointer {
    fn fake_input(&self, event_type: u8, detail: u8, x: i32, y: i32) -> Result<()> {
        let x = x.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        let y = y.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        self.conn
            .xtest_fake_input(event_type, detail, CURRENT_TIME, self.root, x, y, 0)
            .map_err(|e| fatal("XTest request failed", e))?;
        self.conn
            .flush()
            .map_err(|e| fatal("X11 flush failed", e))
    }
}

impl PointerServer for XTestPointer {
    fn connect() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| fatal("Cannot open X display", e))?;

        conn.xtest_get_version(2, 2)
            .map_err(|e| fatal("XTest extension unavailable", e))?
            .reply()
            .map_err(|e| fatal("XTest extension unavailable", e))?;

        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| fatal("X display has no screen", screen_num))?;
        let (root, width, height) = (
            screen.root,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        info!("Connected to X display ({}x{})", width, height);
        Ok(Self {
            conn,
            root,
            width,
            height,
        })
    }

    fn screen_size(&mut self) -> Result<(u32, u32)> {
        Ok((self.width, self.height))
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.fake_input(MOTION_NOTIFY_EVENT, 0, x, y)
    }

    fn send_button(&mut self, button: u8, pressed: bool) -> Result<()> {
        let event_type = if pressed {
            BUTTON_PRESS_EVENT
        } else {
            BUTTON_RELEASE_EVENT
        };
        self.fake_input(event_type, button, 0, 0)
    }
}
