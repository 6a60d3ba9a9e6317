//! Trait abstraction for the output channels to enable testing

use crate::error::Result;

/// Synthetic kernel input device (key and relative-motion channels).
pub trait VirtualInput: Sized {
    /// Create the device. Capabilities cannot change after this call.
    fn create(name: &str) -> Result<Self>;

    /// Send one key transition.
    fn send_key(&mut self, code: u16, pressed: bool) -> Result<()>;

    /// Send relative pointer motion.
    fn send_relative(&mut self, dx: i32, dy: i32) -> Result<()>;
}

/// Windowing-server channel for absolute positioning and fallback buttons.
pub trait PointerServer: Sized {
    /// Connect to the server.
    fn connect() -> Result<Self>;

    /// Screen size in pixels.
    fn screen_size(&mut self) -> Result<(u32, u32)>;

    /// Move the pointer to absolute screen coordinates.
    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()>;

    /// Press or release a pointer button by server button number.
    fn send_button(&mut self, button: u8, pressed: bool) -> Result<()>;
}
