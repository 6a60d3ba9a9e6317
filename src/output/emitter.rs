//! # Virtual Output Emitter
//!
//! Realizes [`OutputAction`]s on the two output channels:
//!
//! | Action | Channel |
//! |--------|---------|
//! | `Key` | uinput key |
//! | `MouseButton` 1, 2, 3, 8, 9 | uinput key (BTN_LEFT ... BTN_EXTRA) |
//! | `MouseButton` other | XTest button |
//! | `MouseMove` | uinput relative |
//! | `MouseMoveAbsolute` | XTest motion |
//!
//! Both channels are opened on first use. A failure on either is
//! [`BridgeError::OutputDeviceFatal`](crate::error::BridgeError::OutputDeviceFatal)
//! and is never retried.

use tracing::{debug, trace};

use super::action::OutputAction;
use super::mouse_buttons::kernel_code;
use super::sink::{PointerServer, VirtualInput};
use super::uinput::UinputDevice;
use super::x11::XTestPointer;
use crate::error::Result;

/// Maps an absolute percentage (-100 to 100) onto a screen extent.
///
/// 0 is the centre, 100 the far edge, -100 the near edge.
#[must_use]
pub fn absolute_position(percent: i32, extent: u32) -> i32 {
    let half = i64::from(extent / 2);
    let percent = i64::from(percent.clamp(-100, 100));
    (half + percent * half / 100) as i32
}

/// Owner of the process-wide synthetic device and pointer connection.
#[derive(Debug)]
pub struct Emitter<V: VirtualInput = UinputDevice, P: PointerServer = XTestPointer> {
    name: String,
    device: Option<V>,
    pointer: Option<P>,
    last_abs_x: i32,
    last_abs_y: i32,
}

impl<V: VirtualInput, P: PointerServer> Emitter<V, P> {
    /// Creates an emitter; nothing is opened until [`init`](Self::init) or
    /// the first [`emit`](Self::emit).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: None,
            pointer: None,
            last_abs_x: 0,
            last_abs_y: 0,
        }
    }

    /// Creates the synthetic device if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `OutputDeviceFatal` if the device cannot be created.
    pub fn init(&mut self) -> Result<()> {
        self.device().map(|_| ())
    }

    fn device(&mut self) -> Result<&mut V> {
        let device = match self.device.take() {
            Some(device) => device,
            None => V::create(&self.name)?,
        };
        Ok(self.device.insert(device))
    }

    fn pointer_server(&mut self) -> Result<&mut P> {
        let pointer = match self.pointer.take() {
            Some(pointer) => pointer,
            None => P::connect()?,
        };
        Ok(self.pointer.insert(pointer))
    }

    /// Synthesizes one action.
    ///
    /// Key code 0, button index 0 and zero motion are ignored.
    ///
    /// # Errors
    ///
    /// Returns `OutputDeviceFatal` on any creation or write failure.
    pub fn emit(&mut self, action: &OutputAction) -> Result<()> {
        trace!("emit {:?}", action);
        match *action {
            OutputAction::Key { code: 0, .. } | OutputAction::MouseButton { index: 0, .. } => Ok(()),
            OutputAction::Key { code, pressed } => self.device()?.send_key(code, pressed),
            OutputAction::MouseButton { index, pressed } => match kernel_code(index) {
                Some(key) => self.device()?.send_key(key.code(), pressed),
                None => self.pointer_server()?.send_button(index, pressed),
            },
            OutputAction::MouseMove { dx: 0, dy: 0 } => Ok(()),
            OutputAction::MouseMove { dx, dy } => self.device()?.send_relative(dx, dy),
            OutputAction::MouseMoveAbsolute { x, y } => self.move_absolute(x, y),
        }
    }

    fn move_absolute(&mut self, x: i32, y: i32) -> Result<()> {
        if x != 0 {
            self.last_abs_x = x;
        }
        if y != 0 {
            self.last_abs_y = y;
        }
        let (percent_x, percent_y) = (self.last_abs_x, self.last_abs_y);

        let pointer = self.pointer_server()?;
        let (width, height) = pointer.screen_size()?;
        let px = absolute_position(percent_x, width);
        let py = absolute_position(percent_y, height);
        debug!("Absolute pointer {}%,{}% -> ({}, {})", percent_x, percent_y, px, py);
        pointer.warp_pointer(px, py)
    }

    /// Synthetic device, if it has been created.
    pub fn virtual_input(&self) -> Option<&V> {
        self.device.as_ref()
    }

    /// Pointer connection, if it has been opened.
    pub fn pointer(&self) -> Option<&P> {
        self.pointer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::sink::mocks::{
        created_count, fail_next_create, MockPointer, MockVirtualInput, Recorded,
    };
    use evdev::Key;

    type TestEmitter = Emitter<MockVirtualInput, MockPointer>;

    fn device_events(emitter: &TestEmitter) -> Vec<Recorded> {
        emitter
            .virtual_input()
            .map(|device| device.events.clone())
            .unwrap_or_default()
    }

    fn pointer_events(emitter: &TestEmitter) -> Vec<Recorded> {
        emitter
            .pointer()
            .map(|pointer| pointer.events.clone())
            .unwrap_or_default()
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_nothing_opened_before_first_use() {
        let emitter = TestEmitter::new("Joypad Bridge");
        assert!(emitter.virtual_input().is_none());
        assert!(emitter.pointer().is_none());
    }

    #[test]
    fn test_init_is_idempotent() {
        let before = created_count();
        let mut emitter = TestEmitter::new("Joypad Bridge");
        emitter.init().unwrap();
        emitter.init().unwrap();
        emitter.emit(&OutputAction::Key { code: 30, pressed: true }).unwrap();
        assert_eq!(created_count() - before, 1);
        assert_eq!(emitter.virtual_input().unwrap().name, "Joypad Bridge");
    }

    #[test]
    fn test_creation_failure_is_fatal() {
        fail_next_create();
        let mut emitter = TestEmitter::new("Joypad Bridge");
        let err = emitter
            .emit(&OutputAction::Key { code: 30, pressed: true })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    // ==================== Key Tests ====================

    #[test]
    fn test_key_goes_to_device() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::Key { code: 57, pressed: true }).unwrap();
        emitter.emit(&OutputAction::Key { code: 57, pressed: false }).unwrap();
        assert_eq!(
            device_events(&emitter),
            vec![Recorded::Key(57, true), Recorded::Key(57, false)]
        );
    }

    #[test]
    fn test_code_zero_is_ignored() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::Key { code: 0, pressed: true }).unwrap();
        emitter.emit(&OutputAction::MouseButton { index: 0, pressed: true }).unwrap();
        assert!(emitter.virtual_input().is_none());
        assert!(emitter.pointer().is_none());
    }

    // ==================== Mouse Button Tests ====================

    #[test]
    fn test_kernel_mouse_buttons_use_device() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::MouseButton { index: 1, pressed: true }).unwrap();
        emitter.emit(&OutputAction::MouseButton { index: 3, pressed: false }).unwrap();
        assert_eq!(
            device_events(&emitter),
            vec![
                Recorded::Key(Key::BTN_LEFT.code(), true),
                Recorded::Key(Key::BTN_RIGHT.code(), false),
            ]
        );
        assert!(emitter.pointer().is_none());
    }

    #[test]
    fn test_wheel_buttons_fall_back_to_pointer_server() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::MouseButton { index: 4, pressed: true }).unwrap();
        emitter.emit(&OutputAction::MouseButton { index: 4, pressed: false }).unwrap();
        assert_eq!(
            pointer_events(&emitter),
            vec![Recorded::Button(4, true), Recorded::Button(4, false)]
        );
    }

    // ==================== Motion Tests ====================

    #[test]
    fn test_relative_motion() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::MouseMove { dx: 16, dy: -3 }).unwrap();
        assert_eq!(device_events(&emitter), vec![Recorded::Relative(16, -3)]);
    }

    #[test]
    fn test_zero_motion_emits_nothing() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::MouseMove { dx: 0, dy: 0 }).unwrap();
        assert!(emitter.virtual_input().is_none());
    }

    #[test]
    fn test_absolute_motion_keeps_unset_axis() {
        let mut emitter = TestEmitter::new("test");
        emitter.emit(&OutputAction::MouseMoveAbsolute { x: 50, y: -20 }).unwrap();
        emitter.emit(&OutputAction::MouseMoveAbsolute { x: -100, y: 0 }).unwrap();
        assert_eq!(
            pointer_events(&emitter),
            vec![Recorded::Warp(1440, 432), Recorded::Warp(0, 432)]
        );
    }

    #[test]
    fn test_absolute_position_mapping() {
        assert_eq!(absolute_position(0, 1920), 960);
        assert_eq!(absolute_position(100, 1920), 1920);
        assert_eq!(absolute_position(-100, 1920), 0);
        assert_eq!(absolute_position(50, 1080), 810);
        assert_eq!(absolute_position(500, 1080), 1080);
    }
}
