//! # Synthetic Input Device
//!
//! The uinput device through which keys, kernel-mapped mouse buttons and
//! relative pointer motion reach the rest of the system.
//!
//! Capabilities must be declared before the device is created:
//! - `EV_REL`: `REL_X`, `REL_Y`
//! - `EV_KEY`: every key code below `KEY_CNT` except the joystick, gamepad
//!   and digitizer button blocks, so desktops classify the device as a
//!   keyboard plus mouse rather than as another joystick

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key, RelativeAxisType};
use std::ops::Range;
use tracing::info;

use super::mouse_buttons::MOUSE_BUTTONS;
use super::sink::VirtualInput;
use crate::controller::code_table::KEY_CODE_SPACE;
use crate::error::{BridgeError, Result};

/// Key codes left out of the advertised key space.
const EXCLUDED_KEY_CODES: [Range<u16>; 2] = [
    0x120..0x140, // BTN_JOYSTICK and BTN_GAMEPAD blocks
    0x140..0x150, // BTN_DIGI block
];

const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x5678;

/// Returns `true` if a `key` binding with this code can reach the system.
///
/// # Examples
///
/// ```
/// use joypad_bridge::output::uinput::is_advertised_key;
///
/// assert!(is_advertised_key(57));
/// assert!(!is_advertised_key(0x130));
/// ```
#[must_use]
pub fn is_advertised_key(code: u16) -> bool {
    code != 0
        && usize::from(code) < KEY_CODE_SPACE
        && !EXCLUDED_KEY_CODES.iter().any(|range| range.contains(&code))
}

/// Key codes the synthetic device advertises.
pub fn advertised_keys() -> AttributeSet<Key> {
    let mut keys = AttributeSet::<Key>::new();
    for code in (1..KEY_CODE_SPACE as u16).filter(|&code| is_advertised_key(code)) {
        keys.insert(Key::new(code));
    }
    for (_, key) in MOUSE_BUTTONS {
        keys.insert(key);
    }
    keys
}

/// uinput-backed synthetic keyboard and mouse.
pub struct UinputDevice {
    device: VirtualDevice,
}

impl std::fmt::Debug for UinputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputDevice").finish_non_exhaustive()
    }
}

fn fatal(step: &str, e: std::io::Error) -> BridgeError {
    BridgeError::OutputDeviceFatal(format!(
        "{}: {} (is /dev/uinput accessible to this user?)",
        step, e
    ))
}

impl VirtualInput for UinputDevice {
    fn create(name: &str) -> Result<Self> {
        let mut relative = AttributeSet::<RelativeAxisType>::new();
        relative.insert(RelativeAxisType::REL_X);
        relative.insert(RelativeAxisType::REL_Y);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e| fatal("Failed to open /dev/uinput", e))?
            .name(name)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, 1))
            .with_keys(&advertised_keys())
            .map_err(|e| fatal("Failed to set key capabilities", e))?
            .with_relative_axes(&relative)
            .map_err(|e| fatal("Failed to set relative axis capabilities", e))?
            .build()
            .map_err(|e| fatal("Failed to create uinput device", e))?;

        info!("Created synthetic input device \"{}\"", name);
        Ok(Self { device })
    }

    fn send_key(&mut self, code: u16, pressed: bool) -> Result<()> {
        let event = InputEvent::new(EventType::KEY, code, i32::from(pressed));
        self.device
            .emit(&[event])
            .map_err(|e| fatal("Failed to write key event", e))
    }

    fn send_relative(&mut self, dx: i32, dy: i32) -> Result<()> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, dx));
        }
        if dy != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        self.device
            .emit(&events)
            .map_err(|e| fatal("Failed to write motion event", e))
    }
}
