//! # Code Table Module
//!
//! Maps raw evdev event codes onto stable logical indices.
//!
//! Each opened device gets its own table, built once from the capabilities the
//! device reports. Lookups are plain array indexing by raw code; the table is
//! never resized after construction.
//!
//! ## Candidate Order
//!
//! Buttons are assigned indices in this order, skipping codes the device does
//! not report:
//!
//! | Range | Codes |
//! |-------|-------|
//! | Gamepad | BTN_SOUTH ..= BTN_THUMBR |
//! | D-Pad | 0x220 ..= 0x227 |
//! | Extra | KEY_HOME, KEY_HOMEPAGE |
//! | Joystick | BTN_JOYSTICK .. BTN_JOYSTICK + 32 |
//!
//! Axes follow ABS_X, ABS_Y, ABS_Z, ABS_RX, ABS_RY, ABS_RZ, ABS_HAT0X,
//! ABS_HAT0Y, ABS_GAS, ABS_BRAKE.

use std::ops::RangeInclusive;

use super::coalescer::RawEvent;

/// Number of key codes the kernel defines (`KEY_CNT`).
pub const KEY_CODE_SPACE: usize = 0x300;

/// Number of absolute axis codes the kernel defines (`ABS_CNT`).
pub const ABS_CODE_SPACE: usize = 0x40;

/// Full joystick value range after normalization.
pub const JOY_MAX: i32 = 32767;
/// Full joystick value range after normalization.
pub const JOY_MIN: i32 = -32767;

const GAMEPAD_BUTTONS: RangeInclusive<u16> = 0x130..=0x13e;
const DPAD_BUTTONS: RangeInclusive<u16> = 0x220..=0x227;
const KEY_HOME: u16 = 102;
const KEY_HOMEPAGE: u16 = 172;
const BTN_JOYSTICK: u16 = 0x120;
const JOYSTICK_BUTTON_COUNT: u16 = 32;

/// Absolute axes in logical index order.
pub const AXIS_CANDIDATES: [u16; 10] = [
    0x00, // ABS_X
    0x01, // ABS_Y
    0x02, // ABS_Z
    0x03, // ABS_RX
    0x04, // ABS_RY
    0x05, // ABS_RZ
    0x10, // ABS_HAT0X
    0x11, // ABS_HAT0Y
    0x09, // ABS_GAS
    0x0a, // ABS_BRAKE
];

/// Returns button candidates in logical index order, without duplicates.
pub fn button_candidates() -> Vec<u16> {
    let mut codes: Vec<u16> = GAMEPAD_BUTTONS.chain(DPAD_BUTTONS).collect();
    codes.push(KEY_HOME);
    codes.push(KEY_HOMEPAGE);
    for code in BTN_JOYSTICK..BTN_JOYSTICK + JOYSTICK_BUTTON_COUNT {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

/// Reported value range of one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// Creates a range from the kernel's reported minimum and maximum.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Scales a raw value into the joystick range (-32767 to 32767).
    ///
    /// Values outside the reported range are clamped first. A degenerate
    /// range (max <= min) always yields center.
    ///
    /// # Examples
    ///
    /// ```
    /// use joypad_bridge::controller::code_table::AxisRange;
    ///
    /// let hat = AxisRange::new(-1, 1);
    /// assert_eq!(hat.normalize(-1), -32767);
    /// assert_eq!(hat.normalize(0), 0);
    /// assert_eq!(hat.normalize(1), 32767);
    /// ```
    #[must_use]
    pub fn normalize(&self, value: i32) -> i32 {
        if self.max <= self.min {
            return 0;
        }
        let span = i64::from(self.max) - i64::from(self.min);
        let offset = i64::from(value.clamp(self.min, self.max)) - i64::from(self.min);
        let full = i64::from(JOY_MAX) - i64::from(JOY_MIN);
        (offset * full / span + i64::from(JOY_MIN)) as i32
    }
}

/// Per-device mapping from raw codes to logical indices.
#[derive(Debug, Clone)]
pub struct CodeTable {
    buttons: Box<[Option<u16>]>,
    axes: [Option<u8>; ABS_CODE_SPACE],
    ranges: Vec<AxisRange>,
    button_count: usize,
}

impl CodeTable {
    /// Builds a table from a device's capabilities.
    ///
    /// # Arguments
    ///
    /// * `has_button` - Whether the device reports a given key code
    /// * `axis_range` - Reported range for a given absolute axis code, or `None`
    ///   if the device lacks it
    pub fn build<B, A>(has_button: B, axis_range: A) -> Self
    where
        B: Fn(u16) -> bool,
        A: Fn(u16) -> Option<AxisRange>,
    {
        let mut buttons = vec![None; KEY_CODE_SPACE].into_boxed_slice();
        let mut button_count = 0usize;
        for code in button_candidates() {
            if has_button(code) {
                buttons[usize::from(code)] = Some(button_count as u16);
                button_count += 1;
            }
        }

        let mut axes = [None; ABS_CODE_SPACE];
        let mut ranges = Vec::new();
        for code in AXIS_CANDIDATES {
            if let Some(range) = axis_range(code) {
                axes[usize::from(code)] = Some(ranges.len() as u8);
                ranges.push(range);
            }
        }

        Self {
            buttons,
            axes,
            ranges,
            button_count,
        }
    }

    /// Logical button index for a raw key code.
    #[must_use]
    pub fn button_index(&self, code: u16) -> Option<usize> {
        self.buttons
            .get(usize::from(code))
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Logical axis index for a raw absolute axis code.
    #[must_use]
    pub fn axis_index(&self, code: u16) -> Option<usize> {
        self.axes
            .get(usize::from(code))
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Normalizes a raw value of the given logical axis.
    #[must_use]
    pub fn normalize(&self, index: usize, value: i32) -> i32 {
        self.ranges
            .get(index)
            .map_or(value, |range| range.normalize(value))
    }

    /// Current state of every mapped control, in logical index order.
    ///
    /// evdev reports nothing until a control moves, so this snapshot plays
    /// the role of the joydev `JS_EVENT_INIT` burst. Axes whose value is
    /// unknown are left out; buttons not reported as pressed read as released.
    ///
    /// # Arguments
    ///
    /// * `axis_value` - Raw current value of an absolute axis code
    /// * `pressed` - Whether a key code is currently held
    pub fn initial_state<V, P>(&self, axis_value: V, pressed: P) -> Vec<RawEvent>
    where
        V: Fn(u16) -> Option<i32>,
        P: Fn(u16) -> bool,
    {
        let mut events = Vec::with_capacity(self.axis_count() + self.button_count);
        for code in AXIS_CANDIDATES {
            if let (Some(index), Some(value)) = (self.axis_index(code), axis_value(code)) {
                events.push(RawEvent::axis(index, self.normalize(index, value)));
            }
        }
        for code in button_candidates() {
            if let Some(index) = self.button_index(code) {
                events.push(RawEvent::button(index, i32::from(pressed(code))));
            }
        }
        events
    }

    /// Number of logical axes.
    #[must_use]
    pub fn axis_count(&self) -> usize {
        self.ranges.len()
    }

    /// Number of logical buttons.
    #[must_use]
    pub fn button_count(&self) -> usize {
        self.button_count
    }
}
