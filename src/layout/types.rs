//! Binding types held by a [`Mapping`].

use std::collections::BTreeMap;

use crate::output::OutputTarget;
use crate::translator::calibration::Calibration;

/// Default maximum mouse speed.
pub const DEFAULT_MAX_SPEED: u32 = 10;
/// Accepted maximum mouse speed range.
pub const MAX_SPEED_RANGE: std::ops::RangeInclusive<u32> = 1..=5000;

/// Pointer axis driven by a joystick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAxis {
    Horizontal,
    Vertical,
}

/// Pointer axis plus whether the joystick direction is inverted onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseDirection {
    pub axis: PointerAxis,
    pub inverted: bool,
}

impl MouseDirection {
    /// Applies the inversion to a signed quantity.
    #[inline]
    #[must_use]
    pub fn orient(&self, value: f64) -> f64 {
        if self.inverted {
            -value
        } else {
            value
        }
    }
}

/// What an axis drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisMode {
    /// Pulsed digital outputs, one per direction.
    Keys {
        positive: Option<OutputTarget>,
        negative: Option<OutputTarget>,
    },
    /// Relative pointer motion.
    Mouse(MouseDirection),
    /// Absolute pointer position.
    Absolute(MouseDirection),
}

impl Default for AxisMode {
    fn default() -> Self {
        AxisMode::Keys {
            positive: None,
            negative: None,
        }
    }
}

/// Configuration of one logical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBinding {
    pub calibration: Calibration,
    pub mode: AxisMode,
    pub max_speed: u32,
}

impl Default for AxisBinding {
    fn default() -> Self {
        Self {
            calibration: Calibration::default(),
            mode: AxisMode::default(),
            max_speed: DEFAULT_MAX_SPEED,
        }
    }
}

impl AxisBinding {
    /// Returns `true` if nothing differs from the default binding.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Output of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Key(u16),
    MouseButton(u8),
    /// Jump the pointer to a position in percent of half the screen.
    Absolute { x: i32, y: i32 },
}

impl ButtonAction {
    /// Holdable output, if this action has one.
    #[must_use]
    pub fn target(&self) -> Option<OutputTarget> {
        match *self {
            ButtonAction::Key(code) => Some(OutputTarget::Key(code)),
            ButtonAction::MouseButton(index) => Some(OutputTarget::MouseButton(index)),
            ButtonAction::Absolute { .. } => None,
        }
    }
}

/// Configuration of one logical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonBinding {
    pub action: Option<ButtonAction>,
    /// Each press toggles the output.
    pub sticky: bool,
    /// The output pulses while the button is held.
    pub rapidfire: bool,
}

impl ButtonBinding {
    /// Returns `true` if nothing differs from the default binding.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted bindings of one joystick.
///
/// Indices are 0-based here and 1-based in the layout file. Only
/// non-default bindings are stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    pub ordinal: u32,
    pub identity: Option<String>,
    pub axes: BTreeMap<usize, AxisBinding>,
    pub buttons: BTreeMap<usize, ButtonBinding>,
}

impl Mapping {
    /// Empty mapping for a joystick.
    #[must_use]
    pub fn new(ordinal: u32, identity: Option<String>) -> Self {
        Self {
            ordinal,
            identity,
            ..Self::default()
        }
    }

    /// Returns `true` if the mapping holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.buttons.is_empty()
    }

    /// Binding of an axis, default if unset.
    #[must_use]
    pub fn axis(&self, index: usize) -> AxisBinding {
        self.axes.get(&index).copied().unwrap_or_default()
    }

    /// Binding of a button, default if unset.
    #[must_use]
    pub fn button(&self, index: usize) -> ButtonBinding {
        self.buttons.get(&index).copied().unwrap_or_default()
    }

    /// Stores an axis binding; a default binding removes the entry.
    pub fn set_axis(&mut self, index: usize, binding: AxisBinding) {
        if binding.is_default() {
            self.axes.remove(&index);
        } else {
            self.axes.insert(index, binding);
        }
    }

    /// Stores a button binding; a default binding removes the entry.
    pub fn set_button(&mut self, index: usize, binding: ButtonBinding) {
        if binding.is_default() {
            self.buttons.remove(&index);
        } else {
            self.buttons.insert(index, binding);
        }
    }

    /// Returns `true` if this mapping belongs to the given joystick.
    ///
    /// A mapping with an identity only matches that identity; one without
    /// matches by ordinal.
    #[must_use]
    pub fn matches_identity(&self, identity: &str) -> bool {
        self.identity.as_deref() == Some(identity)
    }
}
