//! # Duty-Cycle Translator
//!
//! Turns coalesced joystick state into output actions on a fixed-rate tick.
//!
//! One [`Translator`] exists per open device. It owns one [`AxisState`] per
//! reported axis and one [`ButtonState`] per reported button, built from the
//! device's capability counts and its [`Mapping`]. Input is applied as it
//! arrives; output is only produced by [`Translator::tick`].
//!
//! ## Usage
//!
//! ```
//! use joypad_bridge::controller::coalescer::{coalesce, RawEvent};
//! use joypad_bridge::layout::types::{ButtonAction, ButtonBinding, Mapping};
//! use joypad_bridge::output::OutputAction;
//! use joypad_bridge::translator::{timing::Timing, Translator};
//!
//! let mut mapping = Mapping::new(1, None);
//! mapping.set_button(0, ButtonBinding {
//!     action: Some(ButtonAction::Key(57)),
//!     ..ButtonBinding::default()
//! });
//!
//! let mut translator = Translator::new(&mapping, 2, 4, Timing::default());
//! translator.apply(&coalesce([RawEvent::button(0, 1)]));
//!
//! assert_eq!(translator.tick(), vec![OutputAction::Key { code: 57, pressed: true }]);
//! assert!(translator.tick().is_empty());
//! ```

pub mod axis;
pub mod button;
pub mod calibration;
pub mod timing;

pub use axis::AxisState;
pub use button::ButtonState;
pub use timing::Timing;

use tracing::trace;

use self::axis::Motion;
use crate::controller::Coalesced;
use crate::layout::types::Mapping;
use crate::output::OutputAction;

/// Logical axes and buttons of one device.
#[derive(Debug, Clone)]
pub struct Translator {
    axes: Vec<AxisState>,
    buttons: Vec<ButtonState>,
    timing: Timing,
}

impl Translator {
    /// Builds the per-control state for a device.
    ///
    /// # Arguments
    ///
    /// * `mapping` - Bindings for this device (missing entries are unbound)
    /// * `axis_count` - Number of axes the device reports
    /// * `button_count` - Number of buttons the device reports
    /// * `timing` - Tick, macro-cycle and mouse scale settings
    #[must_use]
    pub fn new(mapping: &Mapping, axis_count: usize, button_count: usize, timing: Timing) -> Self {
        Self {
            axes: (0..axis_count)
                .map(|index| AxisState::new(mapping.axis(index)))
                .collect(),
            buttons: (0..button_count)
                .map(|index| ButtonState::new(mapping.button(index)))
                .collect(),
            timing,
        }
    }

    /// Number of logical axes.
    #[must_use]
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Number of logical buttons.
    #[must_use]
    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    /// Stores the final values of one coalesced batch.
    ///
    /// Indices beyond the device's counts are ignored.
    pub fn apply(&mut self, batch: &Coalesced) {
        for (&index, &value) in &batch.axes {
            match self.axes.get_mut(index) {
                Some(axis) => axis.set_raw(value),
                None => trace!("Ignoring axis {} outside range", index),
            }
        }
        for (&index, &value) in &batch.buttons {
            match self.buttons.get_mut(index) {
                Some(button) => button.set_pressed(value != 0),
                None => trace!("Ignoring button {} outside range", index),
            }
        }
    }

    /// Advances every control by one tick.
    ///
    /// Relative motion from all mouse axes is merged into at most one
    /// `MouseMove`, appended last.
    pub fn tick(&mut self) -> Vec<OutputAction> {
        let mut out = Vec::new();
        let mut motion = Motion::default();
        for axis in &mut self.axes {
            axis.tick(&self.timing, &mut out, &mut motion);
        }
        for button in &mut self.buttons {
            button.tick(&self.timing, &mut out);
        }
        out.extend(motion.into_action());
        out
    }

    /// Releases every output currently held and returns the releases.
    pub fn release_all(&mut self) -> Vec<OutputAction> {
        let mut out = Vec::new();
        for axis in &mut self.axes {
            axis.release(&mut out);
        }
        for button in &mut self.buttons {
            button.release(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::code_table::{AxisRange, CodeTable};
    use crate::controller::coalescer::{coalesce, RawEvent};
    use crate::layout::types::{
        AxisBinding, AxisMode, ButtonAction, ButtonBinding, MouseDirection, PointerAxis,
    };
    use crate::output::OutputTarget;

    fn mouse(axis: PointerAxis) -> AxisBinding {
        AxisBinding {
            mode: AxisMode::Mouse(MouseDirection {
                axis,
                inverted: false,
            }),
            ..AxisBinding::default()
        }
    }

    fn sample_mapping() -> Mapping {
        let mut mapping = Mapping::new(1, None);
        mapping.set_axis(0, mouse(PointerAxis::Horizontal));
        mapping.set_axis(1, mouse(PointerAxis::Vertical));
        mapping.set_axis(
            2,
            AxisBinding {
                mode: AxisMode::Keys {
                    positive: Some(OutputTarget::Key(32)),
                    negative: Some(OutputTarget::Key(30)),
                },
                ..AxisBinding::default()
            },
        );
        mapping.set_button(
            0,
            ButtonBinding {
                action: Some(ButtonAction::MouseButton(1)),
                ..ButtonBinding::default()
            },
        );
        mapping
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_counts_follow_device() {
        let translator = Translator::new(&sample_mapping(), 6, 13, Timing::default());
        assert_eq!(translator.axis_count(), 6);
        assert_eq!(translator.button_count(), 13);
    }

    #[test]
    fn test_idle_device_emits_nothing() {
        let mut translator = Translator::new(&sample_mapping(), 6, 13, Timing::default());
        for _ in 0..20 {
            assert!(translator.tick().is_empty());
        }
    }

    // ==================== Resting State Tests ====================

    fn shipped_mapping() -> Mapping {
        let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config/layout.lyt"))
            .unwrap();
        crate::layout::parse_layout(&text).unwrap().remove(0)
    }

    /// Xbox-style pad: centred sticks, triggers resting at their minimum.
    fn resting_pad() -> (CodeTable, Vec<RawEvent>) {
        let table = CodeTable::build(
            |code| (0x130..=0x13e).contains(&code),
            |code| match code {
                0x00 | 0x01 | 0x03 | 0x04 => Some(AxisRange::new(-32768, 32767)),
                0x02 | 0x05 => Some(AxisRange::new(0, 255)),
                0x10 | 0x11 => Some(AxisRange::new(-1, 1)),
                _ => None,
            },
        );
        let seed = table.initial_state(|_| Some(0), |_| false);
        (table, seed)
    }

    #[test]
    fn test_resting_triggers_stay_silent_after_seeding() {
        let (table, seed) = resting_pad();
        let mut translator = Translator::new(
            &shipped_mapping(),
            table.axis_count(),
            table.button_count(),
            Timing::default(),
        );
        translator.apply(&coalesce(seed));

        let emitted: Vec<_> = (0..20).flat_map(|_| translator.tick()).collect();
        assert!(emitted.is_empty(), "resting pad emitted {:?}", emitted);
    }

    #[test]
    fn test_pulled_trigger_clicks_after_seeding() {
        let (table, mut seed) = resting_pad();
        seed.push(RawEvent::axis(table.axis_index(0x05).unwrap(), table.normalize(5, 255)));
        let mut translator = Translator::new(
            &shipped_mapping(),
            table.axis_count(),
            table.button_count(),
            Timing::default(),
        );
        translator.apply(&coalesce(seed));

        assert_eq!(
            translator.tick(),
            vec![OutputAction::MouseButton { index: 1, pressed: true }]
        );
    }

    // ==================== Batching Tests ====================

    #[test]
    fn test_mouse_axes_batch_into_one_move() {
        let mut translator = Translator::new(&sample_mapping(), 6, 13, Timing::default());
        translator.apply(&coalesce([RawEvent::axis(0, 32767), RawEvent::axis(1, -17500)]));
        assert_eq!(
            translator.tick(),
            vec![OutputAction::MouseMove { dx: 32, dy: -16 }]
        );
    }

    #[test]
    fn test_out_of_range_indices_are_ignored() {
        let mut translator = Translator::new(&sample_mapping(), 2, 1, Timing::default());
        translator.apply(&coalesce([RawEvent::axis(2, 32767), RawEvent::button(5, 1)]));
        assert!(translator.tick().is_empty());
    }

    #[test]
    fn test_unbound_controls_are_silent() {
        let mut translator = Translator::new(&sample_mapping(), 6, 13, Timing::default());
        translator.apply(&coalesce([RawEvent::axis(4, 32767), RawEvent::button(7, 1)]));
        assert!(translator.tick().is_empty());
    }

    #[test]
    fn test_keys_and_buttons_before_motion() {
        let mut translator = Translator::new(&sample_mapping(), 6, 13, Timing::default());
        translator.apply(&coalesce([
            RawEvent::axis(0, 32767),
            RawEvent::axis(2, -32767),
            RawEvent::button(0, 1),
        ]));
        assert_eq!(
            translator.tick(),
            vec![
                OutputAction::Key { code: 30, pressed: true },
                OutputAction::MouseButton { index: 1, pressed: true },
                OutputAction::MouseMove { dx: 32, dy: 0 },
            ]
        );
    }

    // ==================== Release Tests ====================

    #[test]
    fn test_release_all_releases_held_outputs() {
        let mut translator = Translator::new(&sample_mapping(), 6, 13, Timing::default());
        translator.apply(&coalesce([RawEvent::axis(2, 32767), RawEvent::button(0, 1)]));
        translator.tick();

        assert_eq!(
            translator.release_all(),
            vec![
                OutputAction::Key { code: 32, pressed: false },
                OutputAction::MouseButton { index: 1, pressed: false },
            ]
        );
        assert!(translator.release_all().is_empty());
    }
}
