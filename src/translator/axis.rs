//! Per-axis state machine.
//!
//! An axis runs in one of three modes:
//! - **Keys**: the target of the deflected direction is pulsed with the
//!   duty cycle of the current level
//! - **Mouse**: a relative displacement is produced every tick, with the
//!   fractional part carried to the next tick
//! - **Absolute**: the signed magnitude is reported as a screen percentage
//!   whenever it changes

use super::timing::{DutyCycle, Timing};
use crate::layout::types::{AxisBinding, AxisMode, MouseDirection, PointerAxis};
use crate::output::{OutputAction, OutputTarget};

/// Side of the centre an axis is deflected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
}

/// Relative motion accumulated over all mouse axes of one device in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Motion {
    pub dx: i32,
    pub dy: i32,
}

impl Motion {
    fn add(&mut self, axis: PointerAxis, delta: i32) {
        match axis {
            PointerAxis::Horizontal => self.dx = self.dx.saturating_add(delta),
            PointerAxis::Vertical => self.dy = self.dy.saturating_add(delta),
        }
    }

    /// The batched action, or `None` when there is nothing to move.
    #[must_use]
    pub fn into_action(self) -> Option<OutputAction> {
        if self.dx == 0 && self.dy == 0 {
            None
        } else {
            Some(OutputAction::MouseMove {
                dx: self.dx,
                dy: self.dy,
            })
        }
    }
}

/// Runtime state of one logical axis.
#[derive(Debug, Clone)]
pub struct AxisState {
    binding: AxisBinding,
    raw: i32,
    duty: DutyCycle,
    engaged: Option<Direction>,
    held: Option<OutputTarget>,
    remainder: f64,
    last_percent: i32,
}

impl AxisState {
    /// Creates an idle axis with the given binding.
    #[must_use]
    pub fn new(binding: AxisBinding) -> Self {
        Self {
            binding,
            raw: 0,
            duty: DutyCycle::default(),
            engaged: None,
            held: None,
            remainder: 0.0,
            last_percent: 0,
        }
    }

    /// Records the latest raw value (-32767 to 32767).
    #[inline]
    pub fn set_raw(&mut self, value: i32) {
        self.raw = value;
    }

    /// Latest raw value.
    #[must_use]
    pub fn raw(&self) -> i32 {
        self.raw
    }

    /// Output currently held down by this axis.
    #[must_use]
    pub fn held(&self) -> Option<OutputTarget> {
        self.held
    }

    fn direction(&self) -> Option<Direction> {
        let calibration = &self.binding.calibration;
        if calibration.magnitude(self.raw) <= 0.0 {
            return None;
        }
        if calibration.signed(self.raw) > 0 {
            Some(Direction::Positive)
        } else {
            Some(Direction::Negative)
        }
    }

    /// Signed magnitude in -1.0..=1.0.
    fn signed_magnitude(&self) -> f64 {
        let magnitude = f64::from(self.binding.calibration.magnitude(self.raw));
        match self.direction() {
            Some(Direction::Positive) => magnitude,
            Some(Direction::Negative) => -magnitude,
            None => 0.0,
        }
    }

    /// Advances the axis by one tick.
    ///
    /// Key transitions and absolute moves are appended to `out`; relative
    /// displacement is added to `motion` so the caller can batch it.
    pub fn tick(&mut self, timing: &Timing, out: &mut Vec<OutputAction>, motion: &mut Motion) {
        match self.binding.mode {
            AxisMode::Keys { positive, negative } => {
                self.tick_keys(timing, positive, negative, out);
            }
            AxisMode::Mouse(direction) => self.tick_mouse(timing, direction, motion),
            AxisMode::Absolute(direction) => self.tick_absolute(direction, out),
        }
    }

    fn tick_keys(
        &mut self,
        timing: &Timing,
        positive: Option<OutputTarget>,
        negative: Option<OutputTarget>,
        out: &mut Vec<OutputAction>,
    ) {
        let direction = self.direction();
        if direction != self.engaged {
            self.duty.reset();
            self.engaged = direction;
        }

        let wanted = match direction {
            Some(side) => {
                let level = timing.level(self.binding.calibration.magnitude(self.raw));
                if self.duty.advance(level, timing.cycle_ticks) {
                    match side {
                        Direction::Positive => positive,
                        Direction::Negative => negative,
                    }
                } else {
                    None
                }
            }
            None => None,
        };

        self.switch_to(wanted, out);
    }

    fn switch_to(&mut self, wanted: Option<OutputTarget>, out: &mut Vec<OutputAction>) {
        if wanted == self.held {
            return;
        }
        if let Some(previous) = self.held.take() {
            out.push(previous.release());
        }
        if let Some(next) = wanted {
            out.push(next.press());
        }
        self.held = wanted;
    }

    fn tick_mouse(&mut self, timing: &Timing, direction: MouseDirection, motion: &mut Motion) {
        let signed = self.signed_magnitude();
        if signed == 0.0 {
            self.remainder = 0.0;
            return;
        }

        let speed = f64::from(self.binding.max_speed) * f64::from(timing.mouse_scale);
        let exact = direction.orient(signed * speed) + self.remainder;
        let whole = exact.round();
        self.remainder = exact - whole;
        motion.add(direction.axis, whole as i32);
    }

    fn tick_absolute(&mut self, direction: MouseDirection, out: &mut Vec<OutputAction>) {
        let percent = direction.orient(self.signed_magnitude() * 100.0).round() as i32;
        if percent == self.last_percent {
            return;
        }
        self.last_percent = percent;
        out.push(match direction.axis {
            PointerAxis::Horizontal => OutputAction::MouseMoveAbsolute { x: percent, y: 0 },
            PointerAxis::Vertical => OutputAction::MouseMoveAbsolute { x: 0, y: percent },
        });
    }

    /// Releases whatever the axis holds and returns it to idle.
    pub fn release(&mut self, out: &mut Vec<OutputAction>) {
        if let Some(previous) = self.held.take() {
            out.push(previous.release());
        }
        self.duty.reset();
        self.engaged = None;
        self.remainder = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::calibration::{Calibration, Throttle};

    const LEFT: OutputTarget = OutputTarget::Key(105);
    const RIGHT: OutputTarget = OutputTarget::Key(106);

    fn keys_axis() -> AxisState {
        AxisState::new(AxisBinding {
            mode: AxisMode::Keys {
                positive: Some(RIGHT),
                negative: Some(LEFT),
            },
            ..AxisBinding::default()
        })
    }

    fn mouse_axis(axis: PointerAxis, inverted: bool) -> AxisState {
        AxisState::new(AxisBinding {
            mode: AxisMode::Mouse(MouseDirection { axis, inverted }),
            ..AxisBinding::default()
        })
    }

    fn run(axis: &mut AxisState, ticks: usize) -> Vec<Vec<OutputAction>> {
        let timing = Timing::default();
        (0..ticks)
            .map(|_| {
                let mut out = Vec::new();
                let mut motion = Motion::default();
                axis.tick(&timing, &mut out, &mut motion);
                out.extend(motion.into_action());
                out
            })
            .collect()
    }

    fn active_ticks(axis: &mut AxisState, ticks: usize) -> usize {
        let timing = Timing::default();
        let mut active = 0;
        for _ in 0..ticks {
            let mut out = Vec::new();
            axis.tick(&timing, &mut out, &mut Motion::default());
            if axis.held().is_some() {
                active += 1;
            }
        }
        active
    }

    // ==================== Key Duty Cycle Tests ====================

    #[test]
    fn test_half_deflection_active_five_of_ten() {
        let mut axis = keys_axis();
        axis.set_raw(17500);
        assert_eq!(active_ticks(&mut axis, 10), 5);
        assert_eq!(active_ticks(&mut axis, 10), 5);
    }

    #[test]
    fn test_full_deflection_held_continuously() {
        let mut axis = keys_axis();
        axis.set_raw(32767);
        let ticks = run(&mut axis, 30);
        assert_eq!(ticks[0], vec![RIGHT.press()]);
        assert!(ticks[1..].iter().all(|tick| tick.is_empty()));
    }

    #[test]
    fn test_below_dead_zone_never_active() {
        let mut axis = keys_axis();
        axis.set_raw(4000);
        assert!(run(&mut axis, 30).iter().all(|tick| tick.is_empty()));
    }

    #[test]
    fn test_first_pulse_starts_immediately() {
        let mut axis = keys_axis();
        axis.set_raw(17500);
        run(&mut axis, 7);
        axis.set_raw(0);
        run(&mut axis, 1);
        axis.set_raw(10000); // level 2
        let ticks = run(&mut axis, 3);
        assert_eq!(ticks[0], vec![RIGHT.press()]);
        assert!(ticks[1].is_empty());
        assert_eq!(ticks[2], vec![RIGHT.release()]);
    }

    #[test]
    fn test_direction_change_releases_before_press() {
        let mut axis = keys_axis();
        axis.set_raw(32767);
        run(&mut axis, 3);
        axis.set_raw(-32767);
        let ticks = run(&mut axis, 1);
        assert_eq!(ticks[0], vec![RIGHT.release(), LEFT.press()]);
    }

    #[test]
    fn test_unbound_direction_emits_nothing() {
        let mut axis = AxisState::new(AxisBinding {
            mode: AxisMode::Keys {
                positive: Some(RIGHT),
                negative: None,
            },
            ..AxisBinding::default()
        });
        axis.set_raw(-32767);
        assert!(run(&mut axis, 10).iter().all(|tick| tick.is_empty()));
    }

    #[test]
    fn test_throttle_axis_rests_released() {
        let mut axis = AxisState::new(AxisBinding {
            calibration: Calibration {
                throttle: Throttle::Positive,
                ..Calibration::default()
            },
            mode: AxisMode::Keys {
                positive: Some(OutputTarget::MouseButton(1)),
                negative: None,
            },
            ..AxisBinding::default()
        });
        axis.set_raw(-32767);
        assert!(run(&mut axis, 10).iter().all(|tick| tick.is_empty()));
        axis.set_raw(32767);
        assert_eq!(
            run(&mut axis, 1)[0],
            vec![OutputTarget::MouseButton(1).press()]
        );
    }

    #[test]
    fn test_release_drops_held_target() {
        let mut axis = keys_axis();
        axis.set_raw(-32767);
        run(&mut axis, 2);
        let mut out = Vec::new();
        axis.release(&mut out);
        assert_eq!(out, vec![LEFT.release()]);
        assert_eq!(axis.held(), None);

        out.clear();
        axis.release(&mut out);
        assert!(out.is_empty());
    }

    // ==================== Mouse Tests ====================

    #[test]
    fn test_half_scale_is_half_displacement() {
        let mut full = mouse_axis(PointerAxis::Horizontal, false);
        full.set_raw(32767);
        let mut half = mouse_axis(PointerAxis::Horizontal, false);
        half.set_raw(17500);

        for (full_tick, half_tick) in run(&mut full, 5).into_iter().zip(run(&mut half, 5)) {
            assert_eq!(full_tick, vec![OutputAction::MouseMove { dx: 32, dy: 0 }]);
            assert_eq!(half_tick, vec![OutputAction::MouseMove { dx: 16, dy: 0 }]);
        }
    }

    #[test]
    fn test_centered_mouse_axis_emits_nothing() {
        let mut axis = mouse_axis(PointerAxis::Vertical, false);
        assert!(run(&mut axis, 10).iter().all(|tick| tick.is_empty()));
    }

    #[test]
    fn test_inverted_vertical_mouse() {
        let mut axis = mouse_axis(PointerAxis::Vertical, true);
        axis.set_raw(32767);
        assert_eq!(
            run(&mut axis, 1)[0],
            vec![OutputAction::MouseMove { dx: 0, dy: -32 }]
        );
    }

    #[test]
    fn test_subpixel_motion_is_carried() {
        // 0.01 * 10 * 3.2 = 0.32 px per tick
        let mut axis = mouse_axis(PointerAxis::Horizontal, false);
        axis.set_raw(5250);
        let total: i32 = run(&mut axis, 25)
            .into_iter()
            .flatten()
            .map(|action| match action {
                OutputAction::MouseMove { dx, .. } => dx,
                _ => 0,
            })
            .sum();
        assert_eq!(total, 8);
    }

    // ==================== Absolute Tests ====================

    #[test]
    fn test_absolute_reports_changes_only() {
        let mut axis = AxisState::new(AxisBinding {
            mode: AxisMode::Absolute(MouseDirection {
                axis: PointerAxis::Vertical,
                inverted: false,
            }),
            ..AxisBinding::default()
        });
        assert!(run(&mut axis, 2).iter().all(|tick| tick.is_empty()));

        axis.set_raw(-17500);
        let ticks = run(&mut axis, 3);
        assert_eq!(ticks[0], vec![OutputAction::MouseMoveAbsolute { x: 0, y: -50 }]);
        assert!(ticks[1].is_empty() && ticks[2].is_empty());
    }
}
