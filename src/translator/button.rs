//! Per-button state machine.
//!
//! Buttons are already digital, so a plain binding simply mirrors the
//! physical state and emits on edges. `sticky` turns every press into a
//! toggle; `rapidfire` pulses the output at half duty while it is engaged.

use super::timing::{DutyCycle, Timing};
use crate::layout::types::{ButtonAction, ButtonBinding};
use crate::output::OutputAction;

/// Runtime state of one logical button.
#[derive(Debug, Clone)]
pub struct ButtonState {
    binding: ButtonBinding,
    pressed: bool,
    was_pressed: bool,
    latched: bool,
    engaged: bool,
    output_on: bool,
    duty: DutyCycle,
}

impl ButtonState {
    /// Creates a released button with the given binding.
    #[must_use]
    pub fn new(binding: ButtonBinding) -> Self {
        Self {
            binding,
            pressed: false,
            was_pressed: false,
            latched: false,
            engaged: false,
            output_on: false,
            duty: DutyCycle::default(),
        }
    }

    /// Records the latest physical state.
    #[inline]
    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    /// Latest physical state.
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Returns `true` while the bound output is held down.
    #[must_use]
    pub fn output_on(&self) -> bool {
        self.output_on
    }

    /// Advances the button by one tick, appending transitions to `out`.
    pub fn tick(&mut self, timing: &Timing, out: &mut Vec<OutputAction>) {
        let rising = self.pressed && !self.was_pressed;
        self.was_pressed = self.pressed;

        let target = match self.binding.action {
            None => return,
            Some(ButtonAction::Absolute { x, y }) => {
                if rising {
                    out.push(OutputAction::MouseMoveAbsolute { x, y });
                }
                return;
            }
            Some(action) => match action.target() {
                Some(target) => target,
                None => return,
            },
        };

        if self.binding.sticky && rising {
            self.latched = !self.latched;
        }
        let engaged = if self.binding.sticky {
            self.latched
        } else {
            self.pressed
        };
        if engaged && !self.engaged {
            self.duty.reset();
        }
        self.engaged = engaged;

        let on = if engaged && self.binding.rapidfire {
            let half = (timing.cycle_ticks + 1) / 2;
            self.duty.advance(half, timing.cycle_ticks)
        } else {
            engaged
        };

        if on != self.output_on {
            self.output_on = on;
            out.push(if on { target.press() } else { target.release() });
        }
    }

    /// Releases the output if held and clears any sticky latch.
    pub fn release(&mut self, out: &mut Vec<OutputAction>) {
        if self.output_on {
            if let Some(target) = self.binding.action.and_then(|action| action.target()) {
                out.push(target.release());
            }
        }
        self.output_on = false;
        self.latched = false;
        self.engaged = false;
        self.duty.reset();
    }
}
