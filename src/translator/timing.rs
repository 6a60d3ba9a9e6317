//! # Duty-Cycle Timing
//!
//! Analog deflection is expressed digitally by pulsing an output over a
//! macro-cycle of `cycle_ticks` ticks. A magnitude `m` is quantized to a
//! level `L = round(m * cycle_ticks)` and the output is active on the first
//! `L` ticks of every cycle:
//!
//! | Level (cycle 10) | Pattern |
//! |------------------|---------|
//! | 0 | `..........` |
//! | 5 | `#####.....` |
//! | 10 | `##########` |
//!
//! With the default 16 ms tick a full cycle is 160 ms.

use std::time::Duration;

/// Default tick period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 16;
/// Default number of ticks in one macro-cycle.
pub const DEFAULT_CYCLE_TICKS: u32 = 10;
/// Default pixels per unit of max speed per tick.
pub const DEFAULT_MOUSE_SCALE: f32 = 3.2;

/// Tick period, macro-cycle length and mouse scale shared by all translators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub tick: Duration,
    pub cycle_ticks: u32,
    pub mouse_scale: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            cycle_ticks: DEFAULT_CYCLE_TICKS,
            mouse_scale: DEFAULT_MOUSE_SCALE,
        }
    }
}

impl Timing {
    /// Quantizes a magnitude (0.0 to 1.0) to a duty level (0 to `cycle_ticks`).
    #[must_use]
    pub fn level(&self, magnitude: f32) -> u32 {
        let level = (magnitude.clamp(0.0, 1.0) * self.cycle_ticks as f32).round();
        (level as u32).min(self.cycle_ticks)
    }
}

/// Position within the macro-cycle of one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DutyCycle {
    position: u32,
}

impl DutyCycle {
    /// Returns whether the output is active on this tick, then moves on.
    #[inline]
    pub fn advance(&mut self, level: u32, cycle_ticks: u32) -> bool {
        let active = self.position < level;
        self.position = (self.position + 1) % cycle_ticks.max(1);
        active
    }

    /// Restarts the cycle so the next tick is the first of a pulse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Current position in the cycle.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}
