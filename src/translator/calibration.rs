//! # Calibration Module
//!
//! Turns a raw axis value into a normalized magnitude in 0.0..=1.0.
//!
//! ## Zones
//!
//! Deflection at or below the dead zone reads as 0.0 to suppress drift and
//! noise. Deflection at or beyond the extreme zone reads as 1.0. In between
//! the value is scaled linearly, shaped by the configured curve, then
//! multiplied by the sensitivity and clamped.
//!
//! ## Curves
//!
//! | Curve | Formula |
//! |-------|---------|
//! | Linear | `x` |
//! | Quadratic | `x²` |
//! | Cubic | `x³` |
//! | Expo(k) | `(1 - k) * x + k * x³` |
//!
//! ## Throttle Mode
//!
//! Analog triggers rest at one end of their range. `Throttle::Positive`
//! remaps the full range onto the positive half (rest = -32767 becomes 0),
//! `Throttle::Negative` onto the negative half.
//!
//! ## Usage
//!
//! ```
//! use joypad_bridge::translator::calibration::Calibration;
//!
//! let cal = Calibration::default(); // dead zone 5000, extreme zone 30000
//!
//! assert_eq!(cal.magnitude(3000), 0.0);
//! assert_eq!(cal.magnitude(17500), 0.5);
//! assert_eq!(cal.magnitude(-32767), 1.0);
//! ```

use crate::controller::code_table::{JOY_MAX, JOY_MIN};

/// Smallest accepted sensitivity.
pub const SENSITIVITY_MIN: f32 = 1e-8;
/// Largest accepted sensitivity.
pub const SENSITIVITY_MAX: f32 = 1e8;

/// Default dead zone in raw units.
pub const DEFAULT_DEAD_ZONE: i32 = 5000;
/// Default extreme zone in raw units.
pub const DEFAULT_EXTREME_ZONE: i32 = 30000;

/// Response curve applied between the dead zone and the extreme zone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Curve {
    #[default]
    Linear,
    Quadratic,
    Cubic,
    /// Blend of linear and cubic; factor in 0.0..=1.0.
    Expo(f32),
}

impl Curve {
    /// Shapes a value in 0.0..=1.0.
    #[inline]
    #[must_use]
    pub fn apply(&self, x: f32) -> f32 {
        match *self {
            Curve::Linear => x,
            Curve::Quadratic => x * x,
            Curve::Cubic => x * x * x,
            Curve::Expo(k) => (1.0 - k) * x + k * x * x * x,
        }
    }
}

/// Rest-position handling for trigger-style axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Throttle {
    /// Centered axis; both halves are used.
    #[default]
    Off,
    /// Full range mapped onto the positive half.
    Positive,
    /// Full range mapped onto the negative half.
    Negative,
}

impl Throttle {
    /// Applies the remapping to a raw value.
    #[inline]
    #[must_use]
    pub fn apply(&self, raw: i32) -> i32 {
        let raw = raw.clamp(JOY_MIN, JOY_MAX);
        match self {
            Throttle::Off => raw,
            Throttle::Positive => (raw + JOY_MAX) / 2,
            Throttle::Negative => (raw - JOY_MAX) / 2,
        }
    }
}

/// Per-axis dead zone, extreme zone, sensitivity, curve and throttle mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub dead_zone: i32,
    pub extreme_zone: i32,
    pub sensitivity: f32,
    pub curve: Curve,
    pub throttle: Throttle,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            dead_zone: DEFAULT_DEAD_ZONE,
            extreme_zone: DEFAULT_EXTREME_ZONE,
            sensitivity: 1.0,
            curve: Curve::Linear,
            throttle: Throttle::Off,
        }
    }
}

impl Calibration {
    /// Returns `true` if `sensitivity` lies within the accepted range.
    #[must_use]
    pub fn sensitivity_in_range(sensitivity: f32) -> bool {
        (SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&sensitivity)
    }

    /// Raw value after throttle remapping; its sign selects the direction.
    #[inline]
    #[must_use]
    pub fn signed(&self, raw: i32) -> i32 {
        self.throttle.apply(raw)
    }

    /// Normalized magnitude of a raw value (0.0 to 1.0).
    #[must_use]
    pub fn magnitude(&self, raw: i32) -> f32 {
        let abs = self.signed(raw).abs();
        if abs <= self.dead_zone {
            return 0.0;
        }
        if abs >= self.extreme_zone || self.extreme_zone <= self.dead_zone {
            return (self.sensitivity * self.curve.apply(1.0)).clamp(0.0, 1.0);
        }

        let linear = (abs - self.dead_zone) as f32 / (self.extreme_zone - self.dead_zone) as f32;
        (self.sensitivity * self.curve.apply(linear)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Curve Tests ====================

    #[test]
    fn test_curves_preserve_endpoints() {
        for curve in [Curve::Linear, Curve::Quadratic, Curve::Cubic, Curve::Expo(0.3)] {
            assert_eq!(curve.apply(0.0), 0.0, "{:?}", curve);
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-6, "{:?}", curve);
        }
    }

    #[test]
    fn test_curves_soften_midpoint() {
        assert_eq!(Curve::Linear.apply(0.5), 0.5);
        assert_eq!(Curve::Quadratic.apply(0.5), 0.25);
        assert_eq!(Curve::Cubic.apply(0.5), 0.125);
        let expo = Curve::Expo(0.5).apply(0.5);
        assert!(expo < 0.5 && expo > 0.125);
    }

    // ==================== Throttle Tests ====================

    #[test]
    fn test_throttle_off_passes_through() {
        assert_eq!(Throttle::Off.apply(-1234), -1234);
    }

    #[test]
    fn test_throttle_positive_rest_is_zero() {
        assert_eq!(Throttle::Positive.apply(JOY_MIN), 0);
        assert_eq!(Throttle::Positive.apply(JOY_MAX), JOY_MAX);
        assert_eq!(Throttle::Positive.apply(0), JOY_MAX / 2);
    }

    #[test]
    fn test_throttle_negative_rest_is_zero() {
        assert_eq!(Throttle::Negative.apply(JOY_MAX), 0);
        assert_eq!(Throttle::Negative.apply(JOY_MIN), JOY_MIN);
    }

    // ==================== Magnitude Tests ====================

    #[test]
    fn test_magnitude_within_dead_zone() {
        let cal = Calibration::default();
        assert_eq!(cal.magnitude(0), 0.0);
        assert_eq!(cal.magnitude(4999), 0.0);
        assert_eq!(cal.magnitude(-5000), 0.0);
    }

    #[test]
    fn test_magnitude_at_full_deflection() {
        let cal = Calibration::default();
        assert_eq!(cal.magnitude(JOY_MAX), 1.0);
        assert_eq!(cal.magnitude(JOY_MIN), 1.0);
        assert_eq!(cal.magnitude(30000), 1.0);
    }

    #[test]
    fn test_magnitude_linear_midpoint() {
        let cal = Calibration::default();
        assert_eq!(cal.magnitude(17500), 0.5);
        assert_eq!(cal.magnitude(-17500), 0.5);
    }

    #[test]
    fn test_magnitude_sensitivity_scales_and_clamps() {
        let cal = Calibration {
            sensitivity: 2.0,
            ..Calibration::default()
        };
        assert_eq!(cal.magnitude(11250), 0.5); // 0.25 * 2
        assert_eq!(cal.magnitude(20000), 1.0); // 0.6 * 2, clamped
    }

    #[test]
    fn test_magnitude_tiny_sensitivity() {
        let cal = Calibration {
            sensitivity: SENSITIVITY_MIN,
            ..Calibration::default()
        };
        assert!(cal.magnitude(JOY_MAX) < 1e-6);
    }

    #[test]
    fn test_magnitude_degenerate_zones() {
        let cal = Calibration {
            dead_zone: 10000,
            extreme_zone: 10000,
            ..Calibration::default()
        };
        assert_eq!(cal.magnitude(9000), 0.0);
        assert_eq!(cal.magnitude(10001), 1.0);
    }

    #[test]
    fn test_sensitivity_range() {
        assert!(Calibration::sensitivity_in_range(1.0));
        assert!(Calibration::sensitivity_in_range(SENSITIVITY_MIN));
        assert!(Calibration::sensitivity_in_range(SENSITIVITY_MAX));
        assert!(!Calibration::sensitivity_in_range(0.0));
        assert!(!Calibration::sensitivity_in_range(1e9));
        assert!(!Calibration::sensitivity_in_range(f32::NAN));
    }
}
