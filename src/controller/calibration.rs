//! # Calibration Module
//!
//! Normalizes stick axes and calibrates analog triggers.
//!
//! ## Sticks
//!
//! Raw 12-bit stick values (0-4095) are centered at 2048 and normalized to
//! `(raw - 2048) / 2048`, giving -1.0 at one end and just under 1.0 at the
//! other. For emulation the normalized value is scaled to the 16-bit signed
//! thumb range and clamped to ±32767.
//!
//! ## Triggers
//!
//! The analog triggers never rest at zero. A dead-zone floor (`base`) is
//! subtracted first, then the remaining travel is stretched to 0-255. The
//! end of that travel is either the point where the trigger meets its
//! digital click (`bump`) or the physical end of travel (`max`):
//!
//! `output = clamp((raw - base) / (end - base) * 255, 0, 255)`
//!
//! ## Usage
//!
//! ```
//! use gc_enabler::controller::calibration::{TriggerCalibration, TriggerMode};
//!
//! let cal = TriggerCalibration::new(32.0, 190.0, 230.0);
//!
//! // Resting trigger reads zero
//! assert_eq!(cal.apply(20, TriggerMode::Bump), 0);
//!
//! // At the bump, "100% at bump" is full scale
//! assert_eq!(cal.apply(190, TriggerMode::Bump), 255);
//! ```

use serde::{Deserialize, Serialize};

use super::protocol::STICK_VALUE_CENTER;

/// Largest thumb magnitude sent to the virtual controller.
pub const XBOX_AXIS_MAX: i16 = 32767;

/// Full-scale trigger output.
pub const TRIGGER_MAX: u8 = 255;

/// Which trigger position maps to full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// 100% at the bump before the digital click
    #[default]
    Bump,
    /// 100% at the end of travel
    Press,
}

/// Dead-zone floor and range of one analog trigger, in raw units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerCalibration {
    base: f32,
    bump: f32,
    max: f32,
}

impl Default for TriggerCalibration {
    fn default() -> Self {
        Self {
            base: 32.0,
            bump: 190.0,
            max: 230.0,
        }
    }
}

impl TriggerCalibration {
    /// Creates a trigger calibration from raw positions.
    ///
    /// # Arguments
    ///
    /// * `base` - Resting value, subtracted as a dead-zone floor
    /// * `bump` - Value where the trigger meets the digital click
    /// * `max` - Value at the end of travel
    #[must_use]
    pub fn new(base: f32, bump: f32, max: f32) -> Self {
        Self { base, bump, max }
    }

    #[must_use]
    pub fn base(&self) -> f32 {
        self.base
    }

    #[must_use]
    pub fn bump(&self) -> f32 {
        self.bump
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Calibrates a raw trigger byte to 0-255.
    ///
    /// A degenerate range (end at or below base) always yields 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use gc_enabler::controller::calibration::{TriggerCalibration, TriggerMode};
    ///
    /// let cal = TriggerCalibration::new(32.0, 190.0, 230.0);
    /// assert_eq!(cal.apply(230, TriggerMode::Press), 255);
    /// assert_eq!(cal.apply(131, TriggerMode::Press), 127);
    /// ```
    #[must_use]
    pub fn apply(&self, raw: u8, mode: TriggerMode) -> u8 {
        let value = (f32::from(raw) - self.base).max(0.0);

        let end = match mode {
            TriggerMode::Bump => self.bump,
            TriggerMode::Press => self.max,
        };
        let range = end - self.base;
        if range <= 0.0 {
            return 0;
        }

        let scaled = (value / range * f32::from(TRIGGER_MAX)) as i32;
        scaled.clamp(0, i32::from(TRIGGER_MAX)) as u8
    }
}

/// Calibration for both triggers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriggerCalibrations {
    pub left: TriggerCalibration,
    pub right: TriggerCalibration,
    pub mode: TriggerMode,
}

impl TriggerCalibrations {
    /// Creates trigger calibration from config values.
    ///
    /// # Examples
    ///
    /// ```
    /// use gc_enabler::controller::calibration::{TriggerCalibrations, TriggerMode};
    ///
    /// let cal = TriggerCalibrations::from_config(
    ///     30.0, 180.0, 225.0, // left base/bump/max
    ///     34.0, 195.0, 235.0, // right base/bump/max
    ///     TriggerMode::Press,
    /// );
    /// assert_eq!(cal.left.base(), 30.0);
    /// ```
    #[must_use]
    pub fn from_config(
        left_base: f32,
        left_bump: f32,
        left_max: f32,
        right_base: f32,
        right_bump: f32,
        right_max: f32,
        mode: TriggerMode,
    ) -> Self {
        Self {
            left: TriggerCalibration::new(left_base, left_bump, left_max),
            right: TriggerCalibration::new(right_base, right_bump, right_max),
            mode,
        }
    }

    #[must_use]
    pub fn apply_left(&self, raw: u8) -> u8 {
        self.left.apply(raw, self.mode)
    }

    #[must_use]
    pub fn apply_right(&self, raw: u8) -> u8 {
        self.right.apply(raw, self.mode)
    }
}

/// Converts a raw 12-bit stick value to a normalized value.
///
/// # Examples
///
/// ```
/// use gc_enabler::controller::calibration::normalize_stick;
///
/// assert_eq!(normalize_stick(0), -1.0);
/// assert_eq!(normalize_stick(2048), 0.0);
/// assert!((normalize_stick(4095) - 1.0).abs() < 0.001);
/// ```
#[must_use]
pub fn normalize_stick(raw: u16) -> f32 {
    (f32::from(raw) - f32::from(STICK_VALUE_CENTER)) / f32::from(STICK_VALUE_CENTER)
}

/// Converts a normalized stick value to the 16-bit thumb range.
///
/// Truncates toward zero and clamps to ±32767.
///
/// # Examples
///
/// ```
/// use gc_enabler::controller::calibration::to_xbox_axis;
///
/// assert_eq!(to_xbox_axis(0.0), 0);
/// assert_eq!(to_xbox_axis(-1.0), -32767);
/// assert_eq!(to_xbox_axis(2.0), 32767);
/// ```
#[must_use]
pub fn to_xbox_axis(normalized: f32) -> i16 {
    let max = f32::from(XBOX_AXIS_MAX);
    (normalized * max).clamp(-max, max) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Stick Tests ====================

    #[test]
    fn test_normalize_stick_endpoints() {
        assert_eq!(normalize_stick(0), -1.0);
        assert_eq!(normalize_stick(2048), 0.0);
        assert_eq!(normalize_stick(4095), 2047.0 / 2048.0);
    }

    #[test]
    fn test_normalize_stick_quarter_points() {
        assert_eq!(normalize_stick(1024), -0.5);
        assert_eq!(normalize_stick(3072), 0.5);
    }

    #[test]
    fn test_to_xbox_axis_center() {
        assert_eq!(to_xbox_axis(0.0), 0);
    }

    #[test]
    fn test_to_xbox_axis_full_deflection() {
        assert_eq!(to_xbox_axis(-1.0), -32767);
        assert_eq!(to_xbox_axis(1.0), 32767);
        assert_eq!(to_xbox_axis(normalize_stick(4095)), 32751);
    }

    #[test]
    fn test_to_xbox_axis_clamps() {
        assert_eq!(to_xbox_axis(-3.0), -32767);
        assert_eq!(to_xbox_axis(3.0), 32767);
    }

    #[test]
    fn test_to_xbox_axis_truncates_toward_zero() {
        // 0.5 * 32767 = 16383.5
        assert_eq!(to_xbox_axis(0.5), 16383);
        assert_eq!(to_xbox_axis(-0.5), -16383);
    }

    // ==================== Trigger Tests ====================

    #[test]
    fn test_trigger_default() {
        let cal = TriggerCalibration::default();
        assert_eq!(cal.base(), 32.0);
        assert_eq!(cal.bump(), 190.0);
        assert_eq!(cal.max(), 230.0);
    }

    #[test]
    fn test_trigger_below_base_is_zero() {
        let cal = TriggerCalibration::default();
        assert_eq!(cal.apply(0, TriggerMode::Bump), 0);
        assert_eq!(cal.apply(32, TriggerMode::Bump), 0);
        assert_eq!(cal.apply(31, TriggerMode::Press), 0);
    }

    #[test]
    fn test_trigger_bump_mode_full_at_bump() {
        let cal = TriggerCalibration::default();
        assert_eq!(cal.apply(190, TriggerMode::Bump), 255);
        // Past the bump stays saturated
        assert_eq!(cal.apply(230, TriggerMode::Bump), 255);
        assert_eq!(cal.apply(255, TriggerMode::Bump), 255);
    }

    #[test]
    fn test_trigger_press_mode_full_at_max() {
        let cal = TriggerCalibration::default();
        assert_eq!(cal.apply(230, TriggerMode::Press), 255);
        assert!(cal.apply(190, TriggerMode::Press) < 255);
    }

    #[test]
    fn test_trigger_midpoint() {
        let cal = TriggerCalibration::new(0.0, 200.0, 200.0);
        // 100 / 200 * 255 = 127.5, truncated
        assert_eq!(cal.apply(100, TriggerMode::Bump), 127);
    }

    #[test]
    fn test_trigger_degenerate_range() {
        let cal = TriggerCalibration::new(100.0, 100.0, 50.0);
        assert_eq!(cal.apply(200, TriggerMode::Bump), 0);
        assert_eq!(cal.apply(200, TriggerMode::Press), 0);
    }

    #[test]
    fn test_trigger_mode_default_is_bump() {
        assert_eq!(TriggerMode::default(), TriggerMode::Bump);
    }

    #[test]
    fn test_trigger_calibrations_per_side() {
        let cal = TriggerCalibrations::from_config(
            0.0, 100.0, 200.0, 50.0, 150.0, 250.0, TriggerMode::Bump,
        );
        assert_eq!(cal.apply_left(100), 255);
        assert_eq!(cal.apply_right(100), 127);
    }

    #[test]
    fn test_trigger_calibrations_follow_mode() {
        let mut cal = TriggerCalibrations::default();
        assert_eq!(cal.apply_left(190), 255);

        cal.mode = TriggerMode::Press;
        assert!(cal.apply_left(190) < 255);
        assert_eq!(cal.apply_right(230), 255);
    }
}
