//! # Xbox 360 Mapper Module
//!
//! Maps a decoded GameCube input report onto an Xbox 360 (XUSB) report.
//!
//! ## Button Assignments
//!
//! | GameCube | Xbox 360 |
//! |----------|----------|
//! | A / B / X / Y | A / B / X / Y |
//! | Z | Right shoulder |
//! | ZL | Left shoulder |
//! | Start/Pause | Start |
//! | Home | Guide |
//! | Capture, Chat | Back |
//! | D-Pad | D-Pad |
//! | L / R click | Left / right trigger at 255 |
//!
//! GR and GL have no Xbox counterpart and are not forwarded.
//!
//! ## Value Ranges
//!
//! - Sticks: normalized -1.0..1.0, scaled to ±32767
//! - Triggers: calibrated 0-255, forced to 255 while the digital click is held
//!
//! ## Usage
//!
//! ```
//! use gc_enabler::controller::mapper::XboxMapper;
//! use gc_enabler::controller::report::InputReport;
//! use gc_enabler::emulation::buttons;
//!
//! let mut data = [0u8; 16];
//! data[3] = 0x02; // A
//! data[4] = 0x10; // L click
//!
//! let report = InputReport::parse(&data).unwrap();
//! let xusb = XboxMapper::default().map_report(&report);
//!
//! assert!(xusb.is_pressed(buttons::A));
//! assert_eq!(xusb.left_trigger, 255);
//! ```

use super::calibration::{to_xbox_axis, TriggerCalibrations, TRIGGER_MAX};
use super::report::{Button, InputReport};
use crate::emulation::{buttons, XusbReport};

/// GameCube button to XUSB button bit.
pub const BUTTON_MAP: [(Button, u16); 14] = [
    (Button::A, buttons::A),
    (Button::B, buttons::B),
    (Button::X, buttons::X),
    (Button::Y, buttons::Y),
    (Button::Z, buttons::RIGHT_SHOULDER),
    (Button::Zl, buttons::LEFT_SHOULDER),
    (Button::Start, buttons::START),
    (Button::Home, buttons::GUIDE),
    (Button::Capture, buttons::BACK),
    (Button::Chat, buttons::BACK),
    (Button::DpadUp, buttons::DPAD_UP),
    (Button::DpadDown, buttons::DPAD_DOWN),
    (Button::DpadLeft, buttons::DPAD_LEFT),
    (Button::DpadRight, buttons::DPAD_RIGHT),
];

/// Maps input reports to XUSB reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct XboxMapper {
    triggers: TriggerCalibrations,
}

impl XboxMapper {
    /// Creates a mapper with the given trigger calibration.
    #[must_use]
    pub fn new(triggers: TriggerCalibrations) -> Self {
        Self { triggers }
    }

    #[must_use]
    pub fn triggers(&self) -> &TriggerCalibrations {
        &self.triggers
    }

    /// Maps one input report.
    #[must_use]
    pub fn map_report(&self, report: &InputReport) -> XusbReport {
        let buttons = BUTTON_MAP
            .iter()
            .filter(|(button, _)| report.is_pressed(*button))
            .fold(0u16, |acc, (_, bit)| acc | bit);

        let (lx, ly) = report.left_stick.normalized();
        let (rx, ry) = report.right_stick.normalized();

        XusbReport {
            buttons,
            left_trigger: self.map_trigger(
                report.is_pressed(Button::L),
                self.triggers.apply_left(report.left_trigger),
            ),
            right_trigger: self.map_trigger(
                report.is_pressed(Button::R),
                self.triggers.apply_right(report.right_trigger),
            ),
            thumb_lx: to_xbox_axis(lx),
            thumb_ly: to_xbox_axis(ly),
            thumb_rx: to_xbox_axis(rx),
            thumb_ry: to_xbox_axis(ry),
        }
    }

    /// The digital click wins over the analog value.
    #[inline]
    fn map_trigger(&self, clicked: bool, calibrated: u8) -> u8 {
        if clicked {
            TRIGGER_MAX
        } else {
            calibrated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::TriggerMode;
    use crate::controller::report::fixtures::*;

    fn map(data: &[u8]) -> XusbReport {
        XboxMapper::default().map_report(&InputReport::parse(data).unwrap())
    }

    // ==================== Fixture Tests ====================

    #[test]
    fn test_all_zero_maps_to_full_negative_sticks() {
        let xusb = map(&ALL_ZERO);
        assert_eq!(xusb.buttons, 0);
        assert_eq!(xusb.thumb_lx, -32767);
        assert_eq!(xusb.thumb_ly, -32767);
        assert_eq!(xusb.thumb_rx, -32767);
        assert_eq!(xusb.thumb_ry, -32767);
        assert_eq!(xusb.left_trigger, 0);
        assert_eq!(xusb.right_trigger, 0);
    }

    #[test]
    fn test_midpoint_maps_to_neutral() {
        assert_eq!(map(&MIDPOINT_STICKS), XusbReport::default());
    }

    #[test]
    fn test_all_buttons_mapping() {
        let xusb = map(&ALL_BUTTONS);

        let expected = buttons::A
            | buttons::B
            | buttons::X
            | buttons::Y
            | buttons::RIGHT_SHOULDER
            | buttons::LEFT_SHOULDER
            | buttons::START
            | buttons::GUIDE
            | buttons::BACK
            | buttons::DPAD_UP
            | buttons::DPAD_DOWN
            | buttons::DPAD_LEFT
            | buttons::DPAD_RIGHT;
        assert_eq!(xusb.buttons, expected);

        // Stick clicks have no source button
        assert!(!xusb.is_pressed(buttons::LEFT_THUMB));
        assert!(!xusb.is_pressed(buttons::RIGHT_THUMB));

        // L and R clicks saturate the triggers
        assert_eq!(xusb.left_trigger, 255);
        assert_eq!(xusb.right_trigger, 255);
    }

    // ==================== Button Tests ====================

    #[test]
    fn test_capture_and_chat_share_back() {
        let mut data = [0u8; 16];
        data[5] = 0x02; // Capture
        assert_eq!(map(&data).buttons, buttons::BACK);

        data[5] = 0x10; // Chat
        assert_eq!(map(&data).buttons, buttons::BACK);
    }

    #[test]
    fn test_gr_gl_not_forwarded() {
        let mut data = [0u8; 16];
        data[5] = 0x04 | 0x08;
        assert_eq!(map(&data).buttons, 0);
    }

    #[test]
    fn test_z_and_zl_shoulders() {
        let mut data = [0u8; 16];
        data[3] = 0x20; // Z
        assert_eq!(map(&data).buttons, buttons::RIGHT_SHOULDER);

        let mut data = [0u8; 16];
        data[4] = 0x20; // ZL
        assert_eq!(map(&data).buttons, buttons::LEFT_SHOULDER);
    }

    // ==================== Trigger Tests ====================

    #[test]
    fn test_analog_triggers_are_calibrated() {
        let data = with_sticks(2048, 2048, 2048, 2048, 32, 190);
        let xusb = map(&data);
        assert_eq!(xusb.left_trigger, 0);
        assert_eq!(xusb.right_trigger, 255);
    }

    #[test]
    fn test_trigger_mode_press() {
        let cal = TriggerCalibrations {
            mode: TriggerMode::Press,
            ..Default::default()
        };
        let mapper = XboxMapper::new(cal);
        let data = with_sticks(2048, 2048, 2048, 2048, 190, 230);
        let xusb = mapper.map_report(&InputReport::parse(&data).unwrap());
        assert!(xusb.left_trigger < 255);
        assert_eq!(xusb.right_trigger, 255);
    }

    #[test]
    fn test_digital_click_overrides_analog() {
        let mut data = with_sticks(2048, 2048, 2048, 2048, 0, 0);
        data[3] = 0x10; // R
        let xusb = map(&data);
        assert_eq!(xusb.right_trigger, 255);
        assert_eq!(xusb.left_trigger, 0);
    }

    // ==================== Stick Tests ====================

    #[test]
    fn test_sticks_not_inverted() {
        let data = with_sticks(3072, 1024, 4095, 0, 0, 0);
        let xusb = map(&data);
        assert_eq!(xusb.thumb_lx, 16383);
        assert_eq!(xusb.thumb_ly, -16383);
        assert_eq!(xusb.thumb_rx, 32751);
        assert_eq!(xusb.thumb_ry, -32767);
    }
}
