//! uinput backend (Linux-only).
//!
//! Creates a virtual device that looks like a wired Xbox 360 pad to the
//! `xpad`-style consumers (SDL, Steam, browsers).

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use tracing::info;

use super::{buttons, emulation_error, VirtualPad, XusbReport};
use crate::error::Result;

/// Microsoft vendor ID
const XBOX360_VENDOR_ID: u16 = 0x045e;

/// Wired Xbox 360 controller product ID
const XBOX360_PRODUCT_ID: u16 = 0x028e;

const XBOX360_VERSION: u16 = 0x0110;

const DEVICE_NAME: &str = "Microsoft X-Box 360 pad";

/// XUSB button bit to evdev key.
const KEY_MAP: [(u16, Key); 11] = [
    (buttons::A, Key::BTN_SOUTH),
    (buttons::B, Key::BTN_EAST),
    (buttons::X, Key::BTN_NORTH),
    (buttons::Y, Key::BTN_WEST),
    (buttons::LEFT_SHOULDER, Key::BTN_TL),
    (buttons::RIGHT_SHOULDER, Key::BTN_TR),
    (buttons::BACK, Key::BTN_SELECT),
    (buttons::START, Key::BTN_START),
    (buttons::GUIDE, Key::BTN_MODE),
    (buttons::LEFT_THUMB, Key::BTN_THUMBL),
    (buttons::RIGHT_THUMB, Key::BTN_THUMBR),
];

/// Virtual Xbox 360 pad backed by `/dev/uinput`.
pub struct UinputPad {
    device: VirtualDevice,
}

impl UinputPad {
    /// Create the virtual device.
    ///
    /// # Errors
    ///
    /// Returns `Emulation` if `/dev/uinput` cannot be opened (usually a
    /// permissions problem) or the device is rejected by the kernel.
    pub fn create() -> Result<Self> {
        let device = Self::build().map_err(|e| emulation_error("uinput", e))?;
        info!("Virtual Xbox 360 controller created via uinput");
        Ok(Self { device })
    }

    fn build() -> std::io::Result<VirtualDevice> {
        let mut keys = AttributeSet::<Key>::new();
        for (_, key) in KEY_MAP {
            keys.insert(key);
        }

        let stick = AbsInfo::new(0, -32768, 32767, 16, 128, 0);
        let trigger = AbsInfo::new(0, 0, 255, 0, 0, 0);
        let hat = AbsInfo::new(0, -1, 1, 0, 0, 0);

        VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .input_id(InputId::new(
                BusType::BUS_USB,
                XBOX360_VENDOR_ID,
                XBOX360_PRODUCT_ID,
                XBOX360_VERSION,
            ))
            .with_keys(&keys)?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_X, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RX, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RY, stick))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Z, trigger))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RZ, trigger))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_HAT0X, hat))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_HAT0Y, hat))?
            .build()
    }
}

impl VirtualPad for UinputPad {
    fn update(&mut self, report: &XusbReport) -> Result<()> {
        let events = report_to_events(report);
        self.device
            .emit(&events)
            .map_err(|e| emulation_error("uinput emit", e))
    }
}

fn abs_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, axis.0, value)
}

/// Resolves a pair of opposing D-pad bits to a hat value.
fn hat_value(report: &XusbReport, negative: u16, positive: u16) -> i32 {
    match (report.is_pressed(negative), report.is_pressed(positive)) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

/// Translates a full report into one batch of evdev events.
///
/// Y axes are inverted: XUSB is positive-up, evdev is positive-down.
fn report_to_events(report: &XusbReport) -> Vec<InputEvent> {
    let mut events: Vec<InputEvent> = KEY_MAP
        .iter()
        .map(|(bit, key)| {
            InputEvent::new(EventType::KEY, key.code(), i32::from(report.is_pressed(*bit)))
        })
        .collect();

    events.extend([
        abs_event(AbsoluteAxisType::ABS_X, i32::from(report.thumb_lx)),
        abs_event(AbsoluteAxisType::ABS_Y, -i32::from(report.thumb_ly)),
        abs_event(AbsoluteAxisType::ABS_RX, i32::from(report.thumb_rx)),
        abs_event(AbsoluteAxisType::ABS_RY, -i32::from(report.thumb_ry)),
        abs_event(AbsoluteAxisType::ABS_Z, i32::from(report.left_trigger)),
        abs_event(AbsoluteAxisType::ABS_RZ, i32::from(report.right_trigger)),
        abs_event(
            AbsoluteAxisType::ABS_HAT0X,
            hat_value(report, buttons::DPAD_LEFT, buttons::DPAD_RIGHT),
        ),
        abs_event(
            AbsoluteAxisType::ABS_HAT0Y,
            hat_value(report, buttons::DPAD_UP, buttons::DPAD_DOWN),
        ),
    ]);

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(events: &[InputEvent], event_type: EventType, code: u16) -> i32 {
        events
            .iter()
            .find(|e| e.event_type() == event_type && e.code() == code)
            .map(|e| e.value())
            .expect("event present")
    }

    #[test]
    fn test_neutral_report_events() {
        let events = report_to_events(&XusbReport::default());
        assert_eq!(events.len(), KEY_MAP.len() + 8);
        assert!(events.iter().all(|e| e.value() == 0));
    }

    #[test]
    fn test_buttons_map_to_keys() {
        let report = XusbReport {
            buttons: buttons::A | buttons::GUIDE,
            ..Default::default()
        };
        let events = report_to_events(&report);
        assert_eq!(value_of(&events, EventType::KEY, Key::BTN_SOUTH.code()), 1);
        assert_eq!(value_of(&events, EventType::KEY, Key::BTN_MODE.code()), 1);
        assert_eq!(value_of(&events, EventType::KEY, Key::BTN_EAST.code()), 0);
    }

    #[test]
    fn test_y_axes_inverted() {
        let report = XusbReport {
            thumb_ly: 1000,
            thumb_ry: -32767,
            ..Default::default()
        };
        let events = report_to_events(&report);
        assert_eq!(value_of(&events, EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0), -1000);
        assert_eq!(value_of(&events, EventType::ABSOLUTE, AbsoluteAxisType::ABS_RY.0), 32767);
    }

    #[test]
    fn test_dpad_to_hat() {
        let report = XusbReport {
            buttons: buttons::DPAD_LEFT | buttons::DPAD_DOWN,
            ..Default::default()
        };
        let events = report_to_events(&report);
        assert_eq!(value_of(&events, EventType::ABSOLUTE, AbsoluteAxisType::ABS_HAT0X.0), -1);
        assert_eq!(value_of(&events, EventType::ABSOLUTE, AbsoluteAxisType::ABS_HAT0Y.0), 1);
    }

    #[test]
    fn test_opposing_dpad_cancels() {
        let report = XusbReport {
            buttons: buttons::DPAD_LEFT | buttons::DPAD_RIGHT,
            ..Default::default()
        };
        assert_eq!(hat_value(&report, buttons::DPAD_LEFT, buttons::DPAD_RIGHT), 0);
    }

    // Requires write access to /dev/uinput
    #[test]
    #[ignore]
    fn test_create_with_real_uinput() {
        let mut pad = UinputPad::create().expect("uinput available");
        pad.update(&XusbReport::default()).unwrap();
    }
}
