//! # Input Report Decoder
//!
//! Decodes the fixed-layout HID input report of a GameCube-style controller
//! into stick positions, trigger values and button states.
//!
//! ## Report Layout
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 3 | B, A, Y, X, R, Z, Start |
//! | 4 | D-Pad Down/Right/Left/Up, L, ZL |
//! | 5 | Home, Capture, GR, GL, Chat |
//! | 6-8 | Left stick, two packed 12-bit values |
//! | 9-11 | Right stick, two packed 12-bit values |
//! | 13 | Left analog trigger (0-255) |
//! | 14 | Right analog trigger (0-255) |
//!
//! Decoding is pure: the same bytes always produce the same report.
//!
//! ## Usage
//!
//! ```
//! use gc_enabler::controller::report::{Button, InputReport};
//!
//! let mut data = [0u8; 16];
//! data[3] = 0x02; // A
//! data[13] = 40;  // Left trigger
//!
//! let report = InputReport::parse(&data).unwrap();
//! assert!(report.is_pressed(Button::A));
//! assert_eq!(report.left_trigger, 40);
//!
//! // Short reports are ignored
//! assert!(InputReport::parse(&data[..10]).is_none());
//! ```

use serde::{Serialize, Serializer};

use super::calibration::normalize_stick;
use super::protocol::{
    BUTTONS_BYTE_0, BUTTONS_BYTE_1, BUTTONS_BYTE_2, LEFT_STICK_OFFSET, LEFT_TRIGGER_OFFSET,
    MIN_REPORT_LEN, RIGHT_STICK_OFFSET, RIGHT_TRIGGER_OFFSET, STICK_VALUE_CENTER,
};

/// A named controller button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    B,
    A,
    Y,
    X,
    R,
    Z,
    Start,
    DpadDown,
    DpadRight,
    DpadLeft,
    DpadUp,
    L,
    Zl,
    Home,
    Capture,
    Gr,
    Gl,
    Chat,
}

impl Button {
    /// Every button, in report bit order.
    pub const ALL: [Button; 18] = [
        Button::B,
        Button::A,
        Button::Y,
        Button::X,
        Button::R,
        Button::Z,
        Button::Start,
        Button::DpadDown,
        Button::DpadRight,
        Button::DpadLeft,
        Button::DpadUp,
        Button::L,
        Button::Zl,
        Button::Home,
        Button::Capture,
        Button::Gr,
        Button::Gl,
        Button::Chat,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Button::B => "B",
            Button::A => "A",
            Button::Y => "Y",
            Button::X => "X",
            Button::R => "R",
            Button::Z => "Z",
            Button::Start => "Start/Pause",
            Button::DpadDown => "Dpad Down",
            Button::DpadRight => "Dpad Right",
            Button::DpadLeft => "Dpad Left",
            Button::DpadUp => "Dpad Up",
            Button::L => "L",
            Button::Zl => "ZL",
            Button::Home => "Home",
            Button::Capture => "Capture",
            Button::Gr => "GR",
            Button::Gl => "GL",
            Button::Chat => "Chat",
        }
    }

    #[inline]
    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Where a button lives in the input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonInfo {
    pub button: Button,
    pub byte_index: usize,
    pub mask: u8,
}

const fn info(button: Button, byte_index: usize, mask: u8) -> ButtonInfo {
    ButtonInfo {
        button,
        byte_index,
        mask,
    }
}

/// Byte-index/bit-mask lookup table for all buttons.
pub const BUTTON_TABLE: [ButtonInfo; 18] = [
    info(Button::B, BUTTONS_BYTE_0, 0x01),
    info(Button::A, BUTTONS_BYTE_0, 0x02),
    info(Button::Y, BUTTONS_BYTE_0, 0x04),
    info(Button::X, BUTTONS_BYTE_0, 0x08),
    info(Button::R, BUTTONS_BYTE_0, 0x10),
    info(Button::Z, BUTTONS_BYTE_0, 0x20),
    info(Button::Start, BUTTONS_BYTE_0, 0x40),
    info(Button::DpadDown, BUTTONS_BYTE_1, 0x01),
    info(Button::DpadRight, BUTTONS_BYTE_1, 0x02),
    info(Button::DpadLeft, BUTTONS_BYTE_1, 0x04),
    info(Button::DpadUp, BUTTONS_BYTE_1, 0x08),
    info(Button::L, BUTTONS_BYTE_1, 0x10),
    info(Button::Zl, BUTTONS_BYTE_1, 0x20),
    info(Button::Home, BUTTONS_BYTE_2, 0x01),
    info(Button::Capture, BUTTONS_BYTE_2, 0x02),
    info(Button::Gr, BUTTONS_BYTE_2, 0x04),
    info(Button::Gl, BUTTONS_BYTE_2, 0x08),
    info(Button::Chat, BUTTONS_BYTE_2, 0x10),
];

/// Set of pressed buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonSet(u32);

impl ButtonSet {
    /// No buttons pressed.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    #[must_use]
    pub fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Pressed buttons in report bit order.
    pub fn iter(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.iter().copied().filter(move |b| self.contains(*b))
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        let mut set = ButtonSet::empty();
        for button in iter {
            set.insert(button);
        }
        set
    }
}

impl Serialize for ButtonSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Raw 12-bit stick position (0-4095 per axis, 2048 = center).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickPosition {
    pub x: u16,
    pub y: u16,
}

impl StickPosition {
    /// Unpacks two 12-bit values from three bytes.
    ///
    /// `x` takes the first byte plus the low nibble of the second, `y` takes
    /// the high nibble of the second plus the third byte.
    #[must_use]
    pub fn from_packed(b0: u8, b1: u8, b2: u8) -> Self {
        Self {
            x: u16::from(b0) | (u16::from(b1 & 0x0F) << 8),
            y: u16::from(b1 >> 4) | (u16::from(b2) << 4),
        }
    }

    /// Position relative to center, each axis in [-2048, 2047].
    #[must_use]
    pub fn centered(&self) -> (i16, i16) {
        (
            self.x as i16 - STICK_VALUE_CENTER as i16,
            self.y as i16 - STICK_VALUE_CENTER as i16,
        )
    }

    /// Position normalized to [-1.0, 1.0).
    #[must_use]
    pub fn normalized(&self) -> (f32, f32) {
        (normalize_stick(self.x), normalize_stick(self.y))
    }
}

/// One decoded input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport {
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    /// Left analog trigger, uncalibrated
    pub left_trigger: u8,
    /// Right analog trigger, uncalibrated
    pub right_trigger: u8,
    pub buttons: ButtonSet,
}

impl InputReport {
    /// Decodes a raw input report.
    ///
    /// Returns `None` for reports shorter than 15 bytes; these are dropped
    /// without surfacing an error.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < MIN_REPORT_LEN {
            return None;
        }

        let buttons = BUTTON_TABLE
            .iter()
            .filter(|entry| data[entry.byte_index] & entry.mask != 0)
            .map(|entry| entry.button)
            .collect();

        let l = LEFT_STICK_OFFSET;
        let r = RIGHT_STICK_OFFSET;

        Some(Self {
            left_stick: StickPosition::from_packed(data[l], data[l + 1], data[l + 2]),
            right_stick: StickPosition::from_packed(data[r], data[r + 1], data[r + 2]),
            left_trigger: data[LEFT_TRIGGER_OFFSET],
            right_trigger: data[RIGHT_TRIGGER_OFFSET],
            buttons,
        })
    }

    #[must_use]
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons.contains(button)
    }

    /// Pressed buttons in report bit order.
    pub fn pressed_buttons(&self) -> impl Iterator<Item = Button> + '_ {
        self.buttons.iter()
    }
}

/// Display-facing controller state.
///
/// Sticks are normalized to [-1.0, 1.0); triggers are the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerState {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub buttons: ButtonSet,
}

impl ControllerState {
    /// Sticks centered, triggers and buttons released.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            left_x: 0.0,
            left_y: 0.0,
            right_x: 0.0,
            right_y: 0.0,
            left_trigger: 0,
            right_trigger: 0,
            buttons: ButtonSet::empty(),
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::neutral()
    }
}

impl From<&InputReport> for ControllerState {
    fn from(report: &InputReport) -> Self {
        let (left_x, left_y) = report.left_stick.normalized();
        let (right_x, right_y) = report.right_stick.normalized();
        Self {
            left_x,
            left_y,
            right_x,
            right_y,
            left_trigger: report.left_trigger,
            right_trigger: report.right_trigger,
            buttons: report.buttons,
        }
    }
}
