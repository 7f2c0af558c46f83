//! # Emulation Module
//!
//! Virtual Xbox 360 controller output.
//!
//! This module handles:
//! - The XUSB report handed to the virtual controller
//! - The [`VirtualPad`] seam implemented by each platform backend
//! - ViGEmBus on Windows, uinput on Linux

use crate::error::{GcEnablerError, Result};

#[cfg(target_os = "linux")]
pub mod uinput;
#[cfg(windows)]
pub mod vigem;

/// XUSB button bits.
pub mod buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const GUIDE: u16 = 0x0400;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Xbox 360 gamepad report.
///
/// Same field layout as the XInput `XINPUT_GAMEPAD` structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XusbReport {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl XusbReport {
    #[must_use]
    pub fn is_pressed(&self, button: u16) -> bool {
        self.buttons & button != 0
    }
}

/// A plugged-in virtual Xbox 360 controller.
///
/// Implementations own their driver handle; dropping the pad unplugs it.
#[cfg_attr(test, mockall::automock)]
pub trait VirtualPad {
    /// Submit a full report.
    fn update(&mut self, report: &XusbReport) -> Result<()>;

    /// Return every input to neutral and submit it.
    fn reset(&mut self) -> Result<()> {
        self.update(&XusbReport::default())
    }
}

/// Whether this build has a virtual controller backend.
#[must_use]
pub fn emulation_available() -> bool {
    cfg!(any(windows, target_os = "linux"))
}

/// Plug in a virtual Xbox 360 controller with the platform backend.
///
/// # Errors
///
/// - `EmulationUnavailable`: no backend for this platform
/// - `Emulation`: the driver rejected the request (e.g. ViGEmBus not installed)
pub fn create_virtual_pad() -> Result<Box<dyn VirtualPad>> {
    #[cfg(windows)]
    {
        Ok(Box::new(vigem::ViGEmPad::plug_in()?))
    }
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(uinput::UinputPad::create()?))
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Err(GcEnablerError::EmulationUnavailable(
            std::env::consts::OS.to_string(),
        ))
    }
}

/// Converts a driver error into [`GcEnablerError::Emulation`].
pub(crate) fn emulation_error(context: &str, err: impl std::fmt::Display) -> GcEnablerError {
    GcEnablerError::Emulation(format!("{}: {}", context, err))
}
