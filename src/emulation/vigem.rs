//! ViGEmBus backend (Windows-only).
//!
//! ViGEmBus is a virtual gamepad bus driver that creates virtual Xbox 360 /
//! DualShock 4 controllers visible to XInput.
//!
//! Reference: https://github.com/nefarius/ViGEmBus
//! Rust crate: https://github.com/CasualX/vigem-client

use tracing::info;
use vigem_client::{Client, TargetId, XButtons, XGamepad, Xbox360Wired};

use super::{emulation_error, VirtualPad, XusbReport};
use crate::error::Result;

/// A wired Xbox 360 target plugged into ViGEmBus.
///
/// The target unplugs itself when dropped.
pub struct ViGEmPad {
    target: Xbox360Wired<Client>,
}

impl ViGEmPad {
    /// Connect to the bus, plug in a target and wait for the driver to
    /// accept reports.
    pub fn plug_in() -> Result<Self> {
        let client = Client::connect().map_err(|e| emulation_error("ViGEmBus connect", e))?;

        let mut target = Xbox360Wired::new(client, TargetId::XBOX360_WIRED);
        target
            .plugin()
            .map_err(|e| emulation_error("ViGEmBus plugin", e))?;
        target
            .wait_ready()
            .map_err(|e| emulation_error("ViGEmBus wait_ready", e))?;

        info!("Virtual Xbox 360 controller plugged into ViGEmBus");
        Ok(Self { target })
    }
}

impl VirtualPad for ViGEmPad {
    fn update(&mut self, report: &XusbReport) -> Result<()> {
        let gamepad = XGamepad {
            buttons: XButtons {
                raw: report.buttons,
            },
            left_trigger: report.left_trigger,
            right_trigger: report.right_trigger,
            thumb_lx: report.thumb_lx,
            thumb_ly: report.thumb_ly,
            thumb_rx: report.thumb_rx,
            thumb_ry: report.thumb_ry,
        };
        self.target
            .update(&gamepad)
            .map_err(|e| emulation_error("ViGEmBus update", e))
    }
}
