//! # USB Initialization Module
//!
//! Raw USB handshake that switches the controller into HID reporting mode.
//!
//! Out of the box the controller enumerates but stays silent on its HID
//! interface. Two fixed 16-byte reports written to the bulk OUT endpoint
//! of interface 1 enable full input reports and set the player LED.
//!
//! This module handles:
//! - Locating the device by vendor/product ID via libusb (`rusb`)
//! - Selecting the configuration and claiming the interface, tolerating
//!   "already configured" and "already claimed" failures
//! - Writing the mode and LED reports in order
//! - Releasing the interface afterwards

use std::time::Duration;

use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::controller::protocol::{DEFAULT_REPORT_DATA, SET_LED_DATA};
use crate::error::{GcEnablerError, Result};
use crate::status::{Status, StatusReporter};

/// Configuration value selected before claiming the interface
const USB_CONFIGURATION: u8 = 1;

/// Raw USB operations used by the handshake.
#[cfg_attr(test, mockall::automock)]
pub trait UsbTransport {
    /// Select the active configuration.
    fn set_configuration(&mut self, config: u8) -> Result<()>;

    /// Claim an interface for this process.
    fn claim_interface(&mut self, iface: u8) -> Result<()>;

    /// Write a report to an OUT endpoint, returning the bytes written.
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Release a claimed interface.
    fn release_interface(&mut self, iface: u8) -> Result<()>;
}

/// libusb-backed transport.
pub struct RusbTransport {
    handle: DeviceHandle<GlobalContext>,
}

impl std::fmt::Debug for RusbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusbTransport").finish_non_exhaustive()
    }
}

impl RusbTransport {
    /// Open the first device matching the IDs.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: no matching device is attached
    /// - `Usb`: the device exists but could not be opened
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self> {
        debug!(
            "Opening USB device {:04x}:{:04x}",
            vendor_id, product_id
        );

        let device = rusb::devices()?
            .iter()
            .find(|device| {
                device
                    .device_descriptor()
                    .map(|desc| desc.vendor_id() == vendor_id && desc.product_id() == product_id)
                    .unwrap_or(false)
            })
            .ok_or(GcEnablerError::DeviceNotFound)?;

        let mut handle = device.open()?;

        // Not supported on every platform
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Kernel driver auto-detach unavailable: {}", e);
        }

        Ok(Self { handle })
    }
}

impl UsbTransport for RusbTransport {
    fn set_configuration(&mut self, config: u8) -> Result<()> {
        Ok(self.handle.set_active_configuration(config)?)
    }

    fn claim_interface(&mut self, iface: u8) -> Result<()> {
        Ok(self.handle.claim_interface(iface)?)
    }

    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> Result<usize> {
        Ok(self.handle.write_bulk(endpoint, data, timeout)?)
    }

    fn release_interface(&mut self, iface: u8) -> Result<()> {
        Ok(self.handle.release_interface(iface)?)
    }
}

/// Locate the controller and run the handshake.
///
/// Reports `LookingForDevice` and `DeviceFound`; the remaining statuses
/// come from [`send_init_reports`].
///
/// # Errors
///
/// - `DeviceNotFound`: nothing with the configured IDs is attached
/// - `Usb`: opening the device or writing a report failed
pub fn initialize(device: &DeviceConfig, reporter: &StatusReporter) -> Result<()> {
    reporter.report(Status::LookingForDevice);

    let mut transport = RusbTransport::open(device.vendor_id, device.product_id)?;
    reporter.report(Status::DeviceFound);

    send_init_reports(&mut transport, device, reporter)
}

/// Send the mode and LED reports over an open transport.
///
/// Configuration, claim and release failures are logged and ignored: the
/// device is often already configured or claimed by a previous run.
///
/// # Errors
///
/// Returns the first failed write.
pub fn send_init_reports<T: UsbTransport + ?Sized>(
    transport: &mut T,
    device: &DeviceConfig,
    reporter: &StatusReporter,
) -> Result<()> {
    if let Err(e) = transport.set_configuration(USB_CONFIGURATION) {
        debug!("set_configuration failed (may already be configured): {}", e);
    }

    if let Err(e) = transport.claim_interface(device.usb_interface) {
        debug!(
            "claim_interface({}) failed (may already be claimed): {}",
            device.usb_interface, e
        );
    }

    let timeout = Duration::from_millis(device.usb_timeout_ms);

    reporter.report(Status::SendingInitData);
    write_report(transport, device.usb_endpoint, &DEFAULT_REPORT_DATA, timeout)?;

    reporter.report(Status::SendingLedData);
    write_report(transport, device.usb_endpoint, &SET_LED_DATA, timeout)?;

    if let Err(e) = transport.release_interface(device.usb_interface) {
        debug!("release_interface({}) failed: {}", device.usb_interface, e);
    }

    reporter.report(Status::UsbInitComplete);
    info!("Controller switched to HID reporting mode");
    Ok(())
}

fn write_report<T: UsbTransport + ?Sized>(
    transport: &mut T,
    endpoint: u8,
    data: &[u8],
    timeout: Duration,
) -> Result<()> {
    let written = transport.write(endpoint, data, timeout)?;
    if written < data.len() {
        warn!(
            "Short USB write on endpoint 0x{:02x}: {} of {} bytes",
            endpoint,
            written,
            data.len()
        );
    } else {
        debug!("Wrote {} bytes to endpoint 0x{:02x}", written, endpoint);
    }
    Ok(())
}
