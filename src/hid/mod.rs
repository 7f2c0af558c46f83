//! # HID Module
//!
//! Opens the controller's HID interface and reads raw input reports.
//!
//! The handshake in [`crate::usb`] must have run first; until then the
//! device opens but never produces reports.

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info};

use crate::error::Result;

/// A source of raw input reports.
///
/// The input loop owns its source exclusively and moves it between
/// threads, hence `Send`.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSource: Send {
    /// Read one report into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Any error means the device is gone or unusable.
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

/// hidapi-backed report source.
pub struct HidReader {
    device: HidDevice,
}

impl std::fmt::Debug for HidReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidReader").finish_non_exhaustive()
    }
}

impl HidReader {
    /// Open the first HID device matching the IDs.
    ///
    /// # Errors
    ///
    /// Returns `Hid` if hidapi cannot be initialized or the device cannot
    /// be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gc_enabler::controller::protocol::{GC_PRODUCT_ID, GC_VENDOR_ID};
    /// use gc_enabler::hid::HidReader;
    ///
    /// let reader = HidReader::open(GC_VENDOR_ID, GC_PRODUCT_ID)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self> {
        let api = HidApi::new()?;
        let device = api.open(vendor_id, product_id)?;

        match device.get_product_string() {
            Ok(Some(product)) => info!("Opened HID device: {}", product),
            _ => info!("Opened HID device {:04x}:{:04x}", vendor_id, product_id),
        }

        Ok(Self { device })
    }
}

impl ReportSource for HidReader {
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let len = self.device.read_timeout(buf, timeout_ms)?;
        if len > 0 {
            debug!("HID report ({} bytes): {:02x?}", len, &buf[..len]);
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::protocol::{GC_PRODUCT_ID, GC_VENDOR_ID, HID_READ_BUFFER_SIZE};
    use crate::error::GcEnablerError;

    #[test]
    fn test_mock_source_fills_buffer() {
        let mut source = MockReportSource::new();
        source.expect_read_report().returning(|buf, _| {
            buf[..4].copy_from_slice(&[1, 2, 3, 4]);
            Ok(4)
        });

        let mut buf = [0u8; HID_READ_BUFFER_SIZE];
        let len = source
            .read_report(&mut buf, Duration::from_millis(10))
            .unwrap();
        assert_eq!(&buf[..len], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_mock_source_error() {
        let mut source = MockReportSource::new();
        source
            .expect_read_report()
            .returning(|_, _| Err(GcEnablerError::NotConnected));

        let mut buf = [0u8; HID_READ_BUFFER_SIZE];
        assert!(source.read_report(&mut buf, Duration::ZERO).is_err());
    }

    // Requires a controller attached and initialized
    #[test]
    #[ignore]
    fn test_read_real_device() {
        let mut reader = HidReader::open(GC_VENDOR_ID, GC_PRODUCT_ID).unwrap();
        let mut buf = [0u8; HID_READ_BUFFER_SIZE];
        let len = reader
            .read_report(&mut buf, Duration::from_millis(100))
            .unwrap();
        assert!(len <= HID_READ_BUFFER_SIZE);
    }
}
