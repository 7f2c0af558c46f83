//! # GameCube Controller Protocol Constants
//!
//! Hardware IDs, the USB initialization reports and the byte layout of the
//! HID input report.

/// Nintendo vendor ID
pub const GC_VENDOR_ID: u16 = 0x057e;

/// GameCube-style USB controller product ID
pub const GC_PRODUCT_ID: u16 = 0x2073;

/// USB interface that accepts the initialization reports
pub const GC_USB_INTERFACE: u8 = 1;

/// Bulk OUT endpoint for the initialization reports
pub const GC_USB_ENDPOINT_OUT: u8 = 0x02;

/// Timeout for each initialization write in milliseconds
pub const GC_USB_TIMEOUT_MS: u64 = 2000;

/// Size of each initialization report
pub const GC_INIT_REPORT_SIZE: usize = 16;

/// Switches the controller into full HID reporting mode
pub const DEFAULT_REPORT_DATA: [u8; GC_INIT_REPORT_SIZE] = [
    0x03, 0x91, 0x00, 0x0d, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Sets the player LED
pub const SET_LED_DATA: [u8; GC_INIT_REPORT_SIZE] = [
    0x09, 0x91, 0x00, 0x07, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Size of the buffer handed to each HID read
pub const HID_READ_BUFFER_SIZE: usize = 64;

/// Minimum length of a decodable input report (through the right trigger byte)
pub const MIN_REPORT_LEN: usize = 15;

/// Offsets of the three button bytes
pub const BUTTONS_BYTE_0: usize = 3;
pub const BUTTONS_BYTE_1: usize = 4;
pub const BUTTONS_BYTE_2: usize = 5;

/// First byte of the packed left stick (x: 12 bits, y: 12 bits)
pub const LEFT_STICK_OFFSET: usize = 6;

/// First byte of the packed right stick
pub const RIGHT_STICK_OFFSET: usize = 9;

/// Left analog trigger byte
pub const LEFT_TRIGGER_OFFSET: usize = 13;

/// Right analog trigger byte
pub const RIGHT_TRIGGER_OFFSET: usize = 14;

/// Stick range (12-bit: 0-4095)
pub const STICK_VALUE_MAX: u16 = 4095;
pub const STICK_VALUE_CENTER: u16 = 2048;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_ids() {
        assert_eq!(GC_VENDOR_ID, 0x057e, "Nintendo vendor ID should be 0x057e");
        assert_eq!(GC_PRODUCT_ID, 0x2073);
    }

    #[test]
    fn test_init_reports_share_header_layout() {
        assert_eq!(DEFAULT_REPORT_DATA[0], 0x03);
        assert_eq!(SET_LED_DATA[0], 0x09);
        assert_eq!(DEFAULT_REPORT_DATA[1..3], SET_LED_DATA[1..3]);
        assert_eq!(DEFAULT_REPORT_DATA[4..10], SET_LED_DATA[4..10]);
    }

    #[test]
    fn test_report_layout_fits_minimum_length() {
        assert!(RIGHT_TRIGGER_OFFSET < MIN_REPORT_LEN);
        assert!(RIGHT_STICK_OFFSET + 2 < LEFT_TRIGGER_OFFSET);
        assert!(MIN_REPORT_LEN <= HID_READ_BUFFER_SIZE);
    }
}
