//! # Error Types
//!
//! Custom error types for GC Enabler using `thiserror`.

use thiserror::Error;

/// Main error type for GC Enabler
#[derive(Debug, Error)]
pub enum GcEnablerError {
    /// No controller with the configured vendor/product ID is attached
    #[error("Device not found")]
    DeviceNotFound,

    /// libusb errors during the initialization handshake
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// hidapi errors while opening or reading the controller
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Virtual controller driver errors
    #[error("Emulation error: {0}")]
    Emulation(String),

    /// No virtual controller backend on this system
    #[error("Xbox 360 emulation not available: {0}")]
    EmulationUnavailable(String),

    /// Operation needs a connected controller
    #[error("Controller is not connected")]
    NotConnected,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Configuration write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// JSON display record errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for GC Enabler
pub type Result<T> = std::result::Result<T, GcEnablerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_message() {
        assert_eq!(GcEnablerError::DeviceNotFound.to_string(), "Device not found");
    }

    #[test]
    fn test_usb_error_converts() {
        let err: GcEnablerError = rusb::Error::Timeout.into();
        assert!(matches!(err, GcEnablerError::Usb(rusb::Error::Timeout)));
        assert!(err.to_string().starts_with("USB error:"));
    }

    #[test]
    fn test_emulation_unavailable_message() {
        let err = GcEnablerError::EmulationUnavailable("macOS".into());
        assert_eq!(err.to_string(), "Xbox 360 emulation not available: macOS");
    }
}
