//! # Configuration Module
//!
//! Handles loading, validating and saving configuration as TOML.
//!
//! Every field has a default, so a missing file or an empty section yields
//! a working configuration for the stock controller.

use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::controller::calibration::{TriggerCalibrations, TriggerMode};
use crate::controller::protocol::{
    GC_PRODUCT_ID, GC_USB_ENDPOINT_OUT, GC_USB_INTERFACE, GC_USB_TIMEOUT_MS, GC_VENDOR_ID,
    HID_READ_BUFFER_SIZE, MIN_REPORT_LEN,
};
use crate::error::{GcEnablerError, Result};

/// Directory under the platform config dir
const APP_DIR_NAME: &str = "gc-enabler";

/// Settings file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Largest HID read buffer accepted
const MAX_REPORT_SIZE: usize = 512;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub triggers: TriggerConfig,
    pub emulation: EmulationConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Controller IDs and USB/HID timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_id")]
    pub product_id: u16,

    #[serde(default = "default_usb_interface")]
    pub usb_interface: u8,

    #[serde(default = "default_usb_endpoint")]
    pub usb_endpoint: u8,

    #[serde(default = "default_usb_timeout_ms")]
    pub usb_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_report_size")]
    pub report_size: usize,
}

/// Analog trigger calibration, in raw trigger units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_trigger_base")]
    pub left_base: f32,

    #[serde(default = "default_trigger_bump")]
    pub left_bump: f32,

    #[serde(default = "default_trigger_max")]
    pub left_max: f32,

    #[serde(default = "default_trigger_base")]
    pub right_base: f32,

    #[serde(default = "default_trigger_bump")]
    pub right_bump: f32,

    #[serde(default = "default_trigger_max")]
    pub right_max: f32,

    /// Trigger position that reads as 100%
    #[serde(default)]
    pub full_at: TriggerMode,
}

/// Virtual controller type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmulationTarget {
    #[default]
    Xbox360,
    /// Accepted by the parser so the error names it; never emulated
    Dualshock,
}

/// Emulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmulationConfig {
    #[serde(default)]
    pub target: EmulationTarget,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Publish every Nth decoded report
    #[serde(default = "default_update_every")]
    pub update_every: u32,
}

/// Log output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily log files; empty logs to stderr only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_vendor_id() -> u16 { GC_VENDOR_ID }
fn default_product_id() -> u16 { GC_PRODUCT_ID }
fn default_usb_interface() -> u8 { GC_USB_INTERFACE }
fn default_usb_endpoint() -> u8 { GC_USB_ENDPOINT_OUT }
fn default_usb_timeout_ms() -> u64 { GC_USB_TIMEOUT_MS }
fn default_read_timeout_ms() -> u64 { 10 }
fn default_poll_interval_ms() -> u64 { 1 }
fn default_report_size() -> usize { HID_READ_BUFFER_SIZE }

fn default_trigger_base() -> f32 { 32.0 }
fn default_trigger_bump() -> f32 { 190.0 }
fn default_trigger_max() -> f32 { 230.0 }

fn default_update_every() -> u32 { 3 }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            usb_interface: default_usb_interface(),
            usb_endpoint: default_usb_endpoint(),
            usb_timeout_ms: default_usb_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            report_size: default_report_size(),
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            left_base: default_trigger_base(),
            left_bump: default_trigger_bump(),
            left_max: default_trigger_max(),
            right_base: default_trigger_base(),
            right_bump: default_trigger_bump(),
            right_max: default_trigger_max(),
            full_at: TriggerMode::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            update_every: default_update_every(),
        }
    }
}

impl LoggingConfig {
    /// Log directory, if file logging is enabled.
    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        if self.directory.trim().is_empty() {
            None
        } else {
            Some(Path::new(&self.directory))
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> GcEnablerError {
    GcEnablerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gc_enabler::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration, falling back to defaults if the file is missing
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for a file that exists.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns `Config` if parsing or validation fails.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string
    ///
    /// # Errors
    ///
    /// Returns `ConfigWrite` if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write configuration to a TOML file, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if validation fails or the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Default settings file location (`<config dir>/gc-enabler/config.toml`)
    ///
    /// `None` if the platform has no config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Trigger calibration for the mapper
    #[must_use]
    pub fn trigger_calibrations(&self) -> TriggerCalibrations {
        let t = &self.triggers;
        TriggerCalibrations::from_config(
            t.left_base,
            t.left_bump,
            t.left_max,
            t.right_base,
            t.right_bump,
            t.right_max,
            t.full_at,
        )
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        let device = &self.device;

        // Validate timing fields
        if device.usb_timeout_ms == 0 || device.usb_timeout_ms > 10000 {
            return Err(invalid("usb_timeout_ms must be between 1 and 10000"));
        }

        if device.read_timeout_ms == 0 || device.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        if device.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be at most 1000"));
        }

        if device.report_size < MIN_REPORT_LEN || device.report_size > MAX_REPORT_SIZE {
            return Err(invalid(format!(
                "report_size must be between {} and {}",
                MIN_REPORT_LEN, MAX_REPORT_SIZE
            )));
        }

        // Endpoint direction bit must be OUT
        if device.usb_endpoint & 0x80 != 0 {
            return Err(invalid("usb_endpoint must be an OUT endpoint"));
        }

        // Validate trigger calibration
        let t = &self.triggers;
        for (side, base, bump, max) in [
            ("left", t.left_base, t.left_bump, t.left_max),
            ("right", t.right_base, t.right_bump, t.right_max),
        ] {
            if !(0.0..255.0).contains(&base) {
                return Err(invalid(format!("{}_base must be between 0 and 254", side)));
            }
            for (name, value) in [("bump", bump), ("max", max)] {
                if value <= base || value > 255.0 {
                    return Err(invalid(format!(
                        "{}_{} must be above {}_base and at most 255",
                        side, name, side
                    )));
                }
            }
        }

        if self.display.update_every == 0 {
            return Err(invalid("update_every must be greater than 0"));
        }

        if self.emulation.target != EmulationTarget::Xbox360 {
            return Err(invalid(
                "emulation target must be 'xbox360' (only supported target)",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.device.vendor_id, 0x057e);
        assert_eq!(config.device.product_id, 0x2073);
        assert_eq!(config.device.usb_interface, 1);
        assert_eq!(config.device.usb_endpoint, 0x02);
        assert_eq!(config.device.read_timeout(), Duration::from_millis(10));
        assert_eq!(config.device.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.display.update_every, 3);
        assert_eq!(config.triggers.full_at, TriggerMode::Bump);
        assert!(config.logging.directory().is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config = Config::from_toml(
            r#"
[triggers]
left_base = 40.0
full_at = "press"
"#,
        )
        .unwrap();

        assert_eq!(config.triggers.left_base, 40.0);
        assert_eq!(config.triggers.left_bump, 190.0);
        assert_eq!(config.triggers.right_base, 32.0);
        assert_eq!(config.triggers.full_at, TriggerMode::Press);
        assert_eq!(config.device, DeviceConfig::default());
    }

    #[test]
    fn test_bundled_default_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../config/default.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_invalid_timeouts() {
        let mut config = Config::default();
        config.device.usb_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.read_timeout_ms = 10001;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.poll_interval_ms = 1001;
        assert!(config.validate().is_err());

        // Zero poll interval means no sleep between reads
        let mut config = Config::default();
        config.device.poll_interval_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_report_size() {
        let mut config = Config::default();
        config.device.report_size = 14;
        assert!(config.validate().is_err());

        config.device.report_size = 513;
        assert!(config.validate().is_err());

        config.device.report_size = 15;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint_direction() {
        let mut config = Config::default();
        config.device.usb_endpoint = 0x81;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_trigger_calibration() {
        let mut config = Config::default();
        config.triggers.left_bump = 20.0; // below base
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.triggers.right_max = 256.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.triggers.right_base = 255.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.triggers.left_base = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_update_every() {
        let mut config = Config::default();
        config.display.update_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dualshock_target_rejected() {
        let result = Config::from_toml("[emulation]\ntarget = \"dualshock\"\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("xbox360"));
    }

    #[test]
    fn test_unknown_trigger_mode_rejected() {
        assert!(Config::from_toml("[triggers]\nfull_at = \"halfway\"\n").is_err());
    }

    // ==================== File Tests ====================

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[device]
read_timeout_ms = 20
poll_interval_ms = 2

[display]
update_every = 5

[logging]
directory = "/tmp/gc-logs"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.device.read_timeout_ms, 20);
        assert_eq!(config.device.poll_interval_ms, 2);
        assert_eq!(config.display.update_every, 5);
        assert_eq!(config.logging.directory(), Some(Path::new("/tmp/gc-logs")));
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[display]\nupdate_every = 0\n")
            .unwrap();
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(GcEnablerError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        assert!(matches!(Config::load(&path), Err(GcEnablerError::Io(_))));
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.triggers.left_base = 28.0;
        config.triggers.right_max = 240.0;
        config.triggers.full_at = TriggerMode::Press;
        config.display.update_every = 1;

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.display.update_every = 0;
        assert!(config.save(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_trigger_calibrations_from_config() {
        let mut config = Config::default();
        config.triggers.left_base = 0.0;
        config.triggers.left_bump = 100.0;
        config.triggers.full_at = TriggerMode::Bump;

        let cal = config.trigger_calibrations();
        assert_eq!(cal.apply_left(100), 255);
        assert_eq!(cal.apply_right(32), 0);
        assert_eq!(cal.mode, TriggerMode::Bump);
    }

    #[test]
    fn test_default_path_file_name() {
        if let Some(path) = Config::default_path() {
            assert!(path.ends_with("gc-enabler/config.toml"));
        }
    }
}
