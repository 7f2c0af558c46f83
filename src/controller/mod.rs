//! # Controller Module
//!
//! GameCube-style USB controller input handling.
//!
//! This module handles:
//! - Hardware IDs, initialization reports and report layout
//! - Decoding raw HID input reports
//! - Stick normalization and trigger calibration
//! - Mapping decoded reports to Xbox 360 reports

pub mod calibration;
pub mod mapper;
pub mod protocol;
pub mod report;
