//! # GC Enabler Library
//!
//! Use a GameCube-style USB controller on a PC.
//!
//! The controller stays silent until a USB handshake switches it into HID
//! reporting mode. This library performs that handshake, decodes the
//! controller's input reports, and can forward them to a virtual Xbox 360
//! controller (ViGEmBus on Windows, uinput on Linux).

pub mod config;
pub mod controller;
pub mod display;
pub mod emulation;
pub mod error;
pub mod hid;
pub mod input_loop;
pub mod session;
pub mod status;
pub mod usb;
