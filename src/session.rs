//! # Session Module
//!
//! Connection lifecycle: USB handshake, HID open, and switching between the
//! monitor and emulate loops.
//!
//! Every failure is published as a [`Status`] and also returned to the
//! caller. Nothing is retried.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --connect--> Monitoring --start_emulation--> Emulating
//!  ^                    |  ^                            |
//!  |                    |  +-------stop_emulation-------+
//!  +----disconnect------+-------------------------------+
//! ```
//!
//! A read error ends the active loop on its own; [`Session::reap`] notices
//! and returns the session to idle.

use tracing::{debug, info};

use crate::config::{Config, DeviceConfig};
use crate::controller::mapper::XboxMapper;
use crate::display::StatePublisher;
use crate::emulation;
use crate::error::{GcEnablerError, Result};
use crate::hid::{HidReader, ReportSource};
use crate::input_loop::{ExitReason, InputLoop, LoopExit, LoopMode, LoopSettings, PadFactory};
use crate::status::{Status, StatusReporter};
use crate::usb;

/// Hardware access used by the session.
pub trait Backend {
    /// Run the USB handshake.
    fn initialize_usb(&self, device: &DeviceConfig, reporter: &StatusReporter) -> Result<()>;

    /// Open the HID interface.
    fn open_hid(&self, device: &DeviceConfig) -> Result<Box<dyn ReportSource>>;

    /// Whether a virtual controller backend exists on this system.
    fn emulation_available(&self) -> bool;

    /// Factory run on the emulate loop thread to plug in the virtual pad.
    fn pad_factory(&self) -> PadFactory;
}

/// libusb + hidapi + platform virtual pad.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackend;

impl Backend for SystemBackend {
    fn initialize_usb(&self, device: &DeviceConfig, reporter: &StatusReporter) -> Result<()> {
        usb::initialize(device, reporter)
    }

    fn open_hid(&self, device: &DeviceConfig) -> Result<Box<dyn ReportSource>> {
        Ok(Box::new(HidReader::open(device.vendor_id, device.product_id)?))
    }

    fn emulation_available(&self) -> bool {
        emulation::emulation_available()
    }

    fn pad_factory(&self) -> PadFactory {
        Box::new(emulation::create_virtual_pad)
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Monitoring,
    Emulating,
}

/// One controller connection.
pub struct Session<B: Backend = SystemBackend> {
    backend: B,
    config: Config,
    reporter: StatusReporter,
    publisher: StatePublisher,
    input_loop: Option<InputLoop>,
}

impl<B: Backend> std::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Session<B> {
    #[must_use]
    pub fn new(
        backend: B,
        config: Config,
        reporter: StatusReporter,
        publisher: StatePublisher,
    ) -> Self {
        Self {
            backend,
            config,
            reporter,
            publisher,
            input_loop: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.input_loop.as_ref().map(InputLoop::mode) {
            None => SessionState::Idle,
            Some(LoopMode::Monitor) => SessionState::Monitoring,
            Some(LoopMode::Emulate) => SessionState::Emulating,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.input_loop.is_some()
    }

    #[must_use]
    pub fn is_emulating(&self) -> bool {
        self.state() == SessionState::Emulating
    }

    /// Run the USB handshake, open HID and start the monitor loop.
    ///
    /// Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound` / `Usb`: the handshake failed
    /// - `Hid`: the HID interface could not be opened
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        if let Err(e) = self.backend.initialize_usb(&self.config.device, &self.reporter) {
            self.reporter.report(match &e {
                GcEnablerError::DeviceNotFound => Status::DeviceNotFound,
                other => Status::UsbInitFailed(other.to_string()),
            });
            return Err(e);
        }

        self.reporter.report(Status::ConnectingHid);
        let source = match self.backend.open_hid(&self.config.device) {
            Ok(source) => source,
            Err(e) => {
                self.reporter.report(Status::HidFailed(e.to_string()));
                return Err(e);
            }
        };
        self.reporter.report(Status::ConnectedHid);

        self.start_monitor(source)
    }

    /// Stop any loop, close the device and publish a neutral state.
    pub fn disconnect(&mut self) {
        if let Some(input_loop) = self.input_loop.take() {
            if let Some(exit) = input_loop.stop() {
                debug!("Closing HID device ({:?})", exit.reason);
            }
        }

        self.publisher.reset();
        self.reporter.report(Status::Disconnected);
    }

    /// Connect if idle, disconnect otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Session::connect`].
    pub fn toggle_connection(&mut self) -> Result<()> {
        if self.is_connected() {
            self.disconnect();
            Ok(())
        } else {
            self.connect()
        }
    }

    /// Replace the monitor loop with an emulate loop.
    ///
    /// If the virtual pad cannot be created the session falls back to
    /// monitoring.
    ///
    /// # Errors
    ///
    /// - `NotConnected`: no controller, or it disconnected meanwhile
    /// - `EmulationUnavailable`: no virtual controller backend
    /// - `Emulation`: the virtual controller driver failed
    pub fn start_emulation(&mut self) -> Result<()> {
        if self.is_emulating() {
            return Ok(());
        }
        if !self.is_connected() {
            return Err(GcEnablerError::NotConnected);
        }
        if !self.backend.emulation_available() {
            let e = GcEnablerError::EmulationUnavailable(std::env::consts::OS.to_string());
            self.reporter.report(Status::EmulationFailed(e.to_string()));
            return Err(e);
        }

        let source = self.take_source()?;
        let mapper = XboxMapper::new(self.config.trigger_calibrations());

        match InputLoop::start_emulate(
            source,
            LoopSettings::from_config(&self.config),
            mapper,
            self.backend.pad_factory(),
            self.publisher.clone(),
            self.reporter.clone(),
        ) {
            Ok(input_loop) => {
                self.input_loop = Some(input_loop);
                self.reporter.report(Status::EmulationActive);
                Ok(())
            }
            Err(failure) => {
                self.reporter
                    .report(Status::EmulationFailed(failure.error.to_string()));
                match failure.source {
                    Some(source) => self.start_monitor(source)?,
                    None => self.publisher.reset(),
                }
                Err(failure.error)
            }
        }
    }

    /// Replace the emulate loop with a monitor loop.
    ///
    /// The virtual pad is reset to neutral and unplugged.
    ///
    /// # Errors
    ///
    /// `NotConnected` if the controller disconnected meanwhile.
    pub fn stop_emulation(&mut self) -> Result<()> {
        if !self.is_emulating() {
            return Ok(());
        }

        let source = self.take_source()?;
        self.start_monitor(source)?;
        self.reporter.report(Status::ConnectedHid);
        info!("Xbox 360 emulation stopped");
        Ok(())
    }

    /// Start emulation if monitoring, stop it if emulating.
    ///
    /// # Errors
    ///
    /// Same as [`Session::start_emulation`] / [`Session::stop_emulation`].
    pub fn toggle_emulation(&mut self) -> Result<()> {
        if self.is_emulating() {
            self.stop_emulation()
        } else {
            self.start_emulation()
        }
    }

    /// Collect a loop that ended on its own.
    ///
    /// Returns `true` if the connection was lost. The loop has already
    /// published the read error.
    pub fn reap(&mut self) -> bool {
        let finished = self
            .input_loop
            .as_ref()
            .map_or(false, InputLoop::is_finished);

        if finished {
            if let Some(exit) = self.input_loop.take().and_then(InputLoop::stop) {
                info!("Controller connection lost ({:?})", exit.reason);
            }
            self.publisher.reset();
        }
        finished
    }

    fn start_monitor(&mut self, source: Box<dyn ReportSource>) -> Result<()> {
        match InputLoop::start_monitor(
            source,
            LoopSettings::from_config(&self.config),
            self.publisher.clone(),
            self.reporter.clone(),
        ) {
            Ok(input_loop) => {
                self.input_loop = Some(input_loop);
                Ok(())
            }
            Err(failure) => {
                self.publisher.reset();
                Err(failure.error)
            }
        }
    }

    /// Stop the active loop and take back its source.
    fn take_source(&mut self) -> Result<Box<dyn ReportSource>> {
        let exit = self.input_loop.take().and_then(InputLoop::stop);

        match exit {
            Some(LoopExit {
                source,
                reason: ExitReason::Cancelled | ExitReason::PadFailed,
            }) => Ok(source),
            _ => {
                self.publisher.reset();
                Err(GcEnablerError::NotConnected)
            }
        }
    }
}
