//! # Input Loop
//!
//! Background polling of the controller's HID reports.
//!
//! The loop runs on a dedicated `std::thread` (not tokio) for steady
//! millisecond polling. It exclusively owns the report source and, in
//! emulate mode, the virtual pad. Each iteration:
//!
//! 1. Reads one report, waiting up to the read timeout
//! 2. Decodes it; short reports are skipped
//! 3. In emulate mode, maps it and updates the virtual pad
//! 4. Every Nth decoded report, publishes the display state
//! 5. Sleeps for the poll interval
//!
//! A read error ends the loop. Either way the source is handed back
//! through [`InputLoop::stop`] so the next loop can reuse it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::controller::mapper::XboxMapper;
use crate::controller::report::{ControllerState, InputReport};
use crate::display::StatePublisher;
use crate::emulation::VirtualPad;
use crate::error::{GcEnablerError, Result};
use crate::hid::ReportSource;
use crate::status::{Status, StatusReporter};

/// Creates the virtual pad on the loop thread.
pub type PadFactory = Box<dyn FnOnce() -> Result<Box<dyn VirtualPad>> + Send>;

/// What the loop does with each report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Display only
    Monitor,
    /// Display and forward to a virtual Xbox 360 pad
    Emulate,
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::Monitor => write!(f, "monitor"),
            LoopMode::Emulate => write!(f, "emulate"),
        }
    }
}

/// Why a loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Stopped through its running flag
    Cancelled,
    /// The source failed; the device is gone
    Disconnected(String),
    /// The virtual pad could not be created
    PadFailed,
}

/// A finished loop's result: the source it owned and why it stopped.
pub struct LoopExit {
    pub source: Box<dyn ReportSource>,
    pub reason: ExitReason,
}

impl fmt::Debug for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopExit")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// A loop that failed to start.
///
/// `source` is `None` only if the thread could not be spawned or panicked.
pub struct StartFailure {
    pub source: Option<Box<dyn ReportSource>>,
    pub error: GcEnablerError,
}

impl fmt::Debug for StartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartFailure")
            .field("has_source", &self.source.is_some())
            .field("error", &self.error)
            .finish()
    }
}

/// Timing and sizing of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub read_timeout: Duration,
    pub poll_interval: Duration,
    pub report_size: usize,
    pub update_every: u32,
}

impl LoopSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            read_timeout: config.device.read_timeout(),
            poll_interval: config.device.poll_interval(),
            report_size: config.device.report_size,
            update_every: config.display.update_every,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Counts decoded reports and decides which ones reach the display.
#[derive(Debug, Clone)]
pub struct FrameCounter {
    update_every: u64,
    frames: u64,
}

impl FrameCounter {
    /// `update_every` of 0 is treated as 1.
    #[must_use]
    pub fn new(update_every: u32) -> Self {
        Self {
            update_every: u64::from(update_every.max(1)),
            frames: 0,
        }
    }

    /// Count one report; `true` on every Nth.
    pub fn tick(&mut self) -> bool {
        self.frames += 1;
        self.frames % self.update_every == 0
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Handle to the running loop thread.
///
/// Dropping the handle stops the loop and discards its source.
pub struct InputLoop {
    mode: LoopMode,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<LoopExit>>,
}

impl fmt::Debug for InputLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputLoop")
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Everything the loop thread owns besides the source.
struct LoopContext {
    settings: LoopSettings,
    mapper: XboxMapper,
    publisher: StatePublisher,
    reporter: StatusReporter,
    running: Arc<AtomicBool>,
}

impl InputLoop {
    /// Start a display-only loop.
    ///
    /// # Errors
    ///
    /// Fails only if the thread cannot be spawned.
    pub fn start_monitor(
        source: Box<dyn ReportSource>,
        settings: LoopSettings,
        publisher: StatePublisher,
        reporter: StatusReporter,
    ) -> std::result::Result<Self, StartFailure> {
        let running = Arc::new(AtomicBool::new(true));
        let ctx = LoopContext {
            settings,
            mapper: XboxMapper::default(),
            publisher,
            reporter,
            running: running.clone(),
        };

        let handle = spawn(LoopMode::Monitor, move || run(source, None, ctx))?;

        Ok(Self {
            mode: LoopMode::Monitor,
            running,
            handle: Some(handle),
        })
    }

    /// Start a loop that also forwards to a virtual pad.
    ///
    /// The pad is created on the loop thread; this call blocks until it
    /// is plugged in or has failed.
    ///
    /// # Errors
    ///
    /// Returns the factory's error together with the source.
    pub fn start_emulate(
        source: Box<dyn ReportSource>,
        settings: LoopSettings,
        mapper: XboxMapper,
        factory: PadFactory,
        publisher: StatePublisher,
        reporter: StatusReporter,
    ) -> std::result::Result<Self, StartFailure> {
        let running = Arc::new(AtomicBool::new(true));
        let ctx = LoopContext {
            settings,
            mapper,
            publisher,
            reporter,
            running: running.clone(),
        };
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let handle = spawn(LoopMode::Emulate, move || match factory() {
            Ok(pad) => {
                let _ = ready_tx.send(Ok(()));
                run(source, Some(pad), ctx)
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                ctx.running.store(false, Ordering::SeqCst);
                LoopExit {
                    source,
                    reason: ExitReason::PadFailed,
                }
            }
        })?;

        let mut input_loop = Self {
            mode: LoopMode::Emulate,
            running,
            handle: Some(handle),
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(input_loop),
            Ok(Err(error)) => Err(StartFailure {
                source: input_loop.join().map(|exit| exit.source),
                error,
            }),
            Err(_) => Err(StartFailure {
                source: input_loop.join().map(|exit| exit.source),
                error: GcEnablerError::Emulation("input loop ended before the pad was ready".into()),
            }),
        }
    }

    #[must_use]
    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    /// Whether the loop is still polling.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the thread has exited on its own (or was stopped).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it.
    ///
    /// Returns `None` if the thread panicked.
    pub fn stop(mut self) -> Option<LoopExit> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    fn join(&mut self) -> Option<LoopExit> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                error!("Input loop thread panicked");
                None
            }
        }
    }
}

impl Drop for InputLoop {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.join();
    }
}

fn spawn<F>(mode: LoopMode, body: F) -> std::result::Result<JoinHandle<LoopExit>, StartFailure>
where
    F: FnOnce() -> LoopExit + Send + 'static,
{
    thread::Builder::new()
        .name(format!("gc-{}-loop", mode))
        .spawn(body)
        .map_err(|e| StartFailure {
            source: None,
            error: GcEnablerError::Io(e),
        })
}

fn run(
    mut source: Box<dyn ReportSource>,
    mut pad: Option<Box<dyn VirtualPad>>,
    ctx: LoopContext,
) -> LoopExit {
    let LoopContext {
        settings,
        mapper,
        publisher,
        reporter,
        running,
    } = ctx;

    let mut buf = vec![0u8; settings.report_size];
    let mut frames = FrameCounter::new(settings.update_every);
    let mut pad_failing = false;

    info!(
        "Input loop started ({})",
        if pad.is_some() { LoopMode::Emulate } else { LoopMode::Monitor }
    );

    let reason = loop {
        if !running.load(Ordering::SeqCst) {
            break ExitReason::Cancelled;
        }

        match source.read_report(&mut buf, settings.read_timeout) {
            Ok(0) => {}
            Ok(len) => {
                let len = len.min(buf.len());
                match InputReport::parse(&buf[..len]) {
                    Some(report) => {
                        if let Some(pad) = pad.as_mut() {
                            match pad.update(&mapper.map_report(&report)) {
                                Ok(()) => pad_failing = false,
                                Err(e) if !pad_failing => {
                                    warn!("Virtual controller update failed: {}", e);
                                    pad_failing = true;
                                }
                                Err(e) => debug!("Virtual controller update failed: {}", e),
                            }
                        }

                        if frames.tick() {
                            publisher.publish(ControllerState::from(&report));
                        }
                    }
                    None => trace!("Skipping short report ({} bytes)", len),
                }
            }
            Err(e) => {
                reporter.report(Status::ReadLoopError(e.to_string()));
                break ExitReason::Disconnected(e.to_string());
            }
        }

        if !settings.poll_interval.is_zero() {
            thread::sleep(settings.poll_interval);
        }
    };

    running.store(false, Ordering::SeqCst);

    if let Some(mut pad) = pad {
        if let Err(e) = pad.reset() {
            warn!("Failed to reset virtual controller: {}", e);
        }
    }

    info!(
        "Input loop stopped after {} reports: {:?}",
        frames.frames(),
        reason
    );
    LoopExit { source, reason }
}
