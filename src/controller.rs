//! Controller - owns the render thread and the adopted configuration.
//!
//! Lifecycle: `Stopped` -> `Off` on [`Controller::start`], `Off` <->
//! `Running(program)` as the power bit changes, anything -> `Stopped` on
//! [`Controller::stop`] or on a strip failure. Only the render thread calls
//! the strip driver and only it replaces the adopted configuration.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use critical_section::Mutex;
use crossbeam_channel::Sender;
use embassy_time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::StripDriver;
use crate::change_handler::ChangeHandler;
use crate::channel::{InterruptChannel, InterruptToken};
use crate::checkpoint::{Checkpoint, Signal};
use crate::color::BLACK;
use crate::config::{Configuration, HardwareSpec, Program, decode};
use crate::error::{ControllerError, StripError};
use crate::frame_scheduler::FrameScheduler;
use crate::program::{ProgramSlot, ProgramTimings, StrandTestConfig, run_program};
use crate::registers::SnapshotSource;

const RENDER_THREAD_NAME: &str = "modled-render";
const DEFAULT_IDLE_POLL_MS: u64 = 50;

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Stopped,
    /// Render thread alive, strip dark, power bit clear
    Off,
    Running(Program),
}

/// Configuration for the controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub timings: ProgramTimings,
    /// Longest park between checkpoints while the strip is off
    pub idle_poll: Duration,
    pub strand_test: StrandTestConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timings: ProgramTimings::default(),
            idle_poll: Duration::from_millis(DEFAULT_IDLE_POLL_MS),
            strand_test: StrandTestConfig::default(),
        }
    }
}

struct Shared {
    state: Mutex<Cell<ControllerState>>,
    configuration: Mutex<Cell<Configuration>>,
    stop: AtomicBool,
}

impl Shared {
    fn state(&self) -> ControllerState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    fn set_state(&self, next: ControllerState) {
        let previous = critical_section::with(|cs| self.state.borrow(cs).replace(next));
        if previous != next {
            debug!(?previous, ?next, "controller state changed");
        }
    }

    fn configuration(&self) -> Configuration {
        critical_section::with(|cs| self.configuration.borrow(cs).get())
    }

    fn set_configuration(&self, configuration: Configuration) {
        critical_section::with(|cs| self.configuration.borrow(cs).set(configuration));
    }

    /// Publish `next`, then re-read the registers until they agree with it.
    ///
    /// The change handler diffs writes against the published value; a write
    /// between the read behind `next` and the publish is picked up by the
    /// re-read. `pinned` replaces the decoded hardware when set.
    fn adopt<S: SnapshotSource>(
        &self,
        source: &S,
        mut next: Configuration,
        pinned: Option<HardwareSpec>,
    ) -> Configuration {
        loop {
            if let Some(hardware) = pinned {
                next.hardware = hardware;
            }
            self.set_configuration(next);

            let latest = match read_configuration(source) {
                Ok(latest) => latest,
                Err(error) => {
                    warn!(%error, "cannot confirm adopted configuration");
                    return next;
                }
            };
            if !next.is_disruptive_change(&latest) {
                return next;
            }
            debug!(
                power = latest.power,
                program = %latest.program,
                "registers changed while adopting, re-reading"
            );
            next = latest;
        }
    }
}

fn read_configuration<S: SnapshotSource>(source: &S) -> Result<Configuration, ControllerError> {
    Ok(decode(&source.read_snapshot()?)?)
}

/// Cloneable read-only view of a controller, safe to use from any thread.
#[derive(Clone)]
pub struct ControllerStatus {
    shared: Arc<Shared>,
}

impl ControllerStatus {
    pub fn state(&self) -> ControllerState {
        self.shared.state()
    }

    /// Last configuration adopted by the render thread
    pub fn configuration(&self) -> Configuration {
        self.shared.configuration()
    }
}

struct RenderExit<D> {
    strip: D,
    result: Result<(), StripError>,
}

struct Lifecycle<D> {
    strip: Option<D>,
    handle: Option<JoinHandle<RenderExit<D>>>,
}

/// LED strip controller
pub struct Controller<D, S>
where
    D: StripDriver + 'static,
    S: SnapshotSource + 'static,
{
    config: ControllerConfig,
    source: Arc<S>,
    interrupts: Arc<InterruptChannel>,
    shared: Arc<Shared>,
    lifecycle: std::sync::Mutex<Lifecycle<D>>,
}

impl<D, S> Controller<D, S>
where
    D: StripDriver + 'static,
    S: SnapshotSource + 'static,
{
    pub fn new(
        config: ControllerConfig,
        strip: D,
        source: S,
        interrupts: Arc<InterruptChannel>,
    ) -> Self {
        Self {
            config,
            source: Arc::new(source),
            interrupts,
            shared: Arc::new(Shared {
                state: Mutex::new(Cell::new(ControllerState::Stopped)),
                configuration: Mutex::new(Cell::new(Configuration::default())),
                stop: AtomicBool::new(false),
            }),
            lifecycle: std::sync::Mutex::new(Lifecycle {
                strip: Some(strip),
                handle: None,
            }),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() != ControllerState::Stopped
    }

    /// Last configuration adopted by the render thread.
    ///
    /// Still valid after the controller stopped.
    pub fn current_configuration(&self) -> Configuration {
        self.shared.configuration()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn interrupts(&self) -> &Arc<InterruptChannel> {
        &self.interrupts
    }

    /// Change handler diffing against this controller
    pub fn change_handler(&self) -> ChangeHandler {
        ChangeHandler::new(self.status(), Arc::clone(&self.interrupts))
    }

    /// Read the configuration, initialize the strip and start rendering.
    ///
    /// Returns once the strip is initialized and the controller is `Off` (or
    /// already `Running`). Read, decode and strip initialization failures
    /// are returned and leave the controller `Stopped`.
    pub fn start(&self) -> Result<(), ControllerError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = lifecycle.handle.take() {
            if !handle.is_finished() {
                lifecycle.handle = Some(handle);
                return Err(ControllerError::AlreadyRunning);
            }
            let exit = handle.join().map_err(|_| ControllerError::RenderPanicked)?;
            if let Err(error) = exit.result {
                warn!(%error, "previous render run ended with a strip failure");
            }
            lifecycle.strip = Some(exit.strip);
        }

        // Tokens posted from here on describe writes the read below may miss
        if let Some((token, pending)) = self.interrupts.drain() {
            trace!(pending, address = token.address, "dropping interrupts queued while stopped");
        }
        let configuration = read_configuration(self.source.as_ref())?;
        let strip = lifecycle.strip.take().ok_or(ControllerError::StripLost)?;

        self.shared.stop.store(false, Ordering::Release);
        let configuration = self.shared.adopt(self.source.as_ref(), configuration, None);

        let worker = RenderWorker {
            strip,
            config: self.config.clone(),
            source: Arc::clone(&self.source),
            interrupts: Arc::clone(&self.interrupts),
            shared: Arc::clone(&self.shared),
            hardware: configuration.hardware,
            configuration,
        };
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || worker.run(&ready_tx))
            .map_err(ControllerError::ThreadSpawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    power = configuration.power,
                    program = %configuration.program,
                    leds = configuration.hardware.led_count,
                    "controller started"
                );
                lifecycle.handle = Some(handle);
                Ok(())
            }
            Ok(Err(_)) | Err(_) => {
                let exit = handle.join().map_err(|_| ControllerError::RenderPanicked)?;
                lifecycle.strip = Some(exit.strip);
                exit.result?;
                Err(ControllerError::RenderPanicked)
            }
        }
    }

    /// Stop rendering, clear the strip and wait for the render thread.
    ///
    /// A no-op when already stopped. Reports a strip failure that ended the
    /// run, once.
    pub fn stop(&self) -> Result<(), ControllerError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = lifecycle.handle.take() else {
            return Ok(());
        };

        self.shared.stop.store(true, Ordering::Release);
        handle.thread().unpark();
        let exit = handle.join().map_err(|_| ControllerError::RenderPanicked)?;
        lifecycle.strip = Some(exit.strip);
        self.shared.stop.store(false, Ordering::Release);
        info!("controller stopped");

        exit.result.map_err(ControllerError::from)
    }
}

impl<D, S> Drop for Controller<D, S>
where
    D: StripDriver + 'static,
    S: SnapshotSource + 'static,
{
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(%error, "controller dropped after a failed run");
        }
    }
}

/// Program currently on the strip, kept across non-disruptive interrupts
struct ActiveProgram {
    slot: ProgramSlot,
    scheduler: FrameScheduler,
}

impl ActiveProgram {
    fn new(configuration: &Configuration, config: &ControllerConfig) -> Self {
        Self {
            slot: ProgramSlot::from_configuration(configuration, &config.strand_test),
            scheduler: FrameScheduler::new(config.timings.frame_duration(configuration.program)),
        }
    }

    /// Start over from the first frame on a fresh schedule
    fn restart(&mut self) {
        self.slot.reset();
        self.scheduler.reset();
    }
}

/// State owned by the render thread
struct RenderWorker<D, S> {
    strip: D,
    config: ControllerConfig,
    source: Arc<S>,
    interrupts: Arc<InterruptChannel>,
    shared: Arc<Shared>,
    /// Read once at start, never replaced while running
    hardware: HardwareSpec,
    configuration: Configuration,
}

impl<D: StripDriver, S: SnapshotSource> RenderWorker<D, S> {
    fn run(mut self, ready: &Sender<Result<(), StripError>>) -> RenderExit<D> {
        self.interrupts.bind_consumer(thread::current());
        let result = self.render(ready);
        self.interrupts.unbind_consumer();

        if let Err(error) = &result {
            error!(%error, "render loop stopped by strip failure");
        }
        self.shared.set_state(ControllerState::Stopped);
        RenderExit {
            strip: self.strip,
            result,
        }
    }

    fn render(&mut self, ready: &Sender<Result<(), StripError>>) -> Result<(), StripError> {
        if let Err(error) = self.strip.initialize(&self.hardware) {
            let _ = ready.send(Err(error.clone()));
            return Err(error);
        }
        let mut frame = vec![BLACK; self.strip.len()];
        self.shared.set_state(ControllerState::Off);
        let _ = ready.send(Ok(()));

        let interrupts = Arc::clone(&self.interrupts);
        let shared = Arc::clone(&self.shared);
        let checkpoint = Checkpoint::new(&interrupts, &shared.stop);
        let mut active: Option<ActiveProgram> = None;

        loop {
            let signal = if self.configuration.power {
                let program = active.get_or_insert_with(|| {
                    ActiveProgram::new(&self.configuration, &self.config)
                });
                self.shared
                    .set_state(ControllerState::Running(program.slot.program()));
                run_program(
                    &mut program.slot,
                    &mut self.strip,
                    &mut frame,
                    &checkpoint,
                    &mut program.scheduler,
                )?
            } else {
                self.shared.set_state(ControllerState::Off);
                self.idle(&checkpoint)
            };

            match signal {
                Signal::Stop => break,
                Signal::Interrupted(token) => self.apply_change(token, &mut active)?,
            }
        }

        self.strip.clear()
    }

    /// Wait for a signal without touching the strip
    fn idle(&self, checkpoint: &Checkpoint<'_>) -> Signal {
        let park = std::time::Duration::from_micros(self.config.idle_poll.as_micros());
        loop {
            if let Some(signal) = checkpoint.poll() {
                return signal;
            }
            thread::park_timeout(park);
        }
    }

    /// Re-read the configuration after an interrupt and switch programs if
    /// the change is disruptive
    fn apply_change(
        &mut self,
        token: InterruptToken,
        active: &mut Option<ActiveProgram>,
    ) -> Result<(), StripError> {
        debug!(
            address = token.address,
            value = token.value,
            "configuration change requested"
        );
        let Some(next) = self.reload() else {
            return Ok(());
        };
        let previous = self.configuration;
        let next = self
            .shared
            .adopt(self.source.as_ref(), next, Some(self.hardware));
        self.configuration = next;

        if !next.power {
            if previous.power {
                self.strip.clear()?;
            }
            return Ok(());
        }

        if previous.power {
            if !previous.is_disruptive_change(&next) {
                trace!(program = %next.program, "change is not disruptive, resuming");
                return Ok(());
            }
            self.strip.clear()?;
        }

        match active {
            // Power cycled back into the same animated program
            Some(program)
                if program.slot.program() == next.program && next.program != Program::Fixed =>
            {
                program.restart();
            }
            _ => *active = Some(ActiveProgram::new(&next, &self.config)),
        }
        if let Some(program) = active {
            debug!(
                program = %next.program,
                frame_ms = program.scheduler.frame_duration().as_millis(),
                "program started"
            );
        }
        Ok(())
    }

    /// Read and decode a fresh configuration; the running hardware is pinned
    /// when it is adopted
    fn reload(&self) -> Option<Configuration> {
        let next = match read_configuration(self.source.as_ref()) {
            Ok(configuration) => configuration,
            Err(error) => {
                warn!(%error, "reload failed, keeping previous configuration");
                return None;
            }
        };

        if next.hardware != self.hardware {
            info!(
                leds = next.hardware.led_count,
                pin = next.hardware.pin,
                brightness = next.hardware.brightness,
                "hardware change ignored until restart"
            );
        }
        Some(next)
    }
}
