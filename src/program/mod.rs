//! Animation programs.
//!
//! Every program is an endless sequence of frames. [`run_program`] renders
//! one frame, presents it, then polls the [`Checkpoint`]; that poll is the
//! only place where a program gives control back.

mod fixed;
mod rainbow;

use embassy_time::{Duration, Instant};
pub use fixed::FixedColorProgram;
pub use rainbow::RainbowProgram;
pub use strand_test::{StrandTestConfig, StrandTestProgram};

use crate::StripDriver;
use crate::checkpoint::{Checkpoint, Signal};
use crate::color::Rgb;
use crate::config::{Configuration, Program};
use crate::error::StripError;
use crate::frame_scheduler::{FrameScheduler, sleep_for};

const DEFAULT_FIXED_FRAME_MS: u64 = 50;
const DEFAULT_RAINBOW_FRAME_MS: u64 = 20;
const DEFAULT_STRAND_TEST_FRAME_MS: u64 = 50;

pub trait Animation {
    /// Render the next frame and advance the animation state
    fn render(&mut self, leds: &mut [Rgb]);

    /// Restart from the first frame
    fn reset(&mut self) {}
}

/// Frame period of each program
#[derive(Debug, Clone, Copy)]
pub struct ProgramTimings {
    pub fixed: Duration,
    pub rainbow: Duration,
    pub strand_test: Duration,
}

impl Default for ProgramTimings {
    fn default() -> Self {
        Self {
            fixed: Duration::from_millis(DEFAULT_FIXED_FRAME_MS),
            rainbow: Duration::from_millis(DEFAULT_RAINBOW_FRAME_MS),
            strand_test: Duration::from_millis(DEFAULT_STRAND_TEST_FRAME_MS),
        }
    }
}

impl ProgramTimings {
    /// Same frame period for every program
    pub const fn uniform(frame: Duration) -> Self {
        Self {
            fixed: frame,
            rainbow: frame,
            strand_test: frame,
        }
    }

    pub const fn frame_duration(&self, program: Program) -> Duration {
        match program {
            Program::Fixed => self.fixed,
            Program::Rainbow => self.rainbow,
            Program::StrandTest => self.strand_test,
        }
    }
}

/// Program slot - enum containing the state of the running program
#[derive(Debug, Clone)]
pub enum ProgramSlot {
    Fixed(FixedColorProgram),
    Rainbow(RainbowProgram),
    StrandTest(StrandTestProgram),
}

impl ProgramSlot {
    /// Fresh program state for the program selected by `configuration`
    pub fn from_configuration(configuration: &Configuration, strand_test: &StrandTestConfig) -> Self {
        match configuration.program {
            Program::Fixed => Self::Fixed(FixedColorProgram::new(configuration.color)),
            Program::Rainbow => Self::Rainbow(RainbowProgram::new()),
            Program::StrandTest => Self::StrandTest(StrandTestProgram::new(strand_test.clone())),
        }
    }

    pub fn program(&self) -> Program {
        match self {
            Self::Fixed(_) => Program::Fixed,
            Self::Rainbow(_) => Program::Rainbow,
            Self::StrandTest(_) => Program::StrandTest,
        }
    }

    pub fn render(&mut self, leds: &mut [Rgb]) {
        match self {
            Self::Fixed(program) => program.render(leds),
            Self::Rainbow(program) => program.render(leds),
            Self::StrandTest(program) => program.render(leds),
        }
    }

    /// Restart the program from its first frame
    pub fn reset(&mut self) {
        match self {
            Self::Fixed(program) => program.reset(),
            Self::Rainbow(program) => program.reset(),
            Self::StrandTest(program) => program.reset(),
        }
    }
}

/// Run a program until the checkpoint reports a takeover.
///
/// Each iteration renders one frame into `frame`, writes it to the strip with
/// a single present, polls the checkpoint and then sleeps until the next
/// frame deadline. Strip failures end the run immediately.
pub fn run_program<D: StripDriver>(
    slot: &mut ProgramSlot,
    strip: &mut D,
    frame: &mut [Rgb],
    checkpoint: &Checkpoint<'_>,
    scheduler: &mut FrameScheduler,
) -> Result<Signal, StripError> {
    loop {
        slot.render(frame);
        strip.write(frame)?;

        if let Some(signal) = checkpoint.poll() {
            return Ok(signal);
        }

        let pacing = scheduler.tick(Instant::now());
        sleep_for(pacing.sleep_duration);
    }
}
