//! Register-controlled LED strip controller.
//!
//! A bank of 16-bit registers describes what the strip should show. Writes to
//! the bank are diffed by a [`ChangeHandler`], which posts tokens on an
//! [`InterruptChannel`] when a running animation has to be replaced. The
//! [`Controller`] owns a dedicated render thread that polls the channel once
//! per frame and switches programs at that checkpoint.

pub mod change_handler;
pub mod channel;
pub mod checkpoint;
pub mod color;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame_scheduler;
pub mod math8;
pub mod program;
pub mod registers;
pub mod strip;

pub use change_handler::{ChangeHandler, ChangeOutcome};
pub use channel::{InterruptChannel, InterruptToken};
pub use checkpoint::{Checkpoint, Signal};
pub use config::{ColorSpec, Configuration, HardwareSpec, Program, decode};
pub use controller::{Controller, ControllerConfig, ControllerState, ControllerStatus};
pub use error::{ControllerError, DecodeError, RegisterError, StripError};
pub use frame_scheduler::FrameScheduler;
pub use program::{ProgramSlot, ProgramTimings, StrandTestConfig};
pub use registers::{
    BankReader, REGISTER_COUNT, RegisterBank, RegisterLayout, RegisterSnapshot, SnapshotSource,
    WriteHook,
};
pub use strip::VirtualStrip;

pub use color::{Hsv, Rgb};
pub use embassy_time::{Duration, Instant};

/// Abstract LED strip driver
///
/// Implement this trait to support different hardware platforms. The
/// controller is generic over it and only ever calls it from the render
/// thread.
pub trait StripDriver: Send {
    /// Prepare the hardware for the given LED count, pin and brightness
    fn initialize(&mut self, hardware: &HardwareSpec) -> Result<(), StripError>;

    /// Number of addressable pixels
    fn len(&self) -> usize;

    /// Check if the strip has no pixels
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage a pixel color; nothing is shown until [`StripDriver::present`]
    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), StripError>;

    /// Push the staged pixels to the strip
    fn present(&mut self) -> Result<(), StripError>;

    /// Stage a whole frame and present it once
    fn write(&mut self, colors: &[Rgb]) -> Result<(), StripError> {
        for (index, color) in colors.iter().enumerate() {
            self.set_pixel(index, *color)?;
        }
        self.present()
    }

    /// Turn every pixel off with a single present call
    fn clear(&mut self) -> Result<(), StripError> {
        for index in 0..self.len() {
            self.set_pixel(index, Rgb::default())?;
        }
        self.present()
    }
}
