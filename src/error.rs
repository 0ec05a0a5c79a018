use thiserror::Error;

/// Failure to turn a register snapshot into a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("register snapshot too short: expected {expected} words, got {actual}")]
    Short { expected: usize, actual: usize },
}

/// Register bank access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Address or length exceeds the bank bounds.
    #[error("registers {address}..+{count} are outside the register bank")]
    OutOfBounds { address: u16, count: usize },
    /// Operation attempted with zero length.
    #[error("register access with zero length")]
    ZeroLength,
}

/// Strip driver failures. These end the current render run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StripError {
    #[error("strip is not initialized")]
    NotInitialized,
    #[error("pixel {index} is out of range for a strip of {len} leds")]
    PixelOutOfRange { index: usize, len: usize },
    #[error("strip hardware failure: {0}")]
    Hardware(String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller is already running")]
    AlreadyRunning,

    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("render thread panicked")]
    RenderPanicked,

    #[error("strip driver was lost with a failed render thread")]
    StripLost,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error(transparent)]
    Strip(#[from] StripError),
}
