//! The single point where an animation can be taken over.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::channel::{InterruptChannel, InterruptToken};

/// Why an animation gave control back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A disruptive register change is pending. Carries the latest token.
    Interrupted(InterruptToken),
    /// The owning process asked the controller to stop.
    Stop,
}

/// Between-frames poll of the stop flag and the interrupt channel.
///
/// Every pending token is consumed at once, so a burst of writes produces a
/// single [`Signal::Interrupted`].
#[derive(Clone, Copy)]
pub struct Checkpoint<'a> {
    interrupts: &'a InterruptChannel,
    stop: &'a AtomicBool,
}

impl<'a> Checkpoint<'a> {
    pub const fn new(interrupts: &'a InterruptChannel, stop: &'a AtomicBool) -> Self {
        Self { interrupts, stop }
    }

    /// Check for a pending takeover. Never blocks.
    pub fn poll(&self) -> Option<Signal> {
        if self.stop.load(Ordering::Acquire) {
            return Some(Signal::Stop);
        }
        let (token, pending) = self.interrupts.drain()?;
        trace!(
            address = token.address,
            value = token.value,
            pending,
            "interrupt tokens coalesced"
        );
        Some(Signal::Interrupted(token))
    }
}
