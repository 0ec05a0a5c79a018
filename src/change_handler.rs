//! Reacts to register writes on behalf of the protocol layer.
//!
//! Every write re-reads the whole configuration range, because program
//! selection depends on more than one register. Only disruptive changes
//! reach the render thread.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::channel::{InterruptChannel, InterruptToken};
use crate::config::decode;
use crate::controller::ControllerStatus;
use crate::error::RegisterError;
use crate::registers::{RegisterSnapshot, WriteHook};

/// What a register write led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Disruptive change, a token was posted
    Posted(InterruptToken),
    /// Nothing the running animation has to react to
    Ignored,
    /// The snapshot could not be read or decoded; nothing was posted
    Unreadable,
}

#[derive(Clone)]
pub struct ChangeHandler {
    status: ControllerStatus,
    interrupts: Arc<InterruptChannel>,
}

impl ChangeHandler {
    pub fn new(status: ControllerStatus, interrupts: Arc<InterruptChannel>) -> Self {
        Self { status, interrupts }
    }

    /// Handle a completed write of `value` at `address`.
    ///
    /// Runs on the writer's thread and never blocks.
    pub fn on_register_written<F>(&self, address: u16, value: u16, read_snapshot: F) -> ChangeOutcome
    where
        F: FnOnce() -> Result<RegisterSnapshot, RegisterError>,
    {
        let snapshot = match read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(address, value, %error, "cannot read registers after write");
                return ChangeOutcome::Unreadable;
            }
        };
        let next = match decode(&snapshot) {
            Ok(configuration) => configuration,
            Err(error) => {
                warn!(address, value, %error, "cannot decode registers after write");
                return ChangeOutcome::Unreadable;
            }
        };

        let current = self.status.configuration();
        if !current.is_disruptive_change(&next) {
            trace!(address, value, "register write is not disruptive");
            return ChangeOutcome::Ignored;
        }

        let token = InterruptToken::new(address, value);
        self.interrupts.post(token);
        debug!(
            address,
            value,
            power = next.power,
            program = %next.program,
            "disruptive register write, interrupt posted"
        );
        ChangeOutcome::Posted(token)
    }
}

impl WriteHook for ChangeHandler {
    fn on_register_written(
        &self,
        address: u16,
        value: u16,
        read_snapshot: &dyn Fn() -> Result<RegisterSnapshot, RegisterError>,
    ) {
        ChangeHandler::on_register_written(self, address, value, read_snapshot);
    }
}
