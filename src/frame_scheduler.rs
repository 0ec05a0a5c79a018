//! Frame pacing for the render loop.
//!
//! The scheduler only does the arithmetic; the render thread does the
//! sleeping between frames.

use embassy_time::{Duration, Instant};

/// Result of a frame tick operation.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    /// The deadline for the next frame.
    pub next_deadline: Instant,
    /// How long to wait until the next frame (may be zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Deadline tracker with drift correction.
///
/// If a frame runs more than two frame periods late, the schedule restarts
/// from the current time instead of rendering a catch-up burst.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    next_frame: Option<Instant>,
    frame_duration: Duration,
}

impl FrameScheduler {
    pub const fn new(frame_duration: Duration) -> Self {
        Self {
            next_frame: None,
            frame_duration,
        }
    }

    pub const fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Forget the schedule; the next tick starts a new one
    pub fn reset(&mut self) {
        self.next_frame = None;
    }

    /// Record that a frame was just completed at `now`.
    pub fn tick(&mut self, now: Instant) -> FrameResult {
        let max_drift = self.frame_duration * 2;
        let scheduled = match self.next_frame {
            Some(deadline) if now.saturating_duration_since(deadline) <= max_drift => deadline,
            _ => now,
        };

        let next_deadline = scheduled + self.frame_duration;
        self.next_frame = Some(next_deadline);

        FrameResult {
            next_deadline,
            sleep_duration: next_deadline.saturating_duration_since(now),
        }
    }
}

/// Block the current thread for `duration`
pub(crate) fn sleep_for(duration: Duration) {
    if duration.as_micros() > 0 {
        std::thread::sleep(std::time::Duration::from_micros(duration.as_micros()));
    }
}
