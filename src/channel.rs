//! Interrupt channel between register writers and the render thread.
//!
//! A multi-sender, single-consumer queue built on `critical-section` and a
//! `VecDeque`. Posting never blocks and never fails; the consumer only
//! polls. The consumer may register its thread so that a post can unpark it
//! while it idles.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::thread::Thread;

use critical_section::Mutex;

/// Notification that a disruptive register write happened.
///
/// Carries the written address/value for diagnostics only; the consumer
/// always re-reads the whole configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptToken {
    pub address: u16,
    pub value: u16,
}

impl InterruptToken {
    pub const fn new(address: u16, value: u16) -> Self {
        Self { address, value }
    }
}

/// Unbounded, thread-safe token queue.
pub struct InterruptChannel {
    queue: Mutex<RefCell<VecDeque<InterruptToken>>>,
    consumer: Mutex<RefCell<Option<Thread>>>,
}

impl InterruptChannel {
    /// Create a new empty channel.
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(RefCell::new(VecDeque::new())),
            consumer: Mutex::new(RefCell::new(None)),
        }
    }

    /// Queue a token and wake the consumer if one is registered.
    ///
    /// Safe from any thread, including protocol handlers.
    pub fn post(&self, token: InterruptToken) {
        let consumer = critical_section::with(|cs| {
            self.queue.borrow_ref_mut(cs).push_back(token);
            self.consumer.borrow_ref(cs).clone()
        });
        if let Some(thread) = consumer {
            thread.unpark();
        }
    }

    /// Take the oldest pending token, if any. Never blocks.
    pub fn try_take(&self) -> Option<InterruptToken> {
        critical_section::with(|cs| self.queue.borrow_ref_mut(cs).pop_front())
    }

    /// Take every pending token.
    ///
    /// Returns the most recent token and how many were pending.
    pub fn drain(&self) -> Option<(InterruptToken, usize)> {
        critical_section::with(|cs| {
            let mut queue = self.queue.borrow_ref_mut(cs);
            let count = queue.len();
            let last = queue.drain(..).last()?;
            Some((last, count))
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register the thread that consumes tokens
    pub(crate) fn bind_consumer(&self, thread: Thread) {
        critical_section::with(|cs| {
            self.consumer.replace(cs, Some(thread));
        });
    }

    pub(crate) fn unbind_consumer(&self) {
        critical_section::with(|cs| {
            self.consumer.replace(cs, None);
        });
    }
}

impl Default for InterruptChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_reports_last_token_and_count() {
        let channel = InterruptChannel::new();
        assert_eq!(channel.drain(), None);

        channel.post(InterruptToken::new(0, 1));
        channel.post(InterruptToken::new(0, 3));
        channel.post(InterruptToken::new(1, 255));

        assert_eq!(channel.drain(), Some((InterruptToken::new(1, 255), 3)));
        assert!(channel.is_empty());
    }

    #[test]
    fn try_take_is_fifo() {
        let channel = InterruptChannel::new();
        channel.post(InterruptToken::new(0, 1));
        channel.post(InterruptToken::new(2, 7));

        assert_eq!(channel.len(), 2);
        assert_eq!(channel.try_take(), Some(InterruptToken::new(0, 1)));
        assert_eq!(channel.try_take(), Some(InterruptToken::new(2, 7)));
        assert_eq!(channel.try_take(), None);
    }
}
