//! Local typing-indicator debounce.
//!
//! Every local input change reports a `start` signal and (re)arms the
//! debounce deadline; once input pauses past the deadline the timer yields
//! an `end` signal. The timer owns nothing but its deadline and is polled by
//! the session tick, so it dies with the session.
//!
//! The remote side has no timer at all: it trusts the sender's explicit
//! `end` signals, which are also emitted right after every message send.

use std::time::{Duration, Instant};

/// How long input may pause before typing is considered ended.
pub const TYPING_DEBOUNCE: Duration = Duration::from_millis(800);

/// Typing signal to forward to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    End,
}

/// Debounce timer for the local party's typing signals.
#[derive(Debug, Default)]
pub struct TypingIndicatorTimer {
    deadline: Option<Instant>,
}

impl TypingIndicatorTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local input change.
    ///
    /// Rearms the debounce deadline and returns the `start` signal to send
    /// while there is text in the input.
    pub fn input_changed(&mut self, now: Instant, has_text: bool) -> Option<TypingSignal> {
        self.deadline = Some(now + TYPING_DEBOUNCE);
        has_text.then_some(TypingSignal::Start)
    }

    /// Poll the deadline, yielding the `end` signal once input has paused.
    pub fn poll(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(TypingSignal::End)
            }
            _ => None,
        }
    }

    /// Disarm the timer.
    ///
    /// Called when an explicit `end` signal was just sent (right after a
    /// message) or the session tears down, so the debounce cannot fire a
    /// stale duplicate.
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    /// Whether the debounce is currently armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}
