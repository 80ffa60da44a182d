//! Submission-boundary rate limiting for stylus samples.
//!
//! Input devices can report far more Move/Hover events than the host can
//! use. The throttle keeps at most one positional sample per interval
//! (8 ms ≈ 125 Hz by default) and never drops Down/Up, which change the
//! pointer state on the host.

use std::time::{Duration, Instant};

use crate::codec::StylusAction;

/// Time-window throttle over sample actions.
#[derive(Debug, Clone)]
pub struct SubmissionThrottle {
    interval: Duration,
    last_accepted: Option<Instant>,
    accepted: u64,
    rejected: u64,
}

impl SubmissionThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: None,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Decide whether a sample with `action` submitted now may be sent.
    pub fn admit(&mut self, action: StylusAction) -> bool {
        self.admit_at(action, Instant::now())
    }

    /// Same as [`admit`](Self::admit) with an explicit clock.
    ///
    /// Accepted samples of any action restart the window.
    pub fn admit_at(&mut self, action: StylusAction, now: Instant) -> bool {
        let too_soon = match self.last_accepted {
            Some(last) => now.saturating_duration_since(last) < self.interval,
            None => false,
        };

        if too_soon && !action.is_transition() {
            self.rejected += 1;
            return false;
        }

        self.last_accepted = Some(now);
        self.accepted += 1;
        true
    }

    /// Forget the window (e.g. after reconnecting).
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl Default for SubmissionThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(8))
    }
}
