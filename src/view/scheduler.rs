//! Redraw coalescing.
//!
//! Resize, wheel and drag events can arrive far faster than frames are
//! painted. Every event only marks the view dirty; a later request replaces
//! an earlier one instead of queueing behind it, and at most one frame is
//! drawn per interval.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    frame_interval: Duration,
    pending: bool,
    last_frame: Option<Instant>,
}

impl RedrawScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            pending: false,
            last_frame: None,
        }
    }

    /// Ask for a redraw. Repeated requests before the next frame collapse
    /// into one.
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Claim the frame if one is due at `now`.
    pub fn begin_frame(&mut self, now: Instant) -> bool {
        if !self.pending || self.time_until_due(now).is_some_and(|d| !d.is_zero()) {
            return false;
        }
        self.pending = false;
        self.last_frame = Some(now);
        true
    }

    /// How long to wait before the pending frame may be drawn; `None` when
    /// nothing is pending.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if !self.pending {
            return None;
        }
        let wait = match self.last_frame {
            Some(last) => (last + self.frame_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        };
        Some(wait)
    }
}
