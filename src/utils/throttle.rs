//! Leading-edge throttle.
//!
//! Used to rate-limit scroll notifications to the rendering layer: the first
//! call in a window fires immediately, the rest of the window is silent, and
//! there is no trailing invocation.

use std::time::{Duration, Instant};

/// Leading-edge throttle state.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given window.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// Returns true when the caller may fire, consuming the window.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}
