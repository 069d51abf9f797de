//! Per-minute request admission.
//!
//! Explicit state owned by the controller instance, not ambient globals.
//! The window is anchored at the first dispatch after a reset; once more
//! than a minute has passed since that anchor the counter starts over, so
//! only post-reset requests count.

use crate::error::ChatError;
use std::time::{Duration, Instant};

/// Default per-minute request budget.
pub const MAX_REQUESTS_PER_MINUTE: u32 = 10;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter state.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests_per_minute: u32,
    requests_this_minute: u32,
    window_start: Option<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MAX_REQUESTS_PER_MINUTE)
    }
}

impl RateLimiter {
    /// Limiter with the given per-minute budget.
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute,
            requests_this_minute: 0,
            window_start: None,
        }
    }

    /// Admission check. Resets the expired window, then rejects when the
    /// budget is spent. Called before dispatch; does not count the request.
    pub fn check(&mut self, now: Instant) -> Result<(), ChatError> {
        if let Some(start) = self.window_start
            && now.duration_since(start) >= WINDOW
        {
            self.requests_this_minute = 0;
            self.window_start = None;
        }
        if self.requests_this_minute >= self.max_requests_per_minute {
            return Err(ChatError::RateLimited);
        }
        Ok(())
    }

    /// Count a dispatch. Called immediately after the request goes out, not
    /// after completion.
    pub fn record_dispatch(&mut self, now: Instant) {
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
        self.requests_this_minute += 1;
    }
}
