//! Fixed-window admission gate
//!
//! One global window shared by all callers. Bursts straddling a window
//! boundary can admit up to twice the capacity in a short span.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use contracts::{Clock, RateLimitConfig};
use serde::Serialize;

#[derive(Debug)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    state: Mutex<WindowState>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            capacity: config.capacity,
            window: config.window(),
            state: Mutex::new(WindowState {
                count: 0,
                window_start,
            }),
            clock,
        }
    }

    /// Admit one request if the current window has room
    ///
    /// The window restarts at `now` once `now` is strictly past
    /// `window_start + window`.
    pub fn allow(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(state.window_start) > self.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count < self.capacity {
            state.count += 1;
            true
        } else {
            false
        }
    }

    /// Current window usage
    pub fn snapshot(&self) -> RateLimitSnapshot {
        let now = self.clock.now();
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(state.window_start);

        if elapsed > self.window {
            // next allow() starts a fresh window
            return RateLimitSnapshot {
                count: 0,
                capacity: self.capacity,
                window_remaining_ms: 0,
            };
        }

        RateLimitSnapshot {
            count: state.count,
            capacity: self.capacity,
            window_remaining_ms: duration_ms(self.window.saturating_sub(elapsed)),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Rate limiter state (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    /// Requests admitted in the current window
    pub count: u32,
    pub capacity: u32,
    pub window_remaining_ms: u64,
}
