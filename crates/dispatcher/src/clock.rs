//! Clock implementations
//!
//! `SystemClock` for production, `ManualClock` for deterministic tests and
//! simulations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use contracts::{Clock, SleepFuture};

/// Tokio-backed clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual clock that only moves when told to
///
/// `sleep` advances virtual time by the requested duration and returns after a
/// single yield, recording each requested duration.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    origin_utc: DateTime<Utc>,
    elapsed_nanos: AtomicU64,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_utc: Utc::now(),
            elapsed_nanos: AtomicU64::new(0),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move virtual time forward
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Virtual time since creation
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    /// Durations passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed())
            .unwrap_or_else(|_| chrono::TimeDelta::zero());
        self.origin_utc + elapsed
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}
