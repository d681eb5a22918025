//! Clock trait - time source for timestamps, windows and backoff waits

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Boxed sleep future returned by [`Clock::sleep`]
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Time source injected into the dispatcher and the rate limiter
///
/// Production code uses a tokio-backed clock; tests inject a virtual one so
/// windows and backoff can be driven deterministically.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Monotonic instant for window and deadline arithmetic
    fn now(&self) -> Instant;

    /// Wall-clock timestamp for outcomes
    fn now_utc(&self) -> DateTime<Utc>;

    /// Wait without blocking the executor thread
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}
