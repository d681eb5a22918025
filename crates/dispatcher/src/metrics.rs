//! Per-backend attempt counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single backend
#[derive(Debug, Default)]
pub struct BackendMetrics {
    /// Delivery calls made
    attempts: AtomicU64,
    /// Calls that reported delivery
    successes: AtomicU64,
    /// Calls that reported an ordinary failure
    failures: AtomicU64,
    /// Calls that returned an error or panicked
    errors: AtomicU64,
}

impl BackendMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn inc_successes(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> BackendMetricsSnapshot {
        BackendMetricsSnapshot {
            attempts: self.attempts(),
            successes: self.successes(),
            failures: self.failures(),
            errors: self.errors(),
        }
    }
}

/// Snapshot of backend counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackendMetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub errors: u64,
}

impl BackendMetricsSnapshot {
    /// Share of attempts that delivered, in percent
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64 * 100.0
        }
    }
}
