//! Dispatch metrics
//!
//! Prometheus counters/histograms fed by the dispatcher, plus an in-memory
//! aggregator for end-of-run summaries.

use std::collections::HashMap;

use contracts::{DispatchOutcome, DispatchStatus};
use metrics::{counter, histogram};

/// Record a finished dispatch sequence
///
/// Called once per outcome the dispatcher produces (replays excluded).
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_dispatch_outcome;
///
/// let outcome = dispatcher.dispatch(request).await?;
/// record_dispatch_outcome(&outcome);
/// ```
pub fn record_dispatch_outcome(outcome: &DispatchOutcome) {
    counter!(
        "mail_relay_dispatch_total",
        "status" => outcome.status.as_str()
    )
    .increment(1);

    if outcome.status == DispatchStatus::RateLimited {
        counter!("mail_relay_rate_limited_total").increment(1);
        return;
    }

    histogram!("mail_relay_dispatch_attempts").record(f64::from(outcome.attempts));

    if let Some(backend) = &outcome.backend_used {
        counter!(
            "mail_relay_dispatch_backend_total",
            "backend" => backend.clone(),
            "status" => outcome.status.as_str()
        )
        .increment(1);
    }
}

/// Delivery attempt result label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Success,
    Failure,
    /// Backend returned an error or panicked
    Error,
}

impl AttemptResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

/// Record a single backend attempt
pub fn record_delivery_attempt(backend: &str, result: AttemptResult) {
    counter!(
        "mail_relay_delivery_attempts_total",
        "backend" => backend.to_string(),
        "result" => result.as_str()
    )
    .increment(1);
}

/// Record a replayed (idempotent) response
pub fn record_idempotent_replay() {
    counter!("mail_relay_idempotent_replays_total").increment(1);
}

/// Record time spent in backoff waits
pub fn record_backoff_ms(backend: &str, delay_ms: f64) {
    histogram!(
        "mail_relay_backoff_ms",
        "backend" => backend.to_string()
    )
    .record(delay_ms);
}

/// Record end-to-end dispatch latency
pub fn record_dispatch_latency_ms(latency_ms: f64) {
    histogram!("mail_relay_dispatch_latency_ms").record(latency_ms);
}

/// Dispatch statistics aggregator
///
/// Aggregates outcomes in memory for summaries.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Outcomes observed (replays included)
    pub total: u64,

    pub sent: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub timed_out: u64,

    /// Responses served from the status store
    pub replays: u64,

    /// Attempts per fresh outcome
    pub attempt_stats: RunningStats,

    /// Caller-observed latency (ms)
    pub latency_stats: RunningStats,

    /// Fresh outcomes per backend_used
    pub backend_counts: HashMap<String, u64>,
}

impl DispatchStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one outcome
    ///
    /// `replayed` outcomes count toward totals and status counts but not toward
    /// attempt statistics, since no attempt was made for them.
    pub fn update(&mut self, outcome: &DispatchOutcome, replayed: bool, latency_ms: f64) {
        self.total += 1;
        match outcome.status {
            DispatchStatus::Sent => self.sent += 1,
            DispatchStatus::Failed => self.failed += 1,
            DispatchStatus::RateLimited => self.rate_limited += 1,
            DispatchStatus::TimedOut => self.timed_out += 1,
        }
        self.latency_stats.push(latency_ms);

        if replayed {
            self.replays += 1;
            return;
        }

        if outcome.attempts > 0 {
            self.attempt_stats.push(f64::from(outcome.attempts));
        }
        if let Some(backend) = &outcome.backend_used {
            *self.backend_counts.entry(backend.clone()).or_insert(0) += 1;
        }
    }

    /// Produce summary report
    pub fn summary(&self) -> DispatchSummary {
        let rate = |count: u64| {
            if self.total > 0 {
                count as f64 / self.total as f64 * 100.0
            } else {
                0.0
            }
        };

        DispatchSummary {
            total: self.total,
            sent: self.sent,
            failed: self.failed,
            rate_limited: self.rate_limited,
            timed_out: self.timed_out,
            replays: self.replays,
            success_rate: rate(self.sent),
            rate_limited_rate: rate(self.rate_limited),
            attempts: StatsSummary::from(&self.attempt_stats),
            latency_ms: StatsSummary::from(&self.latency_stats),
            backend_counts: self.backend_counts.clone(),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub timed_out: u64,
    pub replays: u64,
    pub success_rate: f64,
    pub rate_limited_rate: f64,
    pub attempts: StatsSummary,
    pub latency_ms: StatsSummary,
    pub backend_counts: HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Total outcomes: {}", self.total)?;
        writeln!(f, "Sent: {} ({:.2}%)", self.sent, self.success_rate)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(
            f,
            "Rate limited: {} ({:.2}%)",
            self.rate_limited, self.rate_limited_rate
        )?;
        if self.timed_out > 0 {
            writeln!(f, "Timed out: {}", self.timed_out)?;
        }
        writeln!(f, "Idempotent replays: {}", self.replays)?;
        writeln!(f, "Attempts: {}", self.attempts)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.backend_counts.is_empty() {
            let mut backends: Vec<_> = self.backend_counts.iter().collect();
            backends.sort();
            writeln!(f, "Outcomes by backend:")?;
            for (backend, count) in backends {
                writeln!(f, "  {}: {}", backend, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
