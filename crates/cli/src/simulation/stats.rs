//! Simulation statistics.

use std::time::Duration;

use dispatcher::BackendMetricsSnapshot;
use observability::{DispatchStatsAggregator, DispatchSummary};
use serde::Serialize;

/// Statistics from a simulation run
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Outcome aggregation
    pub aggregator: DispatchStatsAggregator,

    /// Dispatch calls that returned an error or whose task failed
    pub errors: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Per-backend counters at the end of the run
    pub backend_metrics: Vec<(String, BackendMetricsSnapshot)>,

    /// Stopped by timeout or signal
    pub interrupted: bool,
}

impl SimulationStats {
    /// Outcomes per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.aggregator.total as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let summary = self.aggregator.summary();

        println!("\n=== Simulation Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Outcomes: {}", summary.total);
        println!("   ├─ Throughput: {:.2}/s", self.throughput());
        println!("   ├─ Errors: {}", self.errors);
        println!("   └─ Interrupted: {}", self.interrupted);

        println!("\nOutcomes");
        println!(
            "   ├─ SENT: {} ({:.2}%)",
            summary.sent, summary.success_rate
        );
        println!("   ├─ FAILED: {}", summary.failed);
        println!(
            "   ├─ RATE_LIMITED: {} ({:.2}%)",
            summary.rate_limited, summary.rate_limited_rate
        );
        println!("   ├─ TIMED_OUT: {}", summary.timed_out);
        println!("   └─ Idempotent replays: {}", summary.replays);

        println!("\nAttempts per dispatch: {}", summary.attempts);
        println!("Latency (ms): {}", summary.latency_ms);

        if !self.backend_metrics.is_empty() {
            println!("\nBackends");
            let last = self.backend_metrics.len() - 1;
            for (i, (name, metrics)) in self.backend_metrics.iter().enumerate() {
                let prefix = if i == last { "└─" } else { "├─" };
                println!(
                    "   {prefix} {name}: attempts={}, ok={}, failed={}, errors={} ({:.1}% success)",
                    metrics.attempts,
                    metrics.successes,
                    metrics.failures,
                    metrics.errors,
                    metrics.success_rate()
                );
            }
        }

        println!();
    }

    /// Serializable view for `--json`
    pub fn report(&self) -> SimulationReport {
        let summary: DispatchSummary = self.aggregator.summary();
        SimulationReport {
            duration_secs: self.duration.as_secs_f64(),
            interrupted: self.interrupted,
            errors: self.errors,
            total: summary.total,
            sent: summary.sent,
            failed: summary.failed,
            rate_limited: summary.rate_limited,
            timed_out: summary.timed_out,
            replays: summary.replays,
            mean_attempts: summary.attempts.mean,
            mean_latency_ms: summary.latency_ms.mean,
            backends: self
                .backend_metrics
                .iter()
                .map(|(name, metrics)| BackendReport {
                    name: name.clone(),
                    metrics: *metrics,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub duration_secs: f64,
    pub interrupted: bool,
    pub errors: u64,
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub timed_out: u64,
    pub replays: u64,
    pub mean_attempts: f64,
    pub mean_latency_ms: f64,
    pub backends: Vec<BackendReport>,
}

#[derive(Debug, Serialize)]
pub struct BackendReport {
    pub name: String,
    #[serde(flatten)]
    pub metrics: BackendMetricsSnapshot,
}
