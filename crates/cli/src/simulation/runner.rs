//! Simulation runner - spawns dispatches and collects their outcomes.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{DispatchOutcome, DispatchRequest, REPLAY_MESSAGE};
use dispatcher::{Dispatcher, DispatcherError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::SimulationStats;
use crate::error::{CliError, Result};

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Total dispatch calls
    pub requests: usize,

    /// Share of calls reusing an earlier request id
    pub duplicate_ratio: f64,

    /// Maximum in-flight dispatches
    pub concurrency: usize,

    /// Simulation timeout (None = no timeout)
    pub timeout: Option<Duration>,
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.duplicate_ratio) {
            return Err(CliError::simulation(format!(
                "duplicate ratio must be within [0, 1], got {}",
                self.duplicate_ratio
            )));
        }
        if self.concurrency == 0 {
            return Err(CliError::simulation("concurrency must be >= 1"));
        }
        Ok(())
    }
}

/// Request ids for a run: fresh ids first, then repeats of earlier ones
///
/// With a ratio below 1, at least one id is fresh so repeats have a target.
pub fn plan_request_ids(requests: usize, duplicate_ratio: f64) -> Vec<String> {
    if requests == 0 {
        return Vec::new();
    }

    let duplicates = ((requests as f64) * duplicate_ratio).round() as usize;
    let duplicates = duplicates.min(requests - 1);
    let fresh = requests - duplicates;

    let fresh_ids: Vec<String> = (0..fresh).map(|i| format!("sim-{i:05}")).collect();
    let repeats: Vec<String> = (0..duplicates)
        .map(|i| fresh_ids[i % fresh].clone())
        .collect();

    fresh_ids.into_iter().chain(repeats).collect()
}

type DispatchResult = (std::result::Result<DispatchOutcome, DispatcherError>, Duration);

/// Drives one simulation run
pub struct Simulation {
    dispatcher: Arc<Dispatcher>,
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(dispatcher: Arc<Dispatcher>, config: SimulationConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Run until every request finished, the timeout fired or `shutdown` resolved
    ///
    /// Interrupted runs abort outstanding dispatches and return partial statistics.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SimulationStats> {
        self.config.validate()?;

        let start_time = Instant::now();
        let ids = plan_request_ids(self.config.requests, self.config.duplicate_ratio);
        info!(
            requests = ids.len(),
            concurrency = self.config.concurrency,
            "Simulation started"
        );

        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks: JoinSet<DispatchResult> = JoinSet::new();
        for id in ids {
            let dispatcher = Arc::clone(&self.dispatcher);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                let request = DispatchRequest::new(
                    id.as_str(),
                    format!("{id}@example.com"),
                    "Simulated message",
                    format!("Body of {id}"),
                );
                let started = Instant::now();
                let result = dispatcher.dispatch(request).await;
                (result, started.elapsed())
            });
        }

        let mut stats = SimulationStats::default();
        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((result, latency)) => stats.record(result, latency),
                        Err(e) => {
                            warn!(error = %e, "Dispatch task failed");
                            stats.errors += 1;
                        }
                    }
                }
                _ = &mut deadline => {
                    warn!(remaining = tasks.len(), "Simulation timed out");
                    stats.interrupted = true;
                    break;
                }
                _ = &mut shutdown => {
                    warn!(remaining = tasks.len(), "Received shutdown signal, stopping simulation");
                    stats.interrupted = true;
                    break;
                }
            }
        }

        tasks.shutdown().await;

        stats.duration = start_time.elapsed();
        stats.backend_metrics = self.dispatcher.backend_metrics();
        debug!(outcomes = stats.aggregator.total, "Simulation finished");
        Ok(stats)
    }
}

impl SimulationStats {
    fn record(
        &mut self,
        result: std::result::Result<DispatchOutcome, DispatcherError>,
        latency: Duration,
    ) {
        match result {
            Ok(outcome) => {
                let replayed = outcome.message == REPLAY_MESSAGE;
                self.aggregator
                    .update(&outcome, replayed, latency.as_secs_f64() * 1000.0);
            }
            Err(e) => {
                warn!(error = %e, "Dispatch returned an error");
                self.errors += 1;
            }
        }
    }
}
