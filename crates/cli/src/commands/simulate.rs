//! `simulate` command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cli::SimulateArgs;
use crate::config::load_effective_config;
use crate::simulation::{Simulation, SimulationConfig};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let config = load_effective_config(&args.config).context("Failed to load configuration")?;
    super::init_metrics(args.metrics_port)?;

    let dispatcher =
        dispatcher::create_dispatcher(&config).context("Failed to build dispatcher")?;

    let simulation = Simulation::new(
        Arc::new(dispatcher),
        SimulationConfig {
            requests: args.requests,
            duplicate_ratio: args.duplicate_ratio,
            concurrency: args.concurrency,
            timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        },
    );

    info!("Starting simulation...");
    let stats = simulation
        .run(super::shutdown_signal())
        .await
        .context("Simulation failed")?;

    info!(
        outcomes = stats.aggregator.total,
        errors = stats.errors,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = stats.throughput(),
        "Simulation completed"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&stats.report())
            .context("Failed to serialize simulation report")?;
        println!("{}", json);
    } else {
        stats.print_summary();
    }

    Ok(())
}
