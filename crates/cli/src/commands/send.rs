//! `send` command implementation.

use anyhow::{Context, Result};
use contracts::DispatchRequest;
use tracing::info;

use crate::cli::SendArgs;
use crate::config::load_effective_config;

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    let config = load_effective_config(&args.config).context("Failed to load configuration")?;
    super::init_metrics(args.metrics_port)?;

    let dispatcher =
        dispatcher::create_dispatcher(&config).context("Failed to build dispatcher")?;

    let request = DispatchRequest::new(&args.id, &args.to, &args.subject, &args.body);

    for round in 1..=args.repeat.max(1) {
        let outcome = dispatcher
            .dispatch(request.clone())
            .await
            .with_context(|| format!("Dispatch of '{}' failed", args.id))?;

        info!(
            round,
            status = %outcome.status,
            http_status = outcome.status.http_status_hint(),
            attempts = outcome.attempts,
            "Dispatch returned"
        );

        let json =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
        println!("{}", json);
    }

    Ok(())
}
