//! Custom Backend Example
//!
//! Plugs a user-defined `DeliveryBackend` in front of the configured providers
//! and dispatches a few requests, including a repeated id.
//!
//! Run with: cargo run -p demos --bin custom_backend [config.toml]

use std::sync::atomic::{AtomicU32, Ordering};

use config_loader::ConfigLoader;
use contracts::{ContractError, DeliveryBackend, DispatchRequest, ServiceConfig};
use dispatcher::{create_backend_handle, DispatcherBuilder};

/// Fails every other call, like a flaky SMTP relay
struct FlakyRelay {
    calls: AtomicU32,
}

impl DeliveryBackend for FlakyRelay {
    fn name(&self) -> &str {
        "FlakyRelay"
    }

    async fn attempt(&self, request: &DispatchRequest) -> Result<bool, ContractError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        tracing::info!(call, to = %request.recipient, "FlakyRelay attempt");
        Ok(call % 2 == 1)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        ServiceConfig::default()
    };

    // custom backend first, configured providers as fallbacks
    let mut builder = DispatcherBuilder::new()
        .with_rate_limit(config.rate_limit.clone())
        .with_retry(config.retry.clone())
        .with_backend(FlakyRelay {
            calls: AtomicU32::new(0),
        });
    for provider in &config.providers {
        builder = builder.with_backend_handle(create_backend_handle(provider)?);
    }
    let dispatcher = builder.build()?;

    for id in ["welcome-1", "welcome-2", "welcome-1"] {
        let request = DispatchRequest::new(id, "user@example.com", "Welcome", "Hello!");
        let outcome = dispatcher.dispatch(request).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    for (name, metrics) in dispatcher.backend_metrics() {
        println!(
            "{name}: attempts={} ok={} failed={} errors={}",
            metrics.attempts, metrics.successes, metrics.failures, metrics.errors
        );
    }

    Ok(())
}
