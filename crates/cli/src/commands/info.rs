//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use tracing::info;

use crate::cli::InfoArgs;
use crate::config::load_effective_config;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Resolving effective configuration");

    let config = load_effective_config(&args.config).context("Failed to load configuration")?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&config)
            .context("Failed to serialize configuration")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn print_config_info(config: &ServiceConfig) {
    println!("=== Mail Relay Configuration ===\n");
    println!("Version: {:?}", config.version);

    println!("\nRate limit");
    println!("   ├─ Capacity: {}", config.rate_limit.capacity);
    println!("   └─ Window: {} ms", config.rate_limit.window_ms);

    println!("\nRetry");
    println!("   ├─ Attempts per provider: {}", config.retry.max_retries);
    println!("   ├─ Base delay: {} ms", config.retry.base_delay_ms);
    println!("   └─ Max delay: {} ms", config.retry.max_delay_ms);

    match config.dispatch.deadline() {
        Some(deadline) => println!("\nDeadline: {} ms", deadline.as_millis()),
        None => println!("\nDeadline: none"),
    }

    println!("\nProviders ({}, in priority order)", config.providers.len());
    let last = config.providers.len().saturating_sub(1);
    for (i, provider) in config.providers.iter().enumerate() {
        let prefix = if i == last { "└─" } else { "├─" };
        let mut params: Vec<_> = provider.params.iter().collect();
        params.sort();
        let params = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "   {prefix} {} ({:?}) {}",
            provider.name, provider.provider_type, params
        );
    }
    println!();
}
