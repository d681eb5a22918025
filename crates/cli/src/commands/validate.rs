//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ProviderType, ScriptStep, ServiceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    providers: Vec<String>,
    capacity: u32,
    window_ms: u64,
    max_retries: u32,
    base_delay_ms: u64,
    deadline_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    providers: config.providers.iter().map(|p| p.name.clone()).collect(),
                    capacity: config.rate_limit.capacity,
                    window_ms: config.rate_limit.window_ms,
                    max_retries: config.retry.max_retries,
                    base_delay_ms: config.retry.base_delay_ms,
                    deadline_ms: config.dispatch.deadline_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.providers.len() == 1 {
        warnings.push("Only one provider configured - no fallback on failure".to_string());
    }

    for provider in &config.providers {
        match provider.provider_type {
            ProviderType::Mock => {
                if let Ok(Some(rate)) = provider.param::<f64>("success_rate") {
                    if rate == 0.0 {
                        warnings.push(format!(
                            "Provider '{}' has success_rate 0 and will never deliver",
                            provider.name
                        ));
                    }
                }
            }
            ProviderType::Scripted => {
                if let Ok(steps) = provider.script() {
                    if !steps.contains(&ScriptStep::Deliver) {
                        warnings.push(format!(
                            "Provider '{}' script has no 'ok' step and will never deliver",
                            provider.name
                        ));
                    }
                }
            }
            ProviderType::Log => {}
        }
    }

    if let Some(deadline) = config.dispatch.deadline() {
        if deadline <= config.retry.base_delay() {
            warnings.push(format!(
                "dispatch.deadline_ms ({}) <= retry.base_delay_ms ({}) - retries will rarely run",
                config.dispatch.deadline_ms, config.retry.base_delay_ms
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Providers: {}", summary.providers.join(" -> "));
            println!(
                "  Rate limit: {} per {} ms",
                summary.capacity, summary.window_ms
            );
            println!(
                "  Retry: {} attempts per provider, base delay {} ms",
                summary.max_retries, summary.base_delay_ms
            );
            if summary.deadline_ms > 0 {
                println!("  Deadline: {} ms", summary.deadline_ms);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
