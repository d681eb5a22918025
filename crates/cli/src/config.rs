//! Effective configuration: file (or defaults) plus CLI overrides.

use config_loader::ConfigLoader;
use contracts::ServiceConfig;
use tracing::info;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};

/// Load the configuration named by `args` and apply overrides
///
/// The result is validated again after overrides are applied.
pub fn load_effective_config(args: &ConfigArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)?
        }
        None => {
            info!("No configuration file given, using built-in defaults");
            ServiceConfig::default()
        }
    };

    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut ServiceConfig, args: &ConfigArgs) {
    if let Some(capacity) = args.capacity {
        info!(capacity, "Overriding rate limit capacity from CLI");
        config.rate_limit.capacity = capacity;
    }
    if let Some(window_ms) = args.window_ms {
        info!(window_ms, "Overriding rate limit window from CLI");
        config.rate_limit.window_ms = window_ms;
    }
    if let Some(max_retries) = args.max_retries {
        info!(max_retries, "Overriding max retries from CLI");
        config.retry.max_retries = max_retries;
    }
    if let Some(base_delay_ms) = args.base_delay_ms {
        info!(base_delay_ms, "Overriding backoff base delay from CLI");
        config.retry.base_delay_ms = base_delay_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_without_file() {
        let config = load_effective_config(&ConfigArgs::default()).unwrap();
        assert_eq!(config.rate_limit.capacity, 5);
        assert_eq!(config.providers.len(), 2);
    }

    #[test]
    fn test_overrides_applied() {
        let args = ConfigArgs {
            capacity: Some(100),
            window_ms: Some(1_000),
            max_retries: Some(2),
            base_delay_ms: Some(10),
            ..ConfigArgs::default()
        };
        let config = load_effective_config(&args).unwrap();
        assert_eq!(config.rate_limit.capacity, 100);
        assert_eq!(config.rate_limit.window_ms, 1_000);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay_ms, 10);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = ConfigArgs {
            capacity: Some(0),
            ..ConfigArgs::default()
        };
        let err = load_effective_config(&args).unwrap_err();
        assert!(matches!(err, CliError::Config(_)), "got: {err}");
    }

    #[test]
    fn test_missing_file() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/mail-relay.toml")),
            ..ConfigArgs::default()
        };
        let err = load_effective_config(&args).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_file_then_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
[retry]
max_retries = 5

[[providers]]
name = "dry-run"
provider_type = "log"
"#,
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            max_retries: Some(1),
            ..ConfigArgs::default()
        };
        let config = load_effective_config(&args).unwrap();
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.providers[0].name, "dry-run");
    }
}
