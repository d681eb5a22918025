//! Config validation
//!
//! Rules:
//! - field-level bounds declared on the config structs (capacity, window, retries)
//! - provider names unique
//! - base_delay_ms <= max_delay_ms
//! - type-specific provider params parse and are in range

use std::collections::HashSet;

use contracts::{ContractError, ProviderType, ServiceConfig};
use validator::Validate;

/// Validate a ServiceConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_field_bounds(config)?;
    validate_provider_names(config)?;
    validate_retry_delays(config)?;
    validate_provider_params(config)?;
    Ok(())
}

/// Bounds declared with `#[validate(...)]` on the contract types
fn validate_field_bounds(config: &ServiceConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|errors| ContractError::config_validation("config", errors.to_string()))
}

/// Provider names are reported in outcomes, so they must be unique
fn validate_provider_names(config: &ServiceConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for provider in &config.providers {
        if !seen.insert(provider.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("providers[name={}]", provider.name),
                "duplicate provider name",
            ));
        }
    }
    Ok(())
}

fn validate_retry_delays(config: &ServiceConfig) -> Result<(), ContractError> {
    let retry = &config.retry;
    if retry.base_delay_ms > retry.max_delay_ms {
        return Err(ContractError::config_validation(
            "retry.base_delay_ms / retry.max_delay_ms",
            format!(
                "base_delay_ms ({}) must be <= max_delay_ms ({})",
                retry.base_delay_ms, retry.max_delay_ms
            ),
        ));
    }
    Ok(())
}

fn validate_provider_params(config: &ServiceConfig) -> Result<(), ContractError> {
    for provider in &config.providers {
        // common to every type
        provider.param::<u64>("latency_ms")?;

        match provider.provider_type {
            ProviderType::Mock => {
                let rate = provider.param::<f64>("success_rate")?.unwrap_or(1.0);
                if !(0.0..=1.0).contains(&rate) {
                    return Err(ContractError::config_validation(
                        format!("providers[{}].params.success_rate", provider.name),
                        format!("success_rate must be within [0, 1], got {rate}"),
                    ));
                }
            }
            ProviderType::Scripted => {
                provider.script()?;
            }
            ProviderType::Log => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ProviderConfig;
    use std::collections::HashMap;

    fn minimal_config() -> ServiceConfig {
        ServiceConfig {
            providers: vec![
                ProviderConfig::mock("primary", 0.7),
                ProviderConfig {
                    name: "fallback".into(),
                    provider_type: ProviderType::Scripted,
                    params: HashMap::from([("script".to_string(), "fail,ok".to_string())]),
                },
            ],
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = minimal_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_provider_name() {
        let mut config = minimal_config();
        config.providers.push(config.providers[0].clone());
        let result = validate(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate provider name"), "got: {err}");
    }

    #[test]
    fn test_empty_provider_name() {
        let mut config = minimal_config();
        config.providers[0].name = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_no_providers() {
        let mut config = minimal_config();
        config.providers.clear();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("at least one provider"), "got: {err}");
    }

    #[test]
    fn test_zero_retries() {
        let mut config = minimal_config();
        config.retry.max_retries = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("max_retries"), "got: {err}");
    }

    #[test]
    fn test_invalid_delay_range() {
        let mut config = minimal_config();
        config.retry.base_delay_ms = 5_000;
        config.retry.max_delay_ms = 1_000;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("base_delay_ms"), "got: {err}");
    }

    #[test]
    fn test_success_rate_out_of_range() {
        let mut config = minimal_config();
        config.providers[0] = ProviderConfig::mock("primary", 1.5);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("within [0, 1]"), "got: {err}");
    }

    #[test]
    fn test_malformed_script() {
        let mut config = minimal_config();
        config.providers[1]
            .params
            .insert("script".to_string(), "ok,maybe".to_string());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("unknown script step"), "got: {err}");
    }
}
