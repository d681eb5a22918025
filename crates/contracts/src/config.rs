//! ServiceConfig - Config Loader output
//!
//! Describes the complete service setup: rate limit, retry policy, dispatch
//! deadline and the ordered provider list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::ContractError;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Global admission limit
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    /// Per-backend retry policy
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,

    /// Whole-sequence settings
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Providers in priority order
    #[serde(default = "default_providers")]
    #[validate(length(min = 1, message = "at least one provider is required"), nested)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            dispatch: DispatchSettings::default(),
            providers: default_providers(),
        }
    }
}

/// Two simulated providers: a primary and a weaker fallback
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::mock("MockProvider1", 0.7),
        ProviderConfig::mock("MockProvider2", 0.4),
    ]
}

/// Fixed-window rate limit
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, message = "capacity must be >= 1"))]
    pub capacity: u32,

    /// Window length (milliseconds)
    #[serde(default = "default_window_ms")]
    #[validate(range(min = 1, message = "window_ms must be >= 1"))]
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            window_ms: default_window_ms(),
        }
    }
}

fn default_capacity() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    10_000 // 10s
}

/// Retry and backoff policy, applied per backend
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    /// Attempts per backend before falling back
    #[serde(default = "default_max_retries")]
    #[validate(range(min = 1, message = "max_retries must be >= 1"))]
    pub max_retries: u32,

    /// Backoff base (milliseconds); wait = base * 2^attempt_index
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Settings spanning the whole dispatch sequence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Abort the retry loop after this long (milliseconds, 0 = no deadline)
    #[serde(default)]
    pub deadline_ms: u64,
}

impl DispatchSettings {
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_ms > 0).then(|| Duration::from_millis(self.deadline_ms))
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Provider name (reported as `backend_used`)
    #[validate(length(min = 1, message = "provider name cannot be empty"))]
    pub name: String,

    /// Provider type
    pub provider_type: ProviderType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ProviderConfig {
    /// Simulated provider with the given success probability
    pub fn mock(name: impl Into<String>, success_rate: f64) -> Self {
        Self {
            name: name.into(),
            provider_type: ProviderType::Mock,
            params: HashMap::from([("success_rate".to_string(), success_rate.to_string())]),
        }
    }

    /// Typed lookup of a type-specific parameter
    ///
    /// # Errors
    /// Returns `ConfigValidation` when the value is present but unparsable
    pub fn param<T>(&self, key: &str) -> Result<Option<T>, ContractError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.params
            .get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    ContractError::config_validation(
                        format!("providers[{}].params.{key}", self.name),
                        format!("invalid value '{raw}': {e}"),
                    )
                })
            })
            .transpose()
    }
}

/// One step of a scripted provider: `ok`, `fail` or `error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Deliver,
    Fail,
    Error,
}

impl FromStr for ScriptStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ok" | "success" | "true" => Ok(Self::Deliver),
            "fail" | "failure" | "false" => Ok(Self::Fail),
            "error" | "err" => Ok(Self::Error),
            other => Err(format!("unknown script step '{other}'")),
        }
    }
}

impl ProviderConfig {
    /// Parse the comma-separated `script` parameter (e.g. `"fail,fail,ok"`)
    ///
    /// # Errors
    /// Returns `ConfigValidation` when the script is missing, empty or malformed
    pub fn script(&self) -> Result<Vec<ScriptStep>, ContractError> {
        let field = || format!("providers[{}].params.script", self.name);
        let raw = self
            .params
            .get("script")
            .ok_or_else(|| ContractError::config_validation(field(), "missing script"))?;

        let steps = raw
            .split(',')
            .filter(|step| !step.trim().is_empty())
            .map(|step| step.parse::<ScriptStep>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ContractError::config_validation(field(), e))?;

        if steps.is_empty() {
            return Err(ContractError::config_validation(field(), "script is empty"));
        }
        Ok(steps)
    }
}

/// Provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Random success with a configured probability
    Mock,
    /// Fixed success/failure script
    Scripted,
    /// Always succeeds, logs the delivery
    Log,
}
