//! ScriptedBackend - replays a fixed outcome script

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{ContractError, DeliveryBackend, DispatchRequest, ProviderConfig, ScriptStep};
use tracing::debug;

/// Deterministic provider
///
/// Each attempt consumes the next step; the script wraps around when exhausted.
/// `fail,fail,ok` fails twice then succeeds, and `fail` alone always fails.
pub struct ScriptedBackend {
    name: String,
    steps: Vec<ScriptStep>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    /// An empty script behaves as `fail`
    pub fn new(name: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        let steps = if steps.is_empty() {
            vec![ScriptStep::Fail]
        } else {
            steps
        };
        Self {
            name: name.into(),
            steps,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn always_ok(name: impl Into<String>) -> Self {
        Self::new(name, vec![ScriptStep::Deliver])
    }

    pub fn always_fail(name: impl Into<String>) -> Self {
        Self::new(name, vec![ScriptStep::Fail])
    }

    /// Build from the `script` param
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ContractError> {
        Ok(Self::new(&config.name, config.script()?))
    }

    /// Shared call counter; stays readable after the backend moves into a dispatcher
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl DeliveryBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, request: &DispatchRequest) -> Result<bool, ContractError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps[call % self.steps.len()];
        debug!(
            backend = %self.name,
            request_id = %request.request_id,
            call,
            ?step,
            "Scripted delivery"
        );

        match step {
            ScriptStep::Deliver => Ok(true),
            ScriptStep::Fail => Ok(false),
            ScriptStep::Error => Err(ContractError::backend(&self.name, "scripted error")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_script_cycles() {
        let backend = ScriptedBackend::new(
            "s",
            vec![ScriptStep::Fail, ScriptStep::Error, ScriptStep::Deliver],
        );
        let counter = backend.call_counter();
        let request = DispatchRequest::new("r1", "a@example.com", "s", "b");

        assert!(!backend.attempt(&request).await.unwrap());
        assert!(backend.attempt(&request).await.is_err());
        assert!(backend.attempt(&request).await.unwrap());
        assert!(!backend.attempt(&request).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_from_config() {
        let config = ProviderConfig {
            name: "script".into(),
            provider_type: contracts::ProviderType::Scripted,
            params: HashMap::from([("script".to_string(), "fail,ok".to_string())]),
        };
        let backend = ScriptedBackend::from_config(&config).unwrap();
        assert_eq!(backend.steps, vec![ScriptStep::Fail, ScriptStep::Deliver]);
    }
}
