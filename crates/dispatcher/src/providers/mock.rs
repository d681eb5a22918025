//! MockBackend - succeeds with a configured probability

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use contracts::{ContractError, DeliveryBackend, DispatchRequest, ProviderConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

/// Simulated provider
///
/// Params: `success_rate` (0..=1, default 1.0), `latency_ms` (default 0),
/// `seed` (fixes the random sequence).
pub struct MockBackend {
    name: String,
    success_rate: f64,
    latency: Option<Duration>,
    rng: Mutex<StdRng>,
}

impl MockBackend {
    pub fn new(name: impl Into<String>, success_rate: f64) -> Self {
        Self {
            name: name.into(),
            success_rate: success_rate.clamp(0.0, 1.0),
            latency: None,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Build from provider params
    ///
    /// # Errors
    /// Unparsable params or a success rate outside [0, 1]
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ContractError> {
        let success_rate = config.param::<f64>("success_rate")?.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(ContractError::config_validation(
                format!("providers[{}].params.success_rate", config.name),
                format!("success_rate must be within [0, 1], got {success_rate}"),
            ));
        }

        let mut backend = Self::new(&config.name, success_rate);
        if let Some(ms) = config.param::<u64>("latency_ms")? {
            backend = backend.with_latency(Duration::from_millis(ms));
        }
        if let Some(seed) = config.param::<u64>("seed")? {
            backend = backend.with_seed(seed);
        }
        Ok(backend)
    }

    /// Simulated network latency per attempt
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = (!latency.is_zero()).then_some(latency);
        self
    }

    /// Deterministic outcome sequence
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    fn roll(&self) -> bool {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_bool(self.success_rate)
    }
}

impl DeliveryBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "mock_backend_attempt",
        skip(self, request),
        fields(backend = %self.name, request_id = %request.request_id)
    )]
    async fn attempt(&self, request: &DispatchRequest) -> Result<bool, ContractError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let delivered = self.roll();
        debug!(delivered, recipient = %request.recipient, "Mock delivery");
        Ok(delivered)
    }
}
