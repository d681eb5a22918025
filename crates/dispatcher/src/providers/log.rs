//! LogBackend - logs the message instead of sending it

use contracts::{ContractError, DeliveryBackend, DispatchRequest, ProviderConfig};
use tracing::{info, instrument};

/// Backend that always succeeds, for dry runs
pub struct LogBackend {
    name: String,
}

impl LogBackend {
    /// Create a new LogBackend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ContractError> {
        Ok(Self::new(&config.name))
    }
}

impl DeliveryBackend for LogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_backend_attempt",
        skip(self, request),
        fields(backend = %self.name, request_id = %request.request_id)
    )]
    async fn attempt(&self, request: &DispatchRequest) -> Result<bool, ContractError> {
        info!(
            recipient = %request.recipient,
            subject = %request.subject,
            body_len = request.body.len(),
            "Email delivered (log only)"
        );
        Ok(true)
    }
}
