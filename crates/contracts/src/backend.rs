//! DeliveryBackend trait - Dispatcher delivery interface
//!
//! Defines the abstract interface for delivery providers.

use crate::{ContractError, DispatchRequest};

/// Delivery provider trait
///
/// All backend implementations must implement this trait. Backends are shared
/// across concurrent dispatch sequences, so `attempt` takes `&self`.
#[trait_variant::make(DeliveryBackend: Send)]
pub trait LocalDeliveryBackend {
    /// Stable backend name (used in outcomes, logs and metrics)
    fn name(&self) -> &str;

    /// Perform one delivery attempt
    ///
    /// `Ok(true)` means delivered, `Ok(false)` is an ordinary failure.
    ///
    /// # Errors
    /// Unexpected conditions only; the dispatcher counts them as failed attempts
    async fn attempt(&self, request: &DispatchRequest) -> Result<bool, ContractError>;
}
