//! Shipped delivery backends
//!
//! Simulated providers used by the CLI and tests. Real transports plug in by
//! implementing `DeliveryBackend`.

mod log;
mod mock;
mod scripted;

pub use self::log::LogBackend;
pub use self::mock::MockBackend;
pub use self::scripted::ScriptedBackend;

use contracts::{ProviderConfig, ProviderType};
use tracing::instrument;

use crate::error::DispatcherError;
use crate::handle::BackendHandle;

/// Create a BackendHandle from configuration
#[instrument(
    name = "dispatcher_create_backend_handle",
    skip(config),
    fields(backend = %config.name, provider_type = ?config.provider_type)
)]
pub fn create_backend_handle(config: &ProviderConfig) -> Result<BackendHandle, DispatcherError> {
    let creation_error = |e: contracts::ContractError| {
        DispatcherError::backend_creation(&config.name, e.to_string())
    };

    match config.provider_type {
        ProviderType::Mock => {
            let backend = MockBackend::from_config(config).map_err(creation_error)?;
            Ok(BackendHandle::new(backend))
        }
        ProviderType::Scripted => {
            let backend = ScriptedBackend::from_config(config).map_err(creation_error)?;
            Ok(BackendHandle::new(backend))
        }
        ProviderType::Log => {
            let backend = LogBackend::from_config(config).map_err(creation_error)?;
            Ok(BackendHandle::new(backend))
        }
    }
}
