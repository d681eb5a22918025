//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
///
/// Ordinary delivery failures are not errors: they end up in a `DispatchOutcome`.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Request rejected before any dispatch work (empty id)
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Request id is marked processed but no outcome was stored
    #[error("request '{request_id}' is marked processed but has no stored outcome")]
    ConsistencyViolation { request_id: String },

    /// Dispatcher built without any backend
    #[error("dispatcher requires at least one delivery backend")]
    NoBackends,

    /// Backend creation error
    #[error("failed to create backend '{name}': {message}")]
    BackendCreation { name: String, message: String },

    /// Contract-level error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn consistency_violation(request_id: impl Into<String>) -> Self {
        Self::ConsistencyViolation {
            request_id: request_id.into(),
        }
    }

    /// Create a backend creation error
    pub fn backend_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
