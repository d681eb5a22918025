//! Layered error definitions
//!
//! Categorized by source: config / request / backend / store

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Request Errors =====
    /// Request rejected before any dispatch work
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    // ===== Backend Errors =====
    /// Unexpected backend failure (distinct from an ordinary unsuccessful attempt)
    #[error("backend '{backend}' error: {message}")]
    Backend { backend: String, message: String },

    /// Backend could not be built from its configuration
    #[error("failed to create backend '{backend}': {message}")]
    BackendCreation { backend: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create backend error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create backend creation error
    pub fn backend_creation(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCreation {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
