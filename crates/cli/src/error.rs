//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[from] contracts::ContractError),

    /// Dispatcher construction or dispatch error
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] dispatcher::DispatcherError),

    /// Invalid simulation parameters
    #[error("Invalid simulation settings: {message}")]
    Simulation { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn simulation(message: impl Into<String>) -> Self {
        Self::Simulation {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
