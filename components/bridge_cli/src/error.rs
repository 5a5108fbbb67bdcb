//! Error types for the CLI

use reference_bridge::{BridgeError, ConfigError};
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Bridge operation failed
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Mode or environment configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Report serialization failed
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    /// Option combination rejected
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
