//! Error types for fairmm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid risk limits: {0}")]
    InvalidLimits(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
