//! Application error types.

use fairmm_exchange::ExchangeError;
use fairmm_feed::FeedError;
use thiserror::Error;

/// Unrecoverable failures while bringing the orchestrator up.
///
/// Any of these moves the lifecycle to `error`; the process must restart.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Exchange connect failed: {0}")]
    ExchangeConnect(#[source] ExchangeError),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Price feed connect failed: {0}")]
    FeedConnect(#[source] FeedError),

    #[error("Price feed closed during warm-up")]
    FeedLost,

    #[error("Initial sync failed: {0}")]
    InitialSync(#[source] ExchangeError),

    #[error("Start aborted by stop()")]
    Aborted,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

pub type AppResult<T> = Result<T, AppError>;
