//! Exchange adapter error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Not connected")]
    NotConnected,

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Request failed: {0}")]
    Request(String),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
