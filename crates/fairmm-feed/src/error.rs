//! Feed error types.

use fairmm_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

pub type FeedResult<T> = Result<T, FeedError>;
