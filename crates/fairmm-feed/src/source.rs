//! Price feed collaborator contract.

use std::fmt;

use fairmm_core::{BoxFuture, Price};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::FeedResult;

/// Capacity of the sample channel handed out by feeds.
pub const SAMPLE_CHANNEL_CAPACITY: usize = 1024;

/// One observation from a price stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: Price,
    /// Receive time in milliseconds since Unix epoch.
    pub ts_ms: u64,
}

impl PriceSample {
    pub fn new(price: Price, ts_ms: u64) -> Self {
        Self { price, ts_ms }
    }
}

/// Where the fair price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSource {
    /// External reference venue stream.
    #[default]
    PrimaryOracle,
    /// Mid of the traded venue's own orderbook.
    VenueMid,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryOracle => write!(f, "primary-oracle"),
            Self::VenueMid => write!(f, "venue-mid"),
        }
    }
}

/// Upstream price stream.
///
/// `connect` hands out the receiving end of a fresh sample channel. The
/// channel closes when the stream is lost for good (retry budget exhausted)
/// or after `disconnect`. A closed stream is never restarted without a new
/// `connect`.
pub trait PriceFeed: Send + Sync {
    /// Short feed name for logs.
    fn name(&self) -> &'static str;

    fn connect(&self) -> BoxFuture<'_, FeedResult<mpsc::Receiver<PriceSample>>>;

    /// Tear down the stream. Idempotent.
    fn disconnect(&self) -> BoxFuture<'_, ()>;
}
