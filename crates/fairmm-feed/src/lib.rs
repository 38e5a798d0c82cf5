//! Price feeds and fair price estimation for fairmm.
//!
//! - `PriceFeed`: upstream price stream contract, delivering `PriceSample`s
//!   over an mpsc channel
//! - `BinanceBookTickerFeed`: external reference stream (primary oracle)
//! - `VenueMidFeed`: mid of the traded venue's own book
//! - `FairPriceEstimator`: time-weighted EMA with warm-up gating

pub mod binance;
pub mod error;
pub mod estimator;
pub mod source;
pub mod venue_mid;

pub use binance::{parse_book_ticker, BinanceBookTickerFeed, FeedConfig};
pub use error::{FeedError, FeedResult};
pub use estimator::FairPriceEstimator;
pub use source::{PriceFeed, PriceSample, PriceSource, SAMPLE_CHANNEL_CAPACITY};
pub use venue_mid::VenueMidFeed;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
