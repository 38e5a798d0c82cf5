//! Venue-mid price feed.
//!
//! Samples the traded venue's own top-of-book through the exchange
//! adapter's orderbook subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fairmm_core::{BoxFuture, Clock, Orderbook};
use fairmm_exchange::DynExchange;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{FeedError, FeedResult};
use crate::source::{PriceFeed, PriceSample, SAMPLE_CHANNEL_CAPACITY};

/// Feed that emits the book mid of `symbol` on the traded venue.
pub struct VenueMidFeed {
    exchange: DynExchange,
    symbol: String,
    clock: Arc<dyn Clock>,
    subscribed: AtomicBool,
}

impl VenueMidFeed {
    pub fn new(exchange: DynExchange, symbol: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            clock,
            subscribed: AtomicBool::new(false),
        }
    }
}

impl PriceFeed for VenueMidFeed {
    fn name(&self) -> &'static str {
        "venue-mid"
    }

    fn connect(&self) -> BoxFuture<'_, FeedResult<mpsc::Receiver<PriceSample>>> {
        Box::pin(async move {
            if self.subscribed.swap(true, Ordering::SeqCst) {
                return Err(FeedError::AlreadyConnected);
            }
            let (tx, rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
            let clock = self.clock.clone();
            let callback = Box::new(move |book: Orderbook| {
                let Some(mid) = book.mid_price() else {
                    return;
                };
                if let Err(e) = tx.try_send(PriceSample::new(mid, clock.now_ms())) {
                    debug!(error = %e, "Dropping venue mid sample");
                }
            });

            if let Err(e) = self.exchange.subscribe_orderbook(&self.symbol, callback).await {
                self.subscribed.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
            info!(symbol = %self.symbol, venue = self.exchange.name(), "Venue mid feed connected");
            Ok(rx)
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if !self.subscribed.swap(false, Ordering::SeqCst) {
                return;
            }
            // Dropping the callback closes the sample channel
            if let Err(e) = self.exchange.unsubscribe_orderbook(&self.symbol).await {
                warn!(?e, symbol = %self.symbol, "Failed to unsubscribe venue mid feed");
            }
        })
    }
}
