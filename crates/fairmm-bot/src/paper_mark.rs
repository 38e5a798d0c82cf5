//! Oracle feed wrapper that drives paper venue marks.
//!
//! In a paper run the simulated venue has no market data of its own. Every
//! sample from the wrapped feed is applied as the paper mark (which may fill
//! resting orders) before being forwarded unchanged.

use std::sync::Arc;

use fairmm_core::{BoxFuture, Price};
use fairmm_exchange::PaperExchange;
use fairmm_feed::{FeedResult, PriceFeed, PriceSample, SAMPLE_CHANNEL_CAPACITY};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct PaperMarkFeed {
    inner: Arc<dyn PriceFeed>,
    paper: Arc<PaperExchange>,
    symbol: String,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl PaperMarkFeed {
    pub fn new(inner: Arc<dyn PriceFeed>, paper: Arc<PaperExchange>, symbol: impl Into<String>) -> Self {
        Self {
            inner,
            paper,
            symbol: symbol.into(),
            forwarder: Mutex::new(None),
        }
    }

    fn apply_mark(paper: &PaperExchange, symbol: &str, price: Price) {
        let fills = paper.set_mark_price(symbol, price);
        if !fills.is_empty() {
            debug!(%price, fills = fills.len(), "Paper mark crossed resting orders");
        }
    }
}

impl PriceFeed for PaperMarkFeed {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn connect(&self) -> BoxFuture<'_, FeedResult<mpsc::Receiver<PriceSample>>> {
        Box::pin(async move {
            let mut upstream = self.inner.connect().await?;
            let (tx, rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
            let paper = Arc::clone(&self.paper);
            let symbol = self.symbol.clone();

            let handle = tokio::spawn(async move {
                while let Some(sample) = upstream.recv().await {
                    Self::apply_mark(&paper, &symbol, sample.price);
                    if tx.send(sample).await.is_err() {
                        break;
                    }
                }
            });
            if let Some(previous) = self.forwarder.lock().replace(handle) {
                previous.abort();
            }
            Ok(rx)
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.inner.disconnect().await;
            let forwarder = self.forwarder.lock().take();
            if let Some(handle) = forwarder {
                handle.abort();
            }
        })
    }
}
