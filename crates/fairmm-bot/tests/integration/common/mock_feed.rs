//! Price feed driven directly by the test.

use std::sync::atomic::{AtomicU32, Ordering};

use fairmm_core::{BoxFuture, Price};
use fairmm_feed::{FeedError, FeedResult, PriceFeed, PriceSample, SAMPLE_CHANNEL_CAPACITY};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

/// Feed whose samples are pushed by the test.
///
/// The receiving end is handed out on the first `connect`; dropping the
/// sender with [`ScriptedFeed::close`] ends the stream.
pub struct ScriptedFeed {
    tx: Mutex<Option<mpsc::Sender<PriceSample>>>,
    rx: Mutex<Option<mpsc::Receiver<PriceSample>>>,
    connects: AtomicU32,
    disconnects: AtomicU32,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            connects: AtomicU32::new(0),
            disconnects: AtomicU32::new(0),
        }
    }

    pub fn push(&self, price: Decimal, ts_ms: u64) {
        if let Some(tx) = self.tx.lock().as_ref() {
            tx.try_send(PriceSample::new(Price::new(price), ts_ms))
                .expect("sample channel full");
        }
    }

    /// Simulate a permanently lost stream.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl PriceFeed for ScriptedFeed {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn connect(&self) -> BoxFuture<'_, FeedResult<mpsc::Receiver<PriceSample>>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.rx.lock().take().ok_or(FeedError::AlreadyConnected)
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        })
    }
}
