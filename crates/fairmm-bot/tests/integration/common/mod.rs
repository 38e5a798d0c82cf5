//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

pub mod mock_feed;
pub mod mock_venue;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fairmm_bot::{AppConfig, EngineEvent, EventSink, LifecycleState, Orchestrator};
use fairmm_core::Clock;
use fairmm_exchange::{DynExchange, PaperExchange};
use fairmm_feed::FeedConfig;
use parking_lot::Mutex;

use mock_feed::ScriptedFeed;
use mock_venue::MarginVenue;

/// Wall-clock start for the manual clock (2023-11-14T22:13:20Z).
pub const T0: u64 = 1_700_000_000_000;

/// Clock advanced explicitly by the test.
#[derive(Debug)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(AtomicU64::new(start_ms))
    }

    pub fn advance(&self, ms: u64) -> u64 {
        self.0.fetch_add(ms, Ordering::SeqCst) + ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Event sink that keeps every event for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    /// Lifecycle states entered, in order.
    pub fn transitions(&self) -> Vec<LifecycleState> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EngineEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().push(event);
    }
}

/// Config tuned for tests: no warm-up, EMA tracks the latest sample, and
/// background ticks far enough apart that tests drive every tick directly.
pub fn test_config() -> AppConfig {
    AppConfig {
        warmup_seconds: 0,
        fair_price_window_ms: 0,
        update_throttle_ms: 1_000,
        order_sync_interval_ms: 3_600_000,
        margin_check_interval_ms: 3_600_000,
        warmup_poll_interval_ms: 5,
        feed: FeedConfig {
            symbol: "btcusdt".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// An orchestrator wired to the paper venue, a scripted feed and a manual clock.
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub paper: Arc<PaperExchange>,
    pub venue: Arc<MarginVenue>,
    pub feed: Arc<ScriptedFeed>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let paper = Arc::new(PaperExchange::new(config.paper.clone()));
        let venue = Arc::new(MarginVenue::new(paper.clone()));
        let feed = Arc::new(ScriptedFeed::new());
        let clock = Arc::new(ManualClock::new(T0));
        let events = Arc::new(RecordingSink::default());

        let exchange: DynExchange = venue.clone();
        let orchestrator = Arc::new(
            Orchestrator::new(
                config,
                exchange,
                feed.clone(),
                clock.clone(),
                events.clone(),
            )
            .unwrap(),
        );

        Self {
            orchestrator,
            paper,
            venue,
            feed,
            clock,
            events,
        }
    }

    /// Push one oracle price stamped with the current manual time.
    pub fn push_price(&self, price: rust_decimal::Decimal) {
        self.feed.push(price, self.clock.now_ms());
    }

    /// Seed a price and run `start()` to completion.
    pub async fn start_with_price(&self, price: rust_decimal::Decimal) {
        self.push_price(price);
        self.orchestrator.start().await.unwrap();
        assert_eq!(self.orchestrator.state(), LifecycleState::Running);
    }

    /// Move the clock past the quote throttle and publish a new price.
    pub fn next_price(&self, price: rust_decimal::Decimal) {
        self.clock.advance(1_000);
        self.push_price(price);
    }

    /// Yield until background tasks have drained pending samples.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    /// Wait (in paused tokio time) until the orchestrator reaches `state`.
    pub async fn wait_for_state(&self, state: LifecycleState) -> bool {
        for _ in 0..100 {
            if self.orchestrator.state() == state {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}
