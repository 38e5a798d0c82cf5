//! Orchestrator: lifecycle state machine, periodic ticks and circuit breakers.
//!
//! Wires the fair price estimator, quote generator and exposure tracker to
//! the exchange adapter and price feed.
//!
//! # Activities
//!
//! Once running, three independent tokio tasks share an `Arc<Orchestrator>`:
//! - quote tick (`update_throttle_ms`): fair price → exposure → quote →
//!   cancel-and-replace when a resting order is stale
//! - sync tick (`order_sync_interval_ms`): position and open orders from venue
//! - margin tick (`margin_check_interval_ms`): margin breaker and auto-resume
//!
//! A fourth task pumps price samples from the feed into the estimator.
//! Shared state lives behind `parking_lot` locks that are never held across
//! an `.await`; each tick recomputes from freshly fetched venue state.
//!
//! The one async lock is the quote guard: a requote holds it from fetching
//! open orders to the last placement, and `pause`/`stop` take it before
//! cancelling, so no order placed by an in-flight tick outlives the cancel.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fairmm_core::{Clock, Market, Order, OrderSide, Orderbook};
use fairmm_exchange::{DynExchange, ExchangeResult};
use fairmm_feed::{FairPriceEstimator, PriceFeed, PriceSample};
use fairmm_mm::{ExposureTracker, QuoteGenerator};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult, SetupError};
use crate::events::{EngineEvent, EventSink, VenueOp};
use crate::lifecycle::{LifecycleState, PauseReason};
use crate::status::{ExposureSnapshot, RestingSide, StatusSnapshot};

/// Margin pauses resume once the ratio reaches `min_margin_ratio * 1.2`.
const MARGIN_RESUME_FACTOR: Decimal = Decimal::from_parts(12, 0, 0, false, 1);

/// Fraction of `update_throttle_ms` a quote tick may arrive early and still run.
const THROTTLE_SLACK_DIVISOR: u64 = 20;

/// Minimum gap between evaluated quote ticks.
///
/// The quote activity fires every `throttle_ms`; the slack keeps a tick that
/// wakes a little early on the clock from being throttled a whole period.
fn throttle_gap_ms(throttle_ms: u64) -> u64 {
    throttle_ms - throttle_ms / THROTTLE_SLACK_DIVISOR
}

/// Why a quote tick did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRunning,
    Throttled,
    NoFairPrice,
    AtMax,
    NothingToQuote,
}

/// Result of one quote tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// Resting orders still match the quote.
    Unchanged,
    Requoted {
        cancelled: usize,
        placed: usize,
        failed: usize,
    },
}

impl TickOutcome {
    /// The tick actually evaluated the book (not gated by state or throttle).
    fn is_iteration(&self) -> bool {
        !matches!(
            self,
            Self::Skipped(SkipReason::NotRunning | SkipReason::Throttled)
        )
    }

    /// Every venue call in the tick succeeded.
    fn is_clean(&self) -> bool {
        !matches!(self, Self::Requoted { failed, .. } if *failed > 0)
    }
}

#[derive(Debug, Clone, Copy)]
enum Activity {
    Quote,
    Sync,
    Margin,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quote => write!(f, "quote"),
            Self::Sync => write!(f, "sync"),
            Self::Margin => write!(f, "margin"),
        }
    }
}

#[derive(Default)]
struct EngineState {
    lifecycle: LifecycleState,
    pause_reason: Option<PauseReason>,
    paused_at_ms: Option<u64>,
    started_at_ms: Option<u64>,
    market: Option<Market>,
    /// Last known resting orders for the traded symbol.
    resting: Vec<Order>,
    margin_ratio: Option<Decimal>,
    shutdown: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

/// Set the lifecycle state; returns the change to report, if any.
fn set_state(state: &mut EngineState, to: LifecycleState) -> Option<EngineEvent> {
    let from = state.lifecycle;
    if from == to {
        return None;
    }
    state.lifecycle = to;
    Some(EngineEvent::StateChanged { from, to })
}

/// Owns the lifecycle and drives quoting for one symbol.
pub struct Orchestrator {
    config: AppConfig,
    exchange: DynExchange,
    feed: Arc<dyn PriceFeed>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    state: Mutex<EngineState>,
    estimator: Mutex<FairPriceEstimator>,
    quoter: RwLock<QuoteGenerator>,
    exposure: Mutex<ExposureTracker>,
    last_book: Arc<RwLock<Option<Orderbook>>>,
    /// Serializes requotes against the cancel-all in `pause` and `stop`.
    quote_guard: TokioMutex<()>,
    consecutive_errors: AtomicU32,
    /// Time of the last evaluated quote tick (0 = never).
    last_quote_ms: AtomicU64,
    feed_closed: AtomicBool,
    stopping: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        exchange: DynExchange,
        feed: Arc<dyn PriceFeed>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> AppResult<Self> {
        let quoter = QuoteGenerator::new(config.strategy.clone())
            .map_err(|e| AppError::Config(format!("strategy: {e}")))?;
        let exposure = ExposureTracker::new(*quoter.limits());
        let estimator = FairPriceEstimator::new(config.fair_price_window_ms, config.warmup_ms());

        Ok(Self {
            config,
            exchange,
            feed,
            clock,
            events,
            state: Mutex::new(EngineState::default()),
            estimator: Mutex::new(estimator),
            quoter: RwLock::new(quoter),
            exposure: Mutex::new(exposure),
            last_book: Arc::new(RwLock::new(None)),
            quote_guard: TokioMutex::new(()),
            consecutive_errors: AtomicU32::new(0),
            last_quote_ms: AtomicU64::new(0),
            feed_closed: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
        })
    }

    fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn state(&self) -> LifecycleState {
        self.state.lock().lifecycle
    }

    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.state.lock().pause_reason
    }

    /// Resolved market, once connected.
    pub fn market(&self) -> Option<Market> {
        self.state.lock().market.clone()
    }

    /// Running and not shutting down.
    fn may_quote(&self) -> bool {
        self.state() == LifecycleState::Running && !self.stopping.load(Ordering::SeqCst)
    }

    /// Cancel every resting order for the symbol once no requote is in flight.
    async fn cancel_resting(&self) {
        let _guard = self.quote_guard.lock().await;
        match self.exchange.cancel_all_orders(Some(self.symbol())).await {
            Ok(()) => self.state.lock().resting.clear(),
            Err(e) => self.venue_failed(VenueOp::CancelAll, &e),
        }
    }

    fn transition(&self, to: LifecycleState) {
        let event = set_state(&mut self.state.lock(), to);
        if let Some(event) = event {
            self.events.emit(event);
        }
    }

    fn venue_failed(&self, op: VenueOp, error: &dyn fmt::Display) {
        self.events.emit(EngineEvent::VenueCallFailed {
            op,
            error: error.to_string(),
        });
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.state.lock().tasks.push(handle);
    }

    // ---- lifecycle -------------------------------------------------------

    /// Connect, warm up and start the periodic activities.
    ///
    /// Returns once the orchestrator is `running`. Any setup failure moves
    /// the lifecycle to `error`.
    pub async fn start(self: &Arc<Self>) -> AppResult<()> {
        let shutdown = CancellationToken::new();
        let event = {
            let mut state = self.state.lock();
            if state.lifecycle != LifecycleState::Stopped {
                return Err(AppError::InvalidState(format!(
                    "start() called while {}",
                    state.lifecycle
                )));
            }
            state.shutdown = Some(shutdown.clone());
            state.started_at_ms = Some(self.clock.now_ms());
            state.pause_reason = None;
            set_state(&mut state, LifecycleState::Connecting)
        };
        if let Some(event) = event {
            self.events.emit(event);
        }
        self.consecutive_errors.store(0, Ordering::SeqCst);
        self.last_quote_ms.store(0, Ordering::SeqCst);
        self.feed_closed.store(false, Ordering::SeqCst);

        match self.setup(&shutdown).await {
            Ok(()) => Ok(()),
            Err(e) if shutdown.is_cancelled() => {
                info!(error = %e, "Start interrupted by stop()");
                Err(SetupError::Aborted.into())
            }
            Err(e) => {
                self.events.emit(EngineEvent::SetupFailed {
                    reason: e.to_string(),
                });
                self.transition(LifecycleState::Error);
                Err(e.into())
            }
        }
    }

    async fn setup(self: &Arc<Self>, shutdown: &CancellationToken) -> Result<(), SetupError> {
        self.exchange
            .connect()
            .await
            .map_err(SetupError::ExchangeConnect)?;

        let market = self
            .exchange
            .get_markets()
            .await
            .map_err(SetupError::ExchangeConnect)?
            .into_iter()
            .find(|m| m.matches(self.symbol()))
            .ok_or_else(|| SetupError::MarketNotFound(self.config.symbol.clone()))?;
        info!(
            symbol = %market.symbol,
            tick_size = %market.tick_size,
            lot_size = %market.lot_size,
            venue = self.exchange.name(),
            "Market resolved"
        );
        self.quoter.write().bind_market(market.clone());
        self.state.lock().market = Some(market);

        let samples = self
            .feed
            .connect()
            .await
            .map_err(SetupError::FeedConnect)?;
        if shutdown.is_cancelled() {
            self.feed.disconnect().await;
            return Err(SetupError::Aborted);
        }
        info!(feed = self.feed.name(), "Price feed connected");
        self.estimator.lock().mark_connected(self.clock.now_ms());
        self.spawn_task(Arc::clone(self).pump_samples(samples, shutdown.clone()));
        self.transition(LifecycleState::WarmingUp);

        self.subscribe_market_data().await;
        self.wait_for_warmup(shutdown).await?;

        // Start from a fresh position and an empty book (crash recovery)
        self.sync_positions()
            .await
            .map_err(SetupError::InitialSync)?;
        self.exchange
            .cancel_all_orders(Some(self.symbol()))
            .await
            .map_err(SetupError::InitialSync)?;
        self.state.lock().resting.clear();

        if shutdown.is_cancelled() {
            return Err(SetupError::Aborted);
        }
        self.transition(LifecycleState::Running);

        for activity in [Activity::Quote, Activity::Sync, Activity::Margin] {
            self.spawn_task(Arc::clone(self).run_activity(activity, shutdown.clone()));
        }
        Ok(())
    }

    /// Best-effort top-of-book subscription; failures are only reported.
    async fn subscribe_market_data(&self) {
        let book = Arc::clone(&self.last_book);
        let callback = Box::new(move |ob: Orderbook| {
            *book.write() = Some(ob);
        });
        if let Err(e) = self
            .exchange
            .subscribe_orderbook(self.symbol(), callback)
            .await
        {
            self.venue_failed(VenueOp::Subscribe, &e);
        }
    }

    async fn wait_for_warmup(&self, shutdown: &CancellationToken) -> Result<(), SetupError> {
        let poll = Duration::from_millis(self.config.warmup_poll_interval_ms);
        loop {
            let now = self.clock.now_ms();
            let (ready, remaining_ms, price_count) = {
                let est = self.estimator.lock();
                (
                    est.is_ready(now),
                    est.warmup_remaining_ms(now),
                    est.price_count(),
                )
            };
            if ready {
                info!(price_count, "Warm-up complete");
                return Ok(());
            }
            if self.feed_closed.load(Ordering::SeqCst) {
                return Err(SetupError::FeedLost);
            }
            debug!(remaining_ms, price_count, "Warming up");

            tokio::select! {
                () = tokio::time::sleep(poll) => {}
                () = shutdown.cancelled() => return Err(SetupError::Aborted),
            }
        }
    }

    async fn pump_samples(
        self: Arc<Self>,
        mut samples: mpsc::Receiver<PriceSample>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => return,
                sample = samples.recv() => match sample {
                    Some(sample) => {
                        self.estimator.lock().on_sample(sample.price, sample.ts_ms);
                    }
                    None => break,
                },
            }
        }
        warn!(feed = self.feed.name(), "Price feed closed");
        self.feed_closed.store(true, Ordering::SeqCst);
        self.pause(PauseReason::FeedLost).await;
    }

    async fn run_activity(self: Arc<Self>, activity: Activity, shutdown: CancellationToken) {
        let period_ms = match activity {
            Activity::Quote => self.config.update_throttle_ms,
            Activity::Sync => self.config.order_sync_interval_ms,
            Activity::Margin => self.config.margin_check_interval_ms,
        };
        let period = Duration::from_millis(period_ms.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(%activity, period_ms, "Activity started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => return,
                _ = interval.tick() => {}
            }
            let result = match activity {
                Activity::Quote => self.quote_tick().await.map(|_| ()),
                Activity::Sync => self.sync_tick().await,
                Activity::Margin => self.margin_tick().await,
            };
            // Failures were already reported through the event sink
            if let Err(e) = result {
                debug!(%activity, error = %e, "Tick failed");
            }
        }
    }

    /// Cancel orders, unsubscribe, disconnect feed and venue; end `stopped`.
    ///
    /// Each cleanup step runs even if an earlier one fails. Idempotent.
    pub async fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            debug!("stop() already in progress");
            return;
        }
        let (was, shutdown, tasks) = {
            let mut state = self.state.lock();
            (
                state.lifecycle,
                state.shutdown.take(),
                std::mem::take(&mut state.tasks),
            )
        };
        if was == LifecycleState::Stopped && shutdown.is_none() {
            self.stopping.store(false, Ordering::SeqCst);
            return;
        }
        info!(state = %was, "Stopping");

        if let Some(token) = shutdown {
            token.cancel();
        }
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Background task failed");
                }
            }
        }

        self.cancel_resting().await;
        if let Err(e) = self.exchange.unsubscribe_orderbook(self.symbol()).await {
            self.venue_failed(VenueOp::Unsubscribe, &e);
        }
        self.feed.disconnect().await;
        if let Err(e) = self.exchange.disconnect().await {
            self.venue_failed(VenueOp::Disconnect, &e);
        }

        {
            let mut state = self.state.lock();
            state.started_at_ms = None;
            state.pause_reason = None;
            state.paused_at_ms = None;
        }
        self.transition(LifecycleState::Stopped);
        self.stopping.store(false, Ordering::SeqCst);
        info!("Stopped");
    }

    // ---- pause / resume --------------------------------------------------

    /// Pause quoting and cancel every resting order.
    ///
    /// Only acts while running; a feed loss also overrides an existing
    /// pause reason since it never auto-resumes.
    async fn pause(&self, reason: PauseReason) {
        let now = self.clock.now_ms();
        let event = {
            let mut state = self.state.lock();
            match state.lifecycle {
                LifecycleState::Running => {
                    state.pause_reason = Some(reason);
                    state.paused_at_ms = Some(now);
                    set_state(&mut state, LifecycleState::Paused)
                }
                LifecycleState::Paused if reason == PauseReason::FeedLost => {
                    state.pause_reason = Some(reason);
                    None
                }
                _ => return,
            }
        };
        if let Some(event) = event {
            self.events.emit(event);
        }
        self.events.emit(EngineEvent::Paused { reason });
        self.cancel_resting().await;
    }

    /// Paused → running, if paused for `expected` (or any reason when `None`).
    fn resume_from(&self, expected: Option<PauseReason>) -> bool {
        let (event, reason) = {
            let mut state = self.state.lock();
            if state.lifecycle != LifecycleState::Paused {
                return false;
            }
            let Some(reason) = state.pause_reason else {
                return false;
            };
            if expected.is_some_and(|r| r != reason) {
                return false;
            }
            state.pause_reason = None;
            state.paused_at_ms = None;
            (set_state(&mut state, LifecycleState::Running), reason)
        };
        self.consecutive_errors.store(0, Ordering::SeqCst);
        self.last_quote_ms.store(0, Ordering::SeqCst);
        if let Some(event) = event {
            self.events.emit(event);
        }
        self.events.emit(EngineEvent::Resumed { reason });
        true
    }

    /// Operator resume of a margin or error-breaker pause.
    pub fn resume(&self) -> AppResult<()> {
        let (lifecycle, reason) = {
            let state = self.state.lock();
            (state.lifecycle, state.pause_reason)
        };
        if lifecycle != LifecycleState::Paused {
            return Err(AppError::InvalidState(format!(
                "resume() called while {lifecycle}"
            )));
        }
        if reason == Some(PauseReason::FeedLost) {
            return Err(AppError::InvalidState(
                "price feed lost; restart required".to_string(),
            ));
        }
        self.resume_from(None);
        Ok(())
    }

    // ---- ticks -----------------------------------------------------------

    /// One quoting iteration, with error-breaker bookkeeping.
    ///
    /// A failed tick increments the consecutive error count and pauses
    /// quoting at `max_consecutive_errors`; a tick with no failed venue
    /// call resets it.
    pub async fn quote_tick(&self) -> AppResult<TickOutcome> {
        let started = Instant::now();
        let result = self.requote().await;

        match &result {
            Ok(outcome) if outcome.is_iteration() => {
                if outcome.is_clean() {
                    self.consecutive_errors.store(0, Ordering::SeqCst);
                }
                self.events.emit(EngineEvent::QuoteTickCompleted {
                    duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                });
            }
            Ok(_) => {}
            Err(e) => {
                let consecutive = self.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
                self.events.emit(EngineEvent::LoopError {
                    consecutive,
                    error: e.to_string(),
                });
                if consecutive >= self.config.max_consecutive_errors {
                    self.pause(PauseReason::ErrorBreaker).await;
                }
            }
        }
        result
    }

    async fn requote(&self) -> AppResult<TickOutcome> {
        if !self.may_quote() {
            return Ok(TickOutcome::Skipped(SkipReason::NotRunning));
        }
        let _guard = self.quote_guard.lock().await;

        let now = self.clock.now_ms();
        let last = self.last_quote_ms.load(Ordering::SeqCst);
        if last != 0 && now.saturating_sub(last) < throttle_gap_ms(self.config.update_throttle_ms) {
            return Ok(TickOutcome::Skipped(SkipReason::Throttled));
        }
        self.last_quote_ms.store(now, Ordering::SeqCst);

        let Some(fair_price) = self.estimator.lock().fair_price(now) else {
            return Ok(TickOutcome::Skipped(SkipReason::NoFairPrice));
        };

        let (signed_notional_usd, mode, at_max) = {
            let mut exposure = self.exposure.lock();
            exposure.reprice(fair_price);
            (
                exposure.signed_notional(),
                exposure.state().mode,
                exposure.is_at_max(),
            )
        };
        self.events.emit(EngineEvent::ExposureUpdated {
            fair_price,
            signed_notional_usd,
            mode,
        });
        if at_max {
            warn!(%signed_notional_usd, "At max position, skipping quote tick");
            return Ok(TickOutcome::Skipped(SkipReason::AtMax));
        }

        let quote = self
            .quoter
            .read()
            .generate_quotes(fair_price, signed_notional_usd);
        let resting = match self.exchange.get_open_orders(Some(self.symbol())).await {
            Ok(orders) => orders,
            Err(e) => {
                self.venue_failed(VenueOp::Sync, &e);
                return Err(e.into());
            }
        };
        // A pause or stop may have landed while the venue call was in flight
        if !self.may_quote() {
            return Ok(TickOutcome::Skipped(SkipReason::NotRunning));
        }

        let (any_stale, intents) = {
            let quoter = self.quoter.read();
            let any_stale = resting
                .iter()
                .any(|o| quoter.is_order_stale(o.price, o.side, fair_price, signed_notional_usd));
            (any_stale, quoter.quote_to_orders(&quote, self.symbol()))
        };
        let cancelled = resting.len();
        self.state.lock().resting = resting;

        if cancelled > 0 && !any_stale {
            return Ok(TickOutcome::Unchanged);
        }
        if cancelled == 0 && intents.is_empty() {
            return Ok(TickOutcome::Skipped(SkipReason::NothingToQuote));
        }

        if let Err(e) = self.exchange.cancel_all_orders(Some(self.symbol())).await {
            self.venue_failed(VenueOp::CancelAll, &e);
            return Err(e.into());
        }
        self.events.emit(EngineEvent::Requoted {
            fair_price,
            cancelled,
        });

        let mut placed = Vec::with_capacity(intents.len());
        let mut failed = 0;
        for intent in intents {
            if !self.may_quote() {
                break;
            }
            let order = Order {
                order_id: String::new(),
                symbol: intent.symbol.clone(),
                side: intent.side,
                price: intent.price,
                size: intent.size,
                reduce_only: intent.reduce_only,
            };
            match self.exchange.place_order(intent).await {
                Ok(ack) => {
                    self.events.emit(EngineEvent::OrderPlaced {
                        order_id: ack.order_id.clone(),
                        side: order.side,
                        price: order.price,
                        size: order.size,
                        reduce_only: order.reduce_only,
                    });
                    placed.push(Order {
                        order_id: ack.order_id,
                        ..order
                    });
                }
                Err(e) => {
                    failed += 1;
                    self.venue_failed(VenueOp::Place, &e);
                }
            }
        }

        let placed_count = placed.len();
        self.state.lock().resting = placed;
        Ok(TickOutcome::Requoted {
            cancelled,
            placed: placed_count,
            failed,
        })
    }

    async fn sync_positions(&self) -> ExchangeResult<()> {
        let positions = self.exchange.get_positions().await?;
        let orders = self.exchange.get_open_orders(Some(self.symbol())).await?;
        let position = positions
            .into_iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(self.symbol()));
        let fair_price = self.estimator.lock().ema();

        self.exposure.lock().update_position(position, fair_price);
        self.state.lock().resting = orders;
        Ok(())
    }

    /// Re-sync position and open orders from the venue.
    pub async fn sync_tick(&self) -> AppResult<()> {
        if !self.state().is_active() {
            return Ok(());
        }
        if let Err(e) = self.sync_positions().await {
            self.venue_failed(VenueOp::Sync, &e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Margin breaker and auto-resume.
    ///
    /// - running and ratio < floor → pause (margin)
    /// - margin pause and ratio ≥ floor × 1.2 → resume
    /// - error-breaker pause, cooldown elapsed and ratio ≥ floor × 1.2 → resume
    pub async fn margin_tick(&self) -> AppResult<()> {
        if !self.state().is_active() {
            return Ok(());
        }
        let account = match self.exchange.get_account().await {
            Ok(account) => account,
            Err(e) => {
                self.venue_failed(VenueOp::Account, &e);
                return Err(e.into());
            }
        };
        let ratio = account.margin_ratio();
        let now = self.clock.now_ms();
        let (lifecycle, reason, paused_at_ms) = {
            let mut state = self.state.lock();
            state.margin_ratio = Some(ratio);
            (state.lifecycle, state.pause_reason, state.paused_at_ms)
        };
        self.events.emit(EngineEvent::MarginChecked { ratio });

        let floor = self.config.min_margin_ratio;
        let healthy = ratio >= floor * MARGIN_RESUME_FACTOR;
        match (lifecycle, reason) {
            (LifecycleState::Running, _) if ratio < floor => {
                warn!(%ratio, %floor, "Margin ratio below floor");
                self.pause(PauseReason::Margin).await;
            }
            (LifecycleState::Paused, Some(PauseReason::Margin)) if healthy => {
                info!(%ratio, "Margin ratio recovered");
                self.resume_from(Some(PauseReason::Margin));
            }
            (LifecycleState::Paused, Some(PauseReason::ErrorBreaker)) if healthy => {
                let cooled = paused_at_ms.is_some_and(|t| {
                    now.saturating_sub(t) >= self.config.error_pause_cooldown_ms
                });
                if cooled {
                    self.resume_from(Some(PauseReason::ErrorBreaker));
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ---- status ----------------------------------------------------------

    pub fn status(&self) -> StatusSnapshot {
        let now = self.clock.now_ms();
        let (fair_price, warmup_remaining_ms, price_count) = {
            let est = self.estimator.lock();
            (
                est.fair_price(now),
                est.warmup_remaining_ms(now),
                est.price_count(),
            )
        };
        let (exposure, is_close_mode) = {
            let tracker = self.exposure.lock();
            (ExposureSnapshot::from(tracker.state()), tracker.is_close_mode())
        };
        let venue_mid = self.last_book.read().as_ref().and_then(Orderbook::mid_price);

        let state = self.state.lock();
        StatusSnapshot {
            state: state.lifecycle,
            pause_reason: state.pause_reason,
            symbol: self.config.symbol.clone(),
            fair_price,
            venue_mid,
            exposure,
            resting_bid: RestingSide::from_orders(&state.resting, OrderSide::Buy),
            resting_ask: RestingSide::from_orders(&state.resting, OrderSide::Sell),
            margin_ratio: state.margin_ratio,
            is_close_mode,
            uptime_ms: state
                .started_at_ms
                .map(|t| now.saturating_sub(t))
                .unwrap_or(0),
            warmup_remaining_ms,
            price_count,
            consecutive_errors: self.consecutive_errors.load(Ordering::SeqCst),
        }
    }
}
