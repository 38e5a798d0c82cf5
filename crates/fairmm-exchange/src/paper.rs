//! In-memory simulated venue.
//!
//! `PaperExchange` rests limit orders and fills them only when a new mark
//! price crosses them (`set_mark_price`). Orders never fill on placement.
//! Positions, realized PnL and margin are tracked per symbol so the
//! orchestrator's close mode and margin breaker can be exercised without a
//! real venue.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use fairmm_core::{
    AccountInfo, BoxFuture, Market, Order, OrderIntent, OrderSide, Orderbook, PlacedOrder,
    Position, PositionSide, Price, Size,
};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::{Exchange, OrderbookCallback};
use crate::error::{ExchangeError, ExchangeResult};

type SharedCallback = Arc<dyn Fn(Orderbook) + Send + Sync>;

/// Paper venue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Listed markets.
    #[serde(default = "default_markets")]
    pub markets: Vec<Market>,

    /// Starting cash balance in USD.
    #[serde(default = "default_initial_balance_usd")]
    pub initial_balance_usd: Decimal,

    /// Leverage used for the margin requirement (`|notional| / leverage`).
    #[serde(default = "default_leverage")]
    pub leverage: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            markets: default_markets(),
            initial_balance_usd: default_initial_balance_usd(),
            leverage: default_leverage(),
        }
    }
}

impl PaperConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.markets.is_empty() {
            return Err("paper.markets must not be empty".to_string());
        }
        if self.initial_balance_usd <= Decimal::ZERO {
            return Err(format!(
                "paper.initial_balance_usd must be positive, got {}",
                self.initial_balance_usd
            ));
        }
        if self.leverage <= Decimal::ZERO {
            return Err(format!("paper.leverage must be positive, got {}", self.leverage));
        }
        Ok(())
    }
}

fn default_markets() -> Vec<Market> {
    vec![
        Market {
            id: "0".to_string(),
            symbol: "BTC".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USD".to_string(),
            tick_size: Price::new(Decimal::new(5, 1)),
            lot_size: Size::new(Decimal::new(1, 4)),
        },
        Market {
            id: "1".to_string(),
            symbol: "ETH".to_string(),
            base_asset: "ETH".to_string(),
            quote_asset: "USD".to_string(),
            tick_size: Price::new(Decimal::new(1, 2)),
            lot_size: Size::new(Decimal::new(1, 3)),
        },
    ]
}
fn default_initial_balance_usd() -> Decimal {
    Decimal::new(10_000, 0)
}
fn default_leverage() -> Decimal {
    Decimal::new(5, 0)
}

/// Operations that support fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperOp {
    Connect,
    GetMarkets,
    GetAccount,
    GetPositions,
    GetOpenOrders,
    PlaceOrder,
    CancelOrder,
    CancelAll,
}

impl fmt::Display for PaperOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::GetMarkets => "get_markets",
            Self::GetAccount => "get_account",
            Self::GetPositions => "get_positions",
            Self::GetOpenOrders => "get_open_orders",
            Self::PlaceOrder => "place_order",
            Self::CancelOrder => "cancel_order",
            Self::CancelAll => "cancel_all_orders",
        };
        write!(f, "{s}")
    }
}

/// A simulated fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
}

#[derive(Debug, Clone, Default)]
struct PaperPosition {
    signed_size: Decimal,
    entry_price: Decimal,
}

impl PaperPosition {
    /// Apply a fill and return the realized PnL.
    fn apply_fill(&mut self, side: OrderSide, qty: Decimal, price: Decimal) -> Decimal {
        let delta = qty * Decimal::from(side.sign());
        let current = self.signed_size;

        if current.is_zero() || current.is_sign_positive() == delta.is_sign_positive() {
            let new_size = current + delta;
            self.entry_price = (self.entry_price * current.abs() + price * qty) / new_size.abs();
            self.signed_size = new_size;
            return Decimal::ZERO;
        }

        let closed = qty.min(current.abs());
        let direction = if current.is_sign_positive() {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        };
        let realized = (price - self.entry_price) * closed * direction;
        let new_size = current + delta;
        if new_size.is_zero() {
            self.entry_price = Decimal::ZERO;
        } else if new_size.is_sign_positive() != current.is_sign_positive() {
            // Flipped: the remainder opened at the fill price
            self.entry_price = price;
        }
        self.signed_size = new_size;
        realized
    }
}

#[derive(Debug)]
struct PaperState {
    connected: bool,
    /// Initial balance plus realized PnL.
    cash: Decimal,
    realized_pnl: Decimal,
    positions: HashMap<String, PaperPosition>,
    orders: BTreeMap<u64, Order>,
    next_order_id: u64,
    marks: HashMap<String, Price>,
    failures: HashMap<PaperOp, u32>,
}

/// In-memory venue implementing [`Exchange`].
pub struct PaperExchange {
    config: PaperConfig,
    state: Mutex<PaperState>,
    /// Orderbook callbacks keyed by canonical symbol.
    subscriptions: Mutex<HashMap<String, Vec<SharedCallback>>>,
}

impl fmt::Debug for PaperExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaperExchange")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new(PaperConfig::default())
    }
}

impl PaperExchange {
    pub fn new(config: PaperConfig) -> Self {
        let state = PaperState {
            connected: false,
            cash: config.initial_balance_usd,
            realized_pnl: Decimal::ZERO,
            positions: HashMap::new(),
            orders: BTreeMap::new(),
            next_order_id: 1,
            marks: HashMap::new(),
            failures: HashMap::new(),
        };
        Self {
            config,
            state: Mutex::new(state),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next `count` calls of `op` fail with a request error.
    pub fn fail_next(&self, op: PaperOp, count: u32) {
        self.state.lock().failures.insert(op, count);
    }

    fn market(&self, symbol: &str) -> Option<&Market> {
        self.config.markets.iter().find(|m| m.matches(symbol))
    }

    /// Lock state after checking connection and injected failures.
    fn guard(&self, op: PaperOp) -> ExchangeResult<MutexGuard<'_, PaperState>> {
        let mut state = self.state.lock();
        if op != PaperOp::Connect && !state.connected {
            return Err(ExchangeError::NotConnected);
        }
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExchangeError::Request(format!("injected {op} failure")));
            }
        }
        Ok(state)
    }

    /// Current mark price for a symbol, if one was set.
    pub fn mark_price(&self, symbol: &str) -> Option<Price> {
        let market = self.market(symbol)?;
        self.state.lock().marks.get(&market.symbol).copied()
    }

    /// Set a position directly (e.g. to simulate fills that happened while
    /// the bot was offline).
    pub fn seed_position(&self, symbol: &str, signed_size: Decimal, entry_price: Price) {
        let Some(market) = self.market(symbol) else {
            warn!(symbol, "seed_position: unknown market");
            return;
        };
        let mut state = self.state.lock();
        state.positions.insert(
            market.symbol.clone(),
            PaperPosition {
                signed_size,
                entry_price: entry_price.inner(),
            },
        );
    }

    /// Add or withdraw cash (negative amount).
    pub fn adjust_balance(&self, amount_usd: Decimal) {
        self.state.lock().cash += amount_usd;
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.state.lock().realized_pnl
    }

    pub fn open_order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    /// Move the mark price, fill crossing orders and publish a book.
    ///
    /// A bid fills when `price >= mark`, an ask when `price <= mark`, at
    /// the order's own price. Reduce-only orders are clipped to the
    /// opposing position and dropped when nothing is left to reduce.
    pub fn set_mark_price(&self, symbol: &str, mark: Price) -> Vec<PaperFill> {
        let Some(market) = self.market(symbol).cloned() else {
            warn!(symbol, "set_mark_price: unknown market");
            return Vec::new();
        };

        let fills = {
            let mut state = self.state.lock();
            state.marks.insert(market.symbol.clone(), mark);

            let crossing: Vec<u64> = state
                .orders
                .iter()
                .filter(|(_, o)| o.symbol == market.symbol && crosses(o, mark))
                .map(|(id, _)| *id)
                .collect();

            let mut fills = Vec::with_capacity(crossing.len());
            for id in crossing {
                let Some(order) = state.orders.remove(&id) else {
                    continue;
                };
                let realized = {
                    let position = state.positions.entry(market.symbol.clone()).or_default();
                    let mut qty = order.size.inner();
                    if order.reduce_only {
                        let opposing = position.signed_size * Decimal::from(order.side.sign())
                            < Decimal::ZERO;
                        let reducible = if opposing {
                            position.signed_size.abs()
                        } else {
                            Decimal::ZERO
                        };
                        qty = qty.min(reducible);
                    }
                    if qty <= Decimal::ZERO {
                        debug!(order_id = %order.order_id, "Reduce-only order dropped, nothing to reduce");
                        continue;
                    }
                    let realized = position.apply_fill(order.side, qty, order.price.inner());
                    fills.push(PaperFill {
                        order_id: order.order_id.clone(),
                        symbol: order.symbol.clone(),
                        side: order.side,
                        price: order.price,
                        size: Size::new(qty),
                    });
                    realized
                };
                state.cash += realized;
                state.realized_pnl += realized;
            }
            fills
        };

        for fill in &fills {
            info!(
                order_id = %fill.order_id,
                symbol = %fill.symbol,
                side = %fill.side,
                price = %fill.price,
                size = %fill.size,
                "Paper fill"
            );
        }

        self.publish_book(&market, mark);
        fills
    }

    fn publish_book(&self, market: &Market, mark: Price) {
        let callbacks: Vec<SharedCallback> = self
            .subscriptions
            .lock()
            .get(&market.symbol)
            .cloned()
            .unwrap_or_default();
        if callbacks.is_empty() {
            return;
        }
        let book = synthetic_book(market, mark);
        for callback in callbacks {
            callback(book.clone());
        }
    }

    fn account_snapshot(&self, state: &PaperState) -> AccountInfo {
        let leverage = if self.config.leverage > Decimal::ZERO {
            self.config.leverage
        } else {
            Decimal::ONE
        };
        let mut unrealized = Decimal::ZERO;
        let mut margin_used = Decimal::ZERO;
        for (symbol, pos) in &state.positions {
            if pos.signed_size.is_zero() {
                continue;
            }
            let mark = state
                .marks
                .get(symbol)
                .map(Price::inner)
                .unwrap_or(pos.entry_price);
            unrealized += (mark - pos.entry_price) * pos.signed_size;
            margin_used += (pos.signed_size * mark).abs() / leverage;
        }
        let equity = state.cash + unrealized;
        AccountInfo {
            equity,
            available_margin: equity - margin_used,
        }
    }
}

fn crosses(order: &Order, mark: Price) -> bool {
    match order.side {
        OrderSide::Buy => order.price >= mark,
        OrderSide::Sell => order.price <= mark,
    }
}

/// One tick either side of the mark.
fn synthetic_book(market: &Market, mark: Price) -> Orderbook {
    Orderbook::new(
        market.symbol.clone(),
        mark - market.tick_size,
        mark + market.tick_size,
    )
}

impl Exchange for PaperExchange {
    fn name(&self) -> &'static str {
        "paper"
    }

    fn connect(&self) -> BoxFuture<'_, ExchangeResult<()>> {
        Box::pin(async move {
            let mut state = self.guard(PaperOp::Connect)?;
            state.connected = true;
            info!(markets = self.config.markets.len(), "Paper exchange connected");
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ExchangeResult<()>> {
        Box::pin(async move {
            self.state.lock().connected = false;
            self.subscriptions.lock().clear();
            info!("Paper exchange disconnected");
            Ok(())
        })
    }

    fn get_markets(&self) -> BoxFuture<'_, ExchangeResult<Vec<Market>>> {
        Box::pin(async move {
            let _state = self.guard(PaperOp::GetMarkets)?;
            Ok(self.config.markets.clone())
        })
    }

    fn subscribe_orderbook<'a>(
        &'a self,
        symbol: &'a str,
        callback: OrderbookCallback,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let market = self
                .market(symbol)
                .cloned()
                .ok_or_else(|| ExchangeError::MarketNotFound(symbol.to_string()))?;
            let mark = {
                let state = self.state.lock();
                if !state.connected {
                    return Err(ExchangeError::NotConnected);
                }
                state.marks.get(&market.symbol).copied()
            };
            let callback: SharedCallback = Arc::from(callback);
            self.subscriptions
                .lock()
                .entry(market.symbol.clone())
                .or_default()
                .push(callback.clone());
            debug!(symbol = %market.symbol, "Orderbook subscribed");

            if let Some(mark) = mark {
                callback(synthetic_book(&market, mark));
            }
            Ok(())
        })
    }

    fn unsubscribe_orderbook<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let key = self
                .market(symbol)
                .map(|m| m.symbol.clone())
                .unwrap_or_else(|| symbol.to_string());
            if self.subscriptions.lock().remove(&key).is_some() {
                debug!(symbol = %key, "Orderbook unsubscribed");
            }
            Ok(())
        })
    }

    fn get_account(&self) -> BoxFuture<'_, ExchangeResult<AccountInfo>> {
        Box::pin(async move {
            let state = self.guard(PaperOp::GetAccount)?;
            Ok(self.account_snapshot(&state))
        })
    }

    fn get_positions(&self) -> BoxFuture<'_, ExchangeResult<Vec<Position>>> {
        Box::pin(async move {
            let state = self.guard(PaperOp::GetPositions)?;
            let positions = state
                .positions
                .iter()
                .filter(|(_, p)| !p.signed_size.is_zero())
                .map(|(symbol, p)| {
                    let side = if p.signed_size > Decimal::ZERO {
                        PositionSide::Long
                    } else {
                        PositionSide::Short
                    };
                    let mark = state
                        .marks
                        .get(symbol)
                        .map(Price::inner)
                        .unwrap_or(p.entry_price);
                    Position {
                        symbol: symbol.clone(),
                        side,
                        size: Size::new(p.signed_size.abs()),
                        entry_price: Price::new(p.entry_price),
                        unrealized_pnl: Some((mark - p.entry_price) * p.signed_size),
                    }
                })
                .collect();
            Ok(positions)
        })
    }

    fn get_open_orders<'a>(
        &'a self,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Order>>> {
        Box::pin(async move {
            let state = self.guard(PaperOp::GetOpenOrders)?;
            Ok(state
                .orders
                .values()
                .filter(|o| symbol.map_or(true, |s| o.symbol.eq_ignore_ascii_case(s)))
                .cloned()
                .collect())
        })
    }

    fn place_order(&self, intent: OrderIntent) -> BoxFuture<'_, ExchangeResult<PlacedOrder>> {
        Box::pin(async move {
            let market = self
                .market(&intent.symbol)
                .cloned()
                .ok_or_else(|| ExchangeError::MarketNotFound(intent.symbol.clone()))?;
            let mut state = self.guard(PaperOp::PlaceOrder)?;

            if !intent.price.is_positive() {
                return Err(ExchangeError::Rejected(format!(
                    "price must be positive, got {}",
                    intent.price
                )));
            }
            if !intent.size.is_positive() {
                return Err(ExchangeError::Rejected(format!(
                    "size must be positive, got {}",
                    intent.size
                )));
            }
            if intent.reduce_only {
                let signed = state
                    .positions
                    .get(&market.symbol)
                    .map(|p| p.signed_size)
                    .unwrap_or_default();
                if signed * Decimal::from(intent.side.sign()) >= Decimal::ZERO {
                    return Err(ExchangeError::Rejected(
                        "reduce-only order would increase position".to_string(),
                    ));
                }
            }

            let id = state.next_order_id;
            state.next_order_id += 1;
            let order_id = id.to_string();
            state.orders.insert(
                id,
                Order {
                    order_id: order_id.clone(),
                    symbol: market.symbol.clone(),
                    side: intent.side,
                    price: intent.price,
                    size: intent.size,
                    reduce_only: intent.reduce_only,
                },
            );
            debug!(
                order_id = %order_id,
                client_id = %intent.client_id,
                side = %intent.side,
                price = %intent.price,
                size = %intent.size,
                reduce_only = intent.reduce_only,
                "Paper order resting"
            );
            Ok(PlacedOrder { order_id })
        })
    }

    fn cancel_order<'a>(
        &'a self,
        order_id: &'a str,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let mut state = self.guard(PaperOp::CancelOrder)?;
            let id = order_id
                .parse::<u64>()
                .map_err(|_| ExchangeError::OrderNotFound(order_id.to_string()))?;
            let matches_symbol = state.orders.get(&id).is_some_and(|o| {
                symbol.map_or(true, |s| o.symbol.eq_ignore_ascii_case(s))
            });
            if !matches_symbol {
                return Err(ExchangeError::OrderNotFound(order_id.to_string()));
            }
            state.orders.remove(&id);
            Ok(())
        })
    }

    fn cancel_all_orders<'a>(
        &'a self,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            let mut state = self.guard(PaperOp::CancelAll)?;
            let before = state.orders.len();
            state
                .orders
                .retain(|_, o| symbol.is_some_and(|s| !o.symbol.eq_ignore_ascii_case(s)));
            let cancelled = before - state.orders.len();
            if cancelled > 0 {
                debug!(cancelled, symbol = ?symbol, "Paper orders cancelled");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> PaperConfig {
        PaperConfig {
            initial_balance_usd: dec!(1000),
            leverage: dec!(2),
            ..Default::default()
        }
    }

    async fn connected() -> PaperExchange {
        let ex = PaperExchange::new(config());
        ex.connect().await.unwrap();
        ex
    }

    fn intent(side: OrderSide, price: Decimal, size: Decimal, reduce_only: bool) -> OrderIntent {
        OrderIntent::new("BTC", side, Price::new(price), Size::new(size), reduce_only)
    }

    #[tokio::test]
    async fn test_not_connected_rejected() {
        let ex = PaperExchange::new(config());
        let err = ex.get_account().await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotConnected));
    }

    #[tokio::test]
    async fn test_place_and_list_orders() {
        let ex = connected().await;
        let placed = ex
            .place_order(intent(OrderSide::Buy, dec!(49975), dec!(0.002), false))
            .await
            .unwrap();
        ex.place_order(intent(OrderSide::Sell, dec!(50025), dec!(0.002), false))
            .await
            .unwrap();

        let orders = ex.get_open_orders(Some("btc")).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, placed.order_id);
        assert!(ex.get_open_orders(Some("ETH")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_market_rejected() {
        let ex = connected().await;
        let bad = OrderIntent::new(
            "DOGE",
            OrderSide::Buy,
            Price::new(dec!(1)),
            Size::new(dec!(1)),
            false,
        );
        assert!(matches!(
            ex.place_order(bad).await.unwrap_err(),
            ExchangeError::MarketNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_cancel_all_on_empty_book_is_noop() {
        let ex = connected().await;
        ex.cancel_all_orders(Some("BTC")).await.unwrap();
        ex.cancel_all_orders(None).await.unwrap();
        assert_eq!(ex.open_order_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_by_symbol() {
        let ex = connected().await;
        ex.place_order(intent(OrderSide::Buy, dec!(49975), dec!(0.002), false))
            .await
            .unwrap();
        ex.place_order(OrderIntent::new(
            "ETH",
            OrderSide::Buy,
            Price::new(dec!(3000)),
            Size::new(dec!(0.1)),
            false,
        ))
        .await
        .unwrap();

        ex.cancel_all_orders(Some("BTC")).await.unwrap();
        let remaining = ex.get_open_orders(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].symbol, "ETH");
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let ex = connected().await;
        assert!(matches!(
            ex.cancel_order("42", None).await.unwrap_err(),
            ExchangeError::OrderNotFound(_)
        ));
        assert!(ex.cancel_order("not-a-number", None).await.is_err());
    }

    #[tokio::test]
    async fn test_fill_on_cross_opens_position() {
        let ex = connected().await;
        ex.place_order(intent(OrderSide::Buy, dec!(49975), dec!(0.01), false))
            .await
            .unwrap();

        // Not crossed yet
        assert!(ex.set_mark_price("BTC", Price::new(dec!(50000))).is_empty());

        let fills = ex.set_mark_price("BTC", Price::new(dec!(49970)));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price.inner(), dec!(49975));

        let positions = ex.get_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, PositionSide::Long);
        assert_eq!(positions[0].size.inner(), dec!(0.01));
        assert_eq!(positions[0].entry_price.inner(), dec!(49975));
        assert_eq!(ex.open_order_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_realizes_pnl() {
        let ex = connected().await;
        ex.seed_position("BTC", dec!(0.01), Price::new(dec!(50000)));
        ex.place_order(intent(OrderSide::Sell, dec!(51000), dec!(0.01), true))
            .await
            .unwrap();

        let fills = ex.set_mark_price("BTC", Price::new(dec!(51000)));
        assert_eq!(fills.len(), 1);
        assert_eq!(ex.realized_pnl(), dec!(10));
        assert!(ex.get_positions().await.unwrap().is_empty());

        let acct = ex.get_account().await.unwrap();
        assert_eq!(acct.equity, dec!(1010));
        assert_eq!(acct.available_margin, dec!(1010));
    }

    #[test]
    fn test_short_partial_close_realizes_pnl() {
        let mut pos = PaperPosition::default();
        assert_eq!(pos.apply_fill(OrderSide::Sell, dec!(0.01), dec!(50000)), dec!(0));

        // Buy back 0.004 at 49000: short gains 1000 per BTC
        let realized = pos.apply_fill(OrderSide::Buy, dec!(0.004), dec!(49000));
        assert_eq!(realized, dec!(4));
        assert_eq!(pos.signed_size, dec!(-0.006));
        assert_eq!(pos.entry_price, dec!(50000));

        // Buying 0.01 more flips long at the fill price
        let realized = pos.apply_fill(OrderSide::Buy, dec!(0.01), dec!(51000));
        assert_eq!(realized, dec!(-6));
        assert_eq!(pos.signed_size, dec!(0.004));
        assert_eq!(pos.entry_price, dec!(51000));
    }

    #[tokio::test]
    async fn test_reduce_only_clipped_to_position() {
        let ex = connected().await;
        ex.seed_position("BTC", dec!(0.01), Price::new(dec!(50000)));
        ex.place_order(intent(OrderSide::Sell, dec!(50000), dec!(0.05), true))
            .await
            .unwrap();

        let fills = ex.set_mark_price("BTC", Price::new(dec!(50000)));
        assert_eq!(fills[0].size.inner(), dec!(0.01));
        // Never flips short
        assert!(ex.get_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reduce_only_rejected_when_flat() {
        let ex = connected().await;
        let err = ex
            .place_order(intent(OrderSide::Sell, dec!(50025), dec!(0.002), true))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_margin_accounting() {
        let ex = connected().await;
        // 0.01 BTC at 50000 = 500 notional, leverage 2 → 250 used
        ex.seed_position("BTC", dec!(0.01), Price::new(dec!(50000)));
        let acct = ex.get_account().await.unwrap();
        assert_eq!(acct.equity, dec!(1000));
        assert_eq!(acct.available_margin, dec!(750));
        assert_eq!(acct.margin_ratio(), dec!(0.75));

        // Mark drops 1000: unrealized -10
        ex.set_mark_price("BTC", Price::new(dec!(49000)));
        let acct = ex.get_account().await.unwrap();
        assert_eq!(acct.equity, dec!(990));
        assert_eq!(acct.available_margin, dec!(745));
    }

    #[tokio::test]
    async fn test_fail_next_injects_errors() {
        let ex = connected().await;
        ex.fail_next(PaperOp::PlaceOrder, 2);
        for _ in 0..2 {
            assert!(matches!(
                ex.place_order(intent(OrderSide::Buy, dec!(49975), dec!(0.002), false))
                    .await
                    .unwrap_err(),
                ExchangeError::Request(_)
            ));
        }
        assert!(ex
            .place_order(intent(OrderSide::Buy, dec!(49975), dec!(0.002), false))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_orderbook_subscription() {
        let ex = connected().await;
        ex.set_mark_price("BTC", Price::new(dec!(50000)));

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = seen.clone();
        ex.subscribe_orderbook(
            "BTC",
            Box::new(move |book: Orderbook| {
                assert_eq!(book.mid_price().unwrap().inner(), book.best_bid.inner() + dec!(0.5));
                seen_cb.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await
        .unwrap();
        // Current book delivered immediately on subscribe
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        ex.set_mark_price("BTC", Price::new(dec!(50010)));
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        ex.unsubscribe_orderbook("BTC").await.unwrap();
        ex.set_mark_price("BTC", Price::new(dec!(50020)));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_paper_config_validate() {
        assert!(PaperConfig::default().validate().is_ok());
        let bad = PaperConfig {
            leverage: dec!(0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_paper_config_from_toml() {
        let toml_str = r#"
initial_balance_usd = "2500"

[[markets]]
id = "7"
symbol = "SOL"
base_asset = "SOL"
quote_asset = "USD"
tick_size = "0.001"
lot_size = "0.01"
"#;
        let cfg: PaperConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.initial_balance_usd, dec!(2500));
        assert_eq!(cfg.leverage, dec!(5));
        assert_eq!(cfg.markets.len(), 1);
        assert_eq!(cfg.markets[0].tick_size.inner(), dec!(0.001));
    }
}
