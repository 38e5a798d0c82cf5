//! Exchange adapter contract.
//!
//! The orchestrator only ever talks to a venue through this trait. Concrete
//! venues are selected once at construction time via [`ExchangeKind`]; no
//! caller branches on venue identity.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use fairmm_core::{
    AccountInfo, BoxFuture, Market, Order, OrderIntent, Orderbook, PlacedOrder, Position,
};
use serde::{Deserialize, Serialize};

use crate::error::ExchangeResult;

/// Receives top-of-book updates for a subscribed symbol.
pub type OrderbookCallback = Box<dyn Fn(Orderbook) + Send + Sync>;

/// Venue capability interface.
///
/// All methods are dyn-compatible (boxed futures) so the orchestrator can
/// hold an `Arc<dyn Exchange>`.
pub trait Exchange: Send + Sync {
    /// Short venue name for logs.
    fn name(&self) -> &'static str;

    /// Establish the venue session.
    fn connect(&self) -> BoxFuture<'_, ExchangeResult<()>>;

    /// Tear down the venue session. Safe to call when not connected.
    fn disconnect(&self) -> BoxFuture<'_, ExchangeResult<()>>;

    /// List tradable markets.
    fn get_markets(&self) -> BoxFuture<'_, ExchangeResult<Vec<Market>>>;

    /// Register `callback` for top-of-book updates on `symbol`.
    fn subscribe_orderbook<'a>(
        &'a self,
        symbol: &'a str,
        callback: OrderbookCallback,
    ) -> BoxFuture<'a, ExchangeResult<()>>;

    /// Drop every callback registered for `symbol`.
    fn unsubscribe_orderbook<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<()>>;

    fn get_account(&self) -> BoxFuture<'_, ExchangeResult<AccountInfo>>;

    /// Open positions (zero-size positions are omitted).
    fn get_positions(&self) -> BoxFuture<'_, ExchangeResult<Vec<Position>>>;

    /// Resting orders, optionally filtered by symbol.
    fn get_open_orders<'a>(
        &'a self,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Order>>>;

    /// Submit a resting limit order.
    fn place_order(&self, intent: OrderIntent) -> BoxFuture<'_, ExchangeResult<PlacedOrder>>;

    fn cancel_order<'a>(
        &'a self,
        order_id: &'a str,
        symbol: Option<&'a str>,
    ) -> BoxFuture<'a, ExchangeResult<()>>;

    /// Cancel every resting order (optionally for one symbol).
    ///
    /// Must succeed as a no-op when nothing is resting.
    fn cancel_all_orders<'a>(&'a self, symbol: Option<&'a str>)
        -> BoxFuture<'a, ExchangeResult<()>>;
}

/// Arc wrapper for Exchange trait objects.
pub type DynExchange = Arc<dyn Exchange>;

/// Venue selector used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// In-memory simulated venue.
    #[default]
    Paper,
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
        }
    }
}

impl FromStr for ExchangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paper" => Ok(Self::Paper),
            other => Err(format!("unknown exchange: {other}")),
        }
    }
}
