//! Status snapshot polled by the monitoring/log layer.

use fairmm_core::{Order, OrderSide, PositionSide, Price, Size};
use fairmm_mm::ExposureState;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::lifecycle::{LifecycleState, PauseReason};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureSnapshot {
    pub side: PositionSide,
    pub size: Size,
    /// Signed: positive long.
    pub notional_usd: Decimal,
    pub pnl_usd: Decimal,
}

impl From<&ExposureState> for ExposureSnapshot {
    fn from(state: &ExposureState) -> Self {
        Self {
            side: state.side,
            size: state.size,
            notional_usd: state.signed_notional(),
            pnl_usd: state.unrealized_pnl_usd,
        }
    }
}

/// Aggregate of resting orders on one side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestingSide {
    /// Best price (highest bid / lowest ask).
    pub price: Price,
    /// Total size across orders on this side.
    pub size: Size,
    pub orders: usize,
}

impl RestingSide {
    /// Summarize the orders on `side`, or `None` if there are none.
    pub fn from_orders(orders: &[Order], side: OrderSide) -> Option<Self> {
        let mut iter = orders.iter().filter(|o| o.side == side);
        let first = iter.next()?;
        let init = Self {
            price: first.price,
            size: first.size,
            orders: 1,
        };
        Some(iter.fold(init, |acc, o| Self {
            price: match side {
                OrderSide::Buy => acc.price.max(o.price),
                OrderSide::Sell => acc.price.min(o.price),
            },
            size: acc.size + o.size,
            orders: acc.orders + 1,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub state: LifecycleState,
    pub pause_reason: Option<PauseReason>,
    pub symbol: String,
    pub fair_price: Option<Price>,
    pub venue_mid: Option<Price>,
    pub exposure: ExposureSnapshot,
    pub resting_bid: Option<RestingSide>,
    pub resting_ask: Option<RestingSide>,
    pub margin_ratio: Option<Decimal>,
    pub is_close_mode: bool,
    pub uptime_ms: u64,
    pub warmup_remaining_ms: u64,
    pub price_count: u64,
    pub consecutive_errors: u32,
}
