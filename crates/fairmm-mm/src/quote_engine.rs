//! Quote price calculation engine.
//!
//! Computes bid/ask prices and sizes from:
//! - Fair price (smoothed reference)
//! - Signed exposure notional (positive = long)
//! - Spread and risk policy (`StrategyConfig`)
//!
//! The generator holds no mutable state apart from the bound market
//! metadata, which is only used for tick/lot rounding.

use fairmm_core::{
    CoreError, Market, OrderIntent, OrderSide, Price, RiskLimits, RiskMode, Size, BPS_DIVISOR,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::StrategyConfig;

/// One side of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteSide {
    pub price: Price,
    /// Size in base units.
    pub size: Size,
    pub reduce_only: bool,
}

/// Desired two-sided quote. A `None` side is suppressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub mode: RiskMode,
    pub fair_price: Price,
    pub bid: Option<QuoteSide>,
    pub ask: Option<QuoteSide>,
}

impl Quote {
    fn empty(mode: RiskMode, fair_price: Price) -> Self {
        Self {
            mode,
            fair_price,
            bid: None,
            ask: None,
        }
    }

    /// The quoted side for `side`, if any.
    pub fn side(&self, side: OrderSide) -> Option<&QuoteSide> {
        match side {
            OrderSide::Buy => self.bid.as_ref(),
            OrderSide::Sell => self.ask.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bid.is_none() && self.ask.is_none()
    }
}

/// Converts fair price and exposure into quotes.
#[derive(Debug, Clone)]
pub struct QuoteGenerator {
    config: StrategyConfig,
    limits: RiskLimits,
    market: Option<Market>,
}

impl QuoteGenerator {
    /// Create a generator; fails if the risk thresholds are inconsistent.
    pub fn new(config: StrategyConfig) -> Result<Self, CoreError> {
        let limits = config.risk_limits()?;
        Ok(Self {
            config,
            limits,
            market: None,
        })
    }

    /// Bind market metadata used for rounding.
    pub fn bind_market(&mut self, market: Market) {
        self.market = Some(market);
    }

    pub fn market(&self) -> Option<&Market> {
        self.market.as_ref()
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Half-spread in bps for a mode.
    fn half_spread_bps(&self, mode: RiskMode) -> Decimal {
        if mode.is_close() {
            self.config.take_profit_bps
        } else {
            self.config.spread_bps / Decimal::TWO
        }
    }

    fn bid_price(&self, fair_price: Price, half_bps: Decimal) -> Price {
        let raw = fair_price.offset_bps(-half_bps);
        match &self.market {
            Some(m) => m.round_bid(raw),
            None => raw,
        }
    }

    fn ask_price(&self, fair_price: Price, half_bps: Decimal) -> Price {
        let raw = fair_price.offset_bps(half_bps);
        match &self.market {
            Some(m) => m.round_ask(raw),
            None => raw,
        }
    }

    fn size_at(&self, notional_usd: Decimal, price: Price) -> Size {
        let raw = Size::from_notional(notional_usd, price);
        match &self.market {
            Some(m) => m.round_size(raw),
            None => raw,
        }
    }

    fn build_side(&self, price: Price, notional_usd: Decimal, reduce_only: bool) -> Option<QuoteSide> {
        if !price.is_positive() {
            return None;
        }
        let size = self.size_at(notional_usd, price);
        if !size.is_positive() {
            return None;
        }
        Some(QuoteSide {
            price,
            size,
            reduce_only,
        })
    }

    /// Compute the quote for the current fair price and exposure.
    ///
    /// Close mode (which includes the at-max state, since
    /// `max_position_usd >= close_threshold_usd`) quotes only the side that
    /// reduces exposure, sized so it can never flip the position. The side
    /// that would add to the exposure is therefore always suppressed at max.
    pub fn generate_quotes(&self, fair_price: Price, signed_notional_usd: Decimal) -> Quote {
        let mode = self.limits.classify(signed_notional_usd);
        if !fair_price.is_positive() {
            return Quote::empty(mode, fair_price);
        }

        let half_bps = self.half_spread_bps(mode);
        let bid_px = self.bid_price(fair_price, half_bps);
        let ask_px = self.ask_price(fair_price, half_bps);

        if mode.is_close() {
            let close_notional = self.config.order_size_usd.min(signed_notional_usd.abs());
            let mut quote = Quote::empty(mode, fair_price);
            if signed_notional_usd > Decimal::ZERO {
                quote.ask = self.build_side(ask_px, close_notional, true);
            } else {
                quote.bid = self.build_side(bid_px, close_notional, true);
            }
            return quote;
        }

        Quote {
            mode,
            fair_price,
            bid: self.build_side(bid_px, self.config.order_size_usd, false),
            ask: self.build_side(ask_px, self.config.order_size_usd, false),
        }
    }

    /// Whether a resting order should be replaced.
    ///
    /// The target price for `side` is recomputed under the current fair
    /// price and mode. An order on a side the current quote suppresses is
    /// always stale.
    pub fn is_order_stale(
        &self,
        order_price: Price,
        side: OrderSide,
        fair_price: Price,
        signed_notional_usd: Decimal,
    ) -> bool {
        let quote = self.generate_quotes(fair_price, signed_notional_usd);
        let Some(target) = quote.side(side) else {
            return true;
        };
        if target.price.is_zero() {
            return true;
        }
        let deviation_bps =
            ((order_price.inner() - target.price.inner()) / target.price.inner()).abs() * BPS_DIVISOR;
        deviation_bps > self.config.stale_tolerance_bps()
    }

    /// Turn a quote into 0–2 order intents, bid first.
    pub fn quote_to_orders(&self, quote: &Quote, symbol: &str) -> Vec<OrderIntent> {
        let mut intents = Vec::with_capacity(2);
        if let Some(bid) = &quote.bid {
            intents.push(OrderIntent::new(
                symbol,
                OrderSide::Buy,
                bid.price,
                bid.size,
                bid.reduce_only,
            ));
        }
        if let Some(ask) = &quote.ask {
            intents.push(OrderIntent::new(
                symbol,
                OrderSide::Sell,
                ask.price,
                ask.size,
                ask.reduce_only,
            ));
        }
        intents
    }
}
