//! Top-of-book snapshot delivered by orderbook subscriptions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Price;

/// Best bid and offer for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orderbook {
    pub symbol: String,
    pub best_bid: Price,
    pub best_ask: Price,
    /// Timestamp when this book was received.
    pub received_at: DateTime<Utc>,
}

impl Orderbook {
    pub fn new(symbol: impl Into<String>, best_bid: Price, best_ask: Price) -> Self {
        Self {
            symbol: symbol.into(),
            best_bid,
            best_ask,
            received_at: Utc::now(),
        }
    }

    /// Both sides present and not crossed.
    pub fn is_valid(&self) -> bool {
        self.best_bid.is_positive() && self.best_ask.is_positive() && self.best_bid < self.best_ask
    }

    /// Mid price: (bid + ask) / 2.
    ///
    /// Returns None if the book is empty on either side or crossed.
    pub fn mid_price(&self) -> Option<Price> {
        if !self.is_valid() {
            return None;
        }
        Some(Price::new(
            (self.best_bid.inner() + self.best_ask.inner()) / Decimal::TWO,
        ))
    }
}
