//! Market metadata discovered from the venue.

use serde::{Deserialize, Serialize};

use crate::{Price, Size};

/// Market metadata reported by the venue.
///
/// Only tick and lot size influence quoting (rounding); the rest is
/// carried for logging and status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Venue market identifier.
    pub id: String,
    /// Symbol used for lookups (e.g. "BTC").
    pub symbol: String,
    /// Base asset.
    pub base_asset: String,
    /// Quote asset.
    pub quote_asset: String,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum size increment.
    pub lot_size: Size,
}

impl Market {
    /// Round a bid down to the tick grid so it never crosses the intended edge.
    pub fn round_bid(&self, price: Price) -> Price {
        price.floor_to_tick(self.tick_size)
    }

    /// Round an ask up to the tick grid.
    pub fn round_ask(&self, price: Price) -> Price {
        price.ceil_to_tick(self.tick_size)
    }

    /// Round a size down to the lot grid.
    pub fn round_size(&self, size: Size) -> Size {
        size.round_to_lot(self.lot_size)
    }

    /// Whether `symbol` refers to this market (case-insensitive).
    pub fn matches(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}
