//! Position and account snapshots as reported by the venue.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Price, Size};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionSide {
    /// 1 for long, -1 for short, 0 for flat.
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Flat => Decimal::ZERO,
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Venue position snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    /// Absolute size in base units.
    pub size: Size,
    pub entry_price: Price,
    /// Venue-reported unrealized PnL, when the venue provides one.
    pub unrealized_pnl: Option<Decimal>,
}

impl Position {
    /// Signed size: positive long, negative short.
    pub fn signed_size(&self) -> Decimal {
        self.size.inner() * self.side.sign()
    }
}

/// Account-level margin snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub equity: Decimal,
    pub available_margin: Decimal,
}

impl AccountInfo {
    /// `available_margin / equity`, or zero when equity is not positive.
    pub fn margin_ratio(&self) -> Decimal {
        if self.equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.available_margin / self.equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_size() {
        let short = Position {
            symbol: "BTC".to_string(),
            side: PositionSide::Short,
            size: Size::new(dec!(0.3)),
            entry_price: Price::new(dec!(50000)),
            unrealized_pnl: None,
        };
        assert_eq!(short.signed_size(), dec!(-0.3));
    }

    #[test]
    fn test_margin_ratio() {
        let acct = AccountInfo {
            equity: dec!(1000),
            available_margin: dec!(500),
        };
        assert_eq!(acct.margin_ratio(), dec!(0.5));

        let broke = AccountInfo {
            equity: dec!(0),
            available_margin: dec!(0),
        };
        assert_eq!(broke.margin_ratio(), dec!(0));
    }
}
