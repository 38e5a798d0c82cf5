//! Exposure classification shared by quoting and exposure tracking.
//!
//! Both the quote generator and the exposure tracker decide "close mode"
//! and "at max" through [`RiskLimits::classify`], so the two can never
//! disagree about which mode the book is in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Risk mode derived from absolute signed notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMode {
    /// Below the close threshold: quote both sides.
    #[default]
    Normal,
    /// At or above the close threshold: quote only the reducing side.
    Close,
    /// At or above max position: no new same-direction exposure.
    Blocked,
}

impl RiskMode {
    /// Close mode covers both `Close` and `Blocked` (max >= close threshold).
    pub fn is_close(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl fmt::Display for RiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Close => write!(f, "close"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// Notional thresholds in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub close_threshold_usd: Decimal,
    pub max_position_usd: Decimal,
}

impl RiskLimits {
    /// Build limits, enforcing `max_position_usd >= close_threshold_usd`.
    pub fn new(close_threshold_usd: Decimal, max_position_usd: Decimal) -> Result<Self> {
        if close_threshold_usd <= Decimal::ZERO {
            return Err(CoreError::InvalidLimits(format!(
                "close_threshold_usd must be positive, got {close_threshold_usd}"
            )));
        }
        if max_position_usd < close_threshold_usd {
            return Err(CoreError::InvalidLimits(format!(
                "max_position_usd ({max_position_usd}) < close_threshold_usd ({close_threshold_usd})"
            )));
        }
        Ok(Self {
            close_threshold_usd,
            max_position_usd,
        })
    }

    /// Classify a signed notional.
    pub fn classify(&self, signed_notional_usd: Decimal) -> RiskMode {
        let abs = signed_notional_usd.abs();
        if abs >= self.max_position_usd {
            RiskMode::Blocked
        } else if abs >= self.close_threshold_usd {
            RiskMode::Close
        } else {
            RiskMode::Normal
        }
    }

    /// Whether the absolute notional has reached the hard stop.
    pub fn is_at_max(&self, signed_notional_usd: Decimal) -> bool {
        signed_notional_usd.abs() >= self.max_position_usd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> RiskLimits {
        RiskLimits::new(dec!(500), dec!(2000)).unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        let l = limits();
        assert_eq!(l.classify(dec!(0)), RiskMode::Normal);
        assert_eq!(l.classify(dec!(499.99)), RiskMode::Normal);
        assert_eq!(l.classify(dec!(500)), RiskMode::Close);
        assert_eq!(l.classify(dec!(-600)), RiskMode::Close);
        assert_eq!(l.classify(dec!(2000)), RiskMode::Blocked);
        assert_eq!(l.classify(dec!(-2100)), RiskMode::Blocked);
    }

    #[test]
    fn test_blocked_counts_as_close() {
        assert!(RiskMode::Blocked.is_close());
        assert!(RiskMode::Close.is_close());
        assert!(!RiskMode::Normal.is_close());
    }

    #[test]
    fn test_invalid_limits_rejected() {
        assert!(RiskLimits::new(dec!(500), dec!(400)).is_err());
        assert!(RiskLimits::new(dec!(0), dec!(400)).is_err());
        assert!(RiskLimits::new(dec!(500), dec!(500)).is_ok());
    }
}
