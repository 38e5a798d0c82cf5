//! Quoting strategy configuration.

use fairmm_core::{CoreError, RiskLimits};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spread, size and risk knobs for the quote generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Full bid/ask width in normal mode, in basis points.
    /// Each side sits `spread_bps / 2` away from fair price.
    #[serde(default = "default_spread_bps")]
    pub spread_bps: Decimal,

    /// Distance of the reducing quote from fair price in close mode (bps).
    /// Must not exceed `spread_bps`.
    #[serde(default = "default_take_profit_bps")]
    pub take_profit_bps: Decimal,

    /// Notional per side in USD.
    #[serde(default = "default_order_size_usd")]
    pub order_size_usd: Decimal,

    /// Absolute notional at which close mode starts.
    #[serde(default = "default_close_threshold_usd")]
    pub close_threshold_usd: Decimal,

    /// Hard stop on new same-direction exposure.
    #[serde(default = "default_max_position_usd")]
    pub max_position_usd: Decimal,

    /// Resting orders further than this from their target price are replaced.
    /// Defaults to half of `spread_bps` when unset.
    #[serde(default)]
    pub stale_tolerance_bps: Option<Decimal>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            spread_bps: default_spread_bps(),
            take_profit_bps: default_take_profit_bps(),
            order_size_usd: default_order_size_usd(),
            close_threshold_usd: default_close_threshold_usd(),
            max_position_usd: default_max_position_usd(),
            stale_tolerance_bps: None,
        }
    }
}

impl StrategyConfig {
    /// Effective staleness band in basis points.
    pub fn stale_tolerance_bps(&self) -> Decimal {
        self.stale_tolerance_bps
            .unwrap_or(self.spread_bps / Decimal::TWO)
    }

    /// Risk thresholds derived from this config.
    pub fn risk_limits(&self) -> Result<RiskLimits, CoreError> {
        RiskLimits::new(self.close_threshold_usd, self.max_position_usd)
    }

    /// Check every invariant; returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.spread_bps <= Decimal::ZERO {
            return Err(format!("spread_bps must be positive, got {}", self.spread_bps));
        }
        if self.take_profit_bps <= Decimal::ZERO {
            return Err(format!(
                "take_profit_bps must be positive, got {}",
                self.take_profit_bps
            ));
        }
        if self.take_profit_bps > self.spread_bps {
            return Err(format!(
                "take_profit_bps ({}) must not exceed spread_bps ({})",
                self.take_profit_bps, self.spread_bps
            ));
        }
        if self.order_size_usd <= Decimal::ZERO {
            return Err(format!(
                "order_size_usd must be positive, got {}",
                self.order_size_usd
            ));
        }
        if let Some(tol) = self.stale_tolerance_bps {
            if tol < Decimal::ZERO {
                return Err(format!("stale_tolerance_bps must not be negative, got {tol}"));
            }
        }
        self.risk_limits().map(|_| ()).map_err(|e| e.to_string())
    }
}

fn default_spread_bps() -> Decimal {
    Decimal::new(10, 0) // 10 bps wide, 5 bps per side
}
fn default_take_profit_bps() -> Decimal {
    Decimal::new(5, 0)
}
fn default_order_size_usd() -> Decimal {
    Decimal::new(100, 0)
}
fn default_close_threshold_usd() -> Decimal {
    Decimal::new(500, 0)
}
fn default_max_position_usd() -> Decimal {
    Decimal::new(2000, 0)
}
