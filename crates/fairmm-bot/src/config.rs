//! Application configuration.

use crate::error::{AppError, AppResult};
use fairmm_exchange::{ExchangeKind, PaperConfig};
use fairmm_feed::{FeedConfig, PriceSource};
use fairmm_mm::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Venue adapter to use.
    #[serde(default)]
    pub exchange: ExchangeKind,

    /// Traded symbol on the venue (e.g. "BTC").
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Fair price source.
    #[serde(default)]
    pub price_source: PriceSource,

    /// Minimum time after feed connect before quoting starts.
    #[serde(default = "default_warmup_seconds")]
    pub warmup_seconds: u64,

    /// EMA time constant (ms).
    #[serde(default = "default_fair_price_window_ms")]
    pub fair_price_window_ms: u64,

    /// Minimum quoting tick period (ms).
    #[serde(default = "default_update_throttle_ms")]
    pub update_throttle_ms: u64,

    /// Order/position re-sync period (ms).
    #[serde(default = "default_order_sync_interval_ms")]
    pub order_sync_interval_ms: u64,

    /// Margin ratio check period (ms).
    #[serde(default = "default_margin_check_interval_ms")]
    pub margin_check_interval_ms: u64,

    /// Pause below this `available / equity` ratio.
    #[serde(default = "default_min_margin_ratio")]
    pub min_margin_ratio: Decimal,

    /// Consecutive failed quote ticks before pausing.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Time an error-breaker pause lasts before auto-resume (ms).
    #[serde(default = "default_error_pause_cooldown_ms")]
    pub error_pause_cooldown_ms: u64,

    /// Status log period (ms).
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,

    /// Warm-up readiness poll period (ms).
    #[serde(default = "default_warmup_poll_interval_ms")]
    pub warmup_poll_interval_ms: u64,

    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Primary-oracle stream.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Paper venue settings (used when `exchange = "paper"`).
    #[serde(default)]
    pub paper: PaperConfig,
}

fn default_symbol() -> String {
    "BTC".to_string()
}
fn default_warmup_seconds() -> u64 {
    10
}
fn default_fair_price_window_ms() -> u64 {
    5_000
}
fn default_update_throttle_ms() -> u64 {
    1_000
}
fn default_order_sync_interval_ms() -> u64 {
    5_000
}
fn default_margin_check_interval_ms() -> u64 {
    10_000
}
fn default_min_margin_ratio() -> Decimal {
    Decimal::new(1, 1) // 0.1
}
fn default_max_consecutive_errors() -> u32 {
    10
}
fn default_error_pause_cooldown_ms() -> u64 {
    60_000
}
fn default_status_interval_ms() -> u64 {
    30_000
}
fn default_warmup_poll_interval_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeKind::default(),
            symbol: default_symbol(),
            price_source: PriceSource::default(),
            warmup_seconds: default_warmup_seconds(),
            fair_price_window_ms: default_fair_price_window_ms(),
            update_throttle_ms: default_update_throttle_ms(),
            order_sync_interval_ms: default_order_sync_interval_ms(),
            margin_check_interval_ms: default_margin_check_interval_ms(),
            min_margin_ratio: default_min_margin_ratio(),
            max_consecutive_errors: default_max_consecutive_errors(),
            error_pause_cooldown_ms: default_error_pause_cooldown_ms(),
            status_interval_ms: default_status_interval_ms(),
            warmup_poll_interval_ms: default_warmup_poll_interval_ms(),
            strategy: StrategyConfig::default(),
            feed: FeedConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn warmup_ms(&self) -> u64 {
        self.warmup_seconds.saturating_mul(1000)
    }

    /// Fail fast on any invariant violation.
    pub fn validate(&self) -> AppResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        self.strategy
            .validate()
            .map_err(|e| AppError::Config(format!("strategy: {e}")))?;

        for (name, value) in [
            ("update_throttle_ms", self.update_throttle_ms),
            ("order_sync_interval_ms", self.order_sync_interval_ms),
            ("margin_check_interval_ms", self.margin_check_interval_ms),
            ("status_interval_ms", self.status_interval_ms),
            ("warmup_poll_interval_ms", self.warmup_poll_interval_ms),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{name} must be positive")));
            }
        }

        if self.min_margin_ratio <= Decimal::ZERO || self.min_margin_ratio >= Decimal::ONE {
            return Err(AppError::Config(format!(
                "min_margin_ratio must be in (0, 1), got {}",
                self.min_margin_ratio
            )));
        }
        if self.max_consecutive_errors == 0 {
            return Err(AppError::Config(
                "max_consecutive_errors must be at least 1".to_string(),
            ));
        }

        if self.price_source == PriceSource::PrimaryOracle {
            if self.feed.symbol.trim().is_empty() {
                return Err(AppError::Config(
                    "feed.symbol is required for price_source = primary-oracle".to_string(),
                ));
            }
            if self.feed.max_connect_attempts == 0 {
                return Err(AppError::Config(
                    "feed.max_connect_attempts must be at least 1".to_string(),
                ));
            }
        }

        match self.exchange {
            ExchangeKind::Paper => {
                self.paper.validate().map_err(AppError::Config)?;
                if !self.paper.markets.iter().any(|m| m.matches(&self.symbol)) {
                    return Err(AppError::Config(format!(
                        "symbol {} is not listed in paper.markets",
                        self.symbol
                    )));
                }
                // Paper marks are driven by the oracle stream
                if self.price_source == PriceSource::VenueMid {
                    return Err(AppError::Config(
                        "price_source = venue-mid needs a live venue; use primary-oracle with paper"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
