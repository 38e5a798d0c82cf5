//! Fair price estimation.
//!
//! Time-weighted EMA over irregular samples:
//!
//! ```text
//! α    = 1 - exp(-Δt / window_ms)
//! ema' = ema + α · (p - ema)
//! ```
//!
//! The first sample initializes the EMA. A fixed-α EMA would weight bursts
//! of ticks more heavily than quiet periods; scaling α by elapsed time
//! removes that bias.

use fairmm_core::Price;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, trace};

/// Smoothed fair price with warm-up tracking.
#[derive(Debug, Clone)]
pub struct FairPriceEstimator {
    window_ms: u64,
    warmup_ms: u64,
    ema: Option<Decimal>,
    last_sample_ms: Option<u64>,
    sample_count: u64,
    connected_at_ms: Option<u64>,
}

impl FairPriceEstimator {
    pub fn new(window_ms: u64, warmup_ms: u64) -> Self {
        Self {
            window_ms,
            warmup_ms,
            ema: None,
            last_sample_ms: None,
            sample_count: 0,
            connected_at_ms: None,
        }
    }

    /// Start the warm-up clock. Clears any previous state.
    pub fn mark_connected(&mut self, now_ms: u64) {
        self.ema = None;
        self.last_sample_ms = None;
        self.sample_count = 0;
        self.connected_at_ms = Some(now_ms);
        debug!(warmup_ms = self.warmup_ms, "Fair price warm-up started");
    }

    /// Smoothing factor for an elapsed interval, clamped to `[0, 1]`.
    fn alpha(&self, elapsed_ms: u64) -> Decimal {
        if elapsed_ms == 0 {
            return Decimal::ZERO;
        }
        if self.window_ms == 0 {
            return Decimal::ONE;
        }
        let a = 1.0 - (-(elapsed_ms as f64) / self.window_ms as f64).exp();
        Decimal::from_f64(a.clamp(0.0, 1.0))
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE)
    }

    /// Feed one sample. Non-positive prices are ignored.
    ///
    /// Samples at or before the previous timestamp are counted but leave
    /// the EMA unchanged.
    pub fn on_sample(&mut self, price: Price, ts_ms: u64) {
        if !price.is_positive() {
            trace!(%price, "Ignoring non-positive price sample");
            return;
        }
        let p = price.inner();
        self.sample_count += 1;

        let (Some(ema), Some(last)) = (self.ema, self.last_sample_ms) else {
            self.ema = Some(p);
            self.last_sample_ms = Some(ts_ms);
            return;
        };

        let alpha = self.alpha(ts_ms.saturating_sub(last));
        self.ema = Some(ema + alpha * (p - ema));
        self.last_sample_ms = Some(last.max(ts_ms));
    }

    /// Warm-up elapsed and at least one sample seen.
    pub fn is_ready(&self, now_ms: u64) -> bool {
        match self.connected_at_ms {
            Some(connected) => {
                self.sample_count > 0 && now_ms.saturating_sub(connected) >= self.warmup_ms
            }
            None => false,
        }
    }

    /// Smoothed price, or `None` until ready.
    pub fn fair_price(&self, now_ms: u64) -> Option<Price> {
        if !self.is_ready(now_ms) {
            return None;
        }
        self.ema.map(Price::new)
    }

    /// Raw EMA regardless of warm-up.
    pub fn ema(&self) -> Option<Price> {
        self.ema.map(Price::new)
    }

    pub fn warmup_remaining_ms(&self, now_ms: u64) -> u64 {
        match self.connected_at_ms {
            Some(connected) => self
                .warmup_ms
                .saturating_sub(now_ms.saturating_sub(connected)),
            None => self.warmup_ms,
        }
    }

    pub fn price_count(&self) -> u64 {
        self.sample_count
    }

    pub fn last_sample_ms(&self) -> Option<u64> {
        self.last_sample_ms
    }
}
