//! Prometheus metrics for the fairmm bot.
//!
//! Covers:
//! - Lifecycle state and transitions
//! - Fair price, exposure and margin ratio
//! - Order placement, failures and requotes
//! - Circuit breaker trips and loop errors
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use fairmm_core::Price;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram, register_int_gauge, Counter, CounterVec, Encoder, Gauge, GaugeVec,
    Histogram, IntGauge, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::TelemetryResult;

/// Lifecycle states, for one-hot encoding.
const LIFECYCLE_STATES: &[&str] = &[
    "stopped",
    "connecting",
    "warming_up",
    "running",
    "paused",
    "error",
];

/// Lifecycle state (1 = active, 0 = inactive).
/// Labels: state
pub static LIFECYCLE_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "fairmm_lifecycle_state",
        "Orchestrator lifecycle state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Lifecycle transitions.
pub static STATE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_state_transitions_total",
        "Total lifecycle state transitions",
        &["from", "to"]
    )
    .unwrap()
});

/// Current smoothed fair price.
pub static FAIR_PRICE: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("fairmm_fair_price", "Smoothed fair price").unwrap());

/// Signed exposure notional in USD.
pub static SIGNED_NOTIONAL_USD: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "fairmm_signed_notional_usd",
        "Signed position notional in USD (positive=long)"
    )
    .unwrap()
});

/// Close mode flag (1 = close mode).
pub static CLOSE_MODE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("fairmm_close_mode", "Close mode active (1=active)").unwrap()
});

/// Available margin / equity.
pub static MARGIN_RATIO: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("fairmm_margin_ratio", "Available margin divided by equity").unwrap()
});

/// Orders placed.
/// Labels: side, reduce_only
pub static ORDERS_PLACED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_orders_placed_total",
        "Total orders placed",
        &["side", "reduce_only"]
    )
    .unwrap()
});

/// Venue call failures.
/// Labels: op (place/cancel_all/sync/account/subscribe/unsubscribe/disconnect)
pub static VENUE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_venue_failures_total",
        "Total failed venue calls",
        &["op"]
    )
    .unwrap()
});

/// Cancel-and-replace cycles.
pub static REQUOTES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("fairmm_requotes_total", "Total cancel-and-replace cycles").unwrap()
});

/// Failed quote ticks.
pub static LOOP_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("fairmm_loop_errors_total", "Total failed quote ticks").unwrap()
});

/// Circuit breaker trips.
/// Labels: reason (margin/error_breaker/feed_lost)
pub static BREAKER_TRIPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fairmm_breaker_trips_total",
        "Total pauses triggered by circuit breakers",
        &["reason"]
    )
    .unwrap()
});

/// Quote tick duration in milliseconds.
pub static QUOTE_TICK_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "fairmm_quote_tick_ms",
        "Quote tick duration in milliseconds",
        vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0]
    )
    .unwrap()
});

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the active lifecycle state; all others go to 0.
    pub fn lifecycle_state_set(state: &str) {
        for s in LIFECYCLE_STATES {
            LIFECYCLE_STATE.with_label_values(&[s]).set(0.0);
        }
        LIFECYCLE_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn state_transition(from: &str, to: &str) {
        STATE_TRANSITIONS_TOTAL.with_label_values(&[from, to]).inc();
        Self::lifecycle_state_set(to);
    }

    pub fn fair_price(price: Price) {
        FAIR_PRICE.set(to_f64(price.inner()));
    }

    pub fn exposure(signed_notional_usd: Decimal, close_mode: bool) {
        SIGNED_NOTIONAL_USD.set(to_f64(signed_notional_usd));
        CLOSE_MODE.set(i64::from(close_mode));
    }

    pub fn margin_ratio(ratio: Decimal) {
        MARGIN_RATIO.set(to_f64(ratio));
    }

    pub fn order_placed(side: &str, reduce_only: bool) {
        let reduce_only = if reduce_only { "true" } else { "false" };
        ORDERS_PLACED_TOTAL
            .with_label_values(&[side, reduce_only])
            .inc();
    }

    pub fn venue_failure(op: &str) {
        VENUE_FAILURES_TOTAL.with_label_values(&[op]).inc();
    }

    pub fn requote() {
        REQUOTES_TOTAL.inc();
    }

    pub fn loop_error() {
        LOOP_ERRORS_TOTAL.inc();
    }

    pub fn breaker_tripped(reason: &str) {
        BREAKER_TRIPS_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn quote_tick_duration(duration_ms: f64) {
        QUOTE_TICK_MS.observe(duration_ms);
    }

    /// Render the default registry in Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
