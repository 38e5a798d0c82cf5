//! Structured engine events.
//!
//! The orchestrator reports everything observable through an injected
//! [`EventSink`] instead of logging directly. Production uses
//! [`TracingEventSink`] (tracing + Prometheus); tests record events.

use std::fmt;

use fairmm_core::{OrderSide, Price, RiskMode, Size};
use fairmm_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{LifecycleState, PauseReason};

/// Venue operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueOp {
    Place,
    CancelAll,
    Sync,
    Account,
    Subscribe,
    Unsubscribe,
    Disconnect,
}

impl VenueOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::CancelAll => "cancel_all",
            Self::Sync => "sync",
            Self::Account => "account",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for VenueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    SetupFailed {
        reason: String,
    },
    Paused {
        reason: PauseReason,
    },
    Resumed {
        reason: PauseReason,
    },
    /// Fair price and exposure evaluated on a quote tick.
    ExposureUpdated {
        fair_price: Price,
        signed_notional_usd: Decimal,
        mode: RiskMode,
    },
    /// Resting orders cancelled for replacement.
    Requoted {
        fair_price: Price,
        cancelled: usize,
    },
    OrderPlaced {
        order_id: String,
        side: OrderSide,
        price: Price,
        size: Size,
        reduce_only: bool,
    },
    VenueCallFailed {
        op: VenueOp,
        error: String,
    },
    LoopError {
        consecutive: u32,
        error: String,
    },
    MarginChecked {
        ratio: Decimal,
    },
    QuoteTickCompleted {
        duration_ms: f64,
    },
}

/// Receiver for engine events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Logs events with tracing and updates Prometheus metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged { from, to } => {
                info!(%from, %to, "Lifecycle state changed");
                Metrics::state_transition(from.as_str(), to.as_str());
            }
            EngineEvent::SetupFailed { reason } => {
                error!(%reason, "Setup failed; restart required");
            }
            EngineEvent::Paused { reason } => {
                warn!(%reason, "Quoting paused, resting orders cancelled");
                Metrics::breaker_tripped(reason.as_str());
            }
            EngineEvent::Resumed { reason } => {
                info!(%reason, "Quoting resumed");
            }
            EngineEvent::ExposureUpdated {
                fair_price,
                signed_notional_usd,
                mode,
            } => {
                debug!(%fair_price, %signed_notional_usd, %mode, "Exposure evaluated");
                Metrics::fair_price(fair_price);
                Metrics::exposure(signed_notional_usd, mode.is_close());
            }
            EngineEvent::Requoted {
                fair_price,
                cancelled,
            } => {
                debug!(%fair_price, cancelled, "Requoting");
                Metrics::requote();
            }
            EngineEvent::OrderPlaced {
                order_id,
                side,
                price,
                size,
                reduce_only,
            } => {
                info!(%order_id, %side, %price, %size, reduce_only, "Order placed");
                Metrics::order_placed(&side.to_string(), reduce_only);
            }
            EngineEvent::VenueCallFailed { op, error } => {
                warn!(%op, %error, "Venue call failed");
                Metrics::venue_failure(op.as_str());
            }
            EngineEvent::LoopError { consecutive, error } => {
                error!(consecutive, %error, "Quote tick failed");
                Metrics::loop_error();
            }
            EngineEvent::MarginChecked { ratio } => {
                debug!(%ratio, "Margin ratio checked");
                Metrics::margin_ratio(ratio);
            }
            EngineEvent::QuoteTickCompleted { duration_ms } => {
                Metrics::quote_tick_duration(duration_ms);
            }
        }
    }
}
