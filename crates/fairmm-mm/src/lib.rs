//! Quoting strategy for fairmm.
//!
//! Both components here are pure computations over venue snapshots:
//! - `QuoteGenerator`: fair price + signed exposure → bid/ask quote
//! - `ExposureTracker`: position snapshot + fair price → exposure state
//!
//! # Architecture
//!
//! ```text
//! position snapshot ─→ ExposureTracker ─→ signed notional
//!                                              │
//! fair price ──────────────────────→ QuoteGenerator.generate_quotes()
//!                                              │
//!                                   Quote ─→ quote_to_orders() ─→ OrderIntent[]
//! ```

pub mod config;
pub mod exposure;
pub mod quote_engine;

pub use config::StrategyConfig;
pub use exposure::{ExposureState, ExposureTracker};
pub use quote_engine::{Quote, QuoteGenerator, QuoteSide};
