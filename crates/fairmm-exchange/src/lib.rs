//! Exchange adapter layer for fairmm.
//!
//! - [`Exchange`]: the venue capability interface consumed by the orchestrator
//! - [`PaperExchange`]: in-memory simulated venue for dry runs and tests

pub mod adapter;
pub mod error;
pub mod paper;

pub use adapter::{DynExchange, Exchange, ExchangeKind, OrderbookCallback};
pub use error::{ExchangeError, ExchangeResult};
pub use paper::{PaperConfig, PaperExchange, PaperFill, PaperOp};
