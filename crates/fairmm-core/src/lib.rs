//! Core domain types for the fairmm market maker.
//!
//! This crate provides the vocabulary shared by every other crate:
//! - `Price`, `Size`: precision-safe numeric types
//! - `Market`: venue market metadata (tick size, lot size)
//! - `OrderSide`, `OrderIntent`, `Order`: venue-agnostic order types
//! - `Position`, `AccountInfo`, `Orderbook`: venue snapshots
//! - `RiskLimits`, `RiskMode`: the single exposure classification rule
//! - `Clock`: injectable time source
//! - `BoxFuture`: return type for dyn-compatible async collaborator traits

pub mod book;
pub mod clock;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod position;
pub mod risk;

pub use book::Orderbook;
pub use clock::{Clock, SystemClock};
pub use decimal::{Price, Size, BPS_DIVISOR};
pub use error::{CoreError, Result};
pub use market::Market;
pub use order::{ClientOrderId, Order, OrderIntent, OrderSide, PlacedOrder};
pub use position::{AccountInfo, Position, PositionSide};
pub use risk::{RiskLimits, RiskMode};

use std::future::Future;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
