//! Fair-price perpetual market maker.
//!
//! Main application that orchestrates all components:
//! - Price feed → EMA fair price with warm-up gating
//! - Exposure tracking and risk mode classification
//! - Two-sided quoting with cancel-and-replace on stale orders
//! - Margin, error and feed-loss circuit breakers

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod orchestrator;
pub mod paper_mark;
pub mod status;

pub use app::{build_exchange, build_feed, Application};
pub use config::AppConfig;
pub use error::{AppError, AppResult, SetupError};
pub use events::{EngineEvent, EventSink, TracingEventSink, VenueOp};
pub use lifecycle::{LifecycleState, PauseReason};
pub use orchestrator::{Orchestrator, SkipReason, TickOutcome};
pub use paper_mark::PaperMarkFeed;
pub use status::{ExposureSnapshot, RestingSide, StatusSnapshot};
