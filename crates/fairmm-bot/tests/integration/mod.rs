//! Integration tests for fairmm-bot.
//!
//! These tests drive the orchestrator against the paper venue with a
//! scripted price feed and a manual clock:
//! - Startup, warm-up and crash-recovery cleanup
//! - Quote placement and cancel-and-replace
//! - Margin, error and feed-loss circuit breakers
//! - Shutdown

pub mod common;
