//! Orchestrator lifecycle states.
//!
//! ```text
//! stopped ─start()→ connecting ─→ warming_up ─ready→ running ⇄ paused
//!                        │              │
//!                        └──failure─────┴──→ error
//! any ─stop()→ stopped
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Stopped,
    Connecting,
    WarmingUp,
    Running,
    Paused,
    /// Unrecoverable setup failure; only `stop()` is meaningful.
    Error,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Connecting => "connecting",
            Self::WarmingUp => "warming_up",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }

    /// Running or paused: the venue session is live and ticks are scheduled.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why quoting is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// Margin ratio fell below the floor; resumes above `floor * 1.2`.
    Margin,
    /// Too many consecutive failed quote ticks; resumes after a cooldown.
    ErrorBreaker,
    /// Price stream lost for good; never resumes automatically.
    FeedLost,
}

impl PauseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Margin => "margin",
            Self::ErrorBreaker => "error_breaker",
            Self::FeedLost => "feed_lost",
        }
    }
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
