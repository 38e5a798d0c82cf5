//! Time source abstraction.

/// Time source in milliseconds since Unix epoch.
///
/// Injected wherever a timestamp drives a decision (warm-up, throttling,
/// cooldowns) so tests can control time explicitly.
pub trait Clock: Send + Sync {
    /// Returns current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}
