//! Exponential backoff policy for reconnection scheduling.

use std::time::Duration;

/// Configuration for the reconnect backoff policy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of reconnect attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Maximum delay (caps exponential growth).
    pub max_delay: Duration,
    /// Multiplier applied to the delay on each consecutive failure.
    pub multiplier: f64,
    /// Add `jitter_fraction * delay / 2` deterministic jitter (0.0 = none).
    /// Growth stays monotonic non-decreasing until the cap either way.
    pub jitter_fraction: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_fraction: 0.0,
        }
    }
}

/// Stateless backoff policy — computes the delay for a given attempt number.
///
/// The attempt counter itself lives with the connection manager; it resets
/// to zero on every successful connect.
#[derive(Debug, Clone, Default)]
pub struct BackoffPolicy {
    pub config: BackoffConfig,
}

impl BackoffPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Returns the delay before reconnect attempt `attempt` (0-based).
    /// Returns `None` once `attempt` reaches `max_attempts` — the scheduler
    /// stops silently at that point.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        let base_ms = self.config.base_delay.as_millis() as f64
            * self.config.multiplier.powi(attempt as i32);
        let cap_ms = self.config.max_delay.as_millis() as f64;
        let capped = base_ms.min(cap_ms);

        let jitter_ms = capped * self.config.jitter_fraction * 0.5;
        Some(Duration::from_millis((capped + jitter_ms) as u64))
    }

    /// Returns `true` if attempt `attempt` (0-based) is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.config.max_attempts
    }
}
