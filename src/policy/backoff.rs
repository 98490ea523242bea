//! Multiplicative backoff over health-check intervals.
//!
//! Intervals are millisecond counts clamped to `[base_ms, max_ms]`. Growth
//! and shrink are deterministic (no jitter): failures multiply by the
//! configured factor, successes divide by it.

/// Default floor for the check interval (5 seconds).
pub const BASE_INTERVAL_MS: u64 = 5_000;

/// Default ceiling for the check interval (5 minutes).
pub const MAX_INTERVAL_MS: u64 = 300_000;

/// Default growth/shrink factor.
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Pure interval policy: grow on failure, shrink on success, always clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base_ms: u64,
    max_ms: u64,
    multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BASE_INTERVAL_MS, MAX_INTERVAL_MS, BACKOFF_MULTIPLIER)
    }
}

impl BackoffPolicy {
    /// Build a policy. `base_ms`/`max_ms` are swapped if given out of order
    /// and a multiplier at or below 1.0 falls back to the default, so the
    /// invariant `base <= interval <= max` holds for any input.
    pub fn new(base_ms: u64, max_ms: u64, multiplier: f64) -> Self {
        let (base_ms, max_ms) = if base_ms <= max_ms {
            (base_ms, max_ms)
        } else {
            (max_ms, base_ms)
        };
        let multiplier = if multiplier > 1.0 {
            multiplier
        } else {
            BACKOFF_MULTIPLIER
        };
        Self {
            base_ms,
            max_ms,
            multiplier,
        }
    }

    /// Interval floor in milliseconds.
    pub fn base_ms(&self) -> u64 {
        self.base_ms
    }

    /// Interval ceiling in milliseconds.
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Next interval after a failed attempt: `min(interval * multiplier, max)`.
    pub fn grow(&self, interval_ms: u64) -> u64 {
        let grown = (interval_ms as f64 * self.multiplier) as u64;
        grown.clamp(self.base_ms, self.max_ms)
    }

    /// Next interval after a healthy observation: `max(interval / multiplier, base)`.
    pub fn shrink(&self, interval_ms: u64) -> u64 {
        let shrunk = (interval_ms as f64 / self.multiplier) as u64;
        shrunk.clamp(self.base_ms, self.max_ms)
    }

    /// Clamp an arbitrary interval into the policy's bounds.
    pub fn clamp(&self, interval_ms: u64) -> u64 {
        interval_ms.clamp(self.base_ms, self.max_ms)
    }
}
