//! Health collaborator contracts.
//!
//! The supervisor never inspects the monitored capability directly; it asks
//! a `HealthProbe`. Probes are required to fail closed: an `Err` from
//! `probe()` is classified as an unhealthy signal (reason
//! `health_check_exception`), never as a reason to stall the loop.

use anyhow::Result;
use async_trait::async_trait;

/// A fallible boolean liveness query for the monitored capability.
///
/// Implementations must be side-effect-free — probing must not itself
/// restart, reconfigure, or otherwise touch the capability.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok(true)` when the capability is alive and responsive.
    async fn probe(&self) -> Result<bool>;

    /// Probe name for logging.
    fn probe_name(&self) -> &'static str {
        "unnamed"
    }
}

/// Resource-pressure input for the deep-check loop.
///
/// Reports the current usage ratio in `[0.0, 1.0]`. Readings above the
/// configured threshold prompt a resource-reclamation request but never a
/// recovery trigger on their own.
pub trait ResourceGauge: Send + Sync {
    /// Current usage ratio, `0.0` = idle, `1.0` = exhausted.
    fn usage_ratio(&self) -> Result<f64>;
}
