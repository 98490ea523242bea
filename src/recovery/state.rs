//! Recovery state record and its externally visible views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::policy::Tier;
use crate::store::StatsRecord;

/// Why a recovery attempt was triggered.
///
/// Display strings are stable identifiers that appear in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    /// The probe itself raised; treated as an unhealthy signal.
    HealthCheckException,
    /// The fast loop saw the capability unhealthy beyond the grace span.
    ProlongedUnhealthy,
    /// The deep check saw the capability unhealthy beyond its own threshold.
    DeepCheckProlongedUnhealthy,
}

impl std::fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryReason::HealthCheckException => write!(f, "health_check_exception"),
            RecoveryReason::ProlongedUnhealthy => write!(f, "prolonged_unhealthy_state"),
            RecoveryReason::DeepCheckProlongedUnhealthy => {
                write!(f, "deep_check_prolonged_unhealthy")
            }
        }
    }
}

/// Mutable recovery state. One instance per monitored capability, owned
/// exclusively by the controller inside the supervisor actor.
#[derive(Debug, Clone)]
pub struct RecoveryState {
    /// Current rung on the escalation ladder.
    pub tier: Tier,
    /// Consecutive attempts at `tier` since the last tier change or success.
    pub tier_attempts: u32,
    /// Lifetime attempt counter, persisted, never reset.
    pub total_attempts: u64,
    /// Lifetime success counter, persisted, never reset.
    pub successful_recoveries: u64,
    /// Monotonic instant of the last confirmed-healthy observation.
    pub last_healthy: Instant,
    /// Wall-clock twin of `last_healthy`, the value that gets persisted.
    pub last_healthy_at: DateTime<Utc>,
    /// Next check delay in ms, always within the backoff bounds.
    pub current_interval_ms: u64,
    /// Whether the supervisor is running; gates all triggered recovery.
    pub active: bool,
    /// Set only while a NUCLEAR sequence is executing.
    pub deep_recovery_in_progress: bool,
}

impl RecoveryState {
    /// Portion of the state that survives process restarts.
    pub fn stats_record(&self) -> StatsRecord {
        StatsRecord {
            total_attempts: self.total_attempts,
            successful_recoveries: self.successful_recoveries,
            last_healthy_at: self.last_healthy_at,
        }
    }

    /// Cloneable view for status queries.
    pub fn snapshot(&self) -> RecoverySnapshot {
        RecoverySnapshot {
            tier: self.tier,
            tier_attempts: self.tier_attempts,
            total_attempts: self.total_attempts,
            successful_recoveries: self.successful_recoveries,
            last_healthy_at: self.last_healthy_at,
            current_interval_ms: self.current_interval_ms,
            active: self.active,
            deep_recovery_in_progress: self.deep_recovery_in_progress,
        }
    }
}

/// Read-only snapshot of the recovery state for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoverySnapshot {
    pub tier: Tier,
    pub tier_attempts: u32,
    pub total_attempts: u64,
    pub successful_recoveries: u64,
    pub last_healthy_at: DateTime<Utc>,
    pub current_interval_ms: u64,
    pub active: bool,
    pub deep_recovery_in_progress: bool,
}

impl RecoverySnapshot {
    /// Lifetime success ratio; perfect when no attempts have been made.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            1.0
        } else {
            self.successful_recoveries as f64 / self.total_attempts as f64
        }
    }
}
