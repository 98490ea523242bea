//! Recovery controller — the seeded state machine behind the supervisor.
//!
//! Synchronous by design: every transition rule lives here, timer-free, so
//! the escalation/backoff behavior is unit-testable without a runtime. The
//! supervisor actor is the sole caller and the sole writer of the state.
//!
//! Attempt accounting is split across the async boundary: `begin_attempt`
//! increments the counters when a recovery is triggered, and
//! `complete_attempt` applies the outcome transitions and persists once the
//! spawned tier execution reports back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::{RecoveryReason, RecoverySnapshot, RecoveryState};
use crate::config::SupervisorConfig;
use crate::policy::{BackoffPolicy, Tier};
use crate::store::{StatStore, StatsRecord};

pub struct RecoveryController {
    config: SupervisorConfig,
    policy: BackoffPolicy,
    store: Arc<dyn StatStore>,
    state: RecoveryState,
}

impl RecoveryController {
    /// Build a controller seeded from the persisted stats.
    ///
    /// Missing or corrupt records default to a fresh history. The initial
    /// tier derives from the lifetime success ratio, and the persisted
    /// wall-clock last-healthy instant is mapped into the monotonic domain
    /// so a capability that was already down before a restart is treated as
    /// already-unhealthy.
    pub fn seed(config: SupervisorConfig, store: Arc<dyn StatStore>) -> Self {
        let record = match store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(backend = store.backend_name(), "No persisted stats, starting fresh");
                StatsRecord::fresh()
            }
            Err(e) => {
                warn!(
                    backend = store.backend_name(),
                    "Failed to load persisted stats, starting fresh: {e}"
                );
                StatsRecord::fresh()
            }
        };

        let policy = config.backoff();
        let tier = Tier::from_success_rate(record.success_rate());

        let now = Instant::now();
        let since_healthy = (Utc::now() - record.last_healthy_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let last_healthy = now.checked_sub(since_healthy).unwrap_or(now);

        if record.total_attempts > 0 {
            info!(
                total_attempts = record.total_attempts,
                successful_recoveries = record.successful_recoveries,
                success_rate = format!("{:.0}%", record.success_rate() * 100.0),
                initial_tier = %tier,
                "Seeded recovery state from history"
            );
        }

        let state = RecoveryState {
            tier,
            tier_attempts: 0,
            total_attempts: record.total_attempts,
            successful_recoveries: record.successful_recoveries,
            last_healthy,
            last_healthy_at: record.last_healthy_at,
            current_interval_ms: policy.base_ms(),
            active: false,
            deep_recovery_in_progress: false,
        };

        Self {
            config,
            policy,
            store,
            state,
        }
    }

    pub fn state(&self) -> &RecoveryState {
        &self.state
    }

    pub fn snapshot(&self) -> RecoverySnapshot {
        self.state.snapshot()
    }

    pub fn activate(&mut self) {
        self.state.active = true;
    }

    pub fn deactivate(&mut self) {
        self.state.active = false;
    }

    /// Delay until the next health check.
    pub fn next_check_delay(&self) -> Duration {
        Duration::from_millis(self.state.current_interval_ms)
    }

    /// How long the capability has been without a confirmed-healthy
    /// observation, as of `now`.
    pub fn unhealthy_elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state.last_healthy)
    }

    /// Healthy observation: refresh the last-healthy instants, shrink the
    /// interval toward base, and if a recovery was in progress at this
    /// tier, reset the attempt count and step down one rung.
    pub fn on_healthy(&mut self, now: Instant) {
        self.state.last_healthy = now;
        self.state.last_healthy_at = Utc::now();
        self.state.current_interval_ms = self.policy.shrink(self.state.current_interval_ms);

        if self.state.tier_attempts > 0 {
            self.state.tier_attempts = 0;
            let stepped = self.state.tier.deescalate();
            if stepped != self.state.tier {
                info!(from = %self.state.tier, to = %stepped, "Sustained health, de-escalating");
                self.state.tier = stepped;
            }
        }
    }

    /// Unhealthy observation. Brief blips inside the grace span are
    /// tolerated; beyond it the fast loop must trigger recovery.
    pub fn on_unhealthy(&self, elapsed: Duration) -> Option<RecoveryReason> {
        if elapsed > Duration::from_millis(self.config.unhealthy_grace_ms) {
            Some(RecoveryReason::ProlongedUnhealthy)
        } else {
            None
        }
    }

    /// Whether the deep check should trigger recovery for `elapsed`.
    pub fn deep_check_due(&self, elapsed: Duration) -> bool {
        elapsed > Duration::from_millis(self.config.deep_unhealthy_threshold_ms)
    }

    /// Account a triggered recovery attempt. Returns the tier to execute,
    /// or `None` when the supervisor is not active (no counter changes, no
    /// persistence).
    pub fn begin_attempt(&mut self, reason: RecoveryReason) -> Option<Tier> {
        if !self.state.active {
            return None;
        }

        self.state.total_attempts += 1;
        self.state.tier_attempts += 1;

        warn!(
            reason = %reason,
            tier = %self.state.tier,
            attempt = self.state.tier_attempts,
            total = self.state.total_attempts,
            "Recovery triggered"
        );

        Some(self.state.tier)
    }

    /// Apply the outcome of an executed attempt, then persist.
    ///
    /// Success resets the attempt count and the interval and refreshes the
    /// last-healthy instants. Failure escalates one rung once the per-tier
    /// attempt budget is exhausted, then grows the interval.
    pub fn complete_attempt(&mut self, recovered: bool, now: Instant) {
        if recovered {
            self.state.successful_recoveries += 1;
            self.state.tier_attempts = 0;
            self.state.current_interval_ms = self.policy.base_ms();
            self.state.last_healthy = now;
            self.state.last_healthy_at = Utc::now();

            info!(
                successes = self.state.successful_recoveries,
                total = self.state.total_attempts,
                "Recovery succeeded"
            );
        } else {
            if self.state.tier_attempts >= self.config.max_attempts_per_tier {
                let escalated = self.state.tier.escalate();
                if escalated != self.state.tier {
                    warn!(from = %self.state.tier, to = %escalated, "Escalating recovery tier");
                }
                self.state.tier = escalated;
                self.state.tier_attempts = 0;
            }

            self.state.current_interval_ms = self.policy.grow(self.state.current_interval_ms);

            warn!(
                tier = %self.state.tier,
                next_check_ms = self.state.current_interval_ms,
                "Recovery failed"
            );
        }

        self.persist();
    }

    pub fn set_deep_recovery(&mut self, in_progress: bool) {
        self.state.deep_recovery_in_progress = in_progress;
    }

    /// Best-effort persistence. Save failures are logged and swallowed;
    /// lost stats degrade future seeding accuracy but never block recovery.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.state.stats_record()) {
            warn!(backend = self.store.backend_name(), "Failed to persist stats: {e}");
        }
    }
}
