//! Per-tier remediation plans.
//!
//! Each tier is an explicit ordered list of steps: collaborator calls
//! interleaved with fixed waits. The executor appends the verifying
//! re-probe; it is not a step. Wall-clock budgets per tier (waits only):
//! GENTLE ~2s, MODERATE ~3s, AGGRESSIVE ~5s, NUCLEAR ~16.5s plus a ~3s
//! deferred wake armed out-of-process.

use std::time::Duration;

use crate::actions::ComponentId;
use crate::policy::Tier;

/// One step of a remediation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    /// Ask the host to restart gracefully.
    GracefulRestart,
    /// Request resource reclamation.
    ReclaimResources,
    /// Best-effort stop of one component; errors ignored.
    ForceStop(ComponentId),
    /// Idempotent system-wide restart signal.
    BroadcastRestart,
    /// Arm the durable deferred-wake timer.
    DeferredWake(Duration),
    /// Fixed wait; also a cancellation checkpoint.
    Wait(Duration),
}

/// Ordered remediation sequence for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    pub tier: Tier,
    pub steps: Vec<RecoveryStep>,
}

const NUCLEAR_STOP_ROUNDS: usize = 3;

impl RecoveryPlan {
    /// The remediation sequence bound to `tier`.
    pub fn for_tier(tier: Tier) -> Self {
        use RecoveryStep::*;

        let steps = match tier {
            Tier::Gentle => vec![GracefulRestart, Wait(Duration::from_secs(2))],
            Tier::Moderate => vec![
                ReclaimResources,
                ForceStop(ComponentId::Host),
                Wait(Duration::from_secs(1)),
                GracefulRestart,
                Wait(Duration::from_secs(2)),
            ],
            Tier::Aggressive => {
                let mut steps: Vec<RecoveryStep> =
                    ComponentId::ALL.iter().copied().map(ForceStop).collect();
                steps.extend([
                    ReclaimResources,
                    ReclaimResources,
                    BroadcastRestart,
                    Wait(Duration::from_secs(5)),
                ]);
                steps
            }
            Tier::Nuclear => {
                let mut steps = Vec::new();
                for _ in 0..NUCLEAR_STOP_ROUNDS {
                    steps.extend(ComponentId::ALL.iter().copied().map(ForceStop));
                    steps.push(Wait(Duration::from_millis(500)));
                }
                steps.extend([
                    ReclaimResources,
                    Wait(Duration::from_secs(5)),
                    DeferredWake(Duration::from_secs(3)),
                    Wait(Duration::from_secs(10)),
                ]);
                steps
            }
        };

        Self { tier, steps }
    }

    /// Total fixed wait time in the plan (excludes the deferred-wake delay,
    /// which elapses outside this process's sequence).
    pub fn wait_budget(&self) -> Duration {
        self.steps
            .iter()
            .filter_map(|step| match step {
                RecoveryStep::Wait(d) => Some(*d),
                _ => None,
            })
            .sum()
    }
}
