//! Tier plan execution.
//!
//! Runs one remediation plan to completion on whatever task it is spawned
//! on, then verifies with a re-probe. Error policy at this boundary:
//! `ForceStop` failures are ignored, any other action failure ends the
//! attempt as not recovered, and nothing ever propagates out as an error.
//! Waits are the only cancellation checkpoints; a cancelled wait aborts the
//! sequence early.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::plan::{RecoveryPlan, RecoveryStep};
use crate::actions::ActionInterface;
use crate::health::HealthProbe;

/// Result of executing one tier plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The verifying re-probe came back healthy.
    Recovered,
    /// A step failed or the re-probe came back unhealthy.
    NotRecovered,
    /// The supervisor stopped mid-sequence; no outcome to account.
    Aborted,
}

/// Execute `plan` against the collaborators and verify with a re-probe.
pub async fn execute_plan(
    plan: &RecoveryPlan,
    actions: &Arc<dyn ActionInterface>,
    probe: &Arc<dyn HealthProbe>,
    cancel: &CancellationToken,
) -> ExecutionOutcome {
    for step in &plan.steps {
        let result = match step {
            RecoveryStep::GracefulRestart => actions.request_graceful_restart().await,
            RecoveryStep::ReclaimResources => actions.request_resource_reclamation().await,
            RecoveryStep::BroadcastRestart => actions.broadcast_system_restart().await,
            RecoveryStep::DeferredWake(delay) => actions.schedule_deferred_wake(*delay).await,
            RecoveryStep::ForceStop(component) => {
                if let Err(e) = actions.force_stop(*component).await {
                    debug!(tier = %plan.tier, %component, "Force stop failed (ignored): {e:#}");
                }
                Ok(())
            }
            RecoveryStep::Wait(duration) => {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!(tier = %plan.tier, "Recovery sequence cancelled mid-wait");
                        return ExecutionOutcome::Aborted;
                    }
                    () = tokio::time::sleep(*duration) => {}
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(tier = %plan.tier, ?step, "Recovery step failed: {e:#}");
            return ExecutionOutcome::NotRecovered;
        }
    }

    if cancel.is_cancelled() {
        return ExecutionOutcome::Aborted;
    }

    // Verifying re-probe; a probe error counts as not recovered.
    match probe.probe().await {
        Ok(true) => ExecutionOutcome::Recovered,
        Ok(false) => ExecutionOutcome::NotRecovered,
        Err(e) => {
            warn!(tier = %plan.tier, "Verifying probe failed: {e:#}");
            ExecutionOutcome::NotRecovered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ComponentId;
    use crate::policy::Tier;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted collaborator that logs calls and can fail selected actions.
    #[derive(Default)]
    struct ScriptedCapability {
        healthy: AtomicBool,
        heal_on_restart: bool,
        fail_reclaim: bool,
        fail_force_stop: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCapability {
        fn log(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionInterface for ScriptedCapability {
        async fn request_graceful_restart(&self) -> Result<()> {
            self.log("restart");
            if self.heal_on_restart {
                self.healthy.store(true, Ordering::SeqCst);
            }
            Ok(())
        }

        async fn request_resource_reclamation(&self) -> Result<()> {
            self.log("reclaim");
            if self.fail_reclaim {
                return Err(anyhow!("reclamation unavailable"));
            }
            Ok(())
        }

        async fn force_stop(&self, component: ComponentId) -> Result<()> {
            self.log(&format!("stop:{component}"));
            if self.fail_force_stop {
                return Err(anyhow!("already stopped"));
            }
            Ok(())
        }

        async fn broadcast_system_restart(&self) -> Result<()> {
            self.log("broadcast");
            Ok(())
        }

        async fn schedule_deferred_wake(&self, _delay: Duration) -> Result<()> {
            self.log("wake");
            Ok(())
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedCapability {
        async fn probe(&self) -> Result<bool> {
            Ok(self.healthy.load(Ordering::SeqCst))
        }
    }

    fn as_collaborators(
        cap: Arc<ScriptedCapability>,
    ) -> (Arc<dyn ActionInterface>, Arc<dyn HealthProbe>) {
        (cap.clone(), cap)
    }

    #[tokio::test(start_paused = true)]
    async fn gentle_plan_recovers_when_restart_heals() {
        let cap = Arc::new(ScriptedCapability {
            heal_on_restart: true,
            ..ScriptedCapability::default()
        });
        let (actions, probe) = as_collaborators(cap.clone());

        let plan = RecoveryPlan::for_tier(Tier::Gentle);
        let outcome = execute_plan(&plan, &actions, &probe, &CancellationToken::new()).await;

        assert_eq!(outcome, ExecutionOutcome::Recovered);
        assert_eq!(cap.calls(), vec!["restart"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_step_ends_attempt_without_reaching_later_steps() {
        let cap = Arc::new(ScriptedCapability {
            fail_reclaim: true,
            ..ScriptedCapability::default()
        });
        let (actions, probe) = as_collaborators(cap.clone());

        let plan = RecoveryPlan::for_tier(Tier::Moderate);
        let outcome = execute_plan(&plan, &actions, &probe, &CancellationToken::new()).await;

        assert_eq!(outcome, ExecutionOutcome::NotRecovered);
        // Reclaim is the first MODERATE step; the stop/restart never ran.
        assert_eq!(cap.calls(), vec!["reclaim"]);
    }

    #[tokio::test(start_paused = true)]
    async fn force_stop_errors_are_ignored() {
        let cap = Arc::new(ScriptedCapability {
            fail_force_stop: true,
            healthy: AtomicBool::new(true),
            ..ScriptedCapability::default()
        });
        let (actions, probe) = as_collaborators(cap.clone());

        let plan = RecoveryPlan::for_tier(Tier::Aggressive);
        let outcome = execute_plan(&plan, &actions, &probe, &CancellationToken::new()).await;

        assert_eq!(outcome, ExecutionOutcome::Recovered);
        assert!(cap.calls().contains(&"broadcast".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_wait_aborts_early() {
        let cap = Arc::new(ScriptedCapability::default());
        let (actions, probe) = as_collaborators(cap.clone());
        let cancel = CancellationToken::new();

        let plan = RecoveryPlan::for_tier(Tier::Nuclear);
        let exec = {
            let cancel = cancel.clone();
            tokio::spawn(async move { execute_plan(&plan, &actions, &probe, &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        let outcome = exec.await.unwrap();

        assert_eq!(outcome, ExecutionOutcome::Aborted);
        // Aborted inside the first stop round; the wake was never armed.
        assert!(!cap.calls().contains(&"wake".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn unhealthy_reprobe_means_not_recovered() {
        let cap = Arc::new(ScriptedCapability::default());
        let (actions, probe) = as_collaborators(cap);

        let plan = RecoveryPlan::for_tier(Tier::Gentle);
        let outcome = execute_plan(&plan, &actions, &probe, &CancellationToken::new()).await;

        assert_eq!(outcome, ExecutionOutcome::NotRecovered);
    }
}
