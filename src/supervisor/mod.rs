//! Supervisor — single-writer actor driving the recovery controller.
//!
//! One owning task exclusively holds the `RecoveryController`; the timer
//! sources are reduced to `select!` branches consumed serially, so the
//! recovery state is never mutated concurrently:
//!
//! - the health-check schedule: a single re-armed sleep of the current
//!   backoff interval (the one authoritative schedule; there is no second
//!   fixed cadence that could double-check),
//! - the deep-check interval: resource pressure audit plus the prolonged
//!   unhealthy threshold,
//! - an event channel carrying tier-execution outcomes back from the
//!   spawned executor task,
//! - a command channel for status queries.
//!
//! Tier execution is a multi-second operation and runs on its own spawned
//! task so the deep timer and status queries are never starved; while an
//! attempt is in flight, new triggers are suppressed. `stop()` cancels the
//! shared token: in-flight execution aborts at its next wait checkpoint and
//! the actor persists final state before exiting.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actions::ActionInterface;
use crate::config::SupervisorConfig;
use crate::health::{HealthProbe, ResourceGauge};
use crate::policy::Tier;
use crate::recovery::{
    execute_plan, ExecutionOutcome, RecoveryController, RecoveryPlan, RecoveryReason,
    RecoverySnapshot,
};
use crate::store::StatStore;

// ============================================================================
// Commands & events
// ============================================================================

/// Commands accepted by the running actor.
#[derive(Debug)]
enum SupervisorCommand {
    /// Snapshot the recovery state.
    Status {
        response_tx: oneshot::Sender<RecoverySnapshot>,
    },
}

/// Internal events fed back into the actor loop.
enum ActorEvent {
    /// A spawned tier execution finished.
    AttemptFinished { tier: Tier, outcome: ExecutionOutcome },
}

// ============================================================================
// Supervisor surface
// ============================================================================

struct Running {
    cancel: CancellationToken,
    cmd_tx: mpsc::Sender<SupervisorCommand>,
    join: JoinHandle<()>,
}

/// Self-healing supervisor for one monitored capability.
///
/// Construct once with its collaborators, then `start()`/`stop()`. Both are
/// idempotent; the persisted stats outlive every start/stop cycle.
pub struct Supervisor {
    config: SupervisorConfig,
    probe: Arc<dyn HealthProbe>,
    actions: Arc<dyn ActionInterface>,
    store: Arc<dyn StatStore>,
    gauge: Arc<dyn ResourceGauge>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        probe: Arc<dyn HealthProbe>,
        actions: Arc<dyn ActionInterface>,
        store: Arc<dyn StatStore>,
        gauge: Arc<dyn ResourceGauge>,
    ) -> Self {
        Self {
            config,
            probe,
            actions,
            store,
            gauge,
            running: tokio::sync::Mutex::new(None),
        }
    }

    /// Start the supervision loops. Idempotent; a second call while running
    /// is a logged no-op, so timers are never double-armed.
    pub async fn start(&self) {
        let mut guard = self.running.lock().await;
        if guard.is_some() {
            warn!("Supervisor already running, ignoring start()");
            return;
        }

        let mut controller = RecoveryController::seed(self.config.clone(), self.store.clone());
        controller.activate();

        let cancel = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(4);

        let actor = SupervisorActor {
            config: self.config.clone(),
            probe: self.probe.clone(),
            actions: self.actions.clone(),
            gauge: self.gauge.clone(),
            controller,
            cancel: cancel.clone(),
            cmd_rx,
            event_tx,
            event_rx,
            attempt_in_flight: false,
        };

        info!(
            probe = self.probe.probe_name(),
            actions = self.actions.backend_name(),
            store = self.store.backend_name(),
            base_interval_ms = self.config.base_interval_ms,
            deep_check_interval_ms = self.config.deep_check_interval_ms,
            "Supervisor starting"
        );

        let join = tokio::spawn(actor.run());
        *guard = Some(Running {
            cancel,
            cmd_tx,
            join,
        });
    }

    /// Stop the supervision loops and persist final state. Idempotent.
    pub async fn stop(&self) {
        let mut guard = self.running.lock().await;
        let Some(running) = guard.take() else {
            debug!("Supervisor not running, ignoring stop()");
            return;
        };

        running.cancel.cancel();
        if running.join.await.is_err() {
            warn!("Supervisor actor task panicked during shutdown");
        }
        info!("Supervisor stopped");
    }

    /// Whether the actor is currently running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Snapshot the live recovery state. Fails when the supervisor is
    /// stopped or stopping.
    pub async fn status(&self) -> Result<RecoverySnapshot> {
        let cmd_tx = {
            let guard = self.running.lock().await;
            let running = guard.as_ref().context("Supervisor is not running")?;
            running.cmd_tx.clone()
        };

        let (response_tx, response_rx) = oneshot::channel();
        cmd_tx
            .send(SupervisorCommand::Status { response_tx })
            .await
            .context("Supervisor actor channel closed")?;
        response_rx.await.context("Response channel closed")
    }
}

// ============================================================================
// Actor
// ============================================================================

struct SupervisorActor {
    config: SupervisorConfig,
    probe: Arc<dyn HealthProbe>,
    actions: Arc<dyn ActionInterface>,
    gauge: Arc<dyn ResourceGauge>,
    controller: RecoveryController,
    cancel: CancellationToken,
    cmd_rx: mpsc::Receiver<SupervisorCommand>,
    event_tx: mpsc::Sender<ActorEvent>,
    event_rx: mpsc::Receiver<ActorEvent>,
    attempt_in_flight: bool,
}

impl SupervisorActor {
    async fn run(mut self) {
        // First check fires immediately; afterwards the backoff-derived
        // interval is the one schedule that re-arms it.
        let mut next_check_at = Instant::now();

        let deep_period = Duration::from_millis(self.config.deep_check_interval_ms.max(1));
        let mut deep_ticks =
            tokio::time::interval_at(Instant::now() + deep_period, deep_period);
        deep_ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,

                () = tokio::time::sleep_until(next_check_at) => {
                    self.run_health_check().await;
                    next_check_at = Instant::now() + self.controller.next_check_delay();
                }

                _ = deep_ticks.tick() => {
                    self.run_deep_check().await;
                }

                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                    next_check_at = Instant::now() + self.controller.next_check_delay();
                }

                Some(cmd) = self.cmd_rx.recv() => {
                    self.handle_command(cmd);
                }
            }
        }

        self.shutdown().await;
    }

    fn handle_command(&mut self, cmd: SupervisorCommand) {
        match cmd {
            SupervisorCommand::Status { response_tx } => {
                let _ = response_tx.send(self.controller.snapshot());
            }
        }
    }

    /// One fast-loop cycle: probe, classify, maybe trigger recovery.
    async fn run_health_check(&mut self) {
        if self.attempt_in_flight {
            debug!("Recovery attempt in flight, skipping health check");
            return;
        }

        let now = Instant::now();
        match self.probe.probe().await {
            Ok(true) => {
                debug!(probe = self.probe.probe_name(), "Capability healthy");
                self.controller.on_healthy(now);
            }
            Ok(false) => {
                let elapsed = self.controller.unhealthy_elapsed(now);
                debug!(
                    probe = self.probe.probe_name(),
                    unhealthy_for_ms = elapsed.as_millis() as u64,
                    "Capability unhealthy"
                );
                if let Some(reason) = self.controller.on_unhealthy(elapsed) {
                    self.trigger_recovery(reason);
                }
            }
            Err(e) => {
                // A broken probe must never stall the loop: classify as
                // unhealthy and recover immediately.
                warn!(probe = self.probe.probe_name(), "Health check raised: {e:#}");
                self.trigger_recovery(RecoveryReason::HealthCheckException);
            }
        }
    }

    /// One deep-check cycle: resource pressure audit, then the prolonged
    /// unhealthy threshold, independent of the fast loop's grace span.
    async fn run_deep_check(&mut self) {
        match self.gauge.usage_ratio() {
            Ok(ratio) if ratio > self.config.memory_pressure_threshold => {
                warn!(
                    usage = format!("{:.0}%", ratio * 100.0),
                    "Resource pressure high, requesting reclamation"
                );
                if let Err(e) = self.actions.request_resource_reclamation().await {
                    warn!("Resource reclamation request failed: {e:#}");
                }
            }
            Ok(ratio) => {
                debug!(usage = format!("{:.0}%", ratio * 100.0), "Deep check: pressure ok");
            }
            Err(e) => {
                debug!("Resource gauge unavailable: {e:#}");
            }
        }

        if self.attempt_in_flight {
            return;
        }

        let elapsed = self.controller.unhealthy_elapsed(Instant::now());
        if self.controller.deep_check_due(elapsed) {
            warn!(
                unhealthy_for_ms = elapsed.as_millis() as u64,
                "Deep check: prolonged unhealthy state"
            );
            self.trigger_recovery(RecoveryReason::DeepCheckProlongedUnhealthy);
        }
    }

    /// Account the attempt and spawn the tier execution on its own task.
    fn trigger_recovery(&mut self, reason: RecoveryReason) {
        let Some(tier) = self.controller.begin_attempt(reason) else {
            return;
        };

        if tier == Tier::Nuclear {
            self.controller.set_deep_recovery(true);
        }

        self.attempt_in_flight = true;

        let plan = RecoveryPlan::for_tier(tier);
        let actions = self.actions.clone();
        let probe = self.probe.clone();
        let cancel = self.cancel.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            // The sequence runs on its own task so a panicking collaborator
            // unwinds there, surfaces as a JoinError here, and still reports
            // an outcome. Otherwise `attempt_in_flight` would never clear
            // and all supervision would stop.
            let sequence =
                tokio::spawn(async move { execute_plan(&plan, &actions, &probe, &cancel).await });
            let outcome = match sequence.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(tier = %tier, "Tier execution panicked: {e}");
                    ExecutionOutcome::NotRecovered
                }
            };
            // Send failure means the actor is gone; the outcome is moot.
            let _ = event_tx
                .send(ActorEvent::AttemptFinished { tier, outcome })
                .await;
        });
    }

    fn handle_event(&mut self, event: ActorEvent) {
        match event {
            ActorEvent::AttemptFinished { tier, outcome } => {
                self.attempt_in_flight = false;
                if tier == Tier::Nuclear {
                    self.controller.set_deep_recovery(false);
                }

                match outcome {
                    ExecutionOutcome::Recovered => {
                        self.controller.complete_attempt(true, Instant::now());
                    }
                    ExecutionOutcome::NotRecovered => {
                        self.controller.complete_attempt(false, Instant::now());
                    }
                    ExecutionOutcome::Aborted => {
                        debug!(tier = %tier, "Recovery attempt aborted by shutdown");
                    }
                }
            }
        }
    }

    async fn shutdown(mut self) {
        self.controller.deactivate();
        self.controller.set_deep_recovery(false);
        self.controller.persist();

        // Drain a straggling executor outcome so its task can finish.
        if self.attempt_in_flight {
            let _ = tokio::time::timeout(Duration::from_secs(1), self.event_rx.recv()).await;
        }

        info!(
            total_attempts = self.controller.state().total_attempts,
            successful_recoveries = self.controller.state().successful_recoveries,
            "Supervisor actor stopped"
        );
    }
}
