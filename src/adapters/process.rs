//! Child-process capability adapter.
//!
//! Binds the collaborator contract to an arbitrary command line: the
//! monitored capability is a child process that the supervisor respawns,
//! kills and probes. An optional probe command (run via `sh -c`, exit 0 =
//! healthy) refines liveness beyond "the pid exists".
//!
//! The deferred wake is a detached `sh -c 'sleep N; exec <command>'`: it is
//! not reparented to us and keeps running if this process dies, which is
//! what makes the NUCLEAR tier's dead-man's switch durable.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::actions::{ActionInterface, ComponentId};
use crate::health::HealthProbe;

/// A supervised child command implementing both the probe and the actions.
pub struct ProcessCapability {
    /// Program and arguments of the supervised command.
    command: Vec<String>,
    /// Optional shell probe; exit status 0 means healthy.
    probe_command: Option<String>,
    child: Mutex<Option<Child>>,
}

impl ProcessCapability {
    /// `command` is the program followed by its arguments; must be non-empty.
    pub fn new(command: Vec<String>, probe_command: Option<String>) -> Result<Self> {
        if command.is_empty() {
            anyhow::bail!("supervised command must not be empty");
        }
        Ok(Self {
            command,
            probe_command,
            child: Mutex::new(None),
        })
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        cmd
    }

    /// Kill any current child and spawn a fresh one.
    async fn respawn(&self) -> Result<()> {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            // Best effort; the old child may already be gone.
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        let child = self
            .build_command()
            .spawn()
            .with_context(|| format!("failed to spawn {:?}", self.command[0]))?;
        info!(pid = child.id(), command = %self.command[0], "Capability process spawned");
        *guard = Some(child);
        Ok(())
    }

    /// Spawn only if no live child exists. Makes restart signals idempotent.
    async fn ensure_running(&self) -> Result<()> {
        {
            let mut guard = self.child.lock().await;
            if let Some(child) = guard.as_mut() {
                if child.try_wait()?.is_none() {
                    debug!("Capability already running, restart signal is a no-op");
                    return Ok(());
                }
            }
        }
        self.respawn().await
    }

    /// Shell-quote one argument for the deferred-wake command line.
    fn shell_quote(arg: &str) -> String {
        format!("'{}'", arg.replace('\'', r#"'\''"#))
    }
}

#[async_trait]
impl HealthProbe for ProcessCapability {
    async fn probe(&self) -> Result<bool> {
        {
            let mut guard = self.child.lock().await;
            match guard.as_mut() {
                None => return Ok(false),
                Some(child) => {
                    if child.try_wait().context("failed to poll child status")?.is_some() {
                        return Ok(false);
                    }
                }
            }
        }

        // Process is alive; run the responsiveness probe if configured.
        let Some(probe_cmd) = &self.probe_command else {
            return Ok(true);
        };
        let status = Command::new("sh")
            .arg("-c")
            .arg(probe_cmd)
            .status()
            .await
            .context("probe command failed to run")?;
        Ok(status.success())
    }

    fn probe_name(&self) -> &'static str {
        "process"
    }
}

#[async_trait]
impl ActionInterface for ProcessCapability {
    async fn request_graceful_restart(&self) -> Result<()> {
        self.respawn().await
    }

    async fn request_resource_reclamation(&self) -> Result<()> {
        // A generic child process exposes no reclamation hook; the request
        // is acknowledged so tier sequences stay uniform across adapters.
        debug!("Resource reclamation requested (no-op for child processes)");
        Ok(())
    }

    async fn force_stop(&self, component: ComponentId) -> Result<()> {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            if let Err(e) = child.start_kill() {
                debug!(%component, "Kill failed (child likely exited): {e}");
            }
            let _ = child.wait().await;
        }
        *guard = None;
        Ok(())
    }

    async fn broadcast_system_restart(&self) -> Result<()> {
        self.ensure_running().await
    }

    async fn schedule_deferred_wake(&self, delay: Duration) -> Result<()> {
        let quoted: Vec<String> = self.command.iter().map(|a| Self::shell_quote(a)).collect();
        let script = format!("sleep {}; exec {}", delay.as_secs().max(1), quoted.join(" "));

        let child = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .spawn()
            .context("failed to spawn deferred wake")?;
        // Deliberately not tracked: the wake must outlive this process.
        warn!(
            pid = child.id(),
            delay_s = delay.as_secs().max(1),
            "Deferred wake armed"
        );
        drop(child);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_command() {
        assert!(ProcessCapability::new(Vec::new(), None).is_err());
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(ProcessCapability::shell_quote("plain"), "'plain'");
        assert_eq!(
            ProcessCapability::shell_quote("it's"),
            r#"'it'\''s'"#
        );
    }

    #[tokio::test]
    async fn probe_is_false_before_first_spawn() {
        let cap = ProcessCapability::new(vec!["true".to_string()], None).unwrap();
        assert!(!cap.probe().await.unwrap());
    }

    #[tokio::test]
    async fn restart_spawns_and_probe_sees_exit() {
        // `sleep 30` stays alive long enough to be observed, then killed.
        let cap =
            ProcessCapability::new(vec!["sleep".to_string(), "30".to_string()], None).unwrap();
        cap.request_graceful_restart().await.unwrap();
        assert!(cap.probe().await.unwrap());

        cap.force_stop(ComponentId::Host).await.unwrap();
        assert!(!cap.probe().await.unwrap());
    }

    #[tokio::test]
    async fn broadcast_is_idempotent_while_alive() {
        let cap =
            ProcessCapability::new(vec!["sleep".to_string(), "30".to_string()], None).unwrap();
        cap.broadcast_system_restart().await.unwrap();
        let first_pid = cap.child.lock().await.as_ref().and_then(Child::id);

        cap.broadcast_system_restart().await.unwrap();
        let second_pid = cap.child.lock().await.as_ref().and_then(Child::id);
        assert_eq!(first_pid, second_pid);

        cap.force_stop(ComponentId::Host).await.unwrap();
    }

    #[tokio::test]
    async fn probe_command_decides_responsiveness() {
        let cap = ProcessCapability::new(
            vec!["sleep".to_string(), "30".to_string()],
            Some("exit 1".to_string()),
        )
        .unwrap();
        cap.request_graceful_restart().await.unwrap();
        assert!(!cap.probe().await.unwrap());
        cap.force_stop(ComponentId::Host).await.unwrap();
    }
}
