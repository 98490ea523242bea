//! Remediation collaborator contract.
//!
//! Each recovery tier is a bounded sequence of these primitives. All of them
//! are best-effort from the supervisor's point of view: an error from any
//! action marks the attempt as not recovered but is never propagated past
//! the tier-execution boundary.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Components of the monitored capability that can be force-stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// The capability's host process.
    Host,
    /// The capability itself (worker/service component).
    Capability,
}

impl ComponentId {
    /// All known components, in stop order.
    pub const ALL: [ComponentId; 2] = [ComponentId::Host, ComponentId::Capability];
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentId::Host => write!(f, "host"),
            ComponentId::Capability => write!(f, "capability"),
        }
    }
}

/// Remediation primitives invoked by the tier sequences.
///
/// Implementations must be thread-safe (`Send + Sync`) for shared access
/// across the actor task and spawned tier executions.
#[async_trait]
pub trait ActionInterface: Send + Sync {
    /// Ask the capability's host to restart gracefully. Fire-and-forget.
    async fn request_graceful_restart(&self) -> Result<()>;

    /// Ask the platform to reclaim resources (memory, handles). Fire-and-forget.
    async fn request_resource_reclamation(&self) -> Result<()>;

    /// Stop one component. Best-effort; callers ignore errors.
    async fn force_stop(&self, component: ComponentId) -> Result<()>;

    /// Idempotent system-wide restart signal.
    async fn broadcast_system_restart(&self) -> Result<()>;

    /// Arm a durable timer that re-issues the restart broadcast after
    /// `delay`, even if the current process dies before it fires.
    async fn schedule_deferred_wake(&self, delay: Duration) -> Result<()>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str {
        "unnamed"
    }
}
