//! vigil: self-healing supervisor for a single monitored capability.
//!
//! Keeps an externally-defined capability continuously operational despite
//! silent failures by pairing two health loops with an escalating recovery
//! controller that learns across process restarts.
//!
//! ## Architecture
//!
//! - **Policy**: pure backoff arithmetic and the four-tier escalation table
//! - **Recovery**: the seeded state machine, per-tier remediation plans and
//!   their executor
//! - **Supervisor**: a single-writer actor consuming timer sources serially,
//!   so recovery state is never mutated concurrently
//! - **Store**: persisted lifetime stats that seed the initial tier
//! - **Adapters**: child-process and `/proc/meminfo` bindings of the
//!   collaborator traits

pub mod actions;
pub mod adapters;
pub mod config;
pub mod health;
pub mod policy;
pub mod recovery;
pub mod store;
pub mod supervisor;

// Re-export the surface a typical embedder needs.
pub use actions::{ActionInterface, ComponentId};
pub use config::SupervisorConfig;
pub use health::{HealthProbe, ResourceGauge};
pub use policy::{BackoffPolicy, Tier};
pub use recovery::{RecoveryReason, RecoverySnapshot};
pub use store::{InMemoryStatStore, SledStatStore, StatStore, StatsRecord, StoreError};
pub use supervisor::Supervisor;
