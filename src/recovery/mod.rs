//! Autonomous recovery core.
//!
//! `RecoveryController` is the synchronous state machine (seeding, healthy
//! and unhealthy transitions, attempt accounting, backoff, escalation,
//! persistence). `plan` describes each tier as an ordered step list and
//! `executor` runs a plan on its own task with cancellation checkpoints at
//! every wait. The async supervisor in [`crate::supervisor`] is the only
//! writer that drives the controller.

pub mod controller;
pub mod executor;
pub mod plan;
pub mod state;

pub use controller::RecoveryController;
pub use executor::{execute_plan, ExecutionOutcome};
pub use plan::{RecoveryPlan, RecoveryStep};
pub use state::{RecoveryReason, RecoverySnapshot, RecoveryState};
