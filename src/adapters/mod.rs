//! Concrete collaborator implementations.
//!
//! The supervisor core only sees the `HealthProbe`, `ActionInterface` and
//! `ResourceGauge` traits; these adapters bind them to a real child process
//! and the local machine.

pub mod meminfo;
pub mod process;

pub use meminfo::MeminfoGauge;
pub use process::ProcessCapability;
