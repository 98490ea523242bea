//! Pure recovery policy — backoff arithmetic and the tier escalation table.
//!
//! Everything in this module is timing-free and side-effect-free so the
//! controller's transition rules can be unit-tested in isolation.

pub mod backoff;
pub mod escalation;

pub use backoff::BackoffPolicy;
pub use escalation::Tier;
