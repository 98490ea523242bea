//! Escalation ladder for recovery tiers.
//!
//! Four strictly ordered tiers, each more invasive than the last. The
//! transition table is total and timing-independent: `escalate` is absorbing
//! at `Nuclear`, `deescalate` at `Gentle`. Startup seeding maps the
//! historical success ratio onto an initial tier, so a supervisor that has
//! been struggling resumes closer to the heavy artillery.

use serde::{Deserialize, Serialize};

/// Remediation tier, ordered from least to most invasive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    /// Graceful restart of the capability's host.
    Gentle,
    /// Resource reclamation plus a stop/start cycle of the host.
    Moderate,
    /// Stop everything, reclaim hard, broadcast a system-wide restart.
    Aggressive,
    /// Full teardown with a durable deferred wake as a dead-man's switch.
    Nuclear,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Gentle => write!(f, "GENTLE"),
            Tier::Moderate => write!(f, "MODERATE"),
            Tier::Aggressive => write!(f, "AGGRESSIVE"),
            Tier::Nuclear => write!(f, "NUCLEAR"),
        }
    }
}

impl Tier {
    /// One rung up the ladder. `Nuclear` stays `Nuclear`.
    pub const fn escalate(self) -> Self {
        match self {
            Tier::Gentle => Tier::Moderate,
            Tier::Moderate => Tier::Aggressive,
            Tier::Aggressive | Tier::Nuclear => Tier::Nuclear,
        }
    }

    /// One rung down the ladder. `Gentle` stays `Gentle`.
    pub const fn deescalate(self) -> Self {
        match self {
            Tier::Nuclear => Tier::Aggressive,
            Tier::Aggressive => Tier::Moderate,
            Tier::Moderate | Tier::Gentle => Tier::Gentle,
        }
    }

    /// Initial tier from the lifetime success ratio.
    ///
    /// Thresholds: `>0.8` Gentle, `>0.5` Moderate, `>0.2` Aggressive,
    /// otherwise Nuclear.
    pub fn from_success_rate(rate: f64) -> Self {
        if rate > 0.8 {
            Tier::Gentle
        } else if rate > 0.5 {
            Tier::Moderate
        } else if rate > 0.2 {
            Tier::Aggressive
        } else {
            Tier::Nuclear
        }
    }

    /// Seed from persisted lifetime counters. A history with zero attempts
    /// counts as a perfect record.
    pub fn seed(total_attempts: u64, successful_recoveries: u64) -> Self {
        if total_attempts == 0 {
            return Tier::Gentle;
        }
        Self::from_success_rate(successful_recoveries as f64 / total_attempts as f64)
    }
}
