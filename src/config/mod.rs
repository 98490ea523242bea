//! Supervisor configuration — all tunables as operator-editable TOML values.
//!
//! Every field carries a `#[serde(default)]` matching the built-in
//! constants, so a missing or partial config file changes nothing.
//!
//! ## Loading order
//!
//! 1. Explicit path passed to `SupervisorConfig::load`
//! 2. `VIGIL_CONFIG` environment variable (path to TOML file)
//! 3. `vigil.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The config is plain data handed to `Supervisor::new` — there is no
//! process-global accessor. One supervisor, one config.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::policy::backoff::{BACKOFF_MULTIPLIER, BASE_INTERVAL_MS, MAX_INTERVAL_MS};
use crate::policy::BackoffPolicy;

/// Environment variable naming the config file path.
pub const CONFIG_ENV_VAR: &str = "VIGIL_CONFIG";

/// Default config file searched in the working directory.
pub const CONFIG_FILE: &str = "vigil.toml";

fn default_base_interval_ms() -> u64 {
    BASE_INTERVAL_MS
}
fn default_max_interval_ms() -> u64 {
    MAX_INTERVAL_MS
}
fn default_backoff_multiplier() -> f64 {
    BACKOFF_MULTIPLIER
}
fn default_max_attempts_per_tier() -> u32 {
    3
}
fn default_unhealthy_grace_ms() -> u64 {
    30_000
}
fn default_deep_check_interval_ms() -> u64 {
    60_000
}
fn default_deep_unhealthy_threshold_ms() -> u64 {
    300_000
}
fn default_memory_pressure_threshold() -> f64 {
    0.85
}

/// Tunables for one supervised capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Check interval floor and the healthy steady-state cadence (ms).
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,

    /// Check interval ceiling under sustained failure (ms).
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Backoff growth/shrink factor.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Consecutive failed attempts at a tier before escalating.
    #[serde(default = "default_max_attempts_per_tier")]
    pub max_attempts_per_tier: u32,

    /// Unhealthy span tolerated before the fast loop triggers recovery (ms).
    #[serde(default = "default_unhealthy_grace_ms")]
    pub unhealthy_grace_ms: u64,

    /// Cadence of the deep-check loop (ms).
    #[serde(default = "default_deep_check_interval_ms")]
    pub deep_check_interval_ms: u64,

    /// Unhealthy span at which the deep check triggers recovery (ms).
    #[serde(default = "default_deep_unhealthy_threshold_ms")]
    pub deep_unhealthy_threshold_ms: u64,

    /// Resource usage ratio above which the deep check requests reclamation.
    #[serde(default = "default_memory_pressure_threshold")]
    pub memory_pressure_threshold: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts_per_tier: default_max_attempts_per_tier(),
            unhealthy_grace_ms: default_unhealthy_grace_ms(),
            deep_check_interval_ms: default_deep_check_interval_ms(),
            deep_unhealthy_threshold_ms: default_deep_unhealthy_threshold_ms(),
            memory_pressure_threshold: default_memory_pressure_threshold(),
        }
    }
}

impl SupervisorConfig {
    /// Load configuration following the documented search order. Parse
    /// failures are logged and fall back to defaults rather than aborting —
    /// a supervisor with default tunables beats no supervisor.
    pub fn load(explicit_path: Option<&Path>) -> Self {
        let candidate = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(Into::into))
            .or_else(|| {
                let local = Path::new(CONFIG_FILE);
                local.exists().then(|| local.to_path_buf())
            });

        let Some(path) = candidate else {
            info!("No config file found, using built-in defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {:?}: {} — using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {:?}: {} — using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Range-check the tunables. Returns human-readable warnings; the
    /// config stays usable because `BackoffPolicy` repairs degenerate
    /// interval bounds itself.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.base_interval_ms == 0 {
            warnings.push("base_interval_ms is 0 — checks would spin".to_string());
        }
        if self.base_interval_ms > self.max_interval_ms {
            warnings.push(format!(
                "base_interval_ms ({}) exceeds max_interval_ms ({}) — bounds will be swapped",
                self.base_interval_ms, self.max_interval_ms
            ));
        }
        if self.backoff_multiplier <= 1.0 {
            warnings.push(format!(
                "backoff_multiplier ({}) must be > 1.0 — default {} will be used",
                self.backoff_multiplier, BACKOFF_MULTIPLIER
            ));
        }
        if self.max_attempts_per_tier == 0 {
            warnings.push("max_attempts_per_tier is 0 — every failure would escalate".to_string());
        }
        if !(0.0..=1.0).contains(&self.memory_pressure_threshold) {
            warnings.push(format!(
                "memory_pressure_threshold ({}) outside [0.0, 1.0]",
                self.memory_pressure_threshold
            ));
        }
        if self.deep_unhealthy_threshold_ms <= self.unhealthy_grace_ms {
            warnings.push(format!(
                "deep_unhealthy_threshold_ms ({}) at or below unhealthy_grace_ms ({}) — deep check would never fire first",
                self.deep_unhealthy_threshold_ms, self.unhealthy_grace_ms
            ));
        }
        if self.deep_check_interval_ms == 0 {
            warnings.push("deep_check_interval_ms is 0 — deep checks would spin".to_string());
        }

        warnings
    }

    /// Backoff policy derived from the interval tunables.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.base_interval_ms,
            self.max_interval_ms,
            self.backoff_multiplier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = SupervisorConfig::default();
        assert_eq!(config.base_interval_ms, 5_000);
        assert_eq!(config.max_interval_ms, 300_000);
        assert_eq!(config.max_attempts_per_tier, 3);
        assert_eq!(config.unhealthy_grace_ms, 30_000);
        assert_eq!(config.deep_check_interval_ms, 60_000);
        assert_eq!(config.deep_unhealthy_threshold_ms, 300_000);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config: SupervisorConfig = toml::from_str(
            r#"
base_interval_ms = 1000
max_attempts_per_tier = 5
"#,
        )
        .unwrap();
        assert_eq!(config.base_interval_ms, 1_000);
        assert_eq!(config.max_attempts_per_tier, 5);
        assert_eq!(config.max_interval_ms, 300_000);
        assert!((config.backoff_multiplier - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_values_produce_warnings() {
        let config = SupervisorConfig {
            base_interval_ms: 500_000,
            backoff_multiplier: 0.5,
            memory_pressure_threshold: 1.5,
            ..SupervisorConfig::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("backoff_multiplier")));
    }

    #[test]
    fn backoff_policy_uses_config_bounds() {
        let config = SupervisorConfig {
            base_interval_ms: 100,
            max_interval_ms: 1_000,
            backoff_multiplier: 2.0,
            ..SupervisorConfig::default()
        };
        let policy = config.backoff();
        assert_eq!(policy.grow(100), 200);
        assert_eq!(policy.grow(900), 1_000);
        assert_eq!(policy.shrink(150), 100);
    }
}
