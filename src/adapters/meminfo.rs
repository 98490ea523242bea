//! Memory-pressure gauge backed by `/proc/meminfo`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::health::ResourceGauge;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Reads `MemTotal`/`MemAvailable` and reports used ratio. Returns errors
/// on non-Linux hosts; the deep check treats an unavailable gauge as
/// "no pressure signal".
pub struct MeminfoGauge {
    path: PathBuf,
}

impl Default for MeminfoGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl MeminfoGauge {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(MEMINFO_PATH),
        }
    }

    #[cfg(test)]
    fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn field_kb(contents: &str, field: &str) -> Option<u64> {
        contents
            .lines()
            .find(|line| line.starts_with(field))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    }
}

impl ResourceGauge for MeminfoGauge {
    fn usage_ratio(&self) -> Result<f64> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {:?}", self.path))?;

        let total =
            Self::field_kb(&contents, "MemTotal:").context("MemTotal missing from meminfo")?;
        let available = Self::field_kb(&contents, "MemAvailable:")
            .context("MemAvailable missing from meminfo")?;

        if total == 0 {
            anyhow::bail!("MemTotal is zero");
        }
        Ok(1.0 - (available as f64 / total as f64))
    }
}
