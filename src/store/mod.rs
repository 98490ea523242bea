//! StatStore — pluggable persistence for lifetime recovery statistics.
//!
//! Abstracts the durable key→value backend so different stores can be
//! swapped without touching controller code:
//! - `InMemoryStatStore`: in-memory store for testing and minimal deployments
//! - `SledStatStore`: durable sled-backed store
//!
//! Persistence is strictly best-effort: load failures fall back to a fresh
//! record, save failures are swallowed by the caller with a warning. Lost
//! stats only degrade future tier seeding, they never block operation.

mod sled_store;

pub use sled_store::SledStatStore;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime recovery statistics, persisted across process restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Recovery attempts ever triggered. Never reset.
    pub total_attempts: u64,
    /// Attempts whose verifying re-probe came back healthy. Never reset.
    pub successful_recoveries: u64,
    /// Wall-clock instant of the last confirmed-healthy observation.
    pub last_healthy_at: DateTime<Utc>,
}

impl StatsRecord {
    /// A record for a capability with no recovery history.
    pub fn fresh() -> Self {
        Self {
            total_attempts: 0,
            successful_recoveries: 0,
            last_healthy_at: Utc::now(),
        }
    }

    /// Lifetime success ratio. A history with zero attempts counts as perfect.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            1.0
        } else {
            self.successful_recoveries as f64 / self.total_attempts as f64
        }
    }
}

/// Stat persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Trait for pluggable stat persistence backends.
///
/// Implementations must be thread-safe (`Send + Sync`) for shared access
/// across async tasks.
pub trait StatStore: Send + Sync {
    /// Load the persisted record. `Ok(None)` when no record exists yet;
    /// corrupt records surface as `Err` and are defaulted by the caller.
    fn load(&self) -> Result<Option<StatsRecord>, StoreError>;

    /// Persist the record, replacing any previous one.
    fn save(&self, record: &StatsRecord) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// In-memory stat store for testing and minimal deployments.
///
/// Not durable — data lost on restart. Counts saves so tests can assert
/// that inactive supervisors never write.
#[derive(Default)]
pub struct InMemoryStatStore {
    record: std::sync::RwLock<Option<StatsRecord>>,
    saves: AtomicU64,
}

impl InMemoryStatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a record, as if a previous process had saved it.
    pub fn with_record(record: StatsRecord) -> Self {
        Self {
            record: std::sync::RwLock::new(Some(record)),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of completed `save` calls.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StatStore for InMemoryStatStore {
    fn load(&self) -> Result<Option<StatsRecord>, StoreError> {
        let guard = self
            .record
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, record: &StatsRecord) -> Result<(), StoreError> {
        let mut guard = self
            .record
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        *guard = Some(record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_has_perfect_rate() {
        let record = StatsRecord::fresh();
        assert_eq!(record.total_attempts, 0);
        assert!((record.success_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn success_rate_is_a_plain_ratio() {
        let record = StatsRecord {
            total_attempts: 10,
            successful_recoveries: 3,
            last_healthy_at: Utc::now(),
        };
        assert!((record.success_rate() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemoryStatStore::new();
        assert!(store.load().unwrap().is_none());

        let record = StatsRecord {
            total_attempts: 7,
            successful_recoveries: 4,
            last_healthy_at: Utc::now(),
        };
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), Some(record));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn trait_object() {
        let store: Box<dyn StatStore> = Box::new(InMemoryStatStore::new());
        assert_eq!(store.backend_name(), "InMemory");
        store.save(&StatsRecord::fresh()).unwrap();
        assert!(store.load().unwrap().is_some());
    }
}
