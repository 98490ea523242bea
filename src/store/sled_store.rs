//! Durable stat persistence using Sled DB.
//!
//! One tree, one key — the record is tiny and rewritten whole on every
//! save. No explicit flush per write; sled's background flushing is durable
//! enough for statistics whose loss only degrades future tier seeding.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::{StatStore, StatsRecord, StoreError};

const STATS_TREE: &str = "recovery_stats";
const STATS_KEY: &[u8] = b"stats";

/// Sled-backed stat store.
#[derive(Clone)]
pub struct SledStatStore {
    db: Arc<sled::Db>,
}

impl SledStatStore {
    /// Open or create the stats database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref).context("Failed to open stat store")?;

        tracing::info!("Stat store opened at {:?}", path_ref);

        Ok(Self { db: Arc::new(db) })
    }

    /// Wrap an already-open sled database (shared with other subsystems).
    pub fn from_db(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    fn tree(&self) -> Result<sled::Tree, StoreError> {
        self.db
            .open_tree(STATS_TREE)
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

impl StatStore for SledStatStore {
    fn load(&self) -> Result<Option<StatsRecord>, StoreError> {
        let tree = self.tree()?;
        let Some(bytes) = tree
            .get(STATS_KEY)
            .map_err(|e| StoreError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };

        let record: StatsRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(record))
    }

    fn save(&self, record: &StatsRecord) -> Result<(), StoreError> {
        let tree = self.tree()?;
        let bytes = serde_json::to_vec(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tree.insert(STATS_KEY, bytes)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        tracing::debug!(
            total_attempts = record.total_attempts,
            successful_recoveries = record.successful_recoveries,
            "Stats persisted"
        );

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn round_trips_through_sled() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStatStore::open(dir.path().join("stats")).unwrap();
        assert!(store.load().unwrap().is_none());

        let record = StatsRecord {
            total_attempts: 12,
            successful_recoveries: 8,
            last_healthy_at: Utc::now(),
        };
        store.save(&record).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.total_attempts, 12);
        assert_eq!(loaded.successful_recoveries, 8);
    }

    #[test]
    fn corrupt_record_surfaces_as_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStatStore::open(dir.path().join("stats")).unwrap();

        store
            .db
            .open_tree(STATS_TREE)
            .unwrap()
            .insert(STATS_KEY, b"not json".as_slice())
            .unwrap();

        assert!(matches!(
            store.load(),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStatStore::open(dir.path().join("stats")).unwrap();

        let mut record = StatsRecord::fresh();
        store.save(&record).unwrap();
        record.total_attempts = 5;
        store.save(&record).unwrap();

        assert_eq!(store.load().unwrap().unwrap().total_attempts, 5);
    }
}
