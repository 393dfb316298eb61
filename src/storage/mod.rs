//! Test Report History
//!
//! Persists finished [`TestReport`]s to a sled database so past runs can be
//! listed and pruned. Keys are the run's start time in milliseconds as
//! big-endian bytes, so iteration order is chronological.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::TestReport;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub report_count: usize,
    pub size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ReportStore {
    db: Arc<sled::Db>,
}

impl ReportStore {
    /// Open or create the report database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!("Report history opened at {:?}", path);
        Ok(Self { db: Arc::new(db) })
    }

    /// Store a report; returns the key timestamp (ms). Runs started in the
    /// same millisecond are moved to the next free slot.
    pub fn store_report(&self, report: &TestReport) -> Result<u64, StorageError> {
        let mut key = millis(report.started_at);
        while self.db.contains_key(key.to_be_bytes())? {
            key += 1;
        }
        let value = serde_json::to_vec(report)?;
        self.db.insert(key.to_be_bytes(), value)?;
        self.db.flush()?;
        debug!(key, mode = %report.mode, verdict = %report.result.overall, "Stored test report");
        Ok(key)
    }

    /// Most recent `limit` reports, newest first. Undecodable entries are skipped.
    pub fn get_recent(&self, limit: usize) -> Vec<TestReport> {
        self.db
            .iter()
            .rev()
            .filter_map(Result::ok)
            .filter_map(|(_, value)| serde_json::from_slice::<TestReport>(&value).ok())
            .take(limit)
            .collect()
    }

    /// Reports started within `[start, end]`, oldest first.
    pub fn get_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TestReport> {
        let (start_key, end_key) = (millis(start).to_be_bytes(), millis(end).to_be_bytes());
        self.db
            .range(start_key..=end_key)
            .filter_map(Result::ok)
            .filter_map(|(_, value)| serde_json::from_slice::<TestReport>(&value).ok())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Delete every stored report.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    /// Delete reports started before `cutoff`; returns how many were removed.
    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff_key = millis(cutoff).to_be_bytes();
        let keys: Vec<_> = self
            .db
            .range(..cutoff_key)
            .filter_map(|item| item.ok().map(|(k, _)| k))
            .collect();

        for key in &keys {
            self.db.remove(key)?;
        }
        if !keys.is_empty() {
            self.db.flush()?;
            info!(deleted = keys.len(), "Pruned old test reports");
        }
        Ok(keys.len())
    }

    pub fn stats(&self) -> StorageStats {
        let key_time = |item: Option<sled::Result<(sled::IVec, sled::IVec)>>| {
            item.and_then(Result::ok).and_then(|(k, _)| {
                let bytes: [u8; 8] = k.as_ref().try_into().ok()?;
                let ms = i64::try_from(u64::from_be_bytes(bytes)).ok()?;
                DateTime::<Utc>::from_timestamp_millis(ms)
            })
        };
        StorageStats {
            report_count: self.count(),
            size_bytes: self.db.size_on_disk().unwrap_or(0),
            oldest: key_time(self.db.iter().next()),
            newest: key_time(self.db.iter().next_back()),
        }
    }
}

fn millis(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::evaluate;
    use crate::types::{RunStatistics, TestExpectation, TestMode};
    use chrono::Duration;
    use tempfile::TempDir;

    fn report(started_at: DateTime<Utc>, mode: TestMode) -> TestReport {
        TestReport {
            started_at,
            finished_at: started_at + Duration::seconds(60),
            mode,
            weight: None,
            statistics: RunStatistics::default(),
            result: evaluate(0.0, 0.0, TestExpectation::default(), 0, 5.0),
            defrost: None,
            fault: None,
        }
    }

    #[test]
    fn recent_reports_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::open(dir.path().join("reports.db")).unwrap();
        let t0 = Utc::now();

        store.store_report(&report(t0, TestMode::Pasta)).unwrap();
        store
            .store_report(&report(t0 + Duration::minutes(5), TestMode::Fish))
            .unwrap();
        store
            .store_report(&report(t0 + Duration::minutes(10), TestMode::Rice))
            .unwrap();

        let recent = store.get_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].mode, TestMode::Rice);
        assert_eq!(recent[1].mode, TestMode::Fish);
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn same_millisecond_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::open(dir.path().join("reports.db")).unwrap();
        let t0 = Utc::now();
        let a = store.store_report(&report(t0, TestMode::Pasta)).unwrap();
        let b = store.store_report(&report(t0, TestMode::Fish)).unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn cleanup_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::open(dir.path().join("reports.db")).unwrap();
        let now = Utc::now();
        store
            .store_report(&report(now - Duration::days(400), TestMode::Normal))
            .unwrap();
        store.store_report(&report(now, TestMode::Normal)).unwrap();

        let deleted = store.cleanup_before(now - Duration::days(365)).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count(), 1);
        assert_eq!(store.get_range(now - Duration::days(1), now).len(), 1);
        assert!(store.stats().newest.is_some());

        store.clear().unwrap();
        assert_eq!(store.count(), 0);
        assert_eq!(store.stats().oldest, None);
    }
}
