use super::{DailyStatAggregate, ProcessingRecord, StatsStore};
use crate::error::RedactError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

/// Session log plus the aggregates derived from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsState {
    pub sessions: Vec<ProcessingRecord>,
    pub daily: BTreeMap<NaiveDate, DailyStatAggregate>,
}

impl StatsState {
    /// Log the record and fold it into its day's aggregate. The aggregate row
    /// is created on the first successful record of the day.
    pub fn apply(&mut self, record: ProcessingRecord) {
        if record.success {
            let date = record.date();
            self.daily
                .entry(date)
                .or_insert_with(|| DailyStatAggregate::new(date))
                .fold(&record);
        }
        self.sessions.push(record);
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, RedactError> {
    m.lock()
        .map_err(|_| RedactError::Store("stats lock poisoned".to_string()))
}

/// In-process store. Every update runs under one mutex.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    state: Mutex<StatsState>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStatsStore {
    fn record(&self, record: ProcessingRecord) -> Result<(), RedactError> {
        trace!("Recording session {}", record.id);
        lock(&self.state)?.apply(record);
        Ok(())
    }

    fn daily(&self, date: NaiveDate) -> Result<Option<DailyStatAggregate>, RedactError> {
        Ok(lock(&self.state)?.daily.get(&date).cloned())
    }

    fn sessions(&self) -> Result<Vec<ProcessingRecord>, RedactError> {
        Ok(lock(&self.state)?.sessions.clone())
    }
}

/// Store persisted as one JSON document. Each update is a
/// load-apply-write cycle under the store's mutex; the file is replaced
/// through a sibling temp file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<StatsState, RedactError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                RedactError::Store(format!("corrupt stats file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StatsState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &StatsState) -> Result<(), RedactError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(state).map_err(|e| RedactError::Store(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StatsStore for JsonFileStore {
    fn record(&self, record: ProcessingRecord) -> Result<(), RedactError> {
        let _guard = lock(&self.guard)?;
        let mut state = self.load()?;
        debug!("Recording session {} to {}", record.id, self.path.display());
        state.apply(record);
        self.save(&state)
    }

    fn daily(&self, date: NaiveDate) -> Result<Option<DailyStatAggregate>, RedactError> {
        let _guard = lock(&self.guard)?;
        Ok(self.load()?.daily.remove(&date))
    }

    fn sessions(&self) -> Result<Vec<ProcessingRecord>, RedactError> {
        let _guard = lock(&self.guard)?;
        Ok(self.load()?.sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::thread;
    use uuid::Uuid;

    fn record_on(day: u32, elapsed_ms: u64, success: bool) -> ProcessingRecord {
        ProcessingRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            processing_time_ms: elapsed_ms,
            success,
            ..ProcessingRecord::started(Uuid::new_v4())
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn aggregates_are_keyed_by_day() {
        let store = MemoryStatsStore::new();
        store.record(record_on(1, 100, true)).unwrap();
        store.record(record_on(1, 300, true)).unwrap();
        store.record(record_on(2, 50, true)).unwrap();

        let first = store.daily(day(1)).unwrap().unwrap();
        assert_eq!(first.total_images, 2);
        assert_eq!(first.avg_processing_time_ms, 200.);
        assert_eq!(store.daily(day(2)).unwrap().unwrap().total_images, 1);
        assert!(store.daily(day(3)).unwrap().is_none());
    }

    #[test]
    fn failures_are_logged_but_not_aggregated() {
        let store = MemoryStatsStore::new();
        store.record(record_on(1, 100, false)).unwrap();

        assert_eq!(store.sessions().unwrap().len(), 1);
        assert!(store.daily(day(1)).unwrap().is_none());
    }

    #[test]
    fn concurrent_updates_keep_the_average_exact() {
        let store = Arc::new(MemoryStatsStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25 {
                        store.record(record_on(1, (t * 25 + i) as u64, true)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let agg = store.daily(day(1)).unwrap().unwrap();
        assert_eq!(agg.total_images, 200);
        // mean of 0..200
        assert!((agg.avg_processing_time_ms - 99.5).abs() < 1e-6);
        assert_eq!(store.sessions().unwrap().len(), 200);
    }

    #[test]
    fn json_store_persists_between_instances() {
        let dir = std::env::temp_dir().join(format!("facescrub-stats-{}", Uuid::new_v4()));
        let path = dir.join("stats.json");

        let store = JsonFileStore::new(&path);
        store.record(record_on(4, 100, true)).unwrap();
        store.record(record_on(4, 300, true)).unwrap();
        drop(store);

        let reopened = JsonFileStore::new(&path);
        let agg = reopened.daily(day(4)).unwrap().unwrap();
        assert_eq!((agg.total_images, agg.avg_processing_time_ms), (2, 200.));
        assert_eq!(reopened.sessions().unwrap().len(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn json_store_starts_empty() {
        let path = std::env::temp_dir().join(format!("facescrub-missing-{}.json", Uuid::new_v4()));
        let store = JsonFileStore::new(&path);
        assert!(store.sessions().unwrap().is_empty());
        assert!(store.daily(day(1)).unwrap().is_none());
    }
}
