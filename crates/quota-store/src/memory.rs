//! In-memory store for tests
//!
//! Records are kept in their encoded JSON form so the codec is exercised on
//! every save and load, the same as with the file store.

use quota_api::MonthlyStats;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::{decode_stats, encode_stats, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    json: Mutex<Option<String>>,
    saves: AtomicUsize,

    /// Make every save fail with an IO error
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `stats`
    pub fn with_stats(stats: &MonthlyStats) -> StoreResult<Self> {
        let store = Self::new();
        store.put_raw(encode_stats(stats)?);
        Ok(store)
    }

    /// Replace the stored document with arbitrary text
    pub fn put_raw(&self, json: impl Into<String>) {
        *self.json.lock().unwrap_or_else(PoisonError::into_inner) = Some(json.into());
    }

    /// The stored document, if any
    pub fn raw(&self) -> Option<String> {
        self.json
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Store for MemoryStore {
    fn load_stats(&self) -> StoreResult<Option<MonthlyStats>> {
        self.raw().map(|json| decode_stats(&json)).transpose()
    }

    fn save_stats(&self, stats: &MonthlyStats) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::other("simulated write failure")));
        }

        self.put_raw(encode_stats(stats)?);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_util::YearMonth;

    #[test]
    fn empty_store_loads_none() {
        assert!(MemoryStore::new().load_stats().unwrap().is_none());
    }

    #[test]
    fn save_and_load() {
        let store = MemoryStore::new();
        let stats = MonthlyStats::new(YearMonth::new(2025, 6).unwrap());

        store.save_stats(&stats).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_stats().unwrap(), Some(stats));
    }

    #[test]
    fn failing_writes_leave_previous_record() {
        let stats = MonthlyStats::new(YearMonth::new(2025, 6).unwrap());
        let store = MemoryStore::with_stats(&stats).unwrap();
        store.set_fail_writes(true);

        let other = MonthlyStats::new(YearMonth::new(2025, 7).unwrap());
        assert!(matches!(store.save_stats(&other), Err(StoreError::Io(_))));
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.load_stats().unwrap(), Some(stats));
    }
}
