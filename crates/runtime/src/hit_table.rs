//! Concurrent probe-key → (count, last-hit) table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Per-key counters. `count` only increases until reset;
/// `last_hit_epoch_ms` is non-decreasing modulo wall-clock skew.
#[derive(Debug, Default)]
pub struct HitRecord {
    count: AtomicU64,
    last_hit_epoch_ms: AtomicI64,
}

impl HitRecord {
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn last_hit_epoch_ms(&self) -> i64 {
        self.last_hit_epoch_ms.load(Ordering::Acquire)
    }
}

/// Concurrent mapping from probe key to hit record. The hot path
/// (recording a hit for an existing key) takes the read lock and two
/// atomic operations; the write lock is only held to insert a new key
/// or during reset.
#[derive(Debug, Default)]
pub struct HitTable {
    records: RwLock<HashMap<String, Arc<HitRecord>>>,
}

impl HitTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_for(&self, key: &str) -> Arc<HitRecord> {
        if let Some(existing) = self.records.read().expect("hit table poisoned").get(key) {
            return existing.clone();
        }
        let mut records = self.records.write().expect("hit table poisoned");
        records
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(HitRecord::default()))
            .clone()
    }

    /// Record one hit for `key` at `now_epoch_ms`.
    pub fn record(&self, key: &str, now_epoch_ms: i64) {
        if key.is_empty() {
            return;
        }
        let record = self.record_for(key);
        record.count.fetch_add(1, Ordering::AcqRel);
        record.last_hit_epoch_ms.store(now_epoch_ms, Ordering::Release);
    }

    /// Count for `key`; 0 when the key was never hit.
    pub fn count(&self, key: &str) -> u64 {
        self.records
            .read()
            .expect("hit table poisoned")
            .get(key)
            .map(|r| r.count())
            .unwrap_or(0)
    }

    /// Last-hit timestamp for `key`; 0 when the key was never hit.
    pub fn last_hit_epoch_ms(&self, key: &str) -> i64 {
        self.records
            .read()
            .expect("hit table poisoned")
            .get(key)
            .map(|r| r.last_hit_epoch_ms())
            .unwrap_or(0)
    }

    /// Zero both counters for `key`, creating the entry if absent so
    /// subsequent reads are authoritative.
    pub fn reset(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        let record = self.record_for(key);
        record.count.store(0, Ordering::Release);
        record.last_hit_epoch_ms.store(0, Ordering::Release);
    }
}
