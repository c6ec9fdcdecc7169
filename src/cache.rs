//! Memo for the last detection run.
//!
//! The entry is keyed by a fingerprint of the filtered records and keeps a
//! copy of them. A hit needs both the fingerprint and the records to match;
//! anything else evicts the entry before recomputing, so a result is never
//! served for input it was not computed from.

use crate::detector::{detect, Detection};
use crate::types::LoanActivityRecord;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Order-sensitive 64-bit hash over every field of every record.
pub fn fingerprint(records: &[LoanActivityRecord]) -> u64 {
    let mut h = DefaultHasher::new();
    records.len().hash(&mut h);
    for r in records {
        r.loan_id.hash(&mut h);
        r.date.hash(&mut h);
        r.days_past_due.hash(&mut h);
        r.promise_status.hash(&mut h);
        r.promise_amount.map(f64::to_bits).hash(&mut h);
        r.promise_date.hash(&mut h);
        r.promise_source.hash(&mut h);
        r.collection_amount.map(f64::to_bits).hash(&mut h);
        r.collection_date.hash(&mut h);
        r.overdue_amount.map(f64::to_bits).hash(&mut h);
        r.customer_name.hash(&mut h);
        r.branch.hash(&mut h);
        r.is_active.hash(&mut h);
        r.total_communications.hash(&mut h);
        r.whatsapp.hash(&mut h);
        r.blaster.hash(&mut h);
        r.ai_calls.hash(&mut h);
    }
    h.finish()
}

#[derive(Debug)]
struct CachedDetection {
    fingerprint: u64,
    input: Vec<LoanActivityRecord>,
    detection: Detection,
}

#[derive(Debug, Default)]
pub struct DetectionCache {
    entry: Option<CachedDetection>,
    hits: usize,
    misses: usize,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached detection for `records`, running [`detect`] when the input
    /// differs from the one the current entry was built from.
    pub fn get_or_detect(&mut self, records: &[LoanActivityRecord]) -> &Detection {
        let fp = fingerprint(records);
        // The fingerprint is only a fast reject; equal hashes still compare
        // the records themselves.
        let stale = self
            .entry
            .as_ref()
            .map_or(true, |c| c.fingerprint != fp || c.input.as_slice() != records);
        if stale {
            self.entry = None;
            self.misses += 1;
            log::debug!("detection cache miss (fingerprint {fp:016x})");
        } else {
            self.hits += 1;
            log::debug!("detection cache hit (fingerprint {fp:016x})");
        }
        let cached = self.entry.get_or_insert_with(|| CachedDetection {
            fingerprint: fp,
            input: records.to_vec(),
            detection: detect(records),
        });
        &cached.detection
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanId;
    use chrono::NaiveDate;

    fn records(last_dpd: i64) -> Vec<LoanActivityRecord> {
        let d = |n| NaiveDate::from_ymd_opt(2024, 2, n).unwrap();
        let mut first = LoanActivityRecord::new(LoanId::new("9"), d(1), 0);
        first.promise_status = Some("Pending".to_string());
        vec![
            first,
            LoanActivityRecord::new(LoanId::new("9"), d(2), 15),
            LoanActivityRecord::new(LoanId::new("9"), d(3), last_dpd),
        ]
    }

    #[test]
    fn identical_input_is_served_from_cache() {
        let mut cache = DetectionCache::new();
        let first = cache.get_or_detect(&records(3)).clone();
        let second = cache.get_or_detect(&records(3)).clone();
        assert_eq!(first, second);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn changed_input_evicts_and_recomputes() {
        let mut cache = DetectionCache::new();
        assert_eq!(cache.get_or_detect(&records(3)).qualifying.len(), 1);
        // DPD keeps rising: no longer a transition.
        assert!(cache.get_or_detect(&records(40)).qualifying.is_empty());
        assert_eq!(cache.misses(), 2);

        cache.invalidate();
        cache.get_or_detect(&records(40));
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn matching_fingerprint_with_different_records_recomputes() {
        let mut cache = DetectionCache::new();
        assert_eq!(cache.get_or_detect(&records(3)).qualifying.len(), 1);
        // Force a colliding key: same fingerprint as the next input, but the
        // stored records are still the old ones.
        let next = records(40);
        if let Some(entry) = cache.entry.as_mut() {
            entry.fingerprint = fingerprint(&next);
        }
        assert!(cache.get_or_detect(&next).qualifying.is_empty());
        assert_eq!((cache.misses(), cache.hits()), (2, 0));
        cache.get_or_detect(&next);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let a = records(3);
        let mut b = a.clone();
        b.reverse();
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&records(3)));
    }
}
