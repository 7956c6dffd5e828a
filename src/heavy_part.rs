//! Hashed bucket table with guard-counter eviction.
//!
//! Each flow id hashes to one primary bucket of [`COUNTER_PER_BUCKET`] slots. An
//! arrival either matches its own slot, takes a free slot, or contends for the
//! bucket's minimum slot. Contention bumps the victim's guard counter and only
//! replaces the victim once the guard exceeds the victim's value, so a slot resists
//! eviction in proportion to the count it has already accumulated.

use log::{debug, warn};

use crate::bucket::{BucketTable, COUNTER_PER_BUCKET};
use crate::error::{Error, Result};
use crate::hash::{primary_index, secondary_index, HashOracle, Murmur3, FINGERPRINT_SEED};
use crate::traits::{InsertOutcome, TopK};

/// Buckets addressable by a 16-bit index.
const ADDRESSABLE_BUCKETS: usize = 1 << 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SketchStats {
    /// Inserts short-circuited by the gate check.
    pub promotions: u64,
    /// Slots actually replaced by a new occupant.
    pub full_evictions: u64,
}

#[derive(Debug, Clone)]
pub struct HeavyHitterSketch<H = Murmur3> {
    table: BucketTable,
    hasher: H,
    promotions: u64,
    full_evictions: u64,
}

impl HeavyHitterSketch<Murmur3> {
    pub fn new(bucket_count: usize) -> Result<Self> {
        Self::with_hasher(bucket_count, Murmur3)
    }
}

impl<H: HashOracle> HeavyHitterSketch<H> {
    pub fn with_hasher(bucket_count: usize, hasher: H) -> Result<Self> {
        if bucket_count == 0 {
            return Err(Error::ZeroBuckets);
        }
        if bucket_count > ADDRESSABLE_BUCKETS {
            warn!(
                "{} buckets requested but only {} are addressable by a 16-bit index",
                bucket_count, ADDRESSABLE_BUCKETS
            );
        }
        debug!(
            "heavy part created: buckets = {}, slots = {}",
            bucket_count,
            bucket_count * COUNTER_PER_BUCKET
        );
        Ok(HeavyHitterSketch {
            table: BucketTable::new(bucket_count),
            hasher,
            promotions: 0,
            full_evictions: 0,
        })
    }

    fn fingerprint(&self, flow_id: u32) -> u32 {
        self.hasher.hash_flow(flow_id, FINGERPRINT_SEED)
    }

    /// Offer `increment` arrivals of `flow_id`.
    ///
    /// With `gate > 0`, a full bucket whose minimum value is already `>= gate` is
    /// left untouched and [`InsertOutcome::GateHit`] is returned. With `gate == 0`
    /// the guard-counter policy always runs.
    pub fn insert(&mut self, flow_id: u32, increment: u32, gate: u32) -> InsertOutcome {
        if increment == 0 {
            return InsertOutcome::Success;
        }
        let fp = self.fingerprint(flow_id);
        let pos = primary_index(fp, self.table.len());
        let Some(bucket) = self.table.get_bucket_mut(pos) else {
            return InsertOutcome::Rejected;
        };

        let mut empty = None;
        let mut min_idx = 0;
        let mut min_val = u32::MAX;
        for (i, slot) in bucket.slots.iter_mut().enumerate() {
            if slot.holds(flow_id) {
                slot.value = slot.value.saturating_add(increment);
                return InsertOutcome::Success;
            }
            if slot.is_free() && empty.is_none() {
                empty = Some(i);
            }
            if slot.value < min_val {
                min_val = slot.value;
                min_idx = i;
            }
        }

        if let Some(i) = empty {
            bucket.slots[i].occupy(fp, flow_id, increment);
            return InsertOutcome::Success;
        }

        if gate > 0 && min_val >= gate {
            self.promotions += 1;
            return InsertOutcome::GateHit;
        }

        let victim = &mut bucket.slots[min_idx];
        victim.guard = victim.guard.saturating_add(1);
        if victim.guard > victim.value {
            victim.occupy(fp, flow_id, increment);
            self.full_evictions += 1;
            InsertOutcome::Success
        } else {
            InsertOutcome::Rejected
        }
    }

    /// Estimated count of `flow_id`.
    ///
    /// Falls back to the secondary bucket when the primary bucket has no match and
    /// its occupied minimum is `>= gate`. Inserts never place flows in secondary
    /// buckets, so the fallback only finds flows whose primary and secondary index
    /// coincide.
    pub fn query(&self, flow_id: u32, gate: u32) -> u32 {
        let fp = self.fingerprint(flow_id);
        let Some(bucket) = self.table.get_bucket(primary_index(fp, self.table.len())) else {
            return 0;
        };
        if let Some(i) = bucket.find(flow_id) {
            return bucket.slots[i].value;
        }
        if bucket.min_occupied_value().unwrap_or(u32::MAX) < gate {
            return 0;
        }
        self.table
            .get_bucket(secondary_index(fp, self.table.len()))
            .and_then(|b| b.find(flow_id).map(|i| b.slots[i].value))
            .unwrap_or(0)
    }

    /// Slots with a non-zero value `>= threshold`, at most `capacity` of them
    /// (largest values kept), plus the number of slots that qualified.
    pub fn extract_heavy_hitters(&self, threshold: u32, capacity: usize) -> (Vec<(u32, u32)>, usize) {
        let mut top = TopK::new(capacity);
        for slot in self.table.slots() {
            if !slot.is_free() && slot.value >= threshold {
                top.offer(slot.flow_id, slot.value);
            }
        }
        top.finish()
    }

    pub fn clear(&mut self) {
        self.table.reset();
        self.promotions = 0;
        self.full_evictions = 0;
        debug!("heavy part cleared: buckets = {}", self.table.len());
    }

    pub fn stats(&self) -> SketchStats {
        SketchStats {
            promotions: self.promotions,
            full_evictions: self.full_evictions,
        }
    }

    /// Gate hits per counter slot. Diagnostic only.
    pub fn eviction_ratio(&self) -> f64 {
        self.promotions as f64 / self.table.capacity() as f64
    }

    pub fn table(&self) -> &BucketTable {
        &self.table
    }
}
