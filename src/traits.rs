//! Capability interface shared by every heavy-hitter backend.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::heavy_part::SketchStats;

/// Result of offering one arrival to a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The arrival was counted.
    Success,
    /// The bucket is saturated at or above the gate; retry with the gate disabled.
    GateHit,
    /// The arrival was dropped by the eviction policy.
    Rejected,
}

pub trait HeavyHitterBackend {
    fn name(&self) -> &'static str;

    fn insert(&mut self, flow_id: u32, increment: u32) -> InsertOutcome;

    /// Estimated count of `flow_id`, 0 when it is not tracked.
    fn query(&self, flow_id: u32) -> u32;

    /// Up to `capacity` `(flow_id, value)` pairs with `value >= threshold`, largest
    /// first, together with the number of flows that qualified.
    fn extract_heavy_hitters(&self, threshold: u32, capacity: usize) -> (Vec<(u32, u32)>, usize);

    fn clear(&mut self);

    /// Number of counters the backend can hold.
    fn capacity(&self) -> usize;

    /// Eviction diagnostics, for backends that keep them.
    fn stats(&self) -> Option<SketchStats> {
        None
    }

    /// Gate hits per counter slot, for backends with a gate.
    fn eviction_ratio(&self) -> Option<f64> {
        None
    }
}

/// Bounded min-heap keeping the largest offered values.
///
/// A full heap only admits a value strictly larger than its current minimum, and equal
/// values keep their offer order, so truncation is deterministic for a given scan.
pub struct TopK {
    capacity: usize,
    total: usize,
    heap: BinaryHeap<Reverse<(u32, Reverse<usize>, u32)>>,
}

impl TopK {
    pub fn new(capacity: usize) -> Self {
        TopK {
            capacity,
            total: 0,
            heap: BinaryHeap::with_capacity(capacity.min(1 << 16)),
        }
    }

    pub fn offer(&mut self, flow_id: u32, value: u32) {
        let seq = self.total;
        self.total += 1;
        if self.capacity == 0 {
            return;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse((value, Reverse(seq), flow_id)));
            return;
        }
        let admit = match self.heap.peek() {
            Some(Reverse((min, _, _))) => value > *min,
            None => false,
        };
        if admit {
            self.heap.pop();
            self.heap.push(Reverse((value, Reverse(seq), flow_id)));
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finish(self) -> (Vec<(u32, u32)>, usize) {
        let mut held: Vec<_> = self
            .heap
            .into_iter()
            .map(|Reverse((value, Reverse(seq), flow_id))| (value, seq, flow_id))
            .collect();
        held.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let entries = held.into_iter().map(|(value, _, id)| (id, value)).collect();
        (entries, self.total)
    }
}
