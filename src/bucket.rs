/// Number of counter slots in every bucket.
pub const COUNTER_PER_BUCKET: usize = 8;

/// One counter slot. A slot with `value == 0` is free.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CounterSlot {
    pub fingerprint: u32,
    pub flow_id: u32,
    pub value: u32,
    pub guard: u32,
}

impl CounterSlot {
    pub fn is_free(&self) -> bool {
        self.value == 0
    }

    pub fn holds(&self, flow_id: u32) -> bool {
        !self.is_free() && self.flow_id == flow_id
    }

    /// Replace the occupant, resetting the guard counter.
    pub fn occupy(&mut self, fingerprint: u32, flow_id: u32, value: u32) {
        *self = CounterSlot {
            fingerprint,
            flow_id,
            value,
            guard: 0,
        };
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub slots: [CounterSlot; COUNTER_PER_BUCKET],
}

impl Bucket {
    /// Slot holding `flow_id`, if any.
    pub fn find(&self, flow_id: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.holds(flow_id))
    }

    /// Minimum value across the occupied slots, `None` for an empty bucket.
    pub fn min_occupied_value(&self) -> Option<u32> {
        self.slots
            .iter()
            .filter(|s| !s.is_free())
            .map(|s| s.value)
            .min()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }
}

/// A fixed array of buckets, sized once at construction.
#[derive(Debug, Clone)]
pub struct BucketTable {
    buckets: Box<[Bucket]>,
}

impl BucketTable {
    pub fn new(bucket_count: usize) -> Self {
        BucketTable {
            buckets: vec![Bucket::default(); bucket_count].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of counter slots.
    pub fn capacity(&self) -> usize {
        self.buckets.len() * COUNTER_PER_BUCKET
    }

    pub fn get_bucket(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    pub fn get_bucket_mut(&mut self, index: usize) -> Option<&mut Bucket> {
        self.buckets.get_mut(index)
    }

    pub fn slots(&self) -> impl Iterator<Item = &CounterSlot> {
        self.buckets.iter().flat_map(|b| b.slots.iter())
    }

    pub fn reset(&mut self) {
        self.buckets.fill(Bucket::default());
    }

    pub fn size_bytes(&self) -> usize {
        self.buckets.len() * std::mem::size_of::<Bucket>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_all_free() {
        let t = BucketTable::new(4);
        assert_eq!(t.len(), 4);
        assert_eq!(t.capacity(), 4 * COUNTER_PER_BUCKET);
        assert!(t.slots().all(CounterSlot::is_free));
        assert_eq!(t.size_bytes(), 4 * 16 * COUNTER_PER_BUCKET);
    }

    #[test]
    fn get_bucket_is_bounds_checked() {
        let mut t = BucketTable::new(2);
        assert!(t.get_bucket(1).is_some());
        assert!(t.get_bucket(2).is_none());
        assert!(t.get_bucket_mut(2).is_none());
    }

    #[test]
    fn free_slot_never_matches() {
        let slot = CounterSlot {
            fingerprint: 1,
            flow_id: 9,
            value: 0,
            guard: 0,
        };
        assert!(!slot.holds(9));
    }

    #[test]
    fn occupy_resets_guard() {
        let mut slot = CounterSlot {
            fingerprint: 1,
            flow_id: 9,
            value: 3,
            guard: 2,
        };
        slot.occupy(5, 10, 1);
        assert_eq!(slot.flow_id, 10);
        assert_eq!(slot.value, 1);
        assert_eq!(slot.guard, 0);
    }

    #[test]
    fn bucket_min_and_find() {
        let mut b = Bucket::default();
        assert_eq!(b.min_occupied_value(), None);
        b.slots[2].occupy(0, 7, 4);
        b.slots[5].occupy(0, 8, 2);
        assert_eq!(b.min_occupied_value(), Some(2));
        assert_eq!(b.find(8), Some(5));
        assert_eq!(b.find(1), None);
        assert_eq!(b.occupied(), 2);
    }

    #[test]
    fn reset_clears_every_slot() {
        let mut t = BucketTable::new(3);
        t.get_bucket_mut(1).unwrap().slots[0].occupy(1, 2, 3);
        t.reset();
        assert!(t.slots().all(|s| *s == CounterSlot::default()));
    }
}
