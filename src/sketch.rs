//! Two-phase heavy-hitter sketch.
//!
//! Every arrival is first offered with the configured gate. Only when the bucket
//! reports [`InsertOutcome::GateHit`] is it offered again with the gate disabled,
//! which runs the guard-counter eviction policy. Free slots and exact matches resolve
//! in the first phase.

use log::debug;

use crate::config::SketchConfig;
use crate::error::Result;
use crate::hash::{flow_id_from_key, HashOracle, Murmur3};
use crate::heavy_part::{HeavyHitterSketch, SketchStats};
use crate::traits::{HeavyHitterBackend, InsertOutcome};

#[derive(Debug, Clone)]
pub struct TwoFaSketch<H = Murmur3> {
    heavy_part: HeavyHitterSketch<H>,
    thres_set: u32,
}

impl TwoFaSketch<Murmur3> {
    pub fn new(bucket_count: usize, gate_threshold: u32) -> Result<Self> {
        Self::from_config(SketchConfig::new(bucket_count, gate_threshold))
    }

    pub fn from_config(config: SketchConfig) -> Result<Self> {
        Self::with_hasher(config, Murmur3)
    }
}

impl<H: HashOracle> TwoFaSketch<H> {
    pub fn with_hasher(config: SketchConfig, hasher: H) -> Result<Self> {
        config.validate()?;
        let heavy_part = HeavyHitterSketch::with_hasher(config.bucket_count, hasher)?;
        debug!(
            "two-phase sketch: buckets = {}, gate = {}",
            config.bucket_count, config.gate_threshold
        );
        Ok(TwoFaSketch {
            heavy_part,
            thres_set: config.gate_threshold,
        })
    }

    /// Count one logical arrival, retrying without the gate on a gate hit.
    pub fn insert(&mut self, flow_id: u32, increment: u32) -> InsertOutcome {
        match self.heavy_part.insert(flow_id, increment, self.thres_set) {
            InsertOutcome::GateHit => self.heavy_part.insert(flow_id, increment, 0),
            outcome => outcome,
        }
    }

    pub fn insert_key(&mut self, key: &[u8], increment: u32) -> Result<InsertOutcome> {
        let flow_id = flow_id_from_key(key)?;
        Ok(self.insert(flow_id, increment))
    }

    pub fn query(&self, flow_id: u32) -> u32 {
        self.heavy_part.query(flow_id, self.thres_set)
    }

    pub fn query_key(&self, key: &[u8]) -> Result<u32> {
        Ok(self.query(flow_id_from_key(key)?))
    }

    pub fn extract_heavy_hitters(&self, threshold: u32, capacity: usize) -> (Vec<(u32, u32)>, usize) {
        self.heavy_part.extract_heavy_hitters(threshold, capacity)
    }

    pub fn clear(&mut self) {
        self.heavy_part.clear();
    }

    pub fn stats(&self) -> SketchStats {
        self.heavy_part.stats()
    }

    pub fn eviction_ratio(&self) -> f64 {
        self.heavy_part.eviction_ratio()
    }

    pub fn gate_threshold(&self) -> u32 {
        self.thres_set
    }
}

impl<H: HashOracle> HeavyHitterBackend for TwoFaSketch<H> {
    fn name(&self) -> &'static str {
        "2FASketch"
    }

    fn insert(&mut self, flow_id: u32, increment: u32) -> InsertOutcome {
        TwoFaSketch::insert(self, flow_id, increment)
    }

    fn query(&self, flow_id: u32) -> u32 {
        TwoFaSketch::query(self, flow_id)
    }

    fn extract_heavy_hitters(&self, threshold: u32, capacity: usize) -> (Vec<(u32, u32)>, usize) {
        TwoFaSketch::extract_heavy_hitters(self, threshold, capacity)
    }

    fn clear(&mut self) {
        TwoFaSketch::clear(self)
    }

    fn capacity(&self) -> usize {
        self.heavy_part.table().capacity()
    }

    fn stats(&self) -> Option<SketchStats> {
        Some(TwoFaSketch::stats(self))
    }

    fn eviction_ratio(&self) -> Option<f64> {
        Some(TwoFaSketch::eviction_ratio(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::log::init_test_logger;

    struct Collide;

    impl HashOracle for Collide {
        fn hash(&self, _bytes: &[u8], _seed: u32) -> u32 {
            0
        }
    }

    #[test]
    fn create_rejects_zero_buckets() {
        init_test_logger();
        assert!(matches!(TwoFaSketch::new(0, 5), Err(Error::ZeroBuckets)));
    }

    #[test]
    fn two_phase_never_surfaces_gate_hit() {
        init_test_logger();
        let mut s = TwoFaSketch::with_hasher(SketchConfig::new(1, 5), Collide).unwrap();
        for id in 1..=8u32 {
            assert_eq!(s.insert(id, 5), InsertOutcome::Success);
        }
        for id in 100..120u32 {
            assert_ne!(s.insert(id, 1), InsertOutcome::GateHit);
        }
        let stats = s.stats();
        assert!(stats.promotions > 0);
        assert!(stats.full_evictions > 0);
    }

    #[test]
    fn retry_runs_guard_policy() {
        let mut s = TwoFaSketch::with_hasher(SketchConfig::new(1, 5), Collide).unwrap();
        for id in 1..=8u32 {
            s.insert(id, 5);
        }
        // each gated arrival bumps the victim guard once
        for _ in 0..5 {
            assert_eq!(s.insert(77, 1), InsertOutcome::Rejected);
        }
        assert_eq!(s.insert(77, 1), InsertOutcome::Success);
        assert_eq!(s.query(77), 1);
        assert_eq!(s.query(1), 0);
        assert_eq!(s.stats().promotions, 6);
        assert_eq!(s.stats().full_evictions, 1);
    }

    #[test]
    fn keys_are_decoded_big_endian() {
        let mut s = TwoFaSketch::new(128, 2).unwrap();
        assert_eq!(s.gate_threshold(), 2);
        let key = [0xc0, 0xa8, 0x00, 0x01, 0, 80, 0, 0, 1, 187, 6, 0, 0];
        assert_eq!(s.insert_key(&key, 3).unwrap(), InsertOutcome::Success);
        assert_eq!(s.query(0xc0a8_0001), 3);
        assert_eq!(s.query_key(&key[..4]).unwrap(), 3);
        assert!(matches!(s.insert_key(&[], 1), Err(Error::InvalidKey { len: 0 })));
        assert!(s.query_key(&[1, 2]).is_err());
    }

    #[test]
    fn clear_before_measurement() {
        let mut s = TwoFaSketch::new(32, 2).unwrap();
        for id in 0..1_000u32 {
            s.insert(id % 300, 1);
        }
        assert_ne!(s.stats(), SketchStats::default());
        s.clear();
        for id in 0..300u32 {
            assert_eq!(s.query(id), 0);
        }
        assert_eq!(s.stats(), SketchStats::default());
        assert_eq!(s.extract_heavy_hitters(0, 1_000).1, 0);
    }

    #[test]
    fn backend_trait_dispatches() {
        let mut s = TwoFaSketch::new(64, 3).unwrap();
        let backend: &mut dyn HeavyHitterBackend = &mut s;
        for _ in 0..10 {
            backend.insert(5, 1);
        }
        assert_eq!(backend.query(5), 10);
        assert_eq!(backend.capacity(), 64 * 8);
        let (hh, total) = backend.extract_heavy_hitters(10, 4);
        assert_eq!(hh, vec![(5, 10)]);
        assert_eq!(total, 1);
        assert_eq!(backend.name(), "2FASketch");
        assert_eq!(backend.stats(), Some(SketchStats::default()));
        assert_eq!(backend.eviction_ratio(), Some(0.0));
    }

    #[test]
    fn finds_skewed_heavy_hitters() {
        let mut s = TwoFaSketch::new(256, 10).unwrap();
        for round in 0..200u32 {
            for heavy in 0..20u32 {
                s.insert(heavy, 1);
            }
            for light in 0..50u32 {
                s.insert(1_000 + round * 50 + light, 1);
            }
        }
        let (hh, _) = s.extract_heavy_hitters(150, 1_000);
        for heavy in 0..20u32 {
            assert!(hh.iter().any(|&(id, _)| id == heavy), "missing {}", heavy);
        }
        assert!(hh.iter().all(|&(id, _)| id < 20));
    }
}
