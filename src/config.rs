use std::mem::size_of;

use crate::bucket::Bucket;
use crate::error::{Error, Result};

/// Sizing for a two-phase sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SketchConfig {
    pub bucket_count: usize,
    /// Gate threshold used by the first insert phase; 0 disables the gate.
    pub gate_threshold: u32,
}

impl SketchConfig {
    pub fn new(bucket_count: usize, gate_threshold: u32) -> Self {
        SketchConfig {
            bucket_count,
            gate_threshold,
        }
    }

    /// Number of buckets that fit in `bytes`, at least one.
    pub fn from_memory(bytes: usize, gate_threshold: u32) -> Self {
        let bucket_count = (bytes / size_of::<Bucket>()).max(1);
        SketchConfig::new(bucket_count, gate_threshold)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(Error::ZeroBuckets);
        }
        Ok(())
    }
}

/// Parameters of a measurement run over trace windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementConfig {
    pub memory_kb: usize,
    /// Heavy-hitter threshold as a fraction of the window's packets.
    pub threshold_ratio: f64,
    /// The gate threshold is the heavy-hitter threshold divided by this.
    pub gate_divisor: u32,
    pub warmup_packets: usize,
    pub max_packets: usize,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        MeasurementConfig {
            memory_kb: 500,
            threshold_ratio: 1.0 / 10_000.0,
            gate_divisor: 2,
            warmup_packets: 10_000,
            max_packets: 10_000_000,
        }
    }
}

impl MeasurementConfig {
    pub fn memory_bytes(&self) -> usize {
        self.memory_kb * 1024
    }

    pub fn threshold(&self, packets: usize) -> u32 {
        let t = (packets as f64 * self.threshold_ratio) as u32;
        t.max(1)
    }

    pub fn gate(&self, threshold: u32) -> u32 {
        threshold / self.gate_divisor.max(1)
    }

    pub fn sketch_config(&self, threshold: u32) -> SketchConfig {
        SketchConfig::from_memory(self.memory_bytes(), self.gate(threshold))
    }

    pub fn validate(&self) -> Result<()> {
        if self.memory_kb == 0 {
            return Err(Error::InvalidConfig("memory budget must be positive".into()));
        }
        if !(self.threshold_ratio > 0.0 && self.threshold_ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "threshold ratio {} is outside (0, 1]",
                self.threshold_ratio
            )));
        }
        if self.gate_divisor == 0 {
            return Err(Error::InvalidConfig("gate divisor must be positive".into()));
        }
        Ok(())
    }
}
