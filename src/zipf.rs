//! Synthetic Zipf-distributed traces in the 13-byte record format.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use log::info;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Zipf};

use crate::error::{Error, Result};
use crate::hash::{flow_id_from_key, HashOracle, Murmur3};
use crate::trace::RECORD_LEN;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZipfConfig {
    /// Skew exponent.
    pub alpha: f64,
    /// Number of distinct ranks.
    pub flows: u32,
    pub packets: usize,
    pub seed: u32,
}

impl Default for ZipfConfig {
    fn default() -> Self {
        ZipfConfig {
            alpha: 0.4,
            flows: 100_000,
            packets: 3_000_000,
            seed: 0,
        }
    }
}

impl ZipfConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha >= 0.0) {
            return Err(Error::InvalidConfig(format!("zipf alpha {} is negative", self.alpha)));
        }
        if self.flows == 0 || self.packets == 0 {
            return Err(Error::InvalidConfig(
                "zipf trace needs at least one flow and one packet".into(),
            ));
        }
        Ok(())
    }
}

/// Derive the 13-byte record for a rank from four seeded hashes.
pub fn record_for_rank(rank: u32, seed: u32) -> [u8; RECORD_LEN] {
    let h = Murmur3;
    let bytes = rank.to_be_bytes();
    let mut record = [0u8; RECORD_LEN];
    for (i, chunk) in record.chunks_mut(4).enumerate() {
        let word = h.hash(&bytes, seed.wrapping_add(i as u32)).to_be_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
    record
}

/// Write `config.packets` records to `out` and return the exact count per flow id.
pub fn generate<W: Write>(config: &ZipfConfig, out: &mut W) -> Result<HashMap<u32, u32>> {
    config.validate()?;
    let zipf = Zipf::new(config.flows as f64, config.alpha)
        .map_err(|e| Error::InvalidConfig(format!("zipf distribution: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(config.seed as u64);
    let mut records: HashMap<u32, [u8; RECORD_LEN]> = HashMap::new();
    let mut counts: HashMap<u32, u32> = HashMap::new();

    for _ in 0..config.packets {
        let rank = zipf.sample(&mut rng) as u32;
        let record = *records
            .entry(rank)
            .or_insert_with(|| record_for_rank(rank, config.seed));
        out.write_all(&record)?;
        *counts.entry(flow_id_from_key(&record)?).or_insert(0) += 1;
    }
    info!(
        "generated {} flows, {} packets (alpha = {})",
        counts.len(),
        config.packets,
        config.alpha
    );
    Ok(counts)
}

/// `(flow size, number of flows with that size)`, ascending by size.
pub fn flow_size_distribution(counts: &HashMap<u32, u32>) -> Vec<(u32, usize)> {
    let mut fsd: BTreeMap<u32, usize> = BTreeMap::new();
    for &size in counts.values() {
        *fsd.entry(size).or_insert(0) += 1;
    }
    fsd.into_iter().collect()
}

pub fn write_stats<W: Write>(out: &mut W, counts: &HashMap<u32, u32>, packets: usize) -> Result<()> {
    writeln!(out, "{} flows, {} packets", counts.len(), packets)?;
    for (size, flows) in flow_size_distribution(counts) {
        writeln!(out, "{}\t\t{}", size, flows)?;
    }
    Ok(())
}
