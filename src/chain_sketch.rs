//! Multi-row sketch with randomized, chained eviction.
//!
//! Each row holds `width` single-flow cells. A flow that finds no free or matching
//! cell replaces the smallest of its hashed cells with probability
//! `increment / (count + increment)`, inheriting the old count. Before being
//! overwritten, the old occupant is pushed rightwards along its row for up to
//! `chain_length` cells, so large flows tend to survive a collision.

use std::collections::HashMap;
use std::mem::size_of;

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::hash::{HashOracle, Murmur3};
use crate::traits::{HeavyHitterBackend, InsertOutcome, TopK};

pub const DEFAULT_DEPTH: usize = 4;
pub const DEFAULT_CHAIN_LENGTH: usize = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Cell {
    key: u32,
    count: u32,
}

impl Cell {
    fn holds(&self, flow_id: u32) -> bool {
        self.count > 0 && self.key == flow_id
    }
}

#[derive(Debug, Clone)]
pub struct ChainSketch<H = Murmur3> {
    cells: Vec<Cell>,
    width: usize,
    depth: usize,
    chain_length: usize,
    seeds: Vec<u32>,
    hasher: H,
    rng: StdRng,
}

impl ChainSketch<Murmur3> {
    pub fn new(width: usize, depth: usize, chain_length: usize, seed: u64) -> Result<Self> {
        Self::with_hasher(width, depth, chain_length, seed, Murmur3)
    }

    /// Four rows sized to fill `bytes`.
    pub fn from_memory(bytes: usize, seed: u64) -> Result<Self> {
        let width = bytes / DEFAULT_DEPTH / size_of::<Cell>();
        Self::new(width, DEFAULT_DEPTH, DEFAULT_CHAIN_LENGTH, seed)
    }
}

impl<H: HashOracle> ChainSketch<H> {
    pub fn with_hasher(
        width: usize,
        depth: usize,
        chain_length: usize,
        seed: u64,
        hasher: H,
    ) -> Result<Self> {
        if width == 0 || depth == 0 {
            return Err(Error::InvalidConfig(format!(
                "chain sketch needs a positive width and depth, got {}x{}",
                depth, width
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let base: u32 = rng.random();
        let seeds = (0..depth as u32).map(|i| base.wrapping_add(i)).collect();
        debug!(
            "chain sketch created: depth = {}, width = {}, chain = {}",
            depth, width, chain_length
        );
        Ok(ChainSketch {
            cells: vec![Cell::default(); width * depth],
            width,
            depth,
            chain_length,
            seeds,
            hasher,
            rng,
        })
    }

    fn column(&self, row: usize, flow_id: u32) -> usize {
        self.hasher.hash_flow(flow_id, self.seeds[row]) as usize % self.width
    }

    fn insert_flow(&mut self, flow_id: u32, increment: u32) -> InsertOutcome {
        if increment == 0 {
            return InsertOutcome::Success;
        }
        let mut victim = None;
        let mut min = u32::MAX;
        for row in 0..self.depth {
            let col = self.column(row, flow_id);
            let idx = row * self.width + col;
            let cell = &mut self.cells[idx];
            if cell.count == 0 {
                *cell = Cell {
                    key: flow_id,
                    count: increment,
                };
                return InsertOutcome::Success;
            }
            if cell.key == flow_id {
                cell.count = cell.count.saturating_add(increment);
                return InsertOutcome::Success;
            }
            if cell.count < min {
                min = cell.count;
                victim = Some((row, col, idx));
            }
        }
        let Some((row, col, loc)) = victim else {
            return InsertOutcome::Rejected;
        };

        let draw = self.rng.random_range(1..=min as u64 + increment as u64);
        if draw > increment as u64 {
            return InsertOutcome::Rejected;
        }
        if self.chain_length > 0 {
            self.push_out(row, col, loc, flow_id);
        }
        let cell = &mut self.cells[loc];
        cell.key = flow_id;
        cell.count = cell.count.saturating_add(increment);
        InsertOutcome::Success
    }

    /// Move the occupant of `loc` along its row before it is overwritten.
    fn push_out(&mut self, row: usize, col: usize, loc: usize, flow_id: u32) {
        let mut next = (col + 1) % self.width;
        let mut idx = row * self.width + next;
        if idx == loc {
            return;
        }
        let evicted = self.cells[loc];
        if self.cells[idx].holds(evicted.key) {
            let n = &mut self.cells[idx];
            n.count = n.count.saturating_add(evicted.count);
            return;
        }
        if self.cells[idx].holds(flow_id) {
            let arriving = self.cells[idx].count;
            self.cells[idx] = evicted;
            self.cells[loc].count = evicted.count.saturating_add(arriving);
            return;
        }

        let mut round = 1;
        while round <= self.chain_length && self.cells[loc].count > self.cells[idx].count {
            let held = self.cells[loc].count as f64;
            let neighbor = self.cells[idx].count as f64;
            let keep = (held / (held + neighbor)).powi(round as i32);
            if self.rng.random::<f64>() < keep {
                self.cells[idx] = self.cells[loc];
                break;
            }
            next = (next + 1) % self.width;
            idx = row * self.width + next;
            round += 1;
            if idx == loc {
                break;
            }
            // stray counts of the arriving flow go with it
            if self.cells[idx].holds(flow_id) {
                let stray = self.cells[idx].count;
                self.cells[idx].count = 0;
                let l = &mut self.cells[loc];
                l.count = l.count.saturating_add(stray);
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl<H: HashOracle> HeavyHitterBackend for ChainSketch<H> {
    fn name(&self) -> &'static str {
        "ChainSketch"
    }

    fn insert(&mut self, flow_id: u32, increment: u32) -> InsertOutcome {
        self.insert_flow(flow_id, increment)
    }

    fn query(&self, flow_id: u32) -> u32 {
        let span = self.chain_length.min(self.width - 1);
        let mut total = 0u32;
        for row in 0..self.depth {
            let col = self.column(row, flow_id);
            for offset in 0..=span {
                let cell = &self.cells[row * self.width + (col + offset) % self.width];
                if cell.holds(flow_id) {
                    total = total.saturating_add(cell.count);
                }
            }
        }
        total
    }

    fn extract_heavy_hitters(&self, threshold: u32, capacity: usize) -> (Vec<(u32, u32)>, usize) {
        let mut totals: HashMap<u32, u32> = HashMap::new();
        for cell in self.cells.iter().filter(|c| c.count > 0) {
            let t = totals.entry(cell.key).or_insert(0);
            *t = t.saturating_add(cell.count);
        }
        let mut qualifying: Vec<(u32, u32)> = totals
            .into_iter()
            .filter(|&(_, count)| count >= threshold)
            .collect();
        qualifying.sort_unstable_by_key(|&(key, _)| key);

        let mut top = TopK::new(capacity);
        for (key, count) in qualifying {
            top.offer(key, count);
        }
        top.finish()
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    fn capacity(&self) -> usize {
        self.cells.len()
    }
}
