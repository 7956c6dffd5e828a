//! Bounded-memory heavy-hitter detection for flow streams.
//!
//! [`TwoFaSketch`] counts flows in a fixed table of eight-slot buckets and reports
//! flows whose estimated count reaches a threshold. [`ChainSketch`] is an alternative
//! backend behind the same [`HeavyHitterBackend`] interface.

pub mod bucket;
pub mod chain_sketch;
pub mod config;
pub mod error;
pub mod harness;
pub mod hash;
pub mod heavy_part;
pub mod log;
pub mod sketch;
pub mod trace;
pub mod traits;
pub mod zipf;

pub use chain_sketch::ChainSketch;
pub use config::{MeasurementConfig, SketchConfig};
pub use error::{Error, Result};
pub use hash::{HashOracle, Murmur3};
pub use heavy_part::{HeavyHitterSketch, SketchStats};
pub use sketch::TwoFaSketch;
pub use traits::{HeavyHitterBackend, InsertOutcome};
