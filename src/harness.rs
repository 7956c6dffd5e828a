//! Measurement windows: feed a trace through a backend and score the reported heavy
//! hitters against exact counts.

use std::time::Instant;

use log::{debug, info};

use crate::config::MeasurementConfig;
use crate::heavy_part::SketchStats;
use crate::trace::{GroundTruth, Trace};
use crate::traits::HeavyHitterBackend;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Accuracy {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Average relative error over true positives.
    pub are: f64,
    /// Average absolute error over true positives.
    pub aae: f64,
}

impl Accuracy {
    /// Score `reported` heavy hitters against `truth` at `threshold`.
    pub fn score(reported: &[(u32, u32)], truth: &GroundTruth, threshold: u32) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut abs_err = 0.0;
        let mut rel_err = 0.0;
        for &(id, est) in reported {
            let real = truth.get(id);
            if real >= threshold {
                tp += 1;
                let err = (est as f64 - real as f64).abs();
                abs_err += err;
                if real > 0 {
                    rel_err += err / real as f64;
                }
            } else {
                fp += 1;
            }
        }
        let heavy = truth.count_at_least(threshold);

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            1.0
        };
        let recall = if heavy > 0 {
            tp as f64 / heavy as f64
        } else {
            1.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let (are, aae) = if tp > 0 {
            (rel_err / tp as f64, abs_err / tp as f64)
        } else {
            (0.0, 0.0)
        };
        Accuracy {
            precision,
            recall,
            f1,
            are,
            aae,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub backend: &'static str,
    pub packets: usize,
    pub flows: usize,
    pub threshold: u32,
    pub reported: usize,
    pub accuracy: Accuracy,
    /// Million packets per second during the timed pass.
    pub throughput_mpps: f64,
    /// Eviction counters of the timed pass, when the backend keeps them.
    pub stats: Option<SketchStats>,
    pub eviction_ratio: Option<f64>,
}

/// Warm up, clear, then time one full pass of `trace` through `backend`.
pub fn run_window<B: HeavyHitterBackend + ?Sized>(
    backend: &mut B,
    trace: &Trace,
    truth: &GroundTruth,
    threshold: u32,
    config: &MeasurementConfig,
) -> WindowReport {
    let warmup = trace.len().min(config.warmup_packets);
    for id in trace.iter().take(warmup) {
        backend.insert(id, 1);
    }
    backend.clear();

    let start = Instant::now();
    for id in trace.iter() {
        backend.insert(id, 1);
    }
    let elapsed = start.elapsed().as_secs_f64();
    let throughput_mpps = if elapsed > 0.0 {
        trace.len() as f64 / elapsed / 1e6
    } else {
        0.0
    };

    let stats = backend.stats();
    let eviction_ratio = backend.eviction_ratio();
    if let Some(st) = stats {
        debug!(
            "{}: promotions = {}, full evictions = {}",
            backend.name(),
            st.promotions,
            st.full_evictions
        );
    }

    let (reported, _) = backend.extract_heavy_hitters(threshold, backend.capacity());
    let accuracy = Accuracy::score(&reported, truth, threshold);
    info!(
        "{}: {} packets, threshold = {}, reported = {}, F1 = {:.6}",
        backend.name(),
        trace.len(),
        threshold,
        reported.len(),
        accuracy.f1
    );
    WindowReport {
        backend: backend.name(),
        packets: trace.len(),
        flows: truth.len(),
        threshold,
        reported: reported.len(),
        accuracy,
        throughput_mpps,
        stats,
        eviction_ratio,
    }
}

/// Running averages over measurement windows.
#[derive(Debug, Default, Clone)]
pub struct Summary {
    windows: usize,
    total: Accuracy,
    throughput: f64,
}

impl Summary {
    pub fn add(&mut self, report: &WindowReport) {
        self.windows += 1;
        self.total.precision += report.accuracy.precision;
        self.total.recall += report.accuracy.recall;
        self.total.f1 += report.accuracy.f1;
        self.total.are += report.accuracy.are;
        self.total.aae += report.accuracy.aae;
        self.throughput += report.throughput_mpps;
    }

    pub fn windows(&self) -> usize {
        self.windows
    }

    pub fn average(&self) -> Option<(Accuracy, f64)> {
        if self.windows == 0 {
            return None;
        }
        let n = self.windows as f64;
        let avg = Accuracy {
            precision: self.total.precision / n,
            recall: self.total.recall / n,
            f1: self.total.f1 / n,
            are: self.total.are / n,
            aae: self.total.aae / n,
        };
        Some((avg, self.throughput / n))
    }
}
