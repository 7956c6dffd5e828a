//! Fixed-width trace records and exact ground truth.
//!
//! A trace file is a flat sequence of 13-byte five-tuple keys. Each record is reduced
//! to a flow id by decoding its first four bytes big-endian.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info};

use crate::error::Result;
use crate::hash::flow_id_from_key;

pub const RECORD_LEN: usize = 13;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Trace {
    pub flow_ids: Vec<u32>,
}

impl Trace {
    pub fn new(flow_ids: Vec<u32>) -> Self {
        Trace { flow_ids }
    }

    /// Read up to `max_packets` records from `path`. A trailing partial record is
    /// ignored.
    pub fn read<P: AsRef<Path>>(path: P, max_packets: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let trace = Self::from_reader(BufReader::new(file), max_packets)?;
        info!("read {} packets from {}", trace.len(), path.display());
        Ok(trace)
    }

    pub fn from_reader<R: Read>(mut reader: R, max_packets: usize) -> Result<Self> {
        let mut flow_ids = Vec::new();
        let mut record = [0u8; RECORD_LEN];
        while flow_ids.len() < max_packets {
            if !read_record(&mut reader, &mut record)? {
                break;
            }
            flow_ids.push(flow_id_from_key(&record)?);
        }
        Ok(Trace { flow_ids })
    }

    pub fn len(&self) -> usize {
        self.flow_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow_ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.flow_ids.iter().copied()
    }
}

// fills `buf` completely, or reports end of input
fn read_record<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = match reader.read(&mut buf[filled..]) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            if filled > 0 {
                debug!("dropping {} trailing bytes", filled);
            }
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

/// Exact per-flow counts of a trace.
#[derive(Debug, Default, Clone)]
pub struct GroundTruth {
    counts: HashMap<u32, u32>,
}

impl GroundTruth {
    pub fn from_trace(trace: &Trace) -> Self {
        let mut counts = HashMap::with_capacity(1 << 17);
        for id in trace.iter() {
            *counts.entry(id).or_insert(0) += 1;
        }
        GroundTruth { counts }
    }

    pub fn get(&self, flow_id: u32) -> u32 {
        self.counts.get(&flow_id).copied().unwrap_or(0)
    }

    /// Number of distinct flows.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count_at_least(&self, threshold: u32) -> usize {
        self.counts.values().filter(|&&v| v >= threshold).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(flow_id: u32) -> [u8; RECORD_LEN] {
        let mut r = [0xffu8; RECORD_LEN];
        r[..4].copy_from_slice(&flow_id.to_be_bytes());
        r
    }

    #[test]
    fn decodes_records() {
        let mut bytes = Vec::new();
        for id in [7u32, 0x0a00_0001, 7] {
            bytes.extend_from_slice(&record(id));
        }
        let t = Trace::from_reader(Cursor::new(bytes), usize::MAX).unwrap();
        assert_eq!(t.flow_ids, vec![7, 0x0a00_0001, 7]);
    }

    #[test]
    fn stops_at_max_packets_and_ignores_partial_tail() {
        let mut bytes = Vec::new();
        for id in 0..5u32 {
            bytes.extend_from_slice(&record(id));
        }
        assert_eq!(Trace::from_reader(Cursor::new(bytes.clone()), 3).unwrap().len(), 3);
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(Trace::from_reader(Cursor::new(bytes), 100).unwrap().len(), 5);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Trace::read("/nonexistent/trace/0.dat", 10).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }

    #[test]
    fn ground_truth_counts() {
        let gt = GroundTruth::from_trace(&Trace::new(vec![1, 2, 1, 3, 1, 2]));
        assert_eq!(gt.len(), 3);
        assert_eq!(gt.get(1), 3);
        assert_eq!(gt.get(4), 0);
        assert_eq!(gt.count_at_least(2), 2);
        assert_eq!(gt.count_at_least(1), 3);
    }
}
