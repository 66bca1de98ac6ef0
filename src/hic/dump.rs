//! Contact source backed by juicer-tools `dump` text output.
//!
//! Each resolution is loaded from its own file of whitespace-separated
//! `pos1 pos2 count` records, positions in matrix units. Records are stored
//! symmetrically, so upper-triangle dumps answer queries on both sides of the
//! diagonal.

use super::{ContactSource, DenseMatrix, HicError, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::ops::Range;
use std::path::Path;
use tracing::info;

/// Default cap on bins per fetch, per axis.
pub const DEFAULT_MAX_EXTENT: u64 = 2_000;

/// In-memory sparse contact layers keyed by resolution.
#[derive(Debug, Clone)]
pub struct DumpContacts {
    layers: FxHashMap<u64, BTreeMap<(u64, u64), f64>>,
    max_extent: u64,
}

impl Default for DumpContacts {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXTENT)
    }
}

impl DumpContacts {
    pub fn new(max_extent: u64) -> Self {
        Self {
            layers: FxHashMap::default(),
            max_extent: max_extent.max(1),
        }
    }

    /// Load one resolution from a dump file.
    pub fn load_layer<P: AsRef<Path>>(&mut self, resolution: u64, path: P) -> Result<usize> {
        let file = File::open(path.as_ref())?;
        let records = self.read_layer(resolution, file)?;
        info!(
            resolution,
            records,
            path = %path.as_ref().display(),
            "loaded contact layer"
        );
        Ok(records)
    }

    /// Load one resolution from any reader. Returns the number of records.
    pub fn read_layer<R: Read>(&mut self, resolution: u64, reader: R) -> Result<usize> {
        if resolution == 0 {
            return Err(HicError::UnsupportedResolution(0));
        }
        let reader = BufReader::new(reader);
        let mut records = 0;

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(HicError::Parse {
                    line: line_num + 1,
                    message: "Contact records need three columns: pos1 pos2 count".to_string(),
                });
            }
            let parse_pos = |s: &str| {
                s.parse::<u64>().map_err(|_| HicError::Parse {
                    line: line_num + 1,
                    message: format!("Invalid position: {}", s),
                })
            };
            let pos1 = parse_pos(fields[0])?;
            let pos2 = parse_pos(fields[1])?;
            let count: f64 = fields[2].parse().map_err(|_| HicError::Parse {
                line: line_num + 1,
                message: format!("Invalid count: {}", fields[2]),
            })?;

            self.insert(resolution, pos1, pos2, count)?;
            records += 1;
        }

        self.layers.entry(resolution).or_default();
        Ok(records)
    }

    /// Add `count` contacts between two matrix positions.
    pub fn insert(&mut self, resolution: u64, pos1: u64, pos2: u64, count: f64) -> Result<()> {
        if resolution == 0 {
            return Err(HicError::UnsupportedResolution(0));
        }
        let layer = self.layers.entry(resolution).or_default();
        let (a, b) = (pos1 / resolution, pos2 / resolution);
        *layer.entry((a, b)).or_insert(0.0) += count;
        if a != b {
            *layer.entry((b, a)).or_insert(0.0) += count;
        }
        Ok(())
    }
}

impl ContactSource for DumpContacts {
    fn resolutions(&self) -> Vec<u64> {
        let mut resolutions: Vec<u64> = self.layers.keys().copied().collect();
        resolutions.sort_unstable();
        resolutions
    }

    fn max_extent(&self, _resolution: u64) -> u64 {
        self.max_extent
    }

    fn fetch(&self, resolution: u64, rows: Range<u64>, cols: Range<u64>) -> Result<DenseMatrix> {
        let layer = self
            .layers
            .get(&resolution)
            .ok_or(HicError::UnsupportedResolution(resolution))?;
        if rows.end - rows.start > self.max_extent || cols.end - cols.start > self.max_extent {
            return Err(HicError::Fetch(format!(
                "request {:?} x {:?} exceeds {} bins per call",
                rows, cols, self.max_extent
            )));
        }

        let mut matrix = DenseMatrix::zeros(
            (rows.end - rows.start) as usize,
            (cols.end - cols.start) as usize,
        );
        let mut any = false;
        for r in rows.clone() {
            for (&(_, c), &count) in layer.range((r, cols.start)..(r, cols.end)) {
                matrix.set((r - rows.start) as usize, (c - cols.start) as usize, count);
                any = true;
            }
        }

        // Like the binary reader, a tile without records collapses to 1×1.
        if any {
            Ok(matrix)
        } else {
            Ok(DenseMatrix::zeros(1, 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hic::MatrixTileAssembler;

    const DUMP: &str = "# pos1 pos2 count\n0\t0\t5\n0\t100\t3\n100\t300\t2.5\n\n300\t300\t1\n";

    #[test]
    fn test_read_and_fetch_symmetric() {
        let mut contacts = DumpContacts::new(10);
        assert_eq!(contacts.read_layer(100, DUMP.as_bytes()).unwrap(), 4);
        assert_eq!(contacts.resolutions(), vec![100]);

        let m = contacts.fetch(100, 0..4, 0..4).unwrap();
        assert_eq!(m.shape(), (4, 4));
        assert_eq!(m.get(0, 0), 5.0);
        assert_eq!(m.get(0, 1), 3.0);
        assert_eq!(m.get(1, 0), 3.0);
        assert_eq!(m.get(3, 1), 2.5);
        assert_eq!(m.get(3, 3), 1.0);
    }

    #[test]
    fn test_empty_tile_is_degenerate() {
        let mut contacts = DumpContacts::new(10);
        contacts.read_layer(100, DUMP.as_bytes()).unwrap();
        assert_eq!(contacts.fetch(100, 5..8, 5..9).unwrap().shape(), (1, 1));
    }

    #[test]
    fn test_extent_cap_and_resolution() {
        let mut contacts = DumpContacts::new(2);
        contacts.read_layer(100, DUMP.as_bytes()).unwrap();
        assert!(matches!(
            contacts.fetch(100, 0..4, 0..1),
            Err(HicError::Fetch(_))
        ));
        assert!(matches!(
            contacts.fetch(50, 0..1, 0..1),
            Err(HicError::UnsupportedResolution(50))
        ));

        let assembled = MatrixTileAssembler::new(&contacts)
            .assemble(100, 0..4, 0..4)
            .unwrap();
        assert_eq!(assembled.get(3, 1), 2.5);
        assert_eq!(assembled.get(2, 2), 0.0);
    }

    #[test]
    fn test_bad_record() {
        let mut contacts = DumpContacts::default();
        let err = contacts.read_layer(100, "0 0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, HicError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut contacts = DumpContacts::default();
        assert!(matches!(
            contacts.insert(0, 10, 20, 1.0),
            Err(HicError::UnsupportedResolution(0))
        ));
        assert!(contacts.resolutions().is_empty());
    }
}
