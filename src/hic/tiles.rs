//! Tiled retrieval of large contact matrices.
//!
//! A contact source caps the extent of a single fetch, so a logical request is
//! split into a grid of tiles. Tiles are fetched independently (in parallel on
//! the Rayon pool unless disabled) and stitched back in grid order.

use super::{ContactSource, DenseMatrix, HicError, Result};
use crate::config;
use rayon::prelude::*;
use std::ops::Range;
use tracing::debug;

/// Split `range` into the fewest near-equal blocks no longer than `max_len`.
pub fn partition(range: Range<u64>, max_len: u64) -> Vec<Range<u64>> {
    let len = range.end.saturating_sub(range.start);
    if len == 0 {
        return Vec::new();
    }
    let max_len = max_len.max(1);
    let blocks = len.div_ceil(max_len);
    let block_len = len.div_ceil(blocks);

    let mut parts = Vec::with_capacity(blocks as usize);
    let mut start = range.start;
    while start < range.end {
        let end = (start + block_len).min(range.end);
        parts.push(start..end);
        start = end;
    }
    parts
}

/// Presents one dense matrix for an arbitrary bin request.
pub struct MatrixTileAssembler<S> {
    source: S,
    /// Fetch tiles on the Rayon pool.
    pub parallel: bool,
}

impl<S: ContactSource> MatrixTileAssembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            parallel: config::is_parallel_fetch(),
        }
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch `rows × cols` bins at `resolution` as a single matrix.
    pub fn assemble(
        &self,
        resolution: u64,
        rows: Range<u64>,
        cols: Range<u64>,
    ) -> Result<DenseMatrix> {
        if rows.is_empty() || cols.is_empty() {
            return Err(HicError::EmptyRange { rows, cols });
        }

        let max_extent = self.source.max_extent(resolution);
        let row_blocks = partition(rows.clone(), max_extent);
        let col_blocks = partition(cols.clone(), max_extent);

        let tiles: Vec<(Range<u64>, Range<u64>)> = row_blocks
            .iter()
            .flat_map(|r| col_blocks.iter().map(move |c| (r.clone(), c.clone())))
            .collect();

        debug!(
            resolution,
            ?rows,
            ?cols,
            row_blocks = row_blocks.len(),
            col_blocks = col_blocks.len(),
            "assembling contact matrix"
        );

        let fetched: Vec<DenseMatrix> = if self.parallel {
            tiles
                .par_iter()
                .map(|(r, c)| self.fetch_tile(resolution, r, c))
                .collect::<Result<_>>()?
        } else {
            tiles
                .iter()
                .map(|(r, c)| self.fetch_tile(resolution, r, c))
                .collect::<Result<_>>()?
        };

        let mut bands = Vec::with_capacity(row_blocks.len());
        for band in fetched.chunks(col_blocks.len()) {
            bands.push(DenseMatrix::hstack(band).ok_or_else(|| stitch_error(band))?);
        }
        DenseMatrix::vstack(&bands).ok_or_else(|| stitch_error(&bands))
    }

    /// Fetch one tile, replacing an empty-tile answer by zeros of the
    /// expected shape.
    fn fetch_tile(
        &self,
        resolution: u64,
        rows: &Range<u64>,
        cols: &Range<u64>,
    ) -> Result<DenseMatrix> {
        let expected = (
            (rows.end - rows.start) as usize,
            (cols.end - cols.start) as usize,
        );
        let tile = self
            .source
            .fetch(resolution, rows.clone(), cols.clone())?;

        if tile.shape() == expected {
            return Ok(tile);
        }
        if tile.shape() == (1, 1) || tile.is_empty() {
            debug!(?rows, ?cols, "empty tile, substituting zeros");
            return Ok(DenseMatrix::zeros(expected.0, expected.1));
        }
        Err(HicError::ShapeMismatch {
            expected,
            got: tile.shape(),
        })
    }
}

fn stitch_error(parts: &[DenseMatrix]) -> HicError {
    let got = parts.first().map_or((0, 0), DenseMatrix::shape);
    HicError::ShapeMismatch {
        expected: got,
        got: parts.last().map_or((0, 0), DenseMatrix::shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Synthetic source where cell (r, c) holds `r * 1000 + c`, except for an
    /// empty quadrant which answers with a 1×1 matrix.
    struct GridSource {
        max_extent: u64,
        empty_from_col: u64,
        calls: AtomicUsize,
    }

    impl GridSource {
        fn new(max_extent: u64) -> Self {
            Self {
                max_extent,
                empty_from_col: u64::MAX,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ContactSource for GridSource {
        fn resolutions(&self) -> Vec<u64> {
            vec![1]
        }

        fn max_extent(&self, _resolution: u64) -> u64 {
            self.max_extent
        }

        fn fetch(
            &self,
            _resolution: u64,
            rows: Range<u64>,
            cols: Range<u64>,
        ) -> Result<DenseMatrix> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(rows.end - rows.start <= self.max_extent);
            assert!(cols.end - cols.start <= self.max_extent);
            if cols.start >= self.empty_from_col {
                return Ok(DenseMatrix::zeros(1, 1));
            }
            let data = rows
                .clone()
                .flat_map(|r| cols.clone().map(move |c| (r * 1000 + c) as f64))
                .collect();
            Ok(DenseMatrix::from_vec(
                (rows.end - rows.start) as usize,
                (cols.end - cols.start) as usize,
                data,
            )
            .unwrap())
        }
    }

    #[test]
    fn test_partition() {
        assert_eq!(partition(0..120, 50), vec![0..40, 40..80, 80..120]);
        assert_eq!(partition(10..20, 50), vec![10..20]);
        assert_eq!(partition(0..101, 50), vec![0..34, 34..68, 68..101]);
        assert!(partition(5..5, 50).is_empty());
    }

    #[test]
    fn test_assemble_matches_direct_fetch() {
        let source = GridSource::new(50);
        let mut assembler = MatrixTileAssembler::new(&source);
        assembler.parallel = false;

        let matrix = assembler.assemble(1, 0..120, 30..100).unwrap();
        assert_eq!(matrix.shape(), (120, 70));
        assert!(source.calls.load(Ordering::SeqCst) >= 3 * 2);
        for r in [0usize, 39, 40, 79, 80, 119] {
            for c in [0usize, 34, 35, 69] {
                assert_eq!(matrix.get(r, c), (r * 1000 + c + 30) as f64);
            }
        }
    }

    #[test]
    fn test_parallel_and_serial_agree() {
        let source = GridSource::new(7);
        let mut assembler = MatrixTileAssembler::new(&source);
        assembler.parallel = false;
        let serial = assembler.assemble(1, 3..40, 0..25).unwrap();
        assembler.parallel = true;
        let parallel = assembler.assemble(1, 3..40, 0..25).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_empty_tiles_become_zeros() {
        let mut source = GridSource::new(10);
        source.empty_from_col = 10;
        let assembler = MatrixTileAssembler::new(&source);

        let matrix = assembler.assemble(1, 0..5, 0..30).unwrap();
        assert_eq!(matrix.shape(), (5, 30));
        assert_eq!(matrix.get(4, 9), 4009.0);
        assert_eq!(matrix.get(4, 10), 0.0);
        assert_eq!(matrix.get(0, 29), 0.0);
    }

    #[test]
    fn test_empty_request() {
        let source = GridSource::new(10);
        let assembler = MatrixTileAssembler::new(&source);
        assert!(matches!(
            assembler.assemble(1, 4..4, 0..10),
            Err(HicError::EmptyRange { .. })
        ));
    }
}
