//! Hi-C contact access: the matrix reader seam, tiled retrieval and peak
//! search.
//!
//! All ranges handed to a [`ContactSource`] are half-open bin ranges at the
//! given resolution; bin `b` covers matrix coordinates `[b·res, (b+1)·res)`.

pub mod dump;
pub mod matrix;
pub mod peaks;
pub mod tiles;

use std::io;
use std::ops::Range;
use thiserror::Error;

pub use dump::DumpContacts;
pub use matrix::DenseMatrix;
pub use peaks::{PeakCall, PeakLocator};
pub use tiles::MatrixTileAssembler;

/// Errors raised while reading or searching contact data.
#[derive(Error, Debug)]
pub enum HicError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Resolution {0} is not available")]
    UnsupportedResolution(u64),

    #[error("Contact source offers no resolutions")]
    NoResolutions,

    #[error("Empty bin range requested: rows {rows:?}, cols {cols:?}")]
    EmptyRange { rows: Range<u64>, cols: Range<u64> },

    #[error("Tile shape {got:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Contact fetch failed: {0}")]
    Fetch(String),

    #[error("No interaction peak above the {percentile}th percentile")]
    NoPeakFound { percentile: f64 },
}

pub type Result<T> = std::result::Result<T, HicError>;

/// The contact matrix reader.
///
/// Implementations cap how many bins a single [`fetch`](Self::fetch) may
/// span and answer with a 1×1 matrix when a tile holds no data at all.
pub trait ContactSource: Sync {
    /// Supported bin sizes, in matrix units.
    fn resolutions(&self) -> Vec<u64>;

    /// Largest number of bins per axis a single fetch may cover.
    fn max_extent(&self, resolution: u64) -> u64;

    /// Observed counts for `rows × cols` bins at `resolution`.
    fn fetch(&self, resolution: u64, rows: Range<u64>, cols: Range<u64>) -> Result<DenseMatrix>;
}

impl<T: ContactSource + ?Sized> ContactSource for &T {
    fn resolutions(&self) -> Vec<u64> {
        (**self).resolutions()
    }

    fn max_extent(&self, resolution: u64) -> u64 {
        (**self).max_extent(resolution)
    }

    fn fetch(&self, resolution: u64, rows: Range<u64>, cols: Range<u64>) -> Result<DenseMatrix> {
        (**self).fetch(resolution, rows, cols)
    }
}
