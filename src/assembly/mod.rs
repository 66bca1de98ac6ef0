//! Juicebox-style assembly documents: parsing, queries, structural edits and
//! persistence.
//!
//! A document lists every contig fragment once in a header table
//! (`>name order length`) followed by one line per scaffold holding signed
//! order references. Coordinates are derived by walking the scaffolds in
//! order; they are never stored.

pub mod document;
pub mod edit;
pub mod index;
pub mod reader;
pub mod writer;

use std::io;
use thiserror::Error;

pub use document::{AssemblyDocument, AssemblyInfo, ContigLocation};
pub use edit::InsertSide;
pub use index::{ContigIndex, Placement};
pub use reader::{corrected_path, parse_document, read_document, remove_blank_lines};
pub use writer::{write_atomic, write_document, AssemblyWriter};

/// Errors raised while reading, querying or editing an assembly document.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Contig query needs a name or an order")]
    MissingQueryField,

    #[error("Unknown contig: {0}")]
    UnknownContig(String),

    #[error("Contig {0} is not placed in any scaffold")]
    UnplacedContig(String),

    #[error("Invalid cut site {site} for contig {name} spanning {start}-{end}")]
    InvalidCutSite {
        name: String,
        site: u64,
        start: u64,
        end: u64,
    },

    #[error("Contig {0} is already a fragment; re-cut it instead")]
    AlreadyFragmented(String),

    #[error("Contig {0} is not a fragment and cannot be re-cut")]
    NotAFragment(String),

    #[error("Anchor contig {0} is part of the moved set")]
    AnchorInMoveSet(String),

    #[error("Duplicate contig name in header: {0}")]
    DuplicateName(String),

    #[error("Duplicate contig order in header: {0}")]
    DuplicateId(u32),

    #[error("Contig {0} is placed more than once")]
    DuplicatePlacement(String),

    #[error("Header orders are not contiguous: order {0} is missing")]
    MissingId(u32),
}

pub type Result<T> = std::result::Result<T, AssemblyError>;
