//! Insertion-site search for translocated regions.
//!
//! A region whose contacts point elsewhere in the assembly is placed next to
//! the contig it interacts with most. The search runs twice: a coarse pass
//! over the whole matrix picks a neighbourhood, then a pass at the finest
//! resolution pins the single strongest bin inside it. The bin boundaries are
//! turned into document cuts and the contig between them becomes the anchor.

use crate::assembly::{AssemblyDocument, AssemblyError, ContigLocation, InsertSide};
use crate::config::SearchConfig;
use crate::contig::Span;
use crate::hic::{ContactSource, HicError, MatrixTileAssembler, PeakLocator};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while resolving an insertion site.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Hic(#[from] HicError),

    #[error("No contig found in insertion window {start}-{end}")]
    EmptyWindow { start: u64, end: u64 },

    #[error("Invalid matrix-to-document ratio: {0} (must be finite and positive)")]
    InvalidRatio(f64),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// An erroneous region in matrix coordinates, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRegion {
    pub start: u64,
    pub end: u64,
}

impl ErrorRegion {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The region in document coordinates.
    pub fn to_document(&self, ratio: f64) -> Span {
        Span::new(to_document(self.start, ratio), to_document(self.end, ratio))
    }
}

/// Where a translocated region should go.
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// The anchor contig, named as in the updated document.
    pub target: String,
    pub side: InsertSide,
    /// Strongest fine-resolution bin, matrix coordinates.
    pub matrix_window: Range<u64>,
    /// `matrix_window` scaled to document coordinates.
    pub document_window: Range<u64>,
    pub coarse_resolution: u64,
}

/// Result of [`InsertionResolver::resolve`]: the document with the window
/// boundaries cut, and the insertion found in it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub document: AssemblyDocument,
    pub insertion: Insertion,
}

/// Scale a matrix coordinate to the document.
#[inline]
pub fn to_document(pos: u64, ratio: f64) -> u64 {
    (pos as f64 * ratio).round() as u64
}

/// Resolution closest to a third of the region length. Ties go to the finer
/// resolution.
pub fn choose_coarse_resolution(resolutions: &[u64], region_len: u64) -> Option<u64> {
    let target = region_len as f64 / 3.0;
    let mut sorted = resolutions.to_vec();
    sorted.sort_unstable();

    let mut best: Option<(u64, f64)> = None;
    for res in sorted {
        let distance = (target - res as f64).abs();
        // Ascending scan with a strict comparison keeps the finer of two
        // equally close resolutions.
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((res, distance));
        }
    }
    best.map(|(res, _)| res)
}

/// Cut the document at `pos` unless a contig already starts there or `pos`
/// lies at or past the end of the placed sequence.
pub fn cut_boundary(
    doc: AssemblyDocument,
    pos: u64,
) -> std::result::Result<AssemblyDocument, AssemblyError> {
    let Some(location) = doc.contig_at(pos) else {
        return Ok(doc);
    };
    if location.span.start == pos {
        return Ok(doc);
    }
    debug!(contig = %location.name, pos, "cutting at window boundary");
    doc.cut_at(&location.name, pos)
}

/// The contig that overlaps `[left, right)` the most.
///
/// When several contigs are selected, the first scores its part right of
/// `left`, the last its part left of `right` and interior ones their whole
/// length. Ties go to the earliest contig in the document.
pub fn select_insert_target(
    doc: &AssemblyDocument,
    left: u64,
    right: u64,
) -> Option<ContigLocation> {
    let mut hits = doc.find_contigs_in_range(left, right);
    if hits.len() <= 1 {
        return hits.pop();
    }

    let last = hits.len() - 1;
    let mut best: Option<(usize, u64)> = None;
    for (i, hit) in hits.iter().enumerate() {
        let score = if i == 0 {
            hit.span.end.saturating_sub(left)
        } else if i == last {
            right.saturating_sub(hit.span.start)
        } else {
            hit.length
        };
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| hits.swap_remove(i))
}

/// Side of `span` nearer to the window `[left, right)`.
pub fn insert_side(span: Span, left: u64, right: u64) -> InsertSide {
    let left_distance = left as i128 - span.start as i128;
    let right_distance = span.end as i128 - right as i128;
    if left_distance < right_distance {
        InsertSide::Left
    } else {
        InsertSide::Right
    }
}

/// Bins fully inside `[start, end)` at `resolution`, widened to the covering
/// bins when no bin fits.
fn region_bins(start: u64, end: u64, resolution: u64) -> Range<u64> {
    let inner = start.div_ceil(resolution)..end / resolution;
    if !inner.is_empty() {
        return inner;
    }
    let lo = start / resolution;
    lo..end.div_ceil(resolution).max(lo + 1)
}

/// Two-pass contact search for translocation insertion sites.
pub struct InsertionResolver<S> {
    assembler: MatrixTileAssembler<S>,
    config: SearchConfig,
    ratio: f64,
}

impl<S: ContactSource> InsertionResolver<S> {
    /// `ratio` converts matrix coordinates to document coordinates and must
    /// be finite and positive.
    pub fn new(source: S, ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ResolveError::InvalidRatio(ratio));
        }
        Ok(Self {
            assembler: MatrixTileAssembler::new(source),
            config: SearchConfig::default(),
            ratio,
        })
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Find the insertion site for `region` and cut the document at the
    /// window boundaries. `doc` itself is left untouched.
    pub fn resolve(&self, doc: &AssemblyDocument, region: ErrorRegion) -> Result<Resolution> {
        let mut resolutions = self.assembler.source().resolutions();
        resolutions.sort_unstable();
        let fine = *resolutions.first().ok_or(HicError::NoResolutions)?;
        let coarse =
            choose_coarse_resolution(&resolutions, region.len()).ok_or(HicError::NoResolutions)?;

        let matrix_extent = (doc.total_length() as f64 / self.ratio).ceil() as u64;
        info!(
            start = region.start,
            end = region.end,
            coarse,
            fine,
            matrix_extent,
            "searching insertion site"
        );

        // Coarse pass over the whole assembly.
        let rows = region_bins(region.start, region.end, coarse);
        let cols = 0..matrix_extent.div_ceil(coarse);
        let padding = self.config.exclusion_padding;
        let exclusion = (region.start / coarse).saturating_sub(padding) as usize
            ..(region.end.div_ceil(coarse) + padding) as usize;

        let matrix = self.assembler.assemble(coarse, rows, cols)?;
        let locator = PeakLocator {
            percentile: self.config.peak_percentile,
            exclude_self: true,
        };
        let peak = locator.locate(&matrix, &exclusion)?;
        let neighbourhood = peak.column as u64 * coarse..(peak.column as u64 + 1) * coarse;
        info!(?neighbourhood, height = peak.height, "coarse insertion neighbourhood");

        // Fine pass inside the neighbourhood.
        let rows = region_bins(region.start, region.end, fine);
        let cols = neighbourhood.start / fine..neighbourhood.end.div_ceil(fine);
        let origin = cols.start * fine;
        let matrix = self.assembler.assemble(fine, rows, cols)?;
        let ((_, column), value) = matrix.argmax().ok_or(HicError::EmptyRange {
            rows: 0..0,
            cols: 0..0,
        })?;
        if value <= 0.0 {
            warn!(?neighbourhood, "no contacts at fine resolution, using first bin");
        }
        let matrix_window = origin + column as u64 * fine..origin + (column as u64 + 1) * fine;

        let left = to_document(matrix_window.start, self.ratio);
        let right = to_document(matrix_window.end, self.ratio);
        info!(?matrix_window, left, right, "insertion window");

        let document = cut_boundary(doc.clone(), left)?;
        let document = cut_boundary(document, right)?;

        let target =
            select_insert_target(&document, left, right).ok_or(ResolveError::EmptyWindow {
                start: left,
                end: right,
            })?;
        let side = insert_side(target.span, left, right);
        info!(target = %target.name, %side, "insertion anchor");

        Ok(Resolution {
            document,
            insertion: Insertion {
                target: target.name,
                side,
                matrix_window,
                document_window: left..right,
                coarse_resolution: coarse,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::parse_document;
    use crate::hic::DumpContacts;

    fn three_contigs() -> AssemblyDocument {
        parse_document(">A 1 300\n>B 2 400\n>C 3 300\n1 2 3\n").unwrap()
    }

    /// Contacts from matrix region 400..460 to position 710 (1:1 ratio).
    fn synthetic_contacts() -> DumpContacts {
        let mut contacts = DumpContacts::new(16);
        contacts.read_layer(100, "".as_bytes()).unwrap();
        for r in 16..18 {
            contacts.insert(25, r * 25, 700, 100.0).unwrap();
        }
        contacts.insert(5, 420, 710, 50.0).unwrap();
        contacts
    }

    #[test]
    fn test_choose_coarse_resolution() {
        assert_eq!(choose_coarse_resolution(&[100, 5, 25], 60), Some(25));
        assert_eq!(choose_coarse_resolution(&[15, 5], 30), Some(5));
        assert_eq!(choose_coarse_resolution(&[], 30), None);
    }

    #[test]
    fn test_region_bins() {
        assert_eq!(region_bins(400, 460, 25), 16..18);
        assert_eq!(region_bins(410, 440, 25), 16..18);
        assert_eq!(region_bins(410, 420, 25), 16..17);
    }

    #[test]
    fn test_cut_boundary() {
        let doc = three_contigs();
        let same = cut_boundary(doc.clone(), 300).unwrap();
        assert_eq!(same.info().contig_count, 3);
        let past = cut_boundary(doc.clone(), 1000).unwrap();
        assert_eq!(past.info().contig_count, 3);

        let cut = cut_boundary(doc, 350).unwrap();
        assert_eq!(cut.info().contig_count, 4);
        assert_eq!(
            cut.locate_by_name("B:::fragment_2").unwrap().span,
            Span::new(350, 700)
        );
    }

    #[test]
    fn test_select_insert_target_scoring() {
        let doc = parse_document(">A 1 100\n>B 2 50\n>C 3 250\n1 2 3\n").unwrap();
        // A scores 20, B 50, C 50: the earlier of the tie wins.
        let target = select_insert_target(&doc, 80, 200).unwrap();
        assert_eq!(target.name, "B");

        let target = select_insert_target(&doc, 10, 60).unwrap();
        assert_eq!(target.name, "A");
    }

    #[test]
    fn test_insert_side() {
        let span = Span::new(100, 200);
        assert_eq!(insert_side(span, 110, 130), InsertSide::Left);
        assert_eq!(insert_side(span, 170, 190), InsertSide::Right);
        assert_eq!(insert_side(span, 100, 200), InsertSide::Right);
    }

    #[test]
    fn test_resolve_synthetic() {
        let doc = three_contigs();
        let contacts = synthetic_contacts();
        let resolver = InsertionResolver::new(&contacts, 1.0).unwrap();

        let resolution = resolver.resolve(&doc, ErrorRegion::new(400, 460)).unwrap();
        let insertion = &resolution.insertion;
        assert_eq!(insertion.coarse_resolution, 25);
        assert_eq!(insertion.matrix_window, 710..715);
        assert_eq!(insertion.document_window, 710..715);
        assert_eq!(insertion.target, "C:::fragment_2");
        assert_eq!(insertion.side, InsertSide::Right);

        let updated = &resolution.document;
        assert_eq!(updated.info().contig_count, 5);
        assert_eq!(updated.total_length(), doc.total_length());
        assert_eq!(
            updated.locate_by_name("C:::fragment_2").unwrap().span,
            Span::new(710, 715)
        );
        // The input document is unchanged.
        assert_eq!(doc.info().contig_count, 3);
    }

    #[test]
    fn test_resolve_without_resolutions() {
        let contacts = DumpContacts::default();
        let resolver = InsertionResolver::new(&contacts, 1.0).unwrap();
        let err = resolver
            .resolve(&three_contigs(), ErrorRegion::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, ResolveError::Hic(HicError::NoResolutions)));
    }

    #[test]
    fn test_ratio_must_be_positive() {
        let contacts = synthetic_contacts();
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                InsertionResolver::new(&contacts, ratio),
                Err(ResolveError::InvalidRatio(_))
            ));
        }
        assert_eq!(InsertionResolver::new(&contacts, 0.5).unwrap().ratio(), 0.5);
    }
}
