//! The in-memory assembly document and its query operations.

use super::index::{ContigIndex, Placement};
use super::{AssemblyError, Result};
use crate::contig::{Contig, ContigId, Orientation, Scaffold, Span};

/// Contig count and total length of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyInfo {
    pub contig_count: usize,
    pub total_length: u64,
}

/// Where a contig currently sits in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigLocation {
    pub id: ContigId,
    pub name: String,
    pub orientation: Orientation,
    pub length: u64,
    pub span: Span,
    pub scaffold: usize,
}

/// An assembly document: header table plus ordered scaffolds.
///
/// Documents are values. Every structural edit returns a new document and
/// leaves `self` untouched; writing to disk is a separate step.
#[derive(Debug, Clone)]
pub struct AssemblyDocument {
    index: ContigIndex,
    scaffolds: Vec<Scaffold>,
}

impl AssemblyDocument {
    /// Build a document from its header table (position `i` holds order
    /// `i + 1`) and scaffolds.
    pub fn new(contigs: Vec<Contig>, scaffolds: Vec<Scaffold>) -> Result<Self> {
        let index = ContigIndex::build(contigs, &scaffolds)?;
        Ok(Self { index, scaffolds })
    }

    #[inline]
    pub fn index(&self) -> &ContigIndex {
        &self.index
    }

    #[inline]
    pub fn scaffolds(&self) -> &[Scaffold] {
        &self.scaffolds
    }

    #[inline]
    pub fn contig(&self, id: ContigId) -> Option<&Contig> {
        self.index.contig(id)
    }

    /// Contig count and total length, from the header table.
    pub fn info(&self) -> AssemblyInfo {
        AssemblyInfo {
            contig_count: self.index.len(),
            total_length: self.index.total_length(),
        }
    }

    #[inline]
    pub fn total_length(&self) -> u64 {
        self.index.total_length()
    }

    /// Resolve a contig name to its id.
    pub fn resolve(&self, name: &str) -> Result<ContigId> {
        self.index
            .id_of(name)
            .ok_or_else(|| AssemblyError::UnknownContig(name.to_string()))
    }

    pub fn locate_by_name(&self, name: &str) -> Result<ContigLocation> {
        let id = self.resolve(name)?;
        self.locate_by_id(id)
    }

    pub fn locate_by_order(&self, order: u32) -> Result<ContigLocation> {
        let id = self
            .index
            .checked_id(order)
            .ok_or_else(|| AssemblyError::UnknownContig(order.to_string()))?;
        self.locate_by_id(id)
    }

    pub fn locate_by_id(&self, id: ContigId) -> Result<ContigLocation> {
        let contig = self
            .index
            .contig(id)
            .ok_or_else(|| AssemblyError::UnknownContig(id.to_string()))?;
        let placement = self
            .index
            .placement_of(id)
            .ok_or_else(|| AssemblyError::UnplacedContig(contig.name().to_string()))?;
        Ok(self.location(placement))
    }

    /// Look a contig up by name or by order; the name wins if both are given.
    pub fn locate(&self, name: Option<&str>, order: Option<u32>) -> Result<ContigLocation> {
        match (name, order) {
            (Some(name), _) => self.locate_by_name(name),
            (None, Some(order)) => self.locate_by_order(order),
            (None, None) => Err(AssemblyError::MissingQueryField),
        }
    }

    /// Contig covering a document position.
    pub fn contig_at(&self, pos: u64) -> Option<ContigLocation> {
        self.index.placement_at(pos).map(|p| self.location(p))
    }

    /// Every contig selected by `[start, end]`, in scaffold order.
    ///
    /// A contig is selected when its span straddles `start`, or starts at or
    /// after `start` and before `end`. A contig starting exactly at `end` is
    /// not selected.
    pub fn find_contigs_in_range(&self, start: u64, end: u64) -> Vec<ContigLocation> {
        self.index
            .find_range(start, end)
            .into_iter()
            .map(|p| self.location(p))
            .collect()
    }

    /// True when every contig is placed exactly once, so the spans partition
    /// `[0, total_length)`.
    pub fn is_partition(&self) -> bool {
        let mut seen = vec![false; self.index.len()];
        for placement in self.index.placements() {
            let slot = &mut seen[placement.entry.id.index()];
            if *slot {
                return false;
            }
            *slot = true;
        }
        seen.iter().all(|s| *s) && self.index.placed_length() == self.index.total_length()
    }

    fn location(&self, placement: &Placement) -> ContigLocation {
        let id = placement.entry.id;
        // Placements are only built from ids present in the header table.
        let (name, length) = self
            .index
            .contig(id)
            .map(|c| (c.name().to_string(), c.length))
            .unwrap_or_default();
        ContigLocation {
            id,
            name,
            orientation: placement.entry.orientation,
            length,
            span: placement.span,
            scaffold: placement.scaffold,
        }
    }
}
