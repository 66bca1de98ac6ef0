//! Contig indexing for name, order and coordinate queries.

use super::{AssemblyError, Result};
use crate::contig::{Contig, ContigId, OrientedContig, Scaffold, Span};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// One occurrence of a contig in the scaffold walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub entry: OrientedContig,
    pub span: Span,
    /// Index of the scaffold line holding this entry.
    pub scaffold: usize,
}

/// Header table plus the coordinate spans derived from the current scaffold
/// order. Placements are stored in walk order, so their spans are sorted and
/// can be binary searched.
#[derive(Debug, Clone)]
pub struct ContigIndex {
    contigs: Vec<Contig>,
    by_name: FxHashMap<String, ContigId>,
    placements: Vec<Placement>,
    first_placement: Vec<Option<usize>>,
    total_length: u64,
}

impl ContigIndex {
    /// Build an index over `contigs` (position `i` holds order `i + 1`) and
    /// the spans implied by walking `scaffolds`.
    pub fn build(contigs: Vec<Contig>, scaffolds: &[Scaffold]) -> Result<Self> {
        let mut by_name =
            FxHashMap::with_capacity_and_hasher(contigs.len(), Default::default());
        for (idx, contig) in contigs.iter().enumerate() {
            if by_name
                .insert(contig.name().to_string(), ContigId::from_index(idx))
                .is_some()
            {
                return Err(AssemblyError::DuplicateName(contig.name().to_string()));
            }
        }

        let mut placements = Vec::new();
        let mut first_placement = vec![None; contigs.len()];
        let mut cursor = 0u64;

        for (scaffold_idx, scaffold) in scaffolds.iter().enumerate() {
            for entry in scaffold.iter() {
                let contig = contigs
                    .get(entry.id.index())
                    .ok_or_else(|| AssemblyError::UnknownContig(entry.id.to_string()))?;
                let slot = &mut first_placement[entry.id.index()];
                if slot.is_some() {
                    return Err(AssemblyError::DuplicatePlacement(contig.name().to_string()));
                }
                *slot = Some(placements.len());

                let span = Span::new(cursor, cursor + contig.length);
                cursor = span.end;
                placements.push(Placement {
                    entry: *entry,
                    span,
                    scaffold: scaffold_idx,
                });
            }
        }

        let total_length = contigs.iter().map(|c| c.length).sum();

        Ok(Self {
            contigs,
            by_name,
            placements,
            first_placement,
            total_length,
        })
    }

    /// Number of contigs in the header table.
    #[inline]
    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    /// Sum of all header lengths.
    #[inline]
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Length covered by the scaffold walk.
    #[inline]
    pub fn placed_length(&self) -> u64 {
        self.placements.last().map_or(0, |p| p.span.end)
    }

    #[inline]
    pub fn contig(&self, id: ContigId) -> Option<&Contig> {
        self.contigs.get(id.index())
    }

    /// All contigs in order.
    pub fn contigs(&self) -> impl Iterator<Item = (ContigId, &Contig)> {
        self.contigs
            .iter()
            .enumerate()
            .map(|(idx, c)| (ContigId::from_index(idx), c))
    }

    pub(crate) fn contig_slice(&self) -> &[Contig] {
        &self.contigs
    }

    /// Resolve a name, with or without the leading `>`.
    pub fn id_of(&self, name: &str) -> Option<ContigId> {
        let name = name.strip_prefix('>').unwrap_or(name);
        self.by_name.get(name).copied()
    }

    /// Resolve an order magnitude.
    pub fn checked_id(&self, order: u32) -> Option<ContigId> {
        ContigId::new(order).filter(|id| id.index() < self.contigs.len())
    }

    /// All placements in walk order.
    #[inline]
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// First placement of a contig in the walk.
    pub fn placement_of(&self, id: ContigId) -> Option<&Placement> {
        let slot = (*self.first_placement.get(id.index())?)?;
        self.placements.get(slot)
    }

    /// Placement covering a document position.
    pub fn placement_at(&self, pos: u64) -> Option<&Placement> {
        let idx = self.first_ending_after(pos);
        self.placements.get(idx).filter(|p| p.span.contains(pos))
    }

    /// Placements selected by the range `[start, end]`, in walk order.
    pub fn find_range(&self, start: u64, end: u64) -> Vec<&Placement> {
        let mut results = Vec::new();
        for placement in self.placements.iter().skip(self.first_ending_after(start)) {
            if placement.span.start >= start && placement.span.start >= end {
                break;
            }
            if placement.span.selected_by(start, end) {
                results.push(placement);
            }
        }
        results
    }

    /// Index of the first placement whose span ends after `pos`.
    fn first_ending_after(&self, pos: u64) -> usize {
        self.placements
            .binary_search_by(|p| {
                if p.span.end <= pos {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            })
            .unwrap_or_else(|i| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ContigId {
        ContigId::new(n).unwrap()
    }

    fn sample() -> ContigIndex {
        let contigs = vec![
            Contig::new("a", 100),
            Contig::new("b", 50),
            Contig::new("c", 30),
        ];
        let scaffolds = vec![
            Scaffold::new(vec![OrientedContig::forward(id(1)), OrientedContig::reverse(id(3))]),
            Scaffold::new(vec![OrientedContig::forward(id(2))]),
        ];
        ContigIndex::build(contigs, &scaffolds).unwrap()
    }

    #[test]
    fn test_spans_follow_walk_order() {
        let index = sample();
        assert_eq!(index.placement_of(id(1)).unwrap().span, Span::new(0, 100));
        assert_eq!(index.placement_of(id(3)).unwrap().span, Span::new(100, 130));
        assert_eq!(index.placement_of(id(2)).unwrap().span, Span::new(130, 180));
        assert_eq!(index.placement_of(id(2)).unwrap().scaffold, 1);
        assert_eq!(index.total_length(), 180);
        assert_eq!(index.placed_length(), 180);
    }

    #[test]
    fn test_placement_at() {
        let index = sample();
        assert_eq!(index.placement_at(0).unwrap().entry.id, id(1));
        assert_eq!(index.placement_at(99).unwrap().entry.id, id(1));
        assert_eq!(index.placement_at(100).unwrap().entry.id, id(3));
        assert_eq!(index.placement_at(179).unwrap().entry.id, id(2));
        assert!(index.placement_at(180).is_none());
    }

    #[test]
    fn test_find_range() {
        let index = sample();
        let hits: Vec<u32> = index
            .find_range(90, 140)
            .iter()
            .map(|p| p.entry.id.get())
            .collect();
        assert_eq!(hits, vec![1, 3, 2]);

        let hits: Vec<u32> = index
            .find_range(100, 130)
            .iter()
            .map(|p| p.entry.id.get())
            .collect();
        assert_eq!(hits, vec![3]);
    }

    #[test]
    fn test_names_with_prefix() {
        let index = sample();
        assert_eq!(index.id_of(">b"), Some(id(2)));
        assert_eq!(index.id_of("b"), Some(id(2)));
        assert_eq!(index.id_of("z"), None);
        assert_eq!(index.checked_id(3), Some(id(3)));
        assert_eq!(index.checked_id(4), None);
    }

    #[test]
    fn test_unknown_scaffold_reference() {
        let contigs = vec![Contig::new("a", 10)];
        let scaffolds = vec![Scaffold::new(vec![OrientedContig::forward(id(2))])];
        let err = ContigIndex::build(contigs, &scaffolds).unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownContig(_)));
    }

    #[test]
    fn test_repeated_placement_rejected() {
        let contigs = vec![Contig::new("a", 10), Contig::new("b", 20)];
        let scaffolds = vec![
            Scaffold::new(vec![OrientedContig::forward(id(1)), OrientedContig::forward(id(2))]),
            Scaffold::new(vec![OrientedContig::reverse(id(1))]),
        ];
        let err = ContigIndex::build(contigs, &scaffolds).unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicatePlacement(ref name) if name == "a"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let contigs = vec![Contig::new("a", 10), Contig::new("a", 20)];
        let err = ContigIndex::build(contigs, &[]).unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicateName(_)));
    }
}
