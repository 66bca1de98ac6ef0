//! Structural edits on assembly documents.
//!
//! Every edit validates its targets first and then builds a fresh document,
//! so a failed edit never leaves a partially modified document behind.
//!
//! Cutting a contig into `k` pieces replaces order `n` by `n..n+k`; every
//! order above `n` moves up by `k - 1`. Piece `j` (order `n + j`) holds the
//! `j`-th stretch of the contig's own sequence, which is the `j`-th stretch
//! in document order for a forward contig and the `j`-th from the right for
//! a reverse one.

use super::{AssemblyDocument, AssemblyError, Result};
use crate::contig::{Contig, ContigId, FragmentLineage, OrientedContig, Scaffold};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Side of an anchor contig at which moved contigs are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertSide {
    Left,
    Right,
}

impl fmt::Display for InsertSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertSide::Left => write!(f, "left"),
            InsertSide::Right => write!(f, "right"),
        }
    }
}

impl FromStr for InsertSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(InsertSide::Left),
            "right" => Ok(InsertSide::Right),
            other => Err(format!("invalid side '{}', expected left or right", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitMode {
    /// The target is an original contig; pieces become `name:::fragment_N`.
    Fresh,
    /// The target is already a fragment; pieces and later siblings are
    /// renumbered within the parent's lineage.
    Recut,
}

impl AssemblyDocument {
    /// Cut an original contig in two at document coordinate `site`.
    pub fn cut_in_two(&self, name: &str, site: u64) -> Result<AssemblyDocument> {
        self.split(name, &[site], SplitMode::Fresh)
    }

    /// Cut an original contig in three at `site1 < site2`.
    pub fn cut_in_three(&self, name: &str, site1: u64, site2: u64) -> Result<AssemblyDocument> {
        self.split(name, &[site1, site2], SplitMode::Fresh)
    }

    /// Cut an existing fragment in two at `site`.
    pub fn re_cut(&self, name: &str, site: u64) -> Result<AssemblyDocument> {
        self.split(name, &[site], SplitMode::Recut)
    }

    /// Cut an existing fragment in three at `site1 < site2`.
    pub fn re_cut_in_three(&self, name: &str, site1: u64, site2: u64) -> Result<AssemblyDocument> {
        self.split(name, &[site1, site2], SplitMode::Recut)
    }

    /// Cut any contig in two, re-cutting when it is already a fragment.
    pub fn cut_at(&self, name: &str, site: u64) -> Result<AssemblyDocument> {
        let id = self.resolve(name)?;
        match self.contig(id).map(Contig::is_fragment) {
            Some(true) => self.re_cut(name, site),
            _ => self.cut_in_two(name, site),
        }
    }

    /// Cut any contig in three, re-cutting when it is already a fragment.
    pub fn cut_at_two(&self, name: &str, site1: u64, site2: u64) -> Result<AssemblyDocument> {
        let id = self.resolve(name)?;
        match self.contig(id).map(Contig::is_fragment) {
            Some(true) => self.re_cut_in_three(name, site1, site2),
            _ => self.cut_in_three(name, site1, site2),
        }
    }

    fn split(&self, name: &str, sites: &[u64], mode: SplitMode) -> Result<AssemblyDocument> {
        let location = self.locate_by_name(name)?;
        let target = location.id;
        let contig = self
            .contig(target)
            .ok_or_else(|| AssemblyError::UnknownContig(name.to_string()))?;

        let base = match (mode, contig.lineage()) {
            (SplitMode::Fresh, None) => FragmentLineage::new(contig.name(), 1, false),
            (SplitMode::Fresh, Some(_)) => {
                return Err(AssemblyError::AlreadyFragmented(contig.name().to_string()))
            }
            (SplitMode::Recut, Some(lineage)) => lineage.clone(),
            (SplitMode::Recut, None) => {
                return Err(AssemblyError::NotAFragment(contig.name().to_string()))
            }
        };

        let span = location.span;
        let mut previous = span.start;
        for &site in sites {
            if site <= previous || !span.is_interior(site) {
                return Err(AssemblyError::InvalidCutSite {
                    name: contig.name().to_string(),
                    site,
                    start: span.start,
                    end: span.end,
                });
            }
            previous = site;
        }

        // Piece lengths in document order.
        let mut lengths: Vec<u64> = Vec::with_capacity(sites.len() + 1);
        let mut cursor = span.start;
        for &site in sites {
            lengths.push(site - cursor);
            cursor = site;
        }
        lengths.push(span.end - cursor);
        if location.orientation.is_reverse() {
            lengths.reverse();
        }

        let pieces = lengths.len() as u32;
        let shift = pieces - 1;

        let mut contigs = Vec::with_capacity(self.index().len() + shift as usize);
        for (id, existing) in self.index().contigs() {
            if id == target {
                for (j, length) in lengths.iter().enumerate() {
                    let lineage = base.with_index(base.index + j as u32);
                    contigs.push(Contig::fragment(lineage, *length));
                }
                continue;
            }
            match (mode, existing.lineage()) {
                (SplitMode::Recut, Some(sibling))
                    if sibling.parent == base.parent && sibling.index > base.index =>
                {
                    let renamed = sibling.with_index(sibling.index + shift);
                    contigs.push(Contig::fragment(renamed, existing.length));
                }
                _ => contigs.push(existing.clone()),
            }
        }

        let scaffolds = self
            .scaffolds()
            .iter()
            .map(|scaffold| {
                let mut entries = Vec::with_capacity(scaffold.len() + shift as usize);
                for entry in scaffold.iter() {
                    if entry.id == target {
                        let ids = (0..pieces).map(|j| target.offset(j));
                        if entry.orientation.is_reverse() {
                            entries.extend(ids.rev().map(OrientedContig::reverse));
                        } else {
                            entries.extend(ids.map(OrientedContig::forward));
                        }
                    } else {
                        entries.push(OrientedContig::new(
                            entry.id.shifted_above(target, shift),
                            entry.orientation,
                        ));
                    }
                }
                Scaffold::new(entries)
            })
            .collect();

        debug!(
            contig = contig.name(),
            ?sites,
            ?lengths,
            "split contig into {} pieces",
            pieces
        );
        AssemblyDocument::new(contigs, scaffolds)
    }

    /// Move contigs next to an anchor contig.
    ///
    /// The moved contigs keep their orientation and appear in the given
    /// order, immediately left or right of the anchor. Orders are unchanged;
    /// scaffolds left empty by the removal are dropped.
    pub fn move_contigs<S: AsRef<str>>(
        &self,
        names: &[S],
        anchor: &str,
        side: InsertSide,
    ) -> Result<AssemblyDocument> {
        let anchor_id = self.resolve(anchor)?;
        let moved = self.placed_entries(names)?;
        if moved.iter().any(|e| e.id == anchor_id) {
            return Err(AssemblyError::AnchorInMoveSet(anchor.to_string()));
        }
        self.locate_by_id(anchor_id)?;

        let moved_ids: FxHashSet<ContigId> = moved.iter().map(|e| e.id).collect();
        let mut scaffolds = self.without(&moved_ids);

        let (row, col) = scaffolds
            .iter()
            .enumerate()
            .find_map(|(row, s)| s.position(anchor_id).map(|col| (row, col)))
            .ok_or_else(|| AssemblyError::UnplacedContig(anchor.to_string()))?;

        let at = match side {
            InsertSide::Left => col,
            InsertSide::Right => col + 1,
        };
        let entries = &mut scaffolds[row].entries;
        let tail = entries.split_off(at);
        entries.extend(moved);
        entries.extend(tail);
        scaffolds.retain(|s| !s.is_empty());

        AssemblyDocument::new(self.index().contig_slice().to_vec(), scaffolds)
    }

    /// Flip the orientation of a contig in place.
    pub fn invert(&self, name: &str) -> Result<AssemblyDocument> {
        let id = self.locate_by_name(name)?.id;
        let scaffolds = self
            .scaffolds()
            .iter()
            .map(|scaffold| {
                Scaffold::new(
                    scaffold
                        .iter()
                        .map(|e| {
                            if e.id == id {
                                OrientedContig::new(e.id, e.orientation.flipped())
                            } else {
                                *e
                            }
                        })
                        .collect(),
                )
            })
            .collect();
        AssemblyDocument::new(self.index().contig_slice().to_vec(), scaffolds)
    }

    /// Move contigs out of their scaffolds into one new trailing scaffold.
    ///
    /// The relocated contigs keep their orientation. The tail lists them in
    /// the order they had in the document, whatever the order of `names`.
    pub fn relocate_debris_to_tail<S: AsRef<str>>(&self, names: &[S]) -> Result<AssemblyDocument> {
        let requested: FxHashSet<ContigId> =
            self.placed_entries(names)?.iter().map(|e| e.id).collect();
        if requested.is_empty() {
            return Ok(self.clone());
        }

        let mut seen = FxHashSet::default();
        let tail: Vec<OrientedContig> = self
            .index()
            .placements()
            .iter()
            .map(|p| p.entry)
            .filter(|e| requested.contains(&e.id) && seen.insert(e.id))
            .collect();

        let mut scaffolds = self.without(&requested);
        scaffolds.retain(|s| !s.is_empty());
        scaffolds.push(Scaffold::new(tail));

        AssemblyDocument::new(self.index().contig_slice().to_vec(), scaffolds)
    }

    /// Resolve names to their first placed entry, in input order, without
    /// duplicates.
    fn placed_entries<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<OrientedContig>> {
        let mut seen = FxHashSet::default();
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let location = self.locate_by_name(name.as_ref())?;
            if seen.insert(location.id) {
                entries.push(OrientedContig::new(location.id, location.orientation));
            }
        }
        Ok(entries)
    }

    /// Scaffolds with every entry for `ids` removed.
    fn without(&self, ids: &FxHashSet<ContigId>) -> Vec<Scaffold> {
        self.scaffolds()
            .iter()
            .map(|s| Scaffold::new(s.iter().filter(|e| !ids.contains(&e.id)).copied().collect()))
            .collect()
    }
}
