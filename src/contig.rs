//! Core contig types for assembly document representation.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Identity of a contig: its 1-based order magnitude in the header table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContigId(u32);

impl ContigId {
    /// Create an id from a 1-based order magnitude. Returns `None` for zero.
    #[inline]
    pub fn new(order: u32) -> Option<Self> {
        (order > 0).then_some(Self(order))
    }

    /// The 1-based order magnitude.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based position in the header table.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Id for a zero-based header table position.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// Shift this id by `by` if it lies strictly above `pivot`.
    #[inline]
    pub(crate) fn shifted_above(self, pivot: ContigId, by: u32) -> Self {
        if self.0 > pivot.0 {
            Self(self.0 + by)
        } else {
            self
        }
    }

    #[inline]
    pub(crate) fn offset(self, by: u32) -> Self {
        Self(self.0 + by)
    }
}

impl fmt::Display for ContigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orientation of a contig within a scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    /// The opposite orientation.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }

    #[inline]
    pub fn is_reverse(self) -> bool {
        self == Orientation::Reverse
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Forward => write!(f, "+"),
            Orientation::Reverse => write!(f, "-"),
        }
    }
}

/// One scaffold entry: a contig and the orientation it is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientedContig {
    pub id: ContigId,
    pub orientation: Orientation,
}

impl OrientedContig {
    #[inline]
    pub fn new(id: ContigId, orientation: Orientation) -> Self {
        Self { id, orientation }
    }

    #[inline]
    pub fn forward(id: ContigId) -> Self {
        Self::new(id, Orientation::Forward)
    }

    #[inline]
    pub fn reverse(id: ContigId) -> Self {
        Self::new(id, Orientation::Reverse)
    }

    /// Parse a signed order token such as `12` or `-7`.
    pub fn parse_signed(token: &str) -> Option<Self> {
        let value: i64 = token.parse().ok()?;
        let magnitude = u32::try_from(value.unsigned_abs()).ok()?;
        let id = ContigId::new(magnitude)?;
        let orientation = if value < 0 {
            Orientation::Reverse
        } else {
            Orientation::Forward
        };
        Some(Self::new(id, orientation))
    }

    /// The signed order as persisted in scaffold lines.
    #[inline]
    pub fn signed(&self) -> i64 {
        match self.orientation {
            Orientation::Forward => i64::from(self.id.get()),
            Orientation::Reverse => -i64::from(self.id.get()),
        }
    }
}

impl fmt::Display for OrientedContig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signed())
    }
}

/// A span of document coordinates.
/// Uses 0-based, half-open coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    #[inline]
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

    /// Check whether `pos` lies inside the span.
    #[inline]
    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Check whether `site` can split the span into two non-empty pieces.
    #[inline]
    pub fn is_interior(&self, site: u64) -> bool {
        self.start < site && site < self.end
    }

    /// Segment relation used by range queries.
    ///
    /// A span is selected when it straddles the query start, or when it starts
    /// inside the query. A span starting exactly at the query end is not.
    #[inline]
    pub fn selected_by(&self, start: u64, end: u64) -> bool {
        if self.start < start {
            start < self.end
        } else {
            self.end < end || self.start < end
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

static FRAGMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<parent>.+?):::fragment_(?P<index>\d+)(?P<debris>:::debris)?$")
        .expect("fragment name pattern is valid")
});

/// Where a fragment came from: the contig it was cut out of and its rank
/// among that contig's fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentLineage {
    pub parent: String,
    pub index: u32,
    pub debris: bool,
}

impl FragmentLineage {
    pub fn new(parent: impl Into<String>, index: u32, debris: bool) -> Self {
        Self {
            parent: parent.into(),
            index,
            debris,
        }
    }

    /// Recover the lineage encoded in a persisted contig name, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        let caps = FRAGMENT_NAME.captures(name)?;
        let index = caps["index"].parse().ok()?;
        Some(Self {
            parent: caps["parent"].to_string(),
            index,
            debris: caps.name("debris").is_some(),
        })
    }

    /// Sibling lineage with a different index.
    pub fn with_index(&self, index: u32) -> Self {
        Self {
            parent: self.parent.clone(),
            index,
            debris: self.debris,
        }
    }

    /// The persisted name for this fragment.
    pub fn render(&self) -> String {
        if self.debris {
            format!("{}:::fragment_{}:::debris", self.parent, self.index)
        } else {
            format!("{}:::fragment_{}", self.parent, self.index)
        }
    }
}

/// A contig fragment as listed in the header table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    name: String,
    pub length: u64,
    lineage: Option<FragmentLineage>,
}

impl Contig {
    /// Create a contig from its persisted name; any fragment lineage encoded in
    /// the name is recovered here, once.
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        let name = name.into();
        let lineage = FragmentLineage::from_name(&name);
        Self {
            name,
            length,
            lineage,
        }
    }

    /// Create a fragment from its lineage.
    pub fn fragment(lineage: FragmentLineage, length: u64) -> Self {
        Self {
            name: lineage.render(),
            length,
            lineage: Some(lineage),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn lineage(&self) -> Option<&FragmentLineage> {
        self.lineage.as_ref()
    }

    /// True if the contig was produced by an earlier cut.
    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.lineage.is_some()
    }

    #[inline]
    pub fn is_debris(&self) -> bool {
        self.lineage.as_ref().is_some_and(|l| l.debris)
    }
}

/// Ordered sequence of oriented contigs; one line of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scaffold {
    pub entries: Vec<OrientedContig>,
}

impl Scaffold {
    pub fn new(entries: Vec<OrientedContig>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrientedContig> {
        self.entries.iter()
    }

    /// Position of the first entry referring to `id`.
    pub fn position(&self, id: ContigId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}
