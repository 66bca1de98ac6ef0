//! Property tests for assembly document edits.
//!
//! Random documents are built from a list of contig lengths, orientations
//! and scaffold breaks. Every edit must keep the spans a partition of the
//! same total length and keep orders contiguous.

use asmfix::assembly::{parse_document, AssemblyDocument, AssemblyError};
use asmfix::InsertSide;
use proptest::prelude::*;
use proptest::sample::Index;

fn document_text(specs: &[(u64, bool, bool)]) -> String {
    let mut text = String::new();
    for (i, (len, _, _)) in specs.iter().enumerate() {
        text.push_str(&format!(">ctg{} {} {}\n", i + 1, i + 1, len));
    }
    let mut line: Vec<String> = Vec::new();
    for (i, (_, reverse, ends_scaffold)) in specs.iter().enumerate() {
        let order = (i + 1) as i64;
        line.push(if *reverse { -order } else { order }.to_string());
        if *ends_scaffold {
            text.push_str(&line.join(" "));
            text.push('\n');
            line.clear();
        }
    }
    if !line.is_empty() {
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    text
}

fn document_strategy() -> impl Strategy<Value = AssemblyDocument> {
    prop::collection::vec((1u64..500, any::<bool>(), any::<bool>()), 1..8)
        .prop_map(|specs| parse_document(&document_text(&specs)).unwrap())
}

/// Contig names in document order.
fn names_in_order(doc: &AssemblyDocument) -> Vec<String> {
    doc.index()
        .placements()
        .iter()
        .map(|p| doc.contig(p.entry.id).unwrap().name().to_string())
        .collect()
}

fn name_at(doc: &AssemblyDocument, index: &Index) -> String {
    let names = names_in_order(doc);
    names[index.index(names.len())].clone()
}

proptest! {
    #[test]
    fn prop_text_round_trip(doc in document_strategy()) {
        let text = doc.to_text();
        let reparsed = parse_document(&text).unwrap();
        prop_assert_eq!(reparsed.to_text(), text);
        prop_assert!(reparsed.is_partition());
    }

    #[test]
    fn prop_cut_preserves_coverage(
        doc in document_strategy(),
        pick in any::<Index>(),
        frac in 0.0f64..1.0,
    ) {
        let name = name_at(&doc, &pick);
        let location = doc.locate_by_name(&name).unwrap();

        if location.length < 2 {
            let err = doc.cut_in_two(&name, location.span.start + 1).unwrap_err();
            let is_invalid_site = matches!(err, AssemblyError::InvalidCutSite { .. });
            prop_assert!(is_invalid_site);
            return Ok(());
        }

        let site = location.span.start + 1 + ((location.length - 2) as f64 * frac) as u64;
        let cut = doc.cut_in_two(&name, site).unwrap();

        prop_assert_eq!(cut.total_length(), doc.total_length());
        prop_assert_eq!(cut.info().contig_count, doc.info().contig_count + 1);
        prop_assert!(cut.is_partition());

        let first = cut.locate_by_name(&format!("{}:::fragment_1", name)).unwrap();
        let second = cut.locate_by_name(&format!("{}:::fragment_2", name)).unwrap();
        prop_assert_eq!(first.length + second.length, location.length);
        prop_assert_eq!(first.span.start.min(second.span.start), location.span.start);
        prop_assert_eq!(first.span.end.max(second.span.end), location.span.end);
        prop_assert_eq!(first.id.get() + 1, second.id.get());
    }

    #[test]
    fn prop_invert_is_an_involution(doc in document_strategy(), pick in any::<Index>()) {
        let name = name_at(&doc, &pick);
        let once = doc.invert(&name).unwrap();
        prop_assert_ne!(
            once.locate_by_name(&name).unwrap().orientation,
            doc.locate_by_name(&name).unwrap().orientation
        );
        let twice = once.invert(&name).unwrap();
        prop_assert_eq!(twice.to_text(), doc.to_text());
    }

    #[test]
    fn prop_move_splices_next_to_anchor(
        doc in document_strategy(),
        mask in prop::collection::vec(any::<bool>(), 8),
        anchor_pick in any::<Index>(),
        left in any::<bool>(),
    ) {
        let names = names_in_order(&doc);
        let anchor = name_at(&doc, &anchor_pick);
        let moved: Vec<String> = names
            .iter()
            .zip(&mask)
            .filter(|(name, keep)| **keep && **name != anchor)
            .map(|(name, _)| name.clone())
            .collect();
        prop_assume!(!moved.is_empty());

        let side = if left { InsertSide::Left } else { InsertSide::Right };
        let result = doc.move_contigs(&moved, &anchor, side).unwrap();

        prop_assert_eq!(result.total_length(), doc.total_length());
        prop_assert!(result.is_partition());
        prop_assert!(result.scaffolds().iter().all(|s| !s.is_empty()));

        let order = names_in_order(&result);
        let at = order.iter().position(|n| *n == anchor).unwrap();
        let placed = match side {
            InsertSide::Left => &order[at - moved.len()..at],
            InsertSide::Right => &order[at + 1..at + 1 + moved.len()],
        };
        prop_assert_eq!(placed, &moved[..]);
    }

    #[test]
    fn prop_range_query_is_contiguous(
        doc in document_strategy(),
        a in 0u64..4000,
        b in 0u64..4000,
    ) {
        let total = doc.total_length();
        let (start, end) = (a.min(b) % total, a.max(b) % total);
        prop_assume!(start < end);

        let hits = doc.find_contigs_in_range(start, end);
        prop_assert!(!hits.is_empty());
        prop_assert!(hits[0].span.contains(start));
        for pair in hits.windows(2) {
            prop_assert_eq!(pair[0].span.end, pair[1].span.start);
        }
        let last = hits.last().unwrap();
        prop_assert!(last.span.start < end);
    }
}
