//! Insertion of marked-content operators into a page's operations.
//!
//! The marker takes planned [`ContentMark`]s and brackets each range with
//! `/Tag << /MCID n >> BDC` and `EMC`. With artifact marking enabled, every
//! rendering unit no mark covers is wrapped in `/Artifact BMC ... EMC`, so
//! the page holds no untagged rendering content. Nothing else in the stream
//! changes.

use super::matcher::{ContentMark, PageLayout};
use super::operators::Operation;
use crate::error::{Error, Result};
use crate::object::Object;

/// Operations of one page after marking.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedPage {
    /// Operations with marked-content operators inserted
    pub operations: Vec<Operation>,
    /// `BDC`/`EMC` pairs carrying an MCID
    pub marks_written: usize,
    /// `/Artifact` regions written
    pub artifact_regions: usize,
}

/// Brackets planned ranges in a page's operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStreamMarker {
    mark_artifacts: bool,
}

impl ContentStreamMarker {
    /// Create a marker. `mark_artifacts` wraps unclaimed rendering content.
    pub fn new(mark_artifacts: bool) -> Self {
        Self { mark_artifacts }
    }

    /// Insert marks into `ops` (zero-based `page`, used in errors).
    ///
    /// Marks must lie within the operations and must not share an operator.
    pub fn apply(&self, page: usize, ops: &[Operation], marks: &[ContentMark]) -> Result<MarkedPage> {
        let mut sorted: Vec<&ContentMark> = marks.iter().collect();
        sorted.sort_by_key(|m| (m.start, m.mcid));

        for mark in &sorted {
            if mark.start >= mark.end || mark.end > ops.len() {
                return Err(Error::InvalidTree(format!(
                    "mark for MCID {} on page {} spans {}..{} of {} operations",
                    mark.mcid,
                    page,
                    mark.start,
                    mark.end,
                    ops.len()
                )));
            }
        }
        for pair in sorted.windows(2) {
            if pair[0].overlaps(pair[1]) {
                return Err(Error::OverlappingMarks {
                    page,
                    first: pair[0].mcid,
                    second: pair[1].mcid,
                });
            }
        }

        let mut opens: Vec<Option<Operation>> = vec![None; ops.len()];
        let mut closes = vec![false; ops.len()];
        for mark in &sorted {
            opens[mark.start] = Some(Operation::begin_marked_content_dict(&mark.tag, mark.mcid));
            closes[mark.end - 1] = true;
        }

        let artifact_regions = if self.mark_artifacts {
            let regions = artifact_regions(ops, &sorted);
            for &(start, end) in &regions {
                opens[start] = Some(Operation::begin_marked_content("Artifact"));
                closes[end] = true;
            }
            regions.len()
        } else {
            0
        };

        let mut operations = Vec::with_capacity(ops.len() + 2 * (sorted.len() + artifact_regions));
        for (i, op) in ops.iter().enumerate() {
            if let Some(open) = opens[i].take() {
                operations.push(open);
            }
            operations.push(op.clone());
            if closes[i] {
                operations.push(Operation::end_marked_content());
            }
        }

        log::debug!(
            "Page {}: {} marks, {} artifact regions",
            page + 1,
            sorted.len(),
            artifact_regions
        );

        Ok(MarkedPage {
            operations,
            marks_written: sorted.len(),
            artifact_regions,
        })
    }
}

/// Remove MCIDs already present in `ops` so they cannot collide with newly
/// assigned ones. A `BDC` left with an empty property list becomes `BMC`;
/// nesting is unchanged. Returns the number of operations rewritten.
pub fn clear_existing_mcids(ops: &mut [Operation]) -> usize {
    let mut cleared = 0;
    for op in ops.iter_mut().filter(|op| op.mcid().is_some()) {
        if let Some(Object::Dictionary(props)) = op.operands.get_mut(1) {
            props.shift_remove("MCID");
            if props.is_empty() {
                op.operator = "BMC".to_string();
                op.operands.truncate(1);
            }
        }
        op.raw = None;
        cleared += 1;
    }
    cleared
}

/// Inclusive ranges of rendering content no mark covers, adjacent units merged.
fn artifact_regions(ops: &[Operation], marks: &[&ContentMark]) -> Vec<(usize, usize)> {
    let layout = PageLayout::new(ops);
    let mut units = layout.rendering_units(ops);
    units.retain(|&(s, e)| !marks.iter().any(|m| s < m.end && m.start <= e));
    units.sort_unstable();

    let mut regions: Vec<(usize, usize)> = Vec::new();
    for (s, e) in units {
        if let Some(last) = regions.last_mut() {
            if s <= last.1 + 1 {
                let merged = (last.0, last.1.max(e));
                if layout.is_balanced(merged.0, merged.1) {
                    *last = merged;
                    continue;
                }
                if s <= last.1 {
                    // Overlaps a region it cannot join
                    continue;
                }
            }
        }
        if layout.is_balanced(s, e) {
            regions.push((s, e));
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parser::parse_content_stream;
    use crate::content::writer::write_content_stream;

    fn mark(mcid: u32, tag: &str, start: usize, end: usize) -> ContentMark {
        ContentMark {
            mcid,
            tag: tag.to_string(),
            start,
            end,
        }
    }

    fn render(ops: &[Operation]) -> String {
        String::from_utf8(write_content_stream(ops)).unwrap()
    }

    #[test]
    fn test_brackets_marks() {
        let ops = parse_content_stream(b"BT (A) Tj (B) Tj ET", 0).unwrap();
        let page = ContentStreamMarker::new(false)
            .apply(0, &ops, &[mark(1, "P", 2, 3), mark(0, "H1", 1, 2)])
            .unwrap();
        assert_eq!(page.marks_written, 2);
        assert_eq!(
            render(&page.operations),
            "BT\n/H1 << /MCID 0 >> BDC\n(A) Tj\nEMC\n/P << /MCID 1 >> BDC\n(B) Tj\nEMC\nET\n"
        );
    }

    #[test]
    fn test_overlap_is_rejected() {
        let ops = parse_content_stream(b"BT (A) Tj (B) Tj ET", 0).unwrap();
        let err = ContentStreamMarker::new(false)
            .apply(3, &ops, &[mark(0, "P", 0, 3), mark(1, "P", 2, 4)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OverlappingMarks {
                page: 3,
                first: 0,
                second: 1
            }
        ));
    }

    #[test]
    fn test_out_of_bounds_mark_is_rejected() {
        let ops = parse_content_stream(b"BT ET", 0).unwrap();
        assert!(ContentStreamMarker::new(false)
            .apply(0, &ops, &[mark(0, "P", 1, 5)])
            .is_err());
    }

    #[test]
    fn test_unclaimed_content_becomes_artifact() {
        // 0:m 1:l 2:S 3:BT 4:Tj 5:ET 6:re 7:f
        let ops = parse_content_stream(b"0 0 m 100 0 l S BT (Body) Tj ET 0 0 5 5 re f", 0).unwrap();
        let page = ContentStreamMarker::new(true)
            .apply(0, &ops, &[mark(0, "P", 4, 5)])
            .unwrap();
        assert_eq!(page.artifact_regions, 2);
        assert_eq!(
            render(&page.operations),
            "/Artifact BMC\n0 0 m\n100 0 l\nS\nEMC\nBT\n/P << /MCID 0 >> BDC\n(Body) Tj\nEMC\nET\n\
             /Artifact BMC\n0 0 5 5 re\nf\nEMC\n"
        );
    }

    #[test]
    fn test_adjacent_artifacts_merge() {
        let ops = parse_content_stream(b"/Im1 Do /Im2 Do", 0).unwrap();
        let page = ContentStreamMarker::new(true).apply(0, &ops, &[]).unwrap();
        assert_eq!(page.artifact_regions, 1);
        assert_eq!(page.operations.len(), 4);
    }

    #[test]
    fn test_existing_mcids_are_cleared() {
        let mut ops = parse_content_stream(
            b"/P << /MCID 0 >> BDC BT (Old) Tj ET EMC /Span << /MCID 4 /Lang (en) >> BDC EMC \
              /Tx BMC EMC",
            0,
        )
        .unwrap();
        assert_eq!(clear_existing_mcids(&mut ops), 2);
        assert!(ops.iter().all(|op| op.mcid().is_none()));
        assert_eq!(
            render(&ops),
            "/P BMC\nBT\n(Old) Tj\nET\nEMC\n/Span << /Lang (en) >> BDC\nEMC\n/Tx BMC\nEMC\n"
        );
        assert_eq!(clear_existing_mcids(&mut ops), 0);
    }

    #[test]
    fn test_no_marks_leaves_stream_unchanged() {
        let ops = parse_content_stream(b"q BT (x) Tj ET Q", 0).unwrap();
        let page = ContentStreamMarker::default().apply(0, &ops, &[]).unwrap();
        assert_eq!(page.operations, ops);
    }
}
