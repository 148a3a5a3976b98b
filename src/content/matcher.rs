//! Linking content-bearing nodes to operator ranges.
//!
//! The input only says what text an element has, not which operators draw
//! it, so linking is best effort. Every target either becomes a
//! [`ContentMark`] or comes back as an [`UnlinkedTarget`] with the reason;
//! nothing is dropped silently.
//!
//! A mark may only be placed where a `BDC`/`EMC` pair keeps the stream well
//! nested: the same `q`/`Q`, `BT`/`ET` and marked-content depth at both ends,
//! never dipping below that depth in between, and not inside a path object.
//! Matched ranges are widened outward until that holds, or given up on.

use super::operators::{OperatorClass, Operation};
use crate::config::LinkStrategy;
use crate::report::DiagnosticCode;
use crate::structure::NodeId;

/// Node content to locate on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetKind {
    /// Text to search for
    Text(String),
    /// An image or form placed with `Do` or an inline image
    Graphic,
}

/// A content-bearing node to link, in MCID order.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkTarget {
    /// Owning node
    pub node: NodeId,
    /// MCID allocated to the node on this page
    pub mcid: u32,
    /// Marked-content tag (the node's `/S`)
    pub tag: String,
    /// What to look for
    pub kind: TargetKind,
}

/// One bracketed region: operators `start..end` (half-open) get `BDC`/`EMC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMark {
    /// MCID carried by the `BDC` property list
    pub mcid: u32,
    /// Marked-content tag
    pub tag: String,
    /// First wrapped operator
    pub start: usize,
    /// One past the last wrapped operator
    pub end: usize,
}

impl ContentMark {
    /// Whether two marks share an operator.
    pub fn overlaps(&self, other: &ContentMark) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A target that could not be linked.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlinkedTarget {
    /// Owning node
    pub node: NodeId,
    /// MCID allocated to the node
    pub mcid: u32,
    /// Why linking failed
    pub code: DiagnosticCode,
    /// Detail for the report
    pub reason: String,
}

/// Linking result for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    /// Marks in MCID order
    pub marks: Vec<ContentMark>,
    /// Targets left unlinked
    pub unlinked: Vec<UnlinkedTarget>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Depth {
    state: i32,
    text: i32,
    marked: i32,
}

impl Depth {
    fn min(self, other: Depth) -> Depth {
        Depth {
            state: self.state.min(other.state),
            text: self.text.min(other.text),
            marked: self.marked.min(other.marked),
        }
    }

    fn at_most(self, other: Depth) -> bool {
        self.state <= other.state && self.text <= other.text && self.marked <= other.marked
    }
}

/// Nesting depths before and after every operator of a page.
#[derive(Debug, Clone)]
pub struct PageLayout {
    before: Vec<Depth>,
    after: Vec<Depth>,
    path_open_after: Vec<bool>,
}

impl PageLayout {
    /// Scan a page's operations.
    pub fn new(ops: &[Operation]) -> Self {
        let mut before = Vec::with_capacity(ops.len());
        let mut after = Vec::with_capacity(ops.len());
        let mut path_open_after = Vec::with_capacity(ops.len());
        let mut depth = Depth::default();
        let mut path_open = false;

        for op in ops {
            before.push(depth);
            match op.class() {
                OperatorClass::SaveState => depth.state += 1,
                OperatorClass::RestoreState => depth.state -= 1,
                OperatorClass::BeginText => depth.text += 1,
                OperatorClass::EndText => depth.text -= 1,
                OperatorClass::BeginMarkedContent => depth.marked += 1,
                OperatorClass::EndMarkedContent => depth.marked -= 1,
                OperatorClass::PathConstruction => path_open = true,
                OperatorClass::PathPainting => path_open = false,
                _ => {},
            }
            after.push(depth);
            path_open_after.push(path_open);
        }

        Self {
            before,
            after,
            path_open_after,
        }
    }

    fn len(&self) -> usize {
        self.before.len()
    }

    fn path_open_before(&self, i: usize) -> bool {
        i > 0 && self.path_open_after[i - 1]
    }

    /// Whether `first..=last` can be bracketed as is.
    pub fn is_balanced(&self, first: usize, last: usize) -> bool {
        if first > last || last >= self.len() {
            return false;
        }
        let base = self.before[first];
        self.after[last] == base
            && (first..=last).all(|k| base.at_most(self.after[k]))
            && !self.path_open_before(first)
            && !self.path_open_after[last]
    }

    /// Grow `first..=last` outward until it is balanced.
    pub fn widen(&self, first: usize, last: usize) -> Option<(usize, usize)> {
        if first > last || last >= self.len() {
            return None;
        }
        let (mut s, mut e) = (first, last);
        loop {
            if self.is_balanced(s, e) {
                return Some((s, e));
            }
            let floor = (s..=e).fold(self.before[s], |m, k| m.min(self.after[k]));
            let (s0, e0) = (s, e);
            while s > 0 && (!self.before[s].at_most(floor) || self.path_open_before(s)) {
                s -= 1;
            }
            while e + 1 < self.len() && (!self.after[e].at_most(floor) || self.path_open_after[e]) {
                e += 1;
            }
            if (s, e) == (s0, e0) {
                return None;
            }
        }
    }

    /// Operator range of each complete rendering unit: a single text, image
    /// or shading operator, or a whole path object ending in its painting operator.
    pub fn rendering_units(&self, ops: &[Operation]) -> Vec<(usize, usize)> {
        let mut units = Vec::new();
        let mut path_start = None;
        for (i, op) in ops.iter().enumerate() {
            match op.class() {
                OperatorClass::PathConstruction => {
                    path_start.get_or_insert(i);
                },
                OperatorClass::PathPainting => {
                    units.push((path_start.take().unwrap_or(i), i));
                },
                class if class.is_rendering() => units.push((i, i)),
                _ => {},
            }
        }
        units
    }
}

/// Case-folded, whitespace-free text of a page with the operator of each character.
struct PageText {
    chars: Vec<char>,
    ops: Vec<usize>,
}

impl PageText {
    fn new(ops: &[Operation]) -> Self {
        let mut chars = Vec::new();
        let mut owners = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            if op.class() != OperatorClass::ShowText {
                continue;
            }
            // One byte per character code, read as Latin-1
            for c in op.shown_bytes().into_iter().map(char::from) {
                if c.is_whitespace() {
                    continue;
                }
                for folded in c.to_lowercase() {
                    chars.push(folded);
                    owners.push(i);
                }
            }
        }
        Self { chars, ops: owners }
    }

    /// First occurrence of `needle` at or after character `from`.
    fn find(&self, needle: &[char], from: usize) -> Option<(usize, usize)> {
        if needle.is_empty() || needle.len() > self.chars.len() {
            return None;
        }
        (from..=self.chars.len() - needle.len())
            .find(|&i| self.chars[i..i + needle.len()] == *needle)
            .map(|i| (i, i + needle.len()))
    }
}

fn fold(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Plans the marks of one page.
struct Planner<'a> {
    ops: &'a [Operation],
    layout: PageLayout,
    plan: PagePlan,
    next_graphic: usize,
}

impl<'a> Planner<'a> {
    fn new(ops: &'a [Operation]) -> Self {
        Self {
            ops,
            layout: PageLayout::new(ops),
            plan: PagePlan::default(),
            next_graphic: 0,
        }
    }

    fn unlinked(&mut self, target: &MarkTarget, code: DiagnosticCode, reason: impl Into<String>) {
        self.plan.unlinked.push(UnlinkedTarget {
            node: target.node,
            mcid: target.mcid,
            code,
            reason: reason.into(),
        });
    }

    /// Widen a raw match, check it against earlier marks and record the outcome.
    fn place(&mut self, target: &MarkTarget, first: usize, last: usize) {
        let Some((s, e)) = self.layout.widen(first, last) else {
            self.unlinked(
                target,
                DiagnosticCode::UnbalancedRange,
                format!("operators {}..={} cannot be bracketed without breaking nesting", first, last),
            );
            return;
        };

        let mark = ContentMark {
            mcid: target.mcid,
            tag: target.tag.clone(),
            start: s,
            end: e + 1,
        };
        if let Some(other) = self.plan.marks.iter().find(|m| m.overlaps(&mark)) {
            let reason = format!(
                "operators {}..{} overlap MCID {} at {}..{}",
                mark.start, mark.end, other.mcid, other.start, other.end
            );
            self.unlinked(target, DiagnosticCode::OverlappingRange, reason);
            return;
        }
        self.plan.marks.push(mark);
    }

    fn is_claimed(&self, i: usize) -> bool {
        self.plan.marks.iter().any(|m| m.start <= i && i < m.end)
    }

    fn link_graphic(&mut self, target: &MarkTarget) {
        let found = (self.next_graphic..self.ops.len())
            .find(|&i| self.ops[i].class().is_graphic() && !self.is_claimed(i));
        match found {
            Some(i) => {
                self.next_graphic = i + 1;
                self.place(target, i, i);
            },
            None => self.unlinked(
                target,
                DiagnosticCode::ContentNotFound,
                "no unclaimed image or form left on the page",
            ),
        }
    }

    fn plan_text_match(mut self, targets: &[MarkTarget]) -> PagePlan {
        let text = PageText::new(self.ops);
        let mut cursor = 0;

        for target in targets {
            let needle = match target.kind {
                TargetKind::Graphic => {
                    self.link_graphic(target);
                    continue;
                },
                TargetKind::Text(ref t) => fold(t),
            };

            let hit = text.find(&needle, cursor).map(|hit| (hit, true)).or_else(|| {
                text.find(&needle, 0).map(|hit| (hit, false))
            });
            match hit {
                Some(((start, end), in_order)) => {
                    if in_order {
                        cursor = end;
                    }
                    self.place(target, text.ops[start], text.ops[end - 1]);
                },
                None => self.unlinked(
                    target,
                    DiagnosticCode::ContentNotFound,
                    "text not found in the page's text operators",
                ),
            }
        }
        self.plan
    }

    fn plan_text_blocks(mut self, targets: &[MarkTarget]) -> PagePlan {
        let mut blocks = Vec::new();
        let mut open = None;
        let mut shows_text = false;
        for (i, op) in self.ops.iter().enumerate() {
            match op.class() {
                OperatorClass::BeginText => {
                    open = Some(i);
                    shows_text = false;
                },
                OperatorClass::ShowText => shows_text = true,
                OperatorClass::EndText => {
                    if let Some(start) = open.take() {
                        if shows_text {
                            blocks.push((start, i));
                        }
                    }
                },
                _ => {},
            }
        }

        let mut blocks = blocks.into_iter();
        for target in targets {
            if target.kind == TargetKind::Graphic {
                self.link_graphic(target);
                continue;
            }
            match blocks.next() {
                Some((start, end)) => self.place(target, start, end),
                None => self.unlinked(
                    target,
                    DiagnosticCode::ContentNotFound,
                    "more text nodes than text objects on the page",
                ),
            }
        }
        self.plan
    }
}

/// Plan the marks of one page for targets given in MCID order.
pub fn plan_page(ops: &[Operation], targets: &[MarkTarget], strategy: LinkStrategy) -> PagePlan {
    let planner = Planner::new(ops);
    match strategy {
        LinkStrategy::TextMatch => planner.plan_text_match(targets),
        LinkStrategy::TextBlocks => planner.plan_text_blocks(targets),
        LinkStrategy::None => PagePlan {
            marks: Vec::new(),
            unlinked: targets
                .iter()
                .map(|t| UnlinkedTarget {
                    node: t.node,
                    mcid: t.mcid,
                    code: DiagnosticCode::LinkingDisabled,
                    reason: "content linking disabled".to_string(),
                })
                .collect(),
        },
    }
}
