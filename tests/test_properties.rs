//! Property-based tests for MCID allocation, the parent tree and marking
//!
//! For arbitrary element sequences:
//! - every content-bearing node owns exactly one MCID, and no (page, MCID)
//!   pair is owned twice
//! - the parent tree resolves every allocated pair back to its owner
//! - building twice gives identical trees and assignments
//!
//! For arbitrary text pages, marks never overlap and removing the inserted
//! operators gives back the original page.

use pdf_tagger::config::{LinkStrategy, McidScope, TaggingConfig};
use pdf_tagger::content::{
    parse_content_stream, plan_page, ContentStreamMarker, MarkTarget, OperatorClass, TargetKind,
};
use pdf_tagger::structure::{
    allocate_mcids, content_nodes, HierarchyBuilder, NodeId, ParentTreeIndex,
};
use pdf_tagger::ClassifiedElement;
use proptest::prelude::*;
use std::collections::HashSet;

const PAGE_COUNT: usize = 3;

fn role_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("H1".to_string()),
        Just("H2".to_string()),
        Just("P".to_string()),
        Just("LI".to_string()),
        Just("Figure".to_string()),
        Just("Table".to_string()),
        Just("Span".to_string()),
        Just("heading".to_string()),
        Just("Artifact".to_string()),
        Just("not-a-role".to_string()),
    ]
}

fn element_strategy() -> impl Strategy<Value = ClassifiedElement> {
    (role_strategy(), "[a-z]{0,8}( [a-z]{1,8}){0,3}", 1u32..=4)
        .prop_map(|(role, content, page)| ClassifiedElement::new(role, content, page))
}

fn elements_strategy() -> impl Strategy<Value = Vec<ClassifiedElement>> {
    prop::collection::vec(element_strategy(), 0..30)
}

fn scope_strategy() -> impl Strategy<Value = McidScope> {
    prop_oneof![Just(McidScope::PerPage), Just(McidScope::Document)]
}

fn config_strategy() -> impl Strategy<Value = TaggingConfig> {
    (scope_strategy(), any::<bool>(), any::<bool>()).prop_map(|(scope, spans, sections)| {
        TaggingConfig::default()
            .with_mcid_scope(scope)
            .with_text_spans(spans)
            .with_sections(sections)
    })
}

/// A page of single-word text objects and the words on it.
fn page_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 1..12)
}

#[cfg(test)]
mod proptest_tests {
    use super::*;

    proptest! {
        #[test]
        fn test_every_content_node_gets_one_mcid(
            elements in elements_strategy(),
            config in config_strategy(),
        ) {
            let hierarchy = HierarchyBuilder::new(&config)
                .with_page_count(PAGE_COUNT)
                .build(&elements)
                .unwrap();
            let tree = &hierarchy.tree;
            let mcids = allocate_mcids(tree, config.mcid_scope).unwrap();

            let bearing = content_nodes(tree);
            prop_assert_eq!(bearing.len(), mcids.len());
            for node in &bearing {
                prop_assert!(mcids.mcid_of(*node).is_some());
            }

            let mut pairs = HashSet::new();
            for entry in mcids.entries() {
                prop_assert!(entry.page < PAGE_COUNT);
                prop_assert!(pairs.insert((entry.page, entry.mcid)));
            }
            prop_assert!(tree.validate().is_ok());
        }

        #[test]
        fn test_parent_tree_round_trips(
            elements in elements_strategy(),
            config in config_strategy(),
        ) {
            let hierarchy = HierarchyBuilder::new(&config)
                .with_page_count(PAGE_COUNT)
                .build(&elements)
                .unwrap();
            let mcids = allocate_mcids(&hierarchy.tree, config.mcid_scope).unwrap();
            let index = ParentTreeIndex::from_assignment(&mcids).unwrap();

            for entry in mcids.entries() {
                prop_assert_eq!(index.lookup(entry.page, entry.mcid), Some(entry.node));
            }
            let filled: usize = index
                .pages()
                .map(|(_, slots)| slots.iter().filter(|s| s.is_some()).count())
                .sum();
            prop_assert_eq!(filled, mcids.len());
        }

        #[test]
        fn test_build_is_idempotent(
            elements in elements_strategy(),
            config in config_strategy(),
        ) {
            let builder = HierarchyBuilder::new(&config).with_page_count(PAGE_COUNT);
            let first = builder.build(&elements).unwrap();
            let second = builder.build(&elements).unwrap();
            prop_assert_eq!(&first.tree, &second.tree);
            prop_assert_eq!(&first.stats, &second.stats);

            let a = allocate_mcids(&first.tree, config.mcid_scope).unwrap();
            let b = allocate_mcids(&second.tree, config.mcid_scope).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn test_marks_never_overlap(
            words in page_strategy(),
            picks in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let stream: String = words
                .iter()
                .map(|w| format!("BT ({}) Tj ET ", w))
                .collect();
            let ops = parse_content_stream(stream.as_bytes(), 0).unwrap();

            let targets: Vec<MarkTarget> = picks
                .iter()
                .enumerate()
                .map(|(i, pick)| MarkTarget {
                    node: NodeId(i + 1),
                    mcid: i as u32,
                    tag: "P".to_string(),
                    kind: TargetKind::Text(pick.get(&words).clone()),
                })
                .collect();

            let plan = plan_page(&ops, &targets, LinkStrategy::TextMatch);
            prop_assert_eq!(plan.marks.len() + plan.unlinked.len(), targets.len());
            for (i, a) in plan.marks.iter().enumerate() {
                for b in &plan.marks[i + 1..] {
                    prop_assert!(!a.overlaps(b));
                }
            }

            let marked = ContentStreamMarker::new(false).apply(0, &ops, &plan.marks).unwrap();
            let inserted = marked
                .operations
                .iter()
                .filter(|op| op.class() == OperatorClass::BeginMarkedContent)
                .count();
            prop_assert_eq!(inserted, plan.marks.len());

            let stripped: Vec<_> = marked
                .operations
                .into_iter()
                .filter(|op| {
                    !matches!(
                        op.class(),
                        OperatorClass::BeginMarkedContent | OperatorClass::EndMarkedContent
                    )
                })
                .collect();
            prop_assert_eq!(stripped, ops);
        }
    }
}
