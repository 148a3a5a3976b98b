//! Integration tests for hierarchy building and structure materialization.

use pdf_tagger::config::{McidScope, TaggingConfig};
use pdf_tagger::elements::{parse_elements, ElementAttributes};
use pdf_tagger::object::{Object, ObjectRef};
use pdf_tagger::report::DiagnosticCode;
use pdf_tagger::structure::{
    allocate_mcids, preorder, HierarchyBuilder, ParentTreeIndex, StructType, StructureTree,
    StructureTreeBuilder,
};
use pdf_tagger::ClassifiedElement;

fn child_roles(tree: &StructureTree, parent: pdf_tagger::structure::NodeId) -> Vec<StructType> {
    tree.node(parent)
        .unwrap()
        .children
        .iter()
        .map(|&id| tree.node(id).unwrap().role)
        .collect()
}

// =============================================================================
// GROUPING
// =============================================================================

mod grouping_tests {
    use super::*;

    #[test]
    fn test_three_items_then_paragraph() {
        let elements = vec![
            ClassifiedElement::new("LI", "one", 1),
            ClassifiedElement::new("LI", "two", 1),
            ClassifiedElement::new("LI", "three", 1),
            ClassifiedElement::new("P", "after", 1),
        ];
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
        let tree = &hierarchy.tree;

        assert_eq!(child_roles(tree, tree.root()), vec![StructType::L, StructType::P]);
        let list = tree.node(tree.root()).unwrap().children[0];
        assert_eq!(child_roles(tree, list), vec![StructType::LI; 3]);
    }

    #[test]
    fn test_lists_split_by_other_content() {
        let elements = vec![
            ClassifiedElement::new("LI", "one", 1),
            ClassifiedElement::new("P", "between", 1),
            ClassifiedElement::new("LI", "two", 1),
        ];
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
        let tree = &hierarchy.tree;
        assert_eq!(
            child_roles(tree, tree.root()),
            vec![StructType::L, StructType::P, StructType::L]
        );
    }

    #[test]
    fn test_sections_nest_by_heading_level() {
        let elements = vec![
            ClassifiedElement::new("P", "preamble", 1),
            ClassifiedElement::new("H1", "Chapter", 1),
            ClassifiedElement::new("H2", "Section", 1),
            ClassifiedElement::new("P", "body", 1),
            ClassifiedElement::new("H1", "Next chapter", 2),
        ];
        let config = TaggingConfig::default().with_sections(true);
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
        let tree = &hierarchy.tree;

        assert_eq!(
            child_roles(tree, tree.root()),
            vec![StructType::P, StructType::Sect, StructType::Sect]
        );
        let chapter = tree.node(tree.root()).unwrap().children[1];
        assert_eq!(child_roles(tree, chapter), vec![StructType::H1, StructType::Sect]);
        let section = tree.node(chapter).unwrap().children[1];
        assert_eq!(child_roles(tree, section), vec![StructType::H2, StructType::P]);
    }

    #[test]
    fn test_pregrouped_list_from_json() {
        let elements = parse_elements(
            r#"[{"role": "L", "page": 1, "children": [
                    {"role": "LI", "content": "1. First"},
                    {"role": "LI", "content": "2. Second"}]}]"#,
        )
        .unwrap();
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
        let tree = &hierarchy.tree;

        let list = tree.node(tree.root()).unwrap().children[0];
        assert_eq!(tree.node(list).unwrap().role, StructType::L);
        let first = tree.node(list).unwrap().children[0];
        assert_eq!(child_roles(tree, first), vec![StructType::Lbl, StructType::LBody]);
        let label = tree.node(first).unwrap().children[0];
        assert_eq!(tree.node(label).unwrap().text.as_deref(), Some("1."));
    }
}

// =============================================================================
// RECOVERABLE INPUT PROBLEMS
// =============================================================================

mod diagnostics_tests {
    use super::*;

    #[test]
    fn test_unknown_role_becomes_paragraph() {
        let elements = vec![ClassifiedElement::new("sidebar-blob", "Text", 1)];
        let config = TaggingConfig::default().with_text_spans(false);
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();

        let tree = &hierarchy.tree;
        assert_eq!(child_roles(tree, tree.root()), vec![StructType::P]);
        assert_eq!(hierarchy.stats.roles_remapped, 1);
        assert_eq!(hierarchy.diagnostics[0].code, DiagnosticCode::UnrecognizedRole);
    }

    #[test]
    fn test_artifacts_are_excluded() {
        let elements = vec![
            ClassifiedElement::new("Artifact", "Page 3", 1),
            ClassifiedElement::new("P", "Body", 1),
        ];
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();

        assert_eq!(hierarchy.stats.artifacts_excluded, 1);
        assert_eq!(hierarchy.tree.node(hierarchy.tree.root()).unwrap().children.len(), 1);
    }

    #[test]
    fn test_missing_page_dropped_with_page_count() {
        let elements = vec![
            ClassifiedElement::new("P", "kept", 2),
            ClassifiedElement::new("P", "dropped", 3),
            ClassifiedElement::new("P", "no page", 0),
        ];
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config)
            .with_page_count(2)
            .build(&elements)
            .unwrap();

        assert_eq!(hierarchy.stats.elements_dropped, 2);
        assert_eq!(hierarchy.stats.elements_kept, 1);
    }
}

// =============================================================================
// MATERIALIZATION
// =============================================================================

mod materialize_tests {
    use super::*;

    #[test]
    fn test_table_header_references() {
        let elements = vec![ClassifiedElement::new("Table", "Name\tAge\nAda\t36", 1)
            .with_attributes(ElementAttributes {
                summary: Some("People".to_string()),
                ..Default::default()
            })];
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
        let tree = &hierarchy.tree;
        let mcids = allocate_mcids(tree, McidScope::PerPage).unwrap();
        let index = ParentTreeIndex::from_assignment(&mcids).unwrap();
        let objects = StructureTreeBuilder::new(tree, &mcids, &index)
            .build(&[ObjectRef::new(3, 0)], 20)
            .unwrap();

        let table = preorder(tree)
            .find(|&id| tree.node(id).unwrap().role == StructType::Table)
            .unwrap();
        let table_dict = objects.node_object(table).unwrap().as_dict().unwrap();
        let attrs = table_dict.get("A").unwrap().as_dict().unwrap();
        assert_eq!(attrs.get("O"), Some(&Object::name("Table")));
        assert_eq!(attrs.get("Summary"), Some(&Object::text("People")));

        let cell = preorder(tree)
            .find(|&id| tree.node(id).unwrap().role == StructType::TD)
            .unwrap();
        let cell_dict = objects.node_object(cell).unwrap().as_dict().unwrap();
        let headers = cell_dict
            .get("A")
            .and_then(|a| a.as_dict())
            .and_then(|a| a.get("Headers"))
            .unwrap();
        assert_eq!(
            headers,
            &Object::Array(vec![Object::String(b"table1_h1".to_vec())])
        );
        assert_eq!(mcids.len(), 4);
    }

    #[test]
    fn test_dump_shows_mcids() {
        let elements = vec![
            ClassifiedElement::new("H1", "Intro", 1),
            ClassifiedElement::new("P", "Hello world", 1),
        ];
        let config = TaggingConfig::default();
        let hierarchy = HierarchyBuilder::new(&config).build(&elements).unwrap();
        let mcids = allocate_mcids(&hierarchy.tree, config.mcid_scope).unwrap();

        let dump = hierarchy.tree.dump(Some(&mcids));
        assert!(dump.starts_with("Document\n"));
        assert!(dump.contains("    Span [p1 mcid=0] \"Intro\""));
        assert!(dump.contains("    Span [p1 mcid=1] \"Hello world\""));
    }
}
