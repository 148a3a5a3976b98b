//! Hierarchy builder: classified elements to a structure tree.
//!
//! A single pass over the elements in reading order, with a small amount of
//! state: the list currently being filled and, when section grouping is on,
//! the stack of open sections.

use super::heuristics;
use super::tree::{NodeId, StructureNode, StructureTree};
use super::types::{RoleParse, StructType, StructureAttributes};
use crate::config::TaggingConfig;
use crate::elements::ClassifiedElement;
use crate::error::Result;
use crate::report::{Diagnostic, DiagnosticCode};
use log::{debug, info};

/// Counters collected while building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyStats {
    /// Top-level elements received
    pub elements_in: usize,
    /// Elements (at any depth) that became nodes
    pub elements_kept: usize,
    /// Elements dropped for an out-of-range page
    pub elements_dropped: usize,
    /// Elements excluded as artifacts
    pub artifacts_excluded: usize,
    /// Unknown roles remapped to `P`
    pub roles_remapped: usize,
}

/// Result of a hierarchy build.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    /// The built tree
    pub tree: StructureTree,
    /// Recoverable conditions met while building
    pub diagnostics: Vec<Diagnostic>,
    /// Build counters
    pub stats: HierarchyStats,
}

/// Converts classified elements into a [`StructureTree`].
#[derive(Debug, Clone)]
pub struct HierarchyBuilder<'a> {
    config: &'a TaggingConfig,
    page_count: Option<usize>,
}

/// Mutable state of one build.
struct BuildState {
    tree: StructureTree,
    diagnostics: Vec<Diagnostic>,
    stats: HierarchyStats,
    tables: usize,
}

impl BuildState {
    fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }
}

impl<'a> HierarchyBuilder<'a> {
    /// Create a builder. Without a page count, pages are only checked for being non-zero.
    pub fn new(config: &'a TaggingConfig) -> Self {
        Self {
            config,
            page_count: None,
        }
    }

    /// Drop elements whose page exceeds `page_count`.
    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// Build the tree for a document's elements.
    pub fn build(&self, elements: &[ClassifiedElement]) -> Result<Hierarchy> {
        let mut state = BuildState {
            tree: StructureTree::new(),
            diagnostics: Vec::new(),
            stats: HierarchyStats {
                elements_in: elements.len(),
                ..Default::default()
            },
            tables: 0,
        };

        let root = state.tree.root();
        let mut open_list: Option<NodeId> = None;
        let mut sections: Vec<(u8, NodeId)> = Vec::new();

        for element in elements {
            let Some(page) = self.resolve_page(element, None, &mut state) else {
                continue;
            };
            let Some(role) = self.resolve_role(element, page, &mut state) else {
                continue;
            };

            if role == StructType::LI {
                let container = sections.last().map(|&(_, id)| id).unwrap_or(root);
                let list = match open_list {
                    Some(list) => list,
                    None => {
                        let list = state
                            .tree
                            .append(container, StructureNode::new(StructType::L).with_page(page))?;
                        open_list = Some(list);
                        list
                    },
                };
                self.build_element(role, element, page, list, &mut state)?;
                continue;
            }

            open_list = None;

            if self.config.group_sections {
                if let Some(level) = role.heading_level() {
                    while sections.last().is_some_and(|&(open, _)| open >= level) {
                        sections.pop();
                    }
                    let parent = sections.last().map(|&(_, id)| id).unwrap_or(root);
                    let sect = state
                        .tree
                        .append(parent, StructureNode::new(StructType::Sect).with_page(page))?;
                    sections.push((level, sect));
                }
            }

            let container = sections.last().map(|&(_, id)| id).unwrap_or(root);
            self.build_element(role, element, page, container, &mut state)?;
        }

        state.tree.validate()?;
        info!(
            "Built structure tree: {} nodes from {} elements ({} dropped, {} artifacts)",
            state.tree.len(),
            state.stats.elements_in,
            state.stats.elements_dropped,
            state.stats.artifacts_excluded
        );

        Ok(Hierarchy {
            tree: state.tree,
            diagnostics: state.diagnostics,
            stats: state.stats,
        })
    }

    /// Zero-based page of an element; `None` drops it.
    fn resolve_page(
        &self,
        element: &ClassifiedElement,
        inherited: Option<usize>,
        state: &mut BuildState,
    ) -> Option<usize> {
        if element.page == 0 {
            if let Some(page) = inherited {
                return Some(page);
            }
        }

        let number = element.page as usize;
        let in_range = number >= 1 && self.page_count.map_or(true, |count| number <= count);
        if !in_range {
            state.stats.elements_dropped += 1;
            state.report(
                Diagnostic::new(
                    DiagnosticCode::PageOutOfRange,
                    match self.page_count {
                        Some(count) => format!(
                            "element references page {} of a {}-page document; dropped",
                            number, count
                        ),
                        None => format!("element references page {}; dropped", number),
                    },
                )
                .with_role(element.role.clone())
                .with_page(number),
            );
            return None;
        }
        Some(number - 1)
    }

    /// Standard type of an element; `None` excludes it as an artifact.
    fn resolve_role(
        &self,
        element: &ClassifiedElement,
        page: usize,
        state: &mut BuildState,
    ) -> Option<StructType> {
        let role = match StructType::parse(&element.role) {
            RoleParse::Known(t) => t,
            RoleParse::GenericHeading => {
                let level = heuristics::suggest_heading_level(&element.content);
                state.report(
                    Diagnostic::new(
                        DiagnosticCode::HeadingLevelGuessed,
                        format!("heading level {} chosen from content", level),
                    )
                    .with_role(element.role.clone())
                    .with_page(page + 1),
                );
                StructType::heading(level)
            },
            RoleParse::Remapped(t) => {
                state.stats.roles_remapped += 1;
                state.report(
                    Diagnostic::new(
                        DiagnosticCode::UnrecognizedRole,
                        format!("unrecognized role '{}' mapped to {}", element.role, t),
                    )
                    .with_role(element.role.clone())
                    .with_page(page + 1),
                );
                t
            },
        };

        if role == StructType::Artifact {
            state.stats.artifacts_excluded += 1;
            state.report(
                Diagnostic::new(DiagnosticCode::ArtifactExcluded, "artifact kept out of the tree")
                    .with_role(element.role.clone())
                    .with_page(page + 1),
            );
            return None;
        }
        Some(role)
    }

    fn attributes(&self, element: &ClassifiedElement) -> StructureAttributes {
        let mut attributes = element
            .attributes
            .as_ref()
            .map(|a| a.to_structure_attributes())
            .unwrap_or_default();
        if self.config.derive_titles && attributes.title.is_none() {
            attributes.title = heuristics::derive_title(&element.content);
        }
        attributes
    }

    /// Append one element (and everything under it) to `parent`.
    fn build_element(
        &self,
        role: StructType,
        element: &ClassifiedElement,
        page: usize,
        parent: NodeId,
        state: &mut BuildState,
    ) -> Result<NodeId> {
        state.stats.elements_kept += 1;
        let attributes = self.attributes(element);
        let text = element.content.trim();

        if !element.children.is_empty() {
            let node = StructureNode::new(role)
                .with_page(page)
                .with_attributes(attributes);
            let id = state.tree.append(parent, node)?;
            self.build_children(role, &element.children, page, id, state)?;
            return Ok(id);
        }

        match role {
            StructType::Table if !text.is_empty() => {
                self.build_table(&element.content, page, attributes, parent, state)
            },
            StructType::L if !text.is_empty() => {
                let list = state.tree.append(
                    parent,
                    StructureNode::new(role).with_page(page).with_attributes(attributes),
                )?;
                for line in element.content.lines().filter(|l| !l.trim().is_empty()) {
                    self.build_list_item(line.trim(), StructureAttributes::default(), page, list, state)?;
                }
                Ok(list)
            },
            StructType::LI => self.build_list_item(text, attributes, page, parent, state),
            _ if role.is_container() && !text.is_empty() => {
                let id = state.tree.append(
                    parent,
                    StructureNode::new(role).with_page(page).with_attributes(attributes),
                )?;
                self.build_text_leaf(StructType::P, text, StructureAttributes::default(), page, id, state)?;
                Ok(id)
            },
            _ => self.build_text_leaf(role, text, attributes, page, parent, state),
        }
    }

    /// Children of a pre-grouped element, with list runs grouped unless the
    /// parent already is a list.
    fn build_children(
        &self,
        parent_role: StructType,
        children: &[ClassifiedElement],
        page: usize,
        parent: NodeId,
        state: &mut BuildState,
    ) -> Result<()> {
        let mut open_list: Option<NodeId> = None;
        for child in children {
            let Some(child_page) = self.resolve_page(child, Some(page), state) else {
                continue;
            };
            let Some(role) = self.resolve_role(child, child_page, state) else {
                continue;
            };

            if role == StructType::LI && parent_role != StructType::L {
                let list = match open_list {
                    Some(list) => list,
                    None => {
                        let list = state.tree.append(
                            parent,
                            StructureNode::new(StructType::L).with_page(child_page),
                        )?;
                        open_list = Some(list);
                        list
                    },
                };
                self.build_element(role, child, child_page, list, state)?;
            } else {
                open_list = None;
                self.build_element(role, child, child_page, parent, state)?;
            }
        }
        Ok(())
    }

    /// Leaf holding text, wrapped in a `Span` for paragraphs and headings.
    fn build_text_leaf(
        &self,
        role: StructType,
        text: &str,
        attributes: StructureAttributes,
        page: usize,
        parent: NodeId,
        state: &mut BuildState,
    ) -> Result<NodeId> {
        let node = StructureNode::new(role)
            .with_page(page)
            .with_attributes(attributes);

        if self.config.wrap_text_in_spans && role.wraps_text_in_span() && !text.is_empty() {
            let id = state.tree.append(parent, node)?;
            state.tree.append(
                id,
                StructureNode::new(StructType::Span).with_text(text).with_page(page),
            )?;
            debug!("{} {} on page {} wrapped in Span", role, id, page + 1);
            return Ok(id);
        }

        let node = if text.is_empty() { node } else { node.with_text(text) };
        state.tree.append(parent, node)
    }

    fn build_list_item(
        &self,
        text: &str,
        attributes: StructureAttributes,
        page: usize,
        parent: NodeId,
        state: &mut BuildState,
    ) -> Result<NodeId> {
        if self.config.split_list_labels {
            if let Some((marker, body)) = heuristics::split_list_marker(text) {
                let item = state.tree.append(
                    parent,
                    StructureNode::new(StructType::LI)
                        .with_page(page)
                        .with_attributes(attributes),
                )?;
                state.tree.append(
                    item,
                    StructureNode::new(StructType::Lbl).with_text(marker).with_page(page),
                )?;
                state.tree.append(
                    item,
                    StructureNode::new(StructType::LBody).with_text(body).with_page(page),
                )?;
                return Ok(item);
            }
        }
        self.build_text_leaf(StructType::LI, text, attributes, page, parent, state)
    }

    /// Expand a tab/newline matrix into rows of header and data cells.
    fn build_table(
        &self,
        content: &str,
        page: usize,
        attributes: StructureAttributes,
        parent: NodeId,
        state: &mut BuildState,
    ) -> Result<NodeId> {
        state.tables += 1;
        let table_key = attributes
            .id
            .clone()
            .unwrap_or_else(|| format!("table{}", state.tables));
        let table = state.tree.append(
            parent,
            StructureNode::new(StructType::Table)
                .with_page(page)
                .with_attributes(attributes),
        )?;

        let rows = heuristics::parse_table_matrix(content);
        let has_header = heuristics::is_header_row(&rows);
        let header_ids: Vec<String> = if has_header {
            (0..rows[0].len())
                .map(|col| format!("{}_h{}", table_key, col + 1))
                .collect()
        } else {
            Vec::new()
        };

        for (r, row) in rows.iter().enumerate() {
            let tr = state
                .tree
                .append(table, StructureNode::new(StructType::TR).with_page(page))?;
            for (c, cell) in row.iter().enumerate() {
                let mut node = if has_header && r == 0 {
                    let mut th = StructureNode::new(StructType::TH).with_page(page);
                    th.attributes.id = header_ids.get(c).cloned();
                    th
                } else {
                    let mut td = StructureNode::new(StructType::TD).with_page(page);
                    if let Some(header) = header_ids.get(c) {
                        td.attributes.headers = Some(vec![header.clone()]);
                    }
                    td
                };
                if !cell.is_empty() {
                    node.text = Some(cell.clone());
                }
                state.tree.append(tr, node)?;
            }
        }

        debug!(
            "Table {} on page {}: {} rows, header row: {}",
            table,
            page + 1,
            rows.len(),
            has_header
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementAttributes;

    fn roles(tree: &StructureTree, ids: &[NodeId]) -> Vec<StructType> {
        ids.iter().map(|&id| tree.node(id).unwrap().role).collect()
    }

    fn build(config: &TaggingConfig, elements: &[ClassifiedElement]) -> Hierarchy {
        HierarchyBuilder::new(config).with_page_count(2).build(elements).unwrap()
    }

    #[test]
    fn test_list_run_grouped() {
        let config = TaggingConfig::default();
        let elements = vec![
            ClassifiedElement::new("LI", "one", 1),
            ClassifiedElement::new("LI", "two", 1),
            ClassifiedElement::new("LI", "three", 1),
            ClassifiedElement::new("P", "after", 1),
        ];
        let h = build(&config, &elements);
        let top = &h.tree.node(h.tree.root()).unwrap().children;
        assert_eq!(roles(&h.tree, top), vec![StructType::L, StructType::P]);
        assert_eq!(h.tree.node(top[0]).unwrap().children.len(), 3);
    }

    #[test]
    fn test_separate_runs_make_separate_lists() {
        let config = TaggingConfig::default();
        let elements = vec![
            ClassifiedElement::new("LI", "a", 1),
            ClassifiedElement::new("P", "gap", 1),
            ClassifiedElement::new("LI", "b", 1),
        ];
        let h = build(&config, &elements);
        let top = &h.tree.node(h.tree.root()).unwrap().children;
        assert_eq!(roles(&h.tree, top), vec![StructType::L, StructType::P, StructType::L]);
    }

    #[test]
    fn test_paragraph_gets_span() {
        let config = TaggingConfig::default();
        let h = build(&config, &[ClassifiedElement::new("P", "Hello world", 1)]);
        let p = h.tree.node(h.tree.root()).unwrap().children[0];
        let p_node = h.tree.node(p).unwrap();
        assert!(p_node.text.is_none());
        let span = h.tree.node(p_node.children[0]).unwrap();
        assert_eq!(span.role, StructType::Span);
        assert_eq!(span.text.as_deref(), Some("Hello world"));
        assert!(span.is_content_bearing());
    }

    #[test]
    fn test_spans_disabled() {
        let config = TaggingConfig::new().with_text_spans(false);
        let h = build(&config, &[ClassifiedElement::new("H1", "Intro", 1)]);
        let h1 = h.tree.node(h.tree.root()).unwrap().children[0];
        assert!(h.tree.node(h1).unwrap().is_content_bearing());
    }

    #[test]
    fn test_unknown_role_remapped_and_flagged() {
        let config = TaggingConfig::default();
        let h = build(&config, &[ClassifiedElement::new("Banner", "x", 1)]);
        let top = &h.tree.node(h.tree.root()).unwrap().children;
        assert_eq!(roles(&h.tree, top), vec![StructType::P]);
        assert_eq!(h.stats.roles_remapped, 1);
        assert_eq!(h.diagnostics[0].code, DiagnosticCode::UnrecognizedRole);
    }

    #[test]
    fn test_out_of_range_page_dropped() {
        let config = TaggingConfig::default();
        let h = build(
            &config,
            &[ClassifiedElement::new("P", "kept", 1), ClassifiedElement::new("P", "gone", 99)],
        );
        assert_eq!(h.stats.elements_dropped, 1);
        assert_eq!(h.tree.node(h.tree.root()).unwrap().children.len(), 1);
        assert_eq!(h.diagnostics[0].code, DiagnosticCode::PageOutOfRange);
        assert_eq!(h.diagnostics[0].page, Some(99));
    }

    #[test]
    fn test_artifact_excluded() {
        let config = TaggingConfig::default();
        let h = build(&config, &[ClassifiedElement::new("Artifact", "page 1", 1)]);
        assert_eq!(h.tree.len(), 1);
        assert_eq!(h.stats.artifacts_excluded, 1);
    }

    #[test]
    fn test_list_label_split() {
        let config = TaggingConfig::default();
        let h = build(&config, &[ClassifiedElement::new("LI", "1. First", 1)]);
        let list = h.tree.node(h.tree.root()).unwrap().children[0];
        let item = h.tree.node(list).unwrap().children[0];
        let kids = &h.tree.node(item).unwrap().children;
        assert_eq!(roles(&h.tree, kids), vec![StructType::Lbl, StructType::LBody]);
        assert_eq!(h.tree.node(kids[0]).unwrap().text.as_deref(), Some("1."));
        assert_eq!(h.tree.node(kids[1]).unwrap().text.as_deref(), Some("First"));
    }

    #[test]
    fn test_table_matrix_expanded() {
        let config = TaggingConfig::default();
        let element = ClassifiedElement::new("table", "Name\tAge\nAlice\t30\nBob\t41", 1)
            .with_attributes(ElementAttributes {
                summary: Some("People".to_string()),
                ..Default::default()
            });
        let h = build(&config, &[element]);
        let table = h.tree.node(h.tree.root()).unwrap().children[0];
        let table_node = h.tree.node(table).unwrap();
        assert_eq!(table_node.attributes.summary.as_deref(), Some("People"));
        assert_eq!(table_node.children.len(), 3);

        let header_row = h.tree.node(table_node.children[0]).unwrap();
        assert_eq!(roles(&h.tree, &header_row.children), vec![StructType::TH, StructType::TH]);
        let th = h.tree.node(header_row.children[1]).unwrap();
        assert_eq!(th.attributes.id.as_deref(), Some("table1_h2"));

        let data_row = h.tree.node(table_node.children[1]).unwrap();
        let td = h.tree.node(data_row.children[1]).unwrap();
        assert_eq!(td.role, StructType::TD);
        assert_eq!(td.attributes.headers, Some(vec!["table1_h2".to_string()]));
        assert_eq!(td.text.as_deref(), Some("30"));
    }

    #[test]
    fn test_pre_grouped_list_kept() {
        let config = TaggingConfig::default();
        let element = ClassifiedElement::new("L", "", 1).with_children(vec![
            ClassifiedElement::new("LI", "a", 0),
            ClassifiedElement::new("LI", "b", 2),
        ]);
        let h = build(&config, &[element]);
        let list = h.tree.node(h.tree.root()).unwrap().children[0];
        let items = &h.tree.node(list).unwrap().children;
        assert_eq!(roles(&h.tree, items), vec![StructType::LI, StructType::LI]);
        assert_eq!(h.tree.node(items[0]).unwrap().page, Some(0));
        assert_eq!(h.tree.node(items[1]).unwrap().page, Some(1));
    }

    #[test]
    fn test_sections_nest_by_heading_level() {
        let config = TaggingConfig::new().with_sections(true);
        let elements = vec![
            ClassifiedElement::new("P", "preamble", 1),
            ClassifiedElement::new("H1", "One", 1),
            ClassifiedElement::new("H2", "One.One", 1),
            ClassifiedElement::new("P", "body", 1),
            ClassifiedElement::new("H1", "Two", 2),
        ];
        let h = build(&config, &elements);
        let top = &h.tree.node(h.tree.root()).unwrap().children;
        assert_eq!(roles(&h.tree, top), vec![StructType::P, StructType::Sect, StructType::Sect]);

        let first = h.tree.node(top[1]).unwrap();
        assert_eq!(roles(&h.tree, &first.children), vec![StructType::H1, StructType::Sect]);
        let nested = h.tree.node(first.children[1]).unwrap();
        assert_eq!(roles(&h.tree, &nested.children), vec![StructType::H2, StructType::P]);
    }

    #[test]
    fn test_generic_heading_gets_level() {
        let config = TaggingConfig::default();
        let h = build(&config, &[ClassifiedElement::new("heading", "Chapter 1", 1)]);
        let top = &h.tree.node(h.tree.root()).unwrap().children;
        assert_eq!(roles(&h.tree, top), vec![StructType::H1]);
    }

    #[test]
    fn test_derived_title() {
        let config = TaggingConfig::new().with_derived_titles(true);
        let h = build(&config, &[ClassifiedElement::new("P", "  Some   body text ", 1)]);
        let p = h.tree.node(h.tree.root()).unwrap().children[0];
        assert_eq!(
            h.tree.node(p).unwrap().attributes.title.as_deref(),
            Some("Some body text")
        );
    }
}
