//! Structure tree builder.
//!
//! Materializes a [`StructureTree`], its MCID assignment and its parent tree
//! index into PDF objects (ISO 32000-1:2008 Sections 14.7.2 and 14.7.4.4).
//!
//! Object identity is allocated for every node before any dictionary is
//! written, so kid references, parent references and parent tree entries all
//! point at objects that already have a number.

use super::mcid::McidAssignment;
use super::parent_tree::ParentTreeIndex;
use super::traversal::preorder;
use super::tree::{NodeId, StructureNode, StructureTree};
use super::types::{StructType, StructureAttributes};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::report::{Diagnostic, DiagnosticCode};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// Objects produced by [`StructureTreeBuilder::build`].
#[derive(Debug, Clone)]
pub struct StructTreeObjects {
    /// Reference of the `/StructTreeRoot` dictionary
    pub root_ref: ObjectRef,
    /// All new indirect objects by object number
    pub objects: BTreeMap<u32, Object>,
    /// Object reference of every structure node
    pub node_refs: HashMap<NodeId, ObjectRef>,
    /// `/StructParents` value for each zero-based page that has marked content
    pub struct_parents: BTreeMap<usize, i64>,
    /// First object number not used by this build
    pub next_obj_id: u32,
    /// Role overrides left out of `/RoleMap`
    pub diagnostics: Vec<Diagnostic>,
}

impl StructTreeObjects {
    /// Object of a node.
    pub fn node_object(&self, node: NodeId) -> Option<&Object> {
        let r = self.node_refs.get(&node)?;
        self.objects.get(&r.id)
    }

    /// The `/StructTreeRoot` dictionary.
    pub fn root(&self) -> Option<&Dictionary> {
        self.objects.get(&self.root_ref.id)?.as_dict()
    }
}

/// Builds the structure tree object graph.
pub struct StructureTreeBuilder<'a> {
    tree: &'a StructureTree,
    assignment: &'a McidAssignment,
    index: &'a ParentTreeIndex,
}

impl<'a> StructureTreeBuilder<'a> {
    /// Create a builder over an immutable tree, its MCIDs and its parent tree.
    pub fn new(
        tree: &'a StructureTree,
        assignment: &'a McidAssignment,
        index: &'a ParentTreeIndex,
    ) -> Self {
        Self {
            tree,
            assignment,
            index,
        }
    }

    /// Build all objects, numbering them from `start_obj_id`.
    ///
    /// `page_refs` holds the page object of each zero-based page index.
    pub fn build(&self, page_refs: &[ObjectRef], start_obj_id: u32) -> Result<StructTreeObjects> {
        self.tree.validate()?;

        // Pass 1: identity for the root and every node.
        let mut next_id = start_obj_id;
        let root_ref = ObjectRef::new(next_id, 0);
        next_id += 1;

        let order: Vec<NodeId> = preorder(self.tree).collect();
        let mut node_refs = HashMap::with_capacity(order.len());
        for &id in &order {
            node_refs.insert(id, ObjectRef::new(next_id, 0));
            next_id += 1;
        }

        // Pass 2: dictionaries, using only identities from pass 1.
        let mut objects = BTreeMap::new();
        let mut role_map: Dictionary = Dictionary::new();
        let mut diagnostics = Vec::new();

        for &id in &order {
            let node = self.tree.node(id)?;
            let dict = self.element_dict(id, node, root_ref, &node_refs, page_refs)?;
            if let Some(ref custom) = node.attributes.role_override {
                if let Some(diagnostic) = self.add_role_mapping(&mut role_map, custom, node.role) {
                    let diagnostic = match self.tree.first_page(id) {
                        Some(page) => diagnostic.with_page(page + 1),
                        None => diagnostic,
                    };
                    diagnostic.log();
                    diagnostics.push(diagnostic);
                }
            }
            objects.insert(node_refs[&id].id, Object::Dictionary(dict));
        }

        let (parent_tree, struct_parents) = self.parent_tree(&node_refs)?;

        let mut root = Dictionary::new();
        root.insert("Type".to_string(), Object::name("StructTreeRoot"));
        root.insert(
            "K".to_string(),
            Object::Array(vec![Object::Reference(node_refs[&self.tree.root()])]),
        );
        root.insert("ParentTree".to_string(), parent_tree);
        root.insert("ParentTreeNextKey".to_string(), Object::Integer(self.index.next_key()));
        if !role_map.is_empty() {
            root.insert("RoleMap".to_string(), Object::Dictionary(role_map));
        }
        objects.insert(root_ref.id, Object::Dictionary(root));

        debug!(
            "Materialized {} structure elements as objects {}..{}",
            order.len(),
            start_obj_id,
            next_id
        );

        Ok(StructTreeObjects {
            root_ref,
            objects,
            node_refs,
            struct_parents,
            next_obj_id: next_id,
            diagnostics,
        })
    }

    fn element_dict(
        &self,
        id: NodeId,
        node: &StructureNode,
        root_ref: ObjectRef,
        node_refs: &HashMap<NodeId, ObjectRef>,
        page_refs: &[ObjectRef],
    ) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("StructElem"));

        let s = node
            .attributes
            .role_override
            .clone()
            .unwrap_or_else(|| node.role.as_pdf_name().to_string());
        dict.insert("S".to_string(), Object::Name(s));

        let parent_ref = match node.parent() {
            Some(parent) => *node_refs
                .get(&parent)
                .ok_or_else(|| Error::InvalidTree(format!("parent of {} has no object", id)))?,
            None => root_ref,
        };
        dict.insert("P".to_string(), Object::Reference(parent_ref));

        let page = self.tree.first_page(id);
        if let Some(page) = page {
            dict.insert("Pg".to_string(), Object::Reference(page_ref(page_refs, page)?));
        }

        write_attributes(&mut dict, &node.attributes);

        let mut kids = Vec::with_capacity(node.children.len() + 1);
        for child in &node.children {
            let child_ref = node_refs
                .get(child)
                .ok_or_else(|| Error::InvalidTree(format!("child {} of {} has no object", child, id)))?;
            kids.push(Object::Reference(*child_ref));
        }

        if let Some(entry) = self.assignment.entry_of(id) {
            // Unlinked identifiers were cleared from the index and are left out.
            if self.index.lookup(entry.page, entry.mcid) == Some(id) {
                if page == Some(entry.page) {
                    kids.push(Object::Integer(entry.mcid as i64));
                } else {
                    kids.push(Object::dict(vec![
                        ("Type", Object::name("MCR")),
                        ("Pg", Object::Reference(page_ref(page_refs, entry.page)?)),
                        ("MCID", Object::Integer(entry.mcid as i64)),
                    ]));
                }
            }
        }

        if !kids.is_empty() {
            dict.insert("K".to_string(), Object::Array(kids));
        }
        Ok(dict)
    }

    /// Map a custom `/S` to its standard type. Standard types are never
    /// remapped; overriding with one is reported instead.
    fn add_role_mapping(
        &self,
        role_map: &mut Dictionary,
        custom: &str,
        standard: StructType,
    ) -> Option<Diagnostic> {
        match StructType::from_pdf_name(custom) {
            Some(same) if same == standard => return None,
            Some(_) => {
                return Some(
                    Diagnostic::new(
                        DiagnosticCode::RoleMapSkipped,
                        format!(
                            "role override {} is a standard type; not mapped to {}",
                            custom, standard
                        ),
                    )
                    .with_role(standard.as_pdf_name()),
                );
            },
            None => {},
        }
        match role_map.get(custom) {
            Some(Object::Name(existing)) if existing != standard.as_pdf_name() => {
                warn!(
                    "Role '{}' already maps to {}, ignoring mapping to {}",
                    custom, existing, standard
                );
            },
            Some(_) => {},
            None => {
                role_map.insert(custom.to_string(), Object::name(standard.as_pdf_name()));
            },
        }
        None
    }

    /// `<< /Nums [key [refs...] ...] >>` plus the page to key map.
    fn parent_tree(
        &self,
        node_refs: &HashMap<NodeId, ObjectRef>,
    ) -> Result<(Object, BTreeMap<usize, i64>)> {
        let mut nums = Vec::with_capacity(self.index.page_count() * 2);
        let mut struct_parents = BTreeMap::new();

        for (page, slots) in self.index.pages() {
            let key = page as i64;
            let refs = slots
                .iter()
                .map(|slot| match slot {
                    Some(node) => node_refs
                        .get(node)
                        .map(|r| Object::Reference(*r))
                        .ok_or_else(|| {
                            Error::InvalidTree(format!("parent tree points at unknown node {}", node))
                        }),
                    None => Ok(Object::Null),
                })
                .collect::<Result<Vec<_>>>()?;
            nums.push(Object::Integer(key));
            nums.push(Object::Array(refs));
            struct_parents.insert(page, key);
        }

        Ok((Object::dict(vec![("Nums", Object::Array(nums))]), struct_parents))
    }
}

fn page_ref(page_refs: &[ObjectRef], page: usize) -> Result<ObjectRef> {
    page_refs.get(page).copied().ok_or(Error::PageNotFound(page))
}

/// Write `/T`, `/Lang`, `/Alt`, `/ActualText`, `/ID` and the `/A` attribute objects.
fn write_attributes(dict: &mut Dictionary, attributes: &StructureAttributes) {
    if attributes.is_empty() {
        return;
    }
    if let Some(ref title) = attributes.title {
        dict.insert("T".to_string(), Object::text(title));
    }
    if let Some(ref lang) = attributes.lang {
        dict.insert("Lang".to_string(), Object::text(lang));
    }
    if let Some(ref alt) = attributes.alt {
        dict.insert("Alt".to_string(), Object::text(alt));
    }
    if let Some(ref actual) = attributes.actual_text {
        dict.insert("ActualText".to_string(), Object::text(actual));
    }
    if let Some(ref id) = attributes.id {
        dict.insert("ID".to_string(), Object::String(id.as_bytes().to_vec()));
    }

    let mut owners = Vec::new();
    if attributes.has_table_attributes() {
        let mut table = Dictionary::new();
        table.insert("O".to_string(), Object::name("Table"));
        if let Some(ref summary) = attributes.summary {
            table.insert("Summary".to_string(), Object::text(summary));
        }
        if let Some(rows) = attributes.row_span {
            table.insert("RowSpan".to_string(), Object::Integer(rows as i64));
        }
        if let Some(cols) = attributes.column_span {
            table.insert("ColSpan".to_string(), Object::Integer(cols as i64));
        }
        if let Some(ref headers) = attributes.headers {
            table.insert(
                "Headers".to_string(),
                Object::Array(
                    headers
                        .iter()
                        .map(|h| Object::String(h.as_bytes().to_vec()))
                        .collect(),
                ),
            );
        }
        owners.push(Object::Dictionary(table));
    }
    if let Some(checked) = attributes.checked {
        owners.push(Object::dict(vec![
            ("O", Object::name("PrintField")),
            ("checked", Object::name(checked.as_pdf_name())),
        ]));
    }

    match owners.len() {
        0 => {},
        1 => {
            if let Some(owner) = owners.pop() {
                dict.insert("A".to_string(), owner);
            }
        },
        _ => {
            dict.insert("A".to_string(), Object::Array(owners));
        },
    }
}
