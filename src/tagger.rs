//! Tagging pipeline.
//!
//! ```text
//! ClassifiedElement[]
//!     ↓
//! [HierarchyBuilder]      (elements → StructureTree)
//!     ↓
//! [McidAllocator]         (content-bearing nodes → (page, MCID))
//!     ↓
//! [ParentTreeIndex]       ((page, MCID) → node)
//!     ↓
//! per page, in parallel:  parse → plan marks → insert BDC/EMC → write
//!     ↓
//! [StructureTreeBuilder]  (StructTreeRoot, StructElem, ParentTree objects)
//!     ↓
//! HostDocument            (objects, catalog, page entries, page content)
//! ```
//!
//! Everything that can fail runs before the host is touched, so an aborted
//! run leaves the document as it was.

use crate::config::TaggingConfig;
use crate::content::{
    clear_existing_mcids, parse_content_stream, plan_page, write_content_stream,
    ContentStreamMarker, MarkTarget, TargetKind, UnlinkedTarget,
};
use crate::elements::ClassifiedElement;
use crate::error::{Error, Result};
use crate::host::HostDocument;
use crate::object::{Object, ObjectRef};
use crate::report::{Diagnostic, DiagnosticCode, TaggingReport};
use crate::structure::{
    allocate_mcids, HierarchyBuilder, McidAssignment, ParentTreeIndex, StructType,
    StructureTree, StructureTreeBuilder,
};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Everything a tagging run produced.
#[derive(Debug, Clone)]
pub struct TaggingOutcome {
    /// The structure tree
    pub tree: StructureTree,
    /// MCIDs of the content-bearing nodes
    pub mcids: McidAssignment,
    /// Parent tree, with unlinked identifiers cleared
    pub parent_tree: ParentTreeIndex,
    /// Reference of the `/StructTreeRoot` written to the host
    pub root_ref: ObjectRef,
    /// Counts and diagnostics
    pub report: TaggingReport,
}

/// Content of one page and the nodes to link on it.
struct PageJob {
    page: usize,
    content: Vec<u8>,
    targets: Vec<MarkTarget>,
}

/// Result of marking one page.
struct PageOutcome {
    page: usize,
    /// New content, if anything was inserted
    content: Option<Vec<u8>>,
    marks_written: usize,
    artifact_regions: usize,
    /// Pre-existing MCIDs removed from the content
    cleared: usize,
    unlinked: Vec<UnlinkedTarget>,
}

/// Tags documents according to a [`TaggingConfig`].
#[derive(Debug, Clone, Default)]
pub struct Tagger {
    config: TaggingConfig,
}

impl Tagger {
    /// Create a tagger.
    pub fn new(config: TaggingConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &TaggingConfig {
        &self.config
    }

    /// Build the structure tree for `elements` and write it, with the marked
    /// page content, into `host`.
    ///
    /// Content that cannot be linked is reported in the outcome's report and
    /// does not fail the run. Invariant violations and host failures do.
    pub fn tag<H: HostDocument>(
        &self,
        host: &mut H,
        elements: &[ClassifiedElement],
    ) -> Result<TaggingOutcome> {
        let mut report = TaggingReport::new();
        let page_count = host.page_count();
        let retagging = host.has_structure_tree();
        if retagging {
            warn!("Document already has a structure tree; it will be replaced");
        }

        let hierarchy = HierarchyBuilder::new(&self.config)
            .with_page_count(page_count)
            .build(elements)?;
        report.extend(hierarchy.diagnostics);
        let tree = hierarchy.tree;

        let mcids = allocate_mcids(&tree, self.config.mcid_scope)?;
        let mut parent_tree = ParentTreeIndex::from_assignment(&mcids)?;
        info!(
            "Allocated {} MCIDs on {} pages ({:?} scope)",
            mcids.len(),
            parent_tree.page_count(),
            mcids.scope()
        );

        let jobs = self.page_jobs(host, &tree, &mcids, page_count, retagging)?;
        let outcomes: Vec<PageOutcome> = if self.config.parallel_pages {
            jobs.into_par_iter()
                .map(|job| self.mark_page(job))
                .collect::<Result<Vec<_>>>()?
        } else {
            jobs.into_iter()
                .map(|job| self.mark_page(job))
                .collect::<Result<Vec<_>>>()?
        };

        for outcome in &outcomes {
            for unlinked in &outcome.unlinked {
                parent_tree.mark_unlinked(outcome.page, unlinked.mcid);
                let role = tree.node(unlinked.node)?.role;
                report.add(
                    Diagnostic::new(unlinked.code, unlinked.reason.clone())
                        .with_role(role.as_pdf_name())
                        .with_page(outcome.page + 1)
                        .with_mcid(unlinked.mcid),
                );
                report.unlinked += 1;
            }
            if outcome.marks_written > 0 {
                report.marks_per_page.insert(outcome.page + 1, outcome.marks_written);
            }
            report.artifact_regions += outcome.artifact_regions;
            if outcome.cleared > 0 {
                report.add(
                    Diagnostic::new(
                        DiagnosticCode::ExistingMcidsCleared,
                        format!("removed {} existing MCIDs", outcome.cleared),
                    )
                    .with_page(outcome.page + 1),
                );
            }
        }

        let page_refs = host.page_refs()?;
        let objects = StructureTreeBuilder::new(&tree, &mcids, &parent_tree)
            .build(&page_refs, host.next_object_id())?;
        // Already logged by the builder
        report.extend(objects.diagnostics.clone());

        // Only host mutation from here on.
        for (id, object) in objects.objects {
            host.insert_object(ObjectRef::new(id, 0), object)?;
        }
        host.set_catalog_entry("StructTreeRoot", Object::Reference(objects.root_ref))?;
        host.set_catalog_entry("MarkInfo", Object::dict(vec![("Marked", Object::Boolean(true))]))?;
        if let Some(ref lang) = self.config.document_language {
            host.set_catalog_entry("Lang", Object::text(lang))?;
        }
        for (&page, &key) in &objects.struct_parents {
            host.set_page_entry(page, "StructParents", Object::Integer(key))?;
        }
        for outcome in outcomes {
            if let Some(content) = outcome.content {
                host.set_page_content(outcome.page, content)?;
            }
        }

        let stats = hierarchy.stats;
        report.elements_in = stats.elements_in;
        report.elements_kept = stats.elements_kept;
        report.elements_dropped = stats.elements_dropped;
        report.artifacts_excluded = stats.artifacts_excluded;
        report.roles_remapped = stats.roles_remapped;
        report.nodes = tree.len();
        report.content_bearing = mcids.len();
        report.linked = report.content_bearing - report.unlinked;
        for (_, node) in tree.iter() {
            *report.roles.entry(node.role.as_pdf_name().to_string()).or_insert(0) += 1;
        }
        info!("Tagging complete: {}", report.summary());

        Ok(TaggingOutcome {
            tree,
            mcids,
            parent_tree,
            root_ref: objects.root_ref,
            report,
        })
    }

    /// Read the pages that need marking and collect their targets.
    fn page_jobs<H: HostDocument>(
        &self,
        host: &H,
        tree: &StructureTree,
        mcids: &McidAssignment,
        page_count: usize,
        retagging: bool,
    ) -> Result<Vec<PageJob>> {
        // Old MCIDs may sit on pages without new content
        let pages: Vec<usize> = if self.config.mark_unclaimed_as_artifact || retagging {
            (0..page_count).collect()
        } else {
            mcids.pages().into_iter().collect()
        };

        let mut jobs = Vec::with_capacity(pages.len());
        for page in pages {
            let mut targets = Vec::new();
            for entry in mcids.on_page(page) {
                let node = tree.node(entry.node)?;
                let tag = node
                    .attributes
                    .role_override
                    .clone()
                    .unwrap_or_else(|| node.role.as_pdf_name().to_string());
                let kind = match node.text.as_deref() {
                    Some(text) if node.role != StructType::Figure && !text.trim().is_empty() => {
                        TargetKind::Text(text.to_string())
                    },
                    _ => TargetKind::Graphic,
                };
                targets.push(MarkTarget {
                    node: entry.node,
                    mcid: entry.mcid,
                    tag,
                    kind,
                });
            }
            jobs.push(PageJob {
                page,
                content: host.page_content(page)?,
                targets,
            });
        }
        Ok(jobs)
    }

    /// Link and mark one page. Touches nothing outside the job.
    fn mark_page(&self, job: PageJob) -> Result<PageOutcome> {
        let mut ops = match parse_content_stream(&job.content, job.page) {
            Ok(ops) => ops,
            Err(err @ Error::ContentParse { .. }) => {
                warn!("Page {} left unchanged: {}", job.page + 1, err);
                let reason = err.to_string();
                return Ok(PageOutcome {
                    page: job.page,
                    content: None,
                    marks_written: 0,
                    artifact_regions: 0,
                    cleared: 0,
                    unlinked: job
                        .targets
                        .iter()
                        .map(|t| UnlinkedTarget {
                            node: t.node,
                            mcid: t.mcid,
                            code: DiagnosticCode::UnreadableContent,
                            reason: reason.clone(),
                        })
                        .collect(),
                });
            },
            Err(err) => return Err(err),
        };

        let cleared = clear_existing_mcids(&mut ops);
        let plan = plan_page(&ops, &job.targets, self.config.link_strategy);
        let marked = ContentStreamMarker::new(self.config.mark_unclaimed_as_artifact)
            .apply(job.page, &ops, &plan.marks)?;
        debug!(
            "Page {}: {} of {} targets linked",
            job.page + 1,
            plan.marks.len(),
            job.targets.len()
        );

        let changed = marked.marks_written > 0 || marked.artifact_regions > 0 || cleared > 0;
        Ok(PageOutcome {
            page: job.page,
            content: changed.then(|| write_content_stream(&marked.operations)),
            marks_written: marked.marks_written,
            artifact_regions: marked.artifact_regions,
            cleared,
            unlinked: plan.unlinked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkStrategy;
    use crate::host::MemoryDocument;

    fn elements() -> Vec<ClassifiedElement> {
        vec![
            ClassifiedElement::new("H1", "Intro", 1),
            ClassifiedElement::new("P", "Hello world", 1),
        ]
    }

    #[test]
    fn test_tag_writes_catalog_and_page_entries() {
        let mut doc = MemoryDocument::new().with_page("BT (Intro) Tj (Hello world) Tj ET");
        let config = TaggingConfig::default().with_language("en-US");
        let outcome = Tagger::new(config).tag(&mut doc, &elements()).unwrap();

        let catalog = doc.catalog();
        assert_eq!(
            catalog.get("StructTreeRoot"),
            Some(&Object::Reference(outcome.root_ref))
        );
        let mark_info = catalog.get("MarkInfo").and_then(|o| o.as_dict()).unwrap();
        assert_eq!(mark_info.get("Marked"), Some(&Object::Boolean(true)));
        assert_eq!(catalog.get("Lang"), Some(&Object::text("en-US")));
        assert_eq!(
            doc.page_dict(0).unwrap().get("StructParents"),
            Some(&Object::Integer(0))
        );
        assert!(outcome.report.is_fully_linked());
        assert_eq!(outcome.report.marks_per_page.get(&1), Some(&2));
    }

    #[test]
    fn test_unreadable_page_is_left_unchanged() {
        let original = b"BT (Intro) Tj ET BI /W 1 ID xx".to_vec();
        let mut doc = MemoryDocument::new().with_page(original.clone());
        let outcome = Tagger::default().tag(&mut doc, &elements()).unwrap();

        assert_eq!(doc.page_content(0).unwrap(), original);
        assert_eq!(outcome.report.unlinked, 2);
        assert_eq!(
            outcome.report.with_code(DiagnosticCode::UnreadableContent).count(),
            2
        );
        // Structure is still written; slots stay but are empty.
        assert_eq!(outcome.parent_tree.page_slots(0), Some(&[None, None][..]));
        assert!(doc.has_structure_tree());
    }

    #[test]
    fn test_serial_and_parallel_agree() {
        let pages = ["BT (Intro) Tj ET", "BT (Hello world) Tj ET"];
        let elements = vec![
            ClassifiedElement::new("H1", "Intro", 1),
            ClassifiedElement::new("P", "Hello world", 2),
        ];

        let mut serial = MemoryDocument::new().with_page(pages[0]).with_page(pages[1]);
        let mut parallel = serial.clone();
        Tagger::new(TaggingConfig::default().with_parallel_pages(false))
            .tag(&mut serial, &elements)
            .unwrap();
        Tagger::new(TaggingConfig::default())
            .tag(&mut parallel, &elements)
            .unwrap();

        for page in 0..2 {
            assert_eq!(serial.page_content(page).unwrap(), parallel.page_content(page).unwrap());
        }
    }

    #[test]
    fn test_linking_disabled_keeps_content() {
        let mut doc = MemoryDocument::new().with_page("BT (Intro) Tj ET");
        let config = TaggingConfig::default().with_link_strategy(LinkStrategy::None);
        let outcome = Tagger::new(config).tag(&mut doc, &elements()[..1]).unwrap();

        assert_eq!(doc.page_content(0).unwrap(), b"BT (Intro) Tj ET");
        assert_eq!(outcome.report.linked, 0);
        assert_eq!(outcome.report.unlinked, 1);
    }
}
