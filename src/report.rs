//! Tagging report: recoverable diagnostics and run statistics.
//!
//! Everything that went wrong without aborting the run ends up here, with
//! enough context (role, page, MCID) to find the element again.

use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Role not in the taxonomy; remapped to `P`
    UnrecognizedRole,
    /// Heading without a level; level chosen heuristically
    HeadingLevelGuessed,
    /// Element references a page the document does not have; dropped
    PageOutOfRange,
    /// Element classified as an artifact; kept out of the tree
    ArtifactExcluded,
    /// Node content was not found in the page's content stream
    ContentNotFound,
    /// Matched operators could not be bracketed without breaking nesting
    UnbalancedRange,
    /// Matched operators overlap a region claimed by an earlier node
    OverlappingRange,
    /// Linking was disabled by configuration
    LinkingDisabled,
    /// The page's content stream could not be tokenized; the page was left as is
    UnreadableContent,
    /// MCIDs already present in the page content were removed before marking
    ExistingMcidsCleared,
    /// A role override names a standard type, so it was not role-mapped
    RoleMapSkipped,
}

impl DiagnosticCode {
    /// Informational codes describe intended behavior rather than a loss.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::HeadingLevelGuessed
                | DiagnosticCode::ArtifactExcluded
                | DiagnosticCode::LinkingDisabled
        )
    }

    /// Whether this code means a node stayed unlinked.
    pub fn is_unlinked(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::ContentNotFound
                | DiagnosticCode::UnbalancedRange
                | DiagnosticCode::OverlappingRange
                | DiagnosticCode::LinkingDisabled
                | DiagnosticCode::UnreadableContent
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            DiagnosticCode::UnrecognizedRole => "unrecognized-role",
            DiagnosticCode::HeadingLevelGuessed => "heading-level-guessed",
            DiagnosticCode::PageOutOfRange => "page-out-of-range",
            DiagnosticCode::ArtifactExcluded => "artifact-excluded",
            DiagnosticCode::ContentNotFound => "content-not-found",
            DiagnosticCode::UnbalancedRange => "unbalanced-range",
            DiagnosticCode::OverlappingRange => "overlapping-range",
            DiagnosticCode::LinkingDisabled => "linking-disabled",
            DiagnosticCode::UnreadableContent => "unreadable-content",
            DiagnosticCode::ExistingMcidsCleared => "existing-mcids-cleared",
            DiagnosticCode::RoleMapSkipped => "role-map-skipped",
        };
        f.write_str(code)
    }
}

/// One recoverable condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Kind of condition
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Role of the affected element or node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// 1-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// MCID of the affected node, if one was allocated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcid: Option<u32>,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            role: None,
            page: None,
            mcid: None,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the 1-based page number.
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the MCID.
    pub fn with_mcid(mut self, mcid: u32) -> Self {
        self.mcid = Some(mcid);
        self
    }

    /// Log at `debug` for informational codes and `warn` otherwise.
    pub fn log(&self) {
        if self.code.is_informational() {
            log::debug!("{}", self);
        } else {
            log::warn!("{}", self);
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref role) = self.role {
            write!(f, " (role {}", role)?;
            if let Some(page) = self.page {
                write!(f, ", page {}", page)?;
            }
            if let Some(mcid) = self.mcid {
                write!(f, ", MCID {}", mcid)?;
            }
            write!(f, ")")?;
        } else if let Some(page) = self.page {
            write!(f, " (page {})", page)?;
        }
        Ok(())
    }
}

/// Summary of a tagging run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaggingReport {
    /// RFC 3339 timestamp of report creation
    pub generated_at: String,
    /// Top-level classified elements received
    pub elements_in: usize,
    /// Elements (at any depth) that became structure nodes
    pub elements_kept: usize,
    /// Elements dropped for referencing a missing page
    pub elements_dropped: usize,
    /// Elements excluded as artifacts
    pub artifacts_excluded: usize,
    /// Roles remapped to `P`
    pub roles_remapped: usize,
    /// Structure nodes, root included
    pub nodes: usize,
    /// Nodes owning marked content
    pub content_bearing: usize,
    /// Content-bearing nodes bracketed in a content stream
    pub linked: usize,
    /// Content-bearing nodes left unlinked
    pub unlinked: usize,
    /// MCID bracket pairs written, keyed by 1-based page number
    pub marks_per_page: BTreeMap<usize, usize>,
    /// `/Artifact` regions written
    pub artifact_regions: usize,
    /// Node count per structure type
    pub roles: BTreeMap<String, usize>,
    /// Recoverable conditions in the order they were met
    pub diagnostics: Vec<Diagnostic>,
}

impl TaggingReport {
    /// Create an empty report stamped with the current time.
    pub fn new() -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    /// Record a diagnostic and log it.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }

    /// Record diagnostics that were already logged where they arose.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Diagnostics with the given code.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// Whether every content-bearing node was linked.
    pub fn is_fully_linked(&self) -> bool {
        self.unlinked == 0
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{} nodes, {} content-bearing ({} linked, {} unlinked), {} elements dropped, {} diagnostics",
            self.nodes,
            self.content_bearing,
            self.linked,
            self.unlinked,
            self.elements_dropped,
            self.diagnostics.len()
        )
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(DiagnosticCode::ContentNotFound, "text not found")
            .with_role("P")
            .with_page(2)
            .with_mcid(4);
        assert_eq!(
            d.to_string(),
            "[content-not-found] text not found (role P, page 2, MCID 4)"
        );

        let d = Diagnostic::new(DiagnosticCode::PageOutOfRange, "dropped").with_page(99);
        assert_eq!(d.to_string(), "[page-out-of-range] dropped (page 99)");
    }

    #[test]
    fn test_code_classes() {
        assert!(DiagnosticCode::ArtifactExcluded.is_informational());
        assert!(!DiagnosticCode::PageOutOfRange.is_informational());
        assert!(DiagnosticCode::OverlappingRange.is_unlinked());
        assert!(!DiagnosticCode::UnrecognizedRole.is_unlinked());
        assert!(!DiagnosticCode::ExistingMcidsCleared.is_informational());
        assert!(!DiagnosticCode::RoleMapSkipped.is_unlinked());
    }

    #[test]
    fn test_report_json() {
        let mut report = TaggingReport::new();
        report.unlinked = 1;
        report.add(Diagnostic::new(DiagnosticCode::UnbalancedRange, "unbalanced").with_role("Span"));
        report.marks_per_page.insert(1, 3);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"unbalanced_range\""));
        assert!(json.contains("\"marks_per_page\""));
        assert!(!json.contains("\"mcid\""));
        assert!(!report.is_fully_linked());
        assert_eq!(report.with_code(DiagnosticCode::UnbalancedRange).count(), 1);
    }
}
