//! Configuration for a tagging run.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// How marked content identifiers are numbered.
///
/// Fixed once per document; the allocator, the parent tree and the content
/// marker all read the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McidScope {
    /// Counter restarts at 0 on every page
    #[default]
    PerPage,
    /// One counter for the whole document
    Document,
}

/// How content-bearing nodes are linked to content-stream operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    /// Search node text in the decoded text of the page
    #[default]
    TextMatch,
    /// k-th text object on a page goes to the k-th text node on that page
    TextBlocks,
    /// Build structure only, link nothing
    None,
}

impl LinkStrategy {
    /// Parse the CLI spelling (`text`, `blocks`, `none`).
    pub fn from_cli(s: &str) -> Option<Self> {
        match s {
            "text" | "text_match" => Some(Self::TextMatch),
            "blocks" | "text_blocks" => Some(Self::TextBlocks),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Tagging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// MCID numbering scope.
    pub mcid_scope: McidScope,

    /// Give paragraphs and headings a nested `Span` that owns the mark.
    pub wrap_text_in_spans: bool,

    /// Group content under heading-driven `Sect` containers.
    pub group_sections: bool,

    /// Split list items into `Lbl` + `LBody` when a marker is detected.
    pub split_list_labels: bool,

    /// Content linkage strategy.
    pub link_strategy: LinkStrategy,

    /// Wrap rendering operators no mark claims in `/Artifact BMC ... EMC`.
    pub mark_unclaimed_as_artifact: bool,

    /// Derive `/T` from the leading content when no title is given.
    pub derive_titles: bool,

    /// Natural language written to the catalog `/Lang`.
    pub document_language: Option<String>,

    /// Plan and mark pages on the rayon thread pool.
    pub parallel_pages: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggingConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            mcid_scope: McidScope::PerPage,
            wrap_text_in_spans: true,
            group_sections: false,
            split_list_labels: true,
            link_strategy: LinkStrategy::TextMatch,
            mark_unclaimed_as_artifact: false,
            derive_titles: false,
            document_language: None,
            parallel_pages: true,
        }
    }

    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Set the MCID numbering scope.
    pub fn with_mcid_scope(mut self, scope: McidScope) -> Self {
        self.mcid_scope = scope;
        self
    }

    /// Enable span wrapping of paragraph and heading text.
    pub fn with_text_spans(mut self, enable: bool) -> Self {
        self.wrap_text_in_spans = enable;
        self
    }

    /// Enable heading-driven section grouping.
    pub fn with_sections(mut self, enable: bool) -> Self {
        self.group_sections = enable;
        self
    }

    /// Enable list label splitting.
    pub fn with_list_labels(mut self, enable: bool) -> Self {
        self.split_list_labels = enable;
        self
    }

    /// Set the content linkage strategy.
    pub fn with_link_strategy(mut self, strategy: LinkStrategy) -> Self {
        self.link_strategy = strategy;
        self
    }

    /// Enable artifact wrapping of unclaimed content.
    pub fn with_artifacts(mut self, enable: bool) -> Self {
        self.mark_unclaimed_as_artifact = enable;
        self
    }

    /// Enable derived titles.
    pub fn with_derived_titles(mut self, enable: bool) -> Self {
        self.derive_titles = enable;
        self
    }

    /// Set the document language.
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.document_language = Some(lang.into());
        self
    }

    /// Enable parallel page processing.
    pub fn with_parallel_pages(mut self, enable: bool) -> Self {
        self.parallel_pages = enable;
        self
    }
}
