// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Tagger
//!
//! Structure-tree construction and marked-content linkage for Tagged PDF.
//!
//! Given a page-description document and a list of classified content
//! elements (headings, paragraphs, list items, tables, figures, ...) in
//! reading order, this crate builds the logical structure tree of
//! ISO 32000-1:2008 Section 14.7, ties every content-bearing element to the
//! page content that draws it through marked content identifiers, and writes
//! the result back into the document.
//!
//! ## Core Features
//!
//! - **Hierarchy**: list runs grouped into `L`, table matrices expanded into
//!   rows and cells, list labels split, optional heading-driven sections
//! - **MCID allocation**: per page or per document, never reused
//! - **Parent tree**: `(page, MCID)` resolves back to the owning element
//! - **Two-pass materialization**: every element has an object number before
//!   any cross-reference is written
//! - **Content linkage**: text matching against `Tj`/`TJ` operators, with
//!   ranges widened to well-nested boundaries; anything that cannot be linked
//!   is reported instead of corrupting the page
//! - **Hosts**: in-memory documents and existing PDF files (via `lopdf`)
//!
//! ## Quick Start
//!
//! ```
//! use pdf_tagger::host::{HostDocument, MemoryDocument};
//! use pdf_tagger::{ClassifiedElement, Tagger, TaggingConfig};
//!
//! # fn main() -> pdf_tagger::Result<()> {
//! let mut doc = MemoryDocument::new().with_page("BT /F1 12 Tf (Intro) Tj (Hello world) Tj ET");
//! let elements = vec![
//!     ClassifiedElement::new("H1", "Intro", 1),
//!     ClassifiedElement::new("P", "Hello world", 1),
//! ];
//!
//! let outcome = Tagger::new(TaggingConfig::default()).tag(&mut doc, &elements)?;
//! assert!(outcome.report.is_fully_linked());
//! assert!(doc.has_structure_tree());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Object model and serialization
pub mod object;
pub mod writer;

// Input and configuration
pub mod config;
pub mod elements;

// Logical structure
pub mod structure;

// Page content
pub mod content;

// Document access
pub mod host;

// Pipeline and reporting
pub mod report;
pub mod tagger;

// Re-exports
pub use config::{LinkStrategy, McidScope, TaggingConfig};
pub use elements::{load_elements, parse_elements, ClassifiedElement, ElementAttributes};
pub use error::{Error, Result};
pub use report::{Diagnostic, DiagnosticCode, TaggingReport};
pub use tagger::{Tagger, TaggingOutcome};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
