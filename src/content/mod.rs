//! Page content streams: tokenizing, linkage planning and marking.
//!
//! Content is handled at the operator level. A page is parsed into
//! [`Operation`]s, the linker decides which operator ranges belong to which
//! content-bearing node, the marker brackets those ranges with
//! `BDC`/`EMC`, and the writer turns the result back into bytes.

pub mod marker;
pub mod matcher;
pub mod operators;
pub mod parser;
pub mod writer;

pub use marker::{clear_existing_mcids, ContentStreamMarker, MarkedPage};
pub use matcher::{
    plan_page, ContentMark, MarkTarget, PageLayout, PagePlan, TargetKind, UnlinkedTarget,
};
pub use operators::{OperatorClass, Operation};
pub use parser::parse_content_stream;
pub use writer::write_content_stream;
