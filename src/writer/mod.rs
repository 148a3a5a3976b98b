//! PDF writing support.
//!
//! ```text
//! Operation[] ──> [content::writer] ──> content stream bytes
//!                        │
//!                        └── operands via [ObjectSerializer]
//! ```

mod object_serializer;

pub use object_serializer::ObjectSerializer;
