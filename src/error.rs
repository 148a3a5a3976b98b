//! Error types for the tagging engine.
//!
//! Only conditions that must abort a tagging run are represented here.
//! Recoverable conditions (unknown roles, out-of-range pages, content that
//! cannot be linked) are collected as diagnostics in
//! [`TaggingReport`](crate::report::TaggingReport) instead.

/// Result type alias for tagging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that abort a tagging run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two content-bearing nodes were given the same (page, MCID) pair
    #[error("MCID collision: MCID {mcid} on page {page} is already assigned")]
    McidCollision {
        /// Zero-based page index
        page: usize,
        /// The duplicated marked content identifier
        mcid: u32,
    },

    /// Two marked-content regions of one page share an operator
    #[error("Overlapping marks on page {page}: MCID {first} and MCID {second}")]
    OverlappingMarks {
        /// Zero-based page index
        page: usize,
        /// MCID of the earlier region
        first: u32,
        /// MCID of the later region
        second: u32,
    },

    /// The node arena violates a structural invariant (cycle, second parent, dangling id)
    #[error("Invalid structure tree: {0}")]
    InvalidTree(String),

    /// A page content stream could not be tokenized
    #[error("Failed to parse content stream of page {page} at byte {offset}: {reason}")]
    ContentParse {
        /// Zero-based page index
        page: usize,
        /// Byte offset where tokenizing stopped
        offset: usize,
        /// Reason for the failure
        reason: String,
    },

    /// Page index does not exist in the host document
    #[error("Page not found: {0}")]
    PageNotFound(usize),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// The document-object library reported a failure
    #[error("Host document error: {0}")]
    Host(String),

    /// The upstream classification stage failed for the whole request
    #[error("Classification failed: {0}")]
    Classification(String),

    /// Malformed classified-elements file or configuration file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::Host(e.to_string())
    }
}

impl Error {
    /// Whether this error is a programming-invariant violation rather than an
    /// environmental failure.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::McidCollision { .. } | Error::OverlappingMarks { .. } | Error::InvalidTree(_)
        )
    }
}
