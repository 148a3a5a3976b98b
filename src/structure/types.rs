//! Structure element taxonomy and attribute schema.
//!
//! Implements the standard structure types of ISO 32000-1:2008 Section 14.8.4
//! (plus PDF/UA's `Artifact` pseudo-role) and the closed attribute record
//! attached to each structure node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard structure types.
///
/// The set is closed: anything the upstream classifier produces that does
/// not map onto one of these is remapped to [`StructType::P`] by
/// [`StructType::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructType {
    // Grouping elements
    /// Document root
    Document,
    /// Part (major division)
    Part,
    /// Article
    Art,
    /// Section
    Sect,
    /// Division
    Div,
    /// Block quotation
    BlockQuote,
    /// Caption (of a table or figure)
    Caption,
    /// Table of contents
    TOC,
    /// Table of contents item
    TOCI,
    /// Index
    Index,

    // Paragraph-level elements
    /// Paragraph
    P,
    /// Heading of unspecified level
    H,
    /// Heading level 1
    H1,
    /// Heading level 2
    H2,
    /// Heading level 3
    H3,
    /// Heading level 4
    H4,
    /// Heading level 5
    H5,
    /// Heading level 6
    H6,

    // List elements
    /// List
    L,
    /// List item
    LI,
    /// Label (list item marker)
    Lbl,
    /// List body (list item content)
    LBody,

    // Table elements
    /// Table
    Table,
    /// Table row
    TR,
    /// Table header cell
    TH,
    /// Table data cell
    TD,
    /// Table header group
    THead,
    /// Table body group
    TBody,
    /// Table footer group
    TFoot,

    // Inline elements
    /// Span (inline generic)
    Span,
    /// Quote
    Quote,
    /// Note
    Note,
    /// Reference
    Reference,
    /// Bibliographic entry
    BibEntry,
    /// Code
    Code,
    /// Link
    Link,
    /// Annotation
    Annot,
    /// Ruby annotation
    Ruby,
    /// Ruby base text
    RB,
    /// Ruby annotation text
    RT,
    /// Ruby punctuation
    RP,

    // Illustration elements
    /// Figure
    Figure,
    /// Formula
    Formula,
    /// Form (input field)
    Form,

    /// Content excluded from the logical structure
    Artifact,
}

/// Outcome of parsing an upstream role string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleParse {
    /// Exact or case-insensitive standard name, or a known upstream alias
    Known(StructType),
    /// A heading whose level was not given
    GenericHeading,
    /// Unknown role, remapped to a paragraph
    Remapped(StructType),
}

const ALL_TYPES: &[StructType] = &[
    StructType::Document,
    StructType::Part,
    StructType::Art,
    StructType::Sect,
    StructType::Div,
    StructType::BlockQuote,
    StructType::Caption,
    StructType::TOC,
    StructType::TOCI,
    StructType::Index,
    StructType::P,
    StructType::H,
    StructType::H1,
    StructType::H2,
    StructType::H3,
    StructType::H4,
    StructType::H5,
    StructType::H6,
    StructType::L,
    StructType::LI,
    StructType::Lbl,
    StructType::LBody,
    StructType::Table,
    StructType::TR,
    StructType::TH,
    StructType::TD,
    StructType::THead,
    StructType::TBody,
    StructType::TFoot,
    StructType::Span,
    StructType::Quote,
    StructType::Note,
    StructType::Reference,
    StructType::BibEntry,
    StructType::Code,
    StructType::Link,
    StructType::Annot,
    StructType::Ruby,
    StructType::RB,
    StructType::RT,
    StructType::RP,
    StructType::Figure,
    StructType::Formula,
    StructType::Form,
    StructType::Artifact,
];

impl StructType {
    /// The PDF name for this type (value of the `/S` entry).
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            Self::Document => "Document",
            Self::Part => "Part",
            Self::Art => "Art",
            Self::Sect => "Sect",
            Self::Div => "Div",
            Self::BlockQuote => "BlockQuote",
            Self::Caption => "Caption",
            Self::TOC => "TOC",
            Self::TOCI => "TOCI",
            Self::Index => "Index",
            Self::P => "P",
            Self::H => "H",
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H5 => "H5",
            Self::H6 => "H6",
            Self::L => "L",
            Self::LI => "LI",
            Self::Lbl => "Lbl",
            Self::LBody => "LBody",
            Self::Table => "Table",
            Self::TR => "TR",
            Self::TH => "TH",
            Self::TD => "TD",
            Self::THead => "THead",
            Self::TBody => "TBody",
            Self::TFoot => "TFoot",
            Self::Span => "Span",
            Self::Quote => "Quote",
            Self::Note => "Note",
            Self::Reference => "Reference",
            Self::BibEntry => "BibEntry",
            Self::Code => "Code",
            Self::Link => "Link",
            Self::Annot => "Annot",
            Self::Ruby => "Ruby",
            Self::RB => "RB",
            Self::RT => "RT",
            Self::RP => "RP",
            Self::Figure => "Figure",
            Self::Formula => "Formula",
            Self::Form => "Form",
            Self::Artifact => "Artifact",
        }
    }

    /// Look up a standard type by its exact PDF name.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        ALL_TYPES.iter().copied().find(|t| t.as_pdf_name() == name)
    }

    /// Parse a role string coming from the upstream classifier.
    ///
    /// Tries, in order: exact standard name, case-insensitive standard
    /// name, upstream generic names (`paragraph`, `list_item`, ...).
    pub fn parse(role: &str) -> RoleParse {
        let role = role.trim().trim_start_matches('/');

        if let Some(t) = Self::from_pdf_name(role) {
            return if t == Self::H {
                RoleParse::GenericHeading
            } else {
                RoleParse::Known(t)
            };
        }

        if let Some(t) = ALL_TYPES
            .iter()
            .copied()
            .find(|t| t.as_pdf_name().eq_ignore_ascii_case(role))
        {
            return if t == Self::H {
                RoleParse::GenericHeading
            } else {
                RoleParse::Known(t)
            };
        }

        let alias = match role.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "paragraph" | "text" => Some(Self::P),
            "heading" | "title" => return RoleParse::GenericHeading,
            "heading1" | "heading_1" => Some(Self::H1),
            "heading2" | "heading_2" => Some(Self::H2),
            "heading3" | "heading_3" => Some(Self::H3),
            "heading4" | "heading_4" => Some(Self::H4),
            "heading5" | "heading_5" => Some(Self::H5),
            "heading6" | "heading_6" => Some(Self::H6),
            "list" => Some(Self::L),
            "list_item" | "listitem" => Some(Self::LI),
            "list_label" => Some(Self::Lbl),
            "list_body" => Some(Self::LBody),
            "table" => Some(Self::Table),
            "table_row" => Some(Self::TR),
            "table_cell" | "table_data_cell" => Some(Self::TD),
            "table_header" | "table_header_cell" => Some(Self::TH),
            "figure" | "image" => Some(Self::Figure),
            "caption" => Some(Self::Caption),
            "formula" | "equation" => Some(Self::Formula),
            "link" => Some(Self::Link),
            "quote" => Some(Self::Quote),
            "note" | "footnote" => Some(Self::Note),
            "section" => Some(Self::Sect),
            "division" => Some(Self::Div),
            "artifact" => Some(Self::Artifact),
            _ => None,
        };

        match alias {
            Some(t) => RoleParse::Known(t),
            None => RoleParse::Remapped(Self::P),
        }
    }

    /// Heading type for a level; levels outside 1-6 are clamped.
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => Self::H1,
            2 => Self::H2,
            3 => Self::H3,
            4 => Self::H4,
            5 => Self::H5,
            _ => Self::H6,
        }
    }

    /// Heading level (1-6) for numbered headings.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Self::H1 => Some(1),
            Self::H2 => Some(2),
            Self::H3 => Some(3),
            Self::H4 => Some(4),
            Self::H5 => Some(5),
            Self::H6 => Some(6),
            _ => None,
        }
    }

    /// Check if this is a heading type (H, H1-H6)
    pub fn is_heading(&self) -> bool {
        matches!(self, Self::H | Self::H1 | Self::H2 | Self::H3 | Self::H4 | Self::H5 | Self::H6)
    }

    /// Pure containers never own marked content directly.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::Part
                | Self::Art
                | Self::Sect
                | Self::Div
                | Self::BlockQuote
                | Self::TOC
                | Self::Index
                | Self::L
                | Self::Table
                | Self::TR
                | Self::THead
                | Self::TBody
                | Self::TFoot
                | Self::Ruby
        )
    }

    /// Paragraph-like leaves whose text is wrapped in a nested `Span`.
    pub fn wraps_text_in_span(&self) -> bool {
        self.is_heading() || matches!(self, Self::P)
    }

    /// Illustrations are linked to graphics rather than text.
    pub fn is_illustration(&self) -> bool {
        matches!(self, Self::Figure | Self::Formula)
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pdf_name())
    }
}

/// State of a check box or radio button (`/PrintField` attribute owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckedState {
    /// Selected
    On,
    /// Not selected
    Off,
    /// Neither
    Neutral,
}

impl CheckedState {
    /// PDF name of the state.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Neutral => "neutral",
        }
    }
}

/// Attributes of a structure node.
///
/// Every field is optional and absent by default; `Some(String::new())` is
/// kept distinct from `None` all the way to the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureAttributes {
    /// Natural language (`/Lang`)
    pub lang: Option<String>,
    /// Alternate description (`/Alt`)
    pub alt: Option<String>,
    /// Replacement text (`/ActualText`)
    pub actual_text: Option<String>,
    /// Title (`/T`)
    pub title: Option<String>,
    /// Table summary (`/A << /O /Table /Summary >>`)
    pub summary: Option<String>,
    /// Check box state (`/A << /O /PrintField /checked >>`)
    pub checked: Option<CheckedState>,
    /// Number of columns spanned by a table cell
    pub column_span: Option<u32>,
    /// Number of rows spanned by a table cell
    pub row_span: Option<u32>,
    /// IDs of the header cells of a table cell
    pub headers: Option<Vec<String>>,
    /// Element identifier (`/ID`)
    pub id: Option<String>,
    /// Custom structure type written as `/S` and role-mapped to the standard type
    pub role_override: Option<String>,
}

impl StructureAttributes {
    /// Check if no attribute is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any entry of the Table attribute owner is present.
    pub fn has_table_attributes(&self) -> bool {
        self.summary.is_some()
            || self.column_span.is_some()
            || self.row_span.is_some()
            || self.headers.is_some()
    }
}
