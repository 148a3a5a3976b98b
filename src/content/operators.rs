//! PDF content stream operations.
//!
//! Parsed operations keep their source bytes, so a stream is written back
//! byte for byte with only the inserted marked-content operators added.
//! Operands are a decoded view for the linker; [`OperatorClass`] gives the
//! typed operator view.
//!
//! PDF Spec: ISO 32000-1:2008, Section 8.2 (operator categories) and
//! Section 14.6 (marked content).

use crate::object::Object;

/// One operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operator keyword (`Tj`, `BT`, `Do`, ...)
    pub operator: String,
    /// Operands in stream order
    pub operands: Vec<Object>,
    /// Raw sample data of an inline image (`BI ... ID <data> EI`)
    pub inline_data: Option<Vec<u8>>,
    /// Source bytes from the first operand through the operator keyword.
    /// `None` for operations built in code or changed after parsing.
    pub raw: Option<Vec<u8>>,
}

/// Category of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    /// `BT`
    BeginText,
    /// `ET`
    EndText,
    /// `q`
    SaveState,
    /// `Q`
    RestoreState,
    /// `Tj`, `TJ`, `'`, `"`
    ShowText,
    /// `Do`
    XObject,
    /// `BI ... EI`
    InlineImage,
    /// `sh`
    Shading,
    /// `m`, `l`, `c`, `v`, `y`, `h`, `re`, `W`, `W*`
    PathConstruction,
    /// `S`, `s`, `f`, `F`, `f*`, `B`, `B*`, `b`, `b*`, `n`
    PathPainting,
    /// `BMC`, `BDC`
    BeginMarkedContent,
    /// `EMC`
    EndMarkedContent,
    /// Everything else (state, color, text positioning, `MP`, `DP`, ...)
    Other,
}

impl OperatorClass {
    /// Classify an operator keyword.
    pub fn of(operator: &str) -> Self {
        match operator {
            "BT" => Self::BeginText,
            "ET" => Self::EndText,
            "q" => Self::SaveState,
            "Q" => Self::RestoreState,
            "Tj" | "TJ" | "'" | "\"" => Self::ShowText,
            "Do" => Self::XObject,
            "BI" => Self::InlineImage,
            "sh" => Self::Shading,
            "m" | "l" | "c" | "v" | "y" | "h" | "re" | "W" | "W*" => Self::PathConstruction,
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => Self::PathPainting,
            "BMC" | "BDC" => Self::BeginMarkedContent,
            "EMC" => Self::EndMarkedContent,
            _ => Self::Other,
        }
    }

    /// Operators that put marks on the page.
    pub fn is_rendering(&self) -> bool {
        matches!(
            self,
            Self::ShowText | Self::XObject | Self::InlineImage | Self::Shading | Self::PathPainting
        )
    }

    /// Operators that place an image or form on the page.
    pub fn is_graphic(&self) -> bool {
        matches!(self, Self::XObject | Self::InlineImage)
    }
}

/// Kerning adjustment in a `TJ` array (thousandths of text space) treated as a word gap.
const TJ_SPACE_THRESHOLD: f64 = -250.0;

impl Operation {
    /// Create an operation.
    pub fn new(operator: impl Into<String>, operands: Vec<Object>) -> Self {
        Self {
            operator: operator.into(),
            operands,
            inline_data: None,
            raw: None,
        }
    }

    /// `/Tag << /MCID n >> BDC`
    pub fn begin_marked_content_dict(tag: &str, mcid: u32) -> Self {
        Self::new(
            "BDC",
            vec![
                Object::name(tag),
                Object::dict(vec![("MCID", Object::Integer(mcid as i64))]),
            ],
        )
    }

    /// `/Tag BMC`
    pub fn begin_marked_content(tag: &str) -> Self {
        Self::new("BMC", vec![Object::name(tag)])
    }

    /// `EMC`
    pub fn end_marked_content() -> Self {
        Self::new("EMC", Vec::new())
    }

    /// Category of this operation.
    pub fn class(&self) -> OperatorClass {
        OperatorClass::of(&self.operator)
    }

    /// MCID carried by a `BDC` property list, if any.
    pub fn mcid(&self) -> Option<u32> {
        if self.operator != "BDC" {
            return None;
        }
        let props = self.operands.get(1)?.as_dict()?;
        props.get("MCID")?.as_integer().map(|v| v as u32)
    }

    /// Text shown by a text-showing operator, one byte per character code.
    ///
    /// Large negative `TJ` adjustments become a space.
    pub fn shown_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self.operator.as_str() {
            "Tj" | "'" => {
                if let Some(s) = self.operands.first().and_then(|o| o.as_string()) {
                    out.extend_from_slice(s);
                }
            },
            "\"" => {
                if let Some(s) = self.operands.get(2).and_then(|o| o.as_string()) {
                    out.extend_from_slice(s);
                }
            },
            "TJ" => {
                if let Some(items) = self.operands.first().and_then(|o| o.as_array()) {
                    for item in items {
                        match item {
                            Object::String(s) => out.extend_from_slice(s),
                            other => {
                                if other.as_number().is_some_and(|n| n <= TJ_SPACE_THRESHOLD) {
                                    out.push(b' ');
                                }
                            },
                        }
                    }
                }
            },
            _ => {},
        }
        out
    }
}
