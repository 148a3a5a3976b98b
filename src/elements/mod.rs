//! Classified elements: the interchange record produced by the upstream
//! classification stage and consumed by the hierarchy builder.
//!
//! Two file shapes are accepted:
//!
//! ```text
//! [ {"role": "H1", "content": "Intro", "page": 1}, ... ]
//!
//! {"document": {"structure_tags": [ {"type": "paragraph", ...}, ... ]}}
//! ```

use crate::error::{Error, Result};
use crate::structure::{CheckedState, StructureAttributes};
use serde::Deserialize;
use std::path::Path;

/// One classified content unit in reading order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassifiedElement {
    /// Role name from the upstream classifier (standard name or generic alias)
    #[serde(alias = "type")]
    pub role: String,

    /// Text of the element. Tables may carry a tab/newline cell matrix.
    #[serde(default)]
    pub content: String,

    /// 1-based page number. 0 on a nested element means "same as parent".
    #[serde(default)]
    pub page: u32,

    /// Accessibility attributes
    #[serde(default)]
    pub attributes: Option<ElementAttributes>,

    /// Children already grouped upstream
    #[serde(default)]
    pub children: Vec<ClassifiedElement>,
}

impl ClassifiedElement {
    /// Create an element without attributes or children.
    pub fn new(role: impl Into<String>, content: impl Into<String>, page: u32) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            page,
            attributes: None,
            children: Vec::new(),
        }
    }

    /// Attach attributes.
    pub fn with_attributes(mut self, attributes: ElementAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Attach pre-grouped children.
    pub fn with_children(mut self, children: Vec<ClassifiedElement>) -> Self {
        self.children = children;
        self
    }
}

/// Attribute map of an element, as spelled by the upstream stage.
///
/// Keys the engine does not understand are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAttributes {
    /// Natural language
    pub lang: Option<String>,
    /// Alternate description
    pub alt: Option<String>,
    /// Replacement text
    pub actual_text: Option<String>,
    /// Title
    pub title: Option<String>,
    /// Table summary
    pub summary: Option<String>,
    /// Header cell ids, as a list or a space-separated string
    #[serde(default, deserialize_with = "ids::deserialize")]
    pub headers: Option<Vec<String>>,
    /// Rows spanned
    pub row_span: Option<u32>,
    /// Columns spanned
    pub column_span: Option<u32>,
    /// Check box state
    pub checked: Option<CheckedState>,
    /// Element identifier
    pub id: Option<String>,
    /// Custom role name, role-mapped to the element's standard type
    pub role: Option<String>,
}

impl ElementAttributes {
    /// Convert to the closed attribute record of a structure node.
    pub fn to_structure_attributes(&self) -> StructureAttributes {
        StructureAttributes {
            lang: self.lang.clone(),
            alt: self.alt.clone(),
            actual_text: self.actual_text.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            checked: self.checked,
            column_span: self.column_span,
            row_span: self.row_span,
            headers: self.headers.clone(),
            id: self.id.clone(),
            role_override: self.role.clone(),
        }
    }
}

mod ids {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|v| match v {
            OneOrMany::One(s) => s.split_whitespace().map(str::to_string).collect(),
            OneOrMany::Many(v) => v,
        }))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ElementFile {
    Bare(Vec<ClassifiedElement>),
    Tagged { document: TagDocument },
    Failed { error: String },
}

#[derive(Deserialize)]
struct TagDocument {
    #[serde(default)]
    structure_tags: Vec<ClassifiedElement>,
}

/// Parse classified elements from JSON text.
///
/// An `{"error": "..."}` document is the upstream classifier reporting a
/// failed request and becomes [`Error::Classification`].
pub fn parse_elements(json: &str) -> Result<Vec<ClassifiedElement>> {
    let file: ElementFile = serde_json::from_str(json)?;
    match file {
        ElementFile::Bare(elements) => Ok(elements),
        ElementFile::Tagged { document } => Ok(document.structure_tags),
        ElementFile::Failed { error } => Err(Error::Classification(error)),
    }
}

/// Load classified elements from a JSON file.
pub fn load_elements(path: impl AsRef<Path>) -> Result<Vec<ClassifiedElement>> {
    let data = std::fs::read_to_string(path.as_ref())?;
    let elements = parse_elements(&data)?;
    log::info!("Loaded {} classified elements from {}", elements.len(), path.as_ref().display());
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let elements = parse_elements(
            r#"[{"role": "H1", "content": "Intro", "page": 1},
                {"role": "P", "content": "Hello world", "page": 1}]"#,
        )
        .unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], ClassifiedElement::new("H1", "Intro", 1));
    }

    #[test]
    fn test_parse_tag_file() {
        let elements = parse_elements(
            r#"{"document": {"structure_tags": [
                {"type": "paragraph", "content": "Body", "page": 2,
                 "attributes": {"lang": "en", "actualText": "Body text", "name": "ignored"}}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].role, "paragraph");
        assert_eq!(elements[0].page, 2);
        let attrs = elements[0].attributes.as_ref().unwrap();
        assert_eq!(attrs.lang.as_deref(), Some("en"));
        assert_eq!(attrs.actual_text.as_deref(), Some("Body text"));
    }

    #[test]
    fn test_nested_children() {
        let elements = parse_elements(
            r#"[{"role": "L", "page": 1, "children": [
                {"role": "LI", "content": "a"}, {"role": "LI", "content": "b"}]}]"#,
        )
        .unwrap();
        assert_eq!(elements[0].children.len(), 2);
        assert_eq!(elements[0].children[1].page, 0);
    }

    #[test]
    fn test_headers_string_or_list() {
        let a: ElementAttributes = serde_json::from_str(r#"{"headers": "h1 h2"}"#).unwrap();
        let b: ElementAttributes = serde_json::from_str(r#"{"headers": ["h1", "h2"]}"#).unwrap();
        assert_eq!(a.headers, b.headers);
        assert_eq!(a.headers.unwrap(), vec!["h1", "h2"]);
    }

    #[test]
    fn test_empty_string_is_kept() {
        let attrs: ElementAttributes = serde_json::from_str(r#"{"alt": ""}"#).unwrap();
        let converted = attrs.to_structure_attributes();
        assert_eq!(converted.alt, Some(String::new()));
        assert!(converted.title.is_none());
    }

    #[test]
    fn test_classifier_failure() {
        let err = parse_elements(r#"{"error": "classification service timed out"}"#).unwrap_err();
        assert!(matches!(err, Error::Classification(ref m) if m.contains("timed out")));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_elements("{\"document\": 3}").is_err());
    }
}
