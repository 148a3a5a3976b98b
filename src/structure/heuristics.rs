//! Classification heuristics used while building the hierarchy.
//!
//! None of these are guaranteed to be correct; they are fixed rules applied
//! when the upstream stage left a detail open (a heading without a level, a
//! table without marked header cells, a list item with its marker inline).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Unicode bullets may touch the item text; ASCII ones need a space.
    static ref RE_BULLET: Regex =
        Regex::new(r"(?s)^\s*([•▪‣○◦]\s*|[-*]\s+)(\S.*)$").unwrap();

    /// `1.`, `12)`, `a.`, `B)` followed by whitespace
    static ref RE_ENUMERATOR: Regex =
        Regex::new(r"(?s)^\s*(\d{1,3}[.)]|[A-Za-z][.)])\s+(\S.*)$").unwrap();

    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Maximum length of a derived `/T` entry, in characters.
pub const TITLE_MAX_CHARS: usize = 60;

/// Split a list item's text into its marker and body.
///
/// Returns `None` when no marker is found or nothing follows it.
pub fn split_list_marker(text: &str) -> Option<(String, String)> {
    let caps = RE_BULLET
        .captures(text)
        .or_else(|| RE_ENUMERATOR.captures(text))?;
    let marker = caps.get(1)?.as_str().trim().to_string();
    let body = caps.get(2)?.as_str().trim_end().to_string();
    if marker.is_empty() || body.is_empty() {
        return None;
    }
    Some((marker, body))
}

/// Decide whether the first row of a table is a header row.
///
/// Every non-empty cell must be upper-case or a short phrase (at most five
/// words). Tables with a single row are treated as data only.
pub fn is_header_row(rows: &[Vec<String>]) -> bool {
    if rows.len() < 2 {
        return false;
    }
    let mut cells = rows[0].iter().map(|c| c.trim()).filter(|c| !c.is_empty()).peekable();
    if cells.peek().is_none() {
        return false;
    }
    cells.all(|cell| is_upper(cell) || cell.split_whitespace().count() <= 5)
}

/// Split tab-separated, newline-delimited table content into a cell matrix.
///
/// Blank lines are skipped; rows may have different lengths.
pub fn parse_table_matrix(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(|c| c.trim().to_string()).collect())
        .collect()
}

/// Suggest a heading level (1-6) for a heading whose level was not given.
pub fn suggest_heading_level(text: &str) -> u8 {
    let upper = text.trim().to_uppercase();
    let words = upper.split_whitespace().count();

    if upper.starts_with("CHAPTER") || upper.starts_with("PART") {
        1
    } else if upper.starts_with("SECTION") || words <= 5 {
        2
    } else if words <= 10 && is_upper(text) {
        3
    } else if words <= 15 {
        4
    } else if words <= 20 {
        5
    } else {
        6
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Title derived from the leading content of an element.
pub fn derive_title(text: &str) -> Option<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return None;
    }
    Some(normalized.chars().take(TITLE_MAX_CHARS).collect())
}

/// Has at least one cased letter and no lower-case letter.
fn is_upper(text: &str) -> bool {
    text.chars().any(|c| c.is_uppercase()) && !text.chars().any(|c| c.is_lowercase())
}
