//! crates/docgen_core/src/outline.rs
//!
//! Turns model output into outline entries, with a fixed outline for output
//! that cannot be read.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::domain::{DocumentKind, OutlineEntry};
use crate::ports::{PortError, PortResult};

const DOCX_DEFAULT: &[&str] = &["Introduction", "Background", "Main Content", "Conclusion"];
const PPTX_DEFAULT: &[&str] = &["Title Slide", "Introduction", "Main Points", "Conclusion"];

fn array_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("array pattern is valid"))
}

/// Parses a JSON array of titles. Models sometimes wrap the array in prose,
/// so the first `[...]` span is tried when the whole text does not parse.
pub fn parse_outline_titles(text: &str) -> Result<Vec<String>, serde_json::Error> {
    match serde_json::from_str::<Vec<String>>(text.trim()) {
        Ok(titles) => Ok(titles),
        Err(e) => match array_span().find(text) {
            Some(span) => serde_json::from_str(span.as_str()),
            None => Err(e),
        },
    }
}

/// Numbers titles in order: `section_0, section_1, ...` or `slide_0, ...`.
pub fn outline_from_titles<S: AsRef<str>>(kind: DocumentKind, titles: &[S]) -> Vec<OutlineEntry> {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            OutlineEntry::new(
                format!("{}_{}", kind.entry_id_prefix(), i),
                title.as_ref().trim(),
            )
        })
        .collect()
}

/// The outline used when model output cannot be parsed.
pub fn default_outline(kind: DocumentKind) -> Vec<OutlineEntry> {
    let titles = match kind {
        DocumentKind::Docx => DOCX_DEFAULT,
        DocumentKind::Pptx => PPTX_DEFAULT,
    };
    outline_from_titles(kind, titles)
}

/// Outline ids key content rows, so they must be unique and non-empty.
pub fn validate_outline(entries: &[OutlineEntry]) -> PortResult<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(PortError::Invalid("Outline entry ids must not be empty".to_string()));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(PortError::Invalid(format!(
                "Duplicate outline entry id '{}'",
                entry.id
            )));
        }
    }
    Ok(())
}
