//! Zip packaging and XML helpers for the `.pptx` writer.

use docgen_core::ports::{PortError, PortResult};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// One file inside the package.
pub struct Part {
    pub name: String,
    pub xml: String,
}

impl Part {
    pub fn new(name: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xml: xml.into(),
        }
    }
}

/// A `(relationship id, type, target)` triple.
pub type Relationship<'a> = (&'a str, &'a str, &'a str);

pub fn relationships_xml(relationships: &[Relationship<'_>]) -> String {
    let mut xml = format!(
        "{}<Relationships xmlns=\"{}\">",
        XML_DECLARATION, RELATIONSHIPS_NS
    );
    for (id, kind, target) in relationships {
        xml.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
            id, kind, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// `[Content_Types].xml` with the common defaults plus `overrides` as
/// `(part name, content type)` pairs.
pub fn content_types_xml(overrides: &[(String, &str)]) -> String {
    let mut xml = format!(
        "{}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>",
        XML_DECLARATION
    );
    for (part, content_type) in overrides {
        xml.push_str(&format!(
            "<Override PartName=\"{}\" ContentType=\"{}\"/>",
            part, content_type
        ));
    }
    xml.push_str("</Types>");
    xml
}

pub fn core_properties_xml(title: &str) -> String {
    format!(
        "{}<cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:title>{}</dc:title><dc:creator>AI Document Generator</dc:creator>\
         </cp:coreProperties>",
        XML_DECLARATION,
        escape_xml(title)
    )
}

/// Drops control characters other than tab and newlines; XML 1.0 has no
/// representation for them.
pub fn strip_control_characters(text: &str) -> String {
    text.chars()
        .filter(|&c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

pub fn escape_xml(text: &str) -> String {
    let text = strip_control_characters(text);
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Writes the parts into an in-memory zip archive.
pub fn write_package(parts: &[Part]) -> PortResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for part in parts {
        zip.start_file(part.name.as_str(), options)
            .map_err(|e| PortError::Unexpected(format!("Failed to add {}: {}", part.name, e)))?;
        zip.write_all(part.xml.as_bytes())
            .map_err(|e| PortError::Unexpected(format!("Failed to write {}: {}", part.name, e)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| PortError::Unexpected(format!("Failed to finish package: {}", e)))?;
    Ok(cursor.into_inner())
}
