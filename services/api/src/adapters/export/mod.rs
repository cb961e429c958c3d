//! services/api/src/adapters/export/mod.rs
//!
//! The office document exporter. It implements the `DocumentExporter` port by
//! first building an in-memory model of the document (`WordDocument` or
//! `SlideDeck`) and then serializing that model: `.docx` through `docx-rs`,
//! `.pptx` through the PresentationML writer in [`pptx`].

mod docx;
mod package;
mod pptx;

use docgen_core::{
    domain::{Content, DocumentKind, ExportedDocument, Project},
    ports::{DocumentExporter, PortResult},
};
use std::collections::HashMap;

pub const PRESENTATION_SUBTITLE: &str = "AI-Generated Presentation";
pub const BODY_FONT: &str = "Calibri";
/// Body text size for word-processor documents, in points.
pub const DOCUMENT_FONT_SIZE_PT: u32 = 11;
/// Body text size for slides, in points.
pub const SLIDE_FONT_SIZE_PT: u32 = 18;

//=========================================================================================
// In-memory Document Models
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// The centered document title.
    Title(String),
    Heading { level: u8, text: String },
    Paragraph(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordDocument {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slide {
    /// Title-and-subtitle layout.
    Title { title: String, subtitle: String },
    /// Title-and-body layout.
    Content {
        title: String,
        body: String,
        font_size_pt: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideDeck {
    pub title: String,
    pub slides: Vec<Slide>,
}

/// Indexes contents by section id, keeping the highest version of each.
fn latest_by_section(contents: &[Content]) -> HashMap<&str, &Content> {
    let mut latest: HashMap<&str, &Content> = HashMap::new();
    for content in contents {
        latest
            .entry(content.section_id.as_str())
            .and_modify(|current| {
                if content.version > current.version {
                    *current = content;
                }
            })
            .or_insert(content);
    }
    latest
}

impl WordDocument {
    /// Topic as the title, then a heading and its paragraphs for every outline
    /// entry that has content. Entries without content are skipped.
    pub fn from_project(project: &Project, contents: &[Content]) -> Self {
        let latest = latest_by_section(contents);
        let mut blocks = vec![Block::Title(project.topic.clone())];

        for entry in &project.outline {
            let Some(content) = latest.get(entry.id.as_str()) else {
                continue;
            };
            blocks.push(Block::Heading {
                level: 1,
                text: entry.title.clone(),
            });
            blocks.extend(
                content
                    .content_text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| Block::Paragraph(line.to_string())),
            );
        }

        Self { blocks }
    }

    pub fn to_bytes(&self) -> PortResult<Vec<u8>> {
        docx::render(self)
    }
}

impl SlideDeck {
    /// A title slide, then one slide per outline entry with content.
    ///
    /// The entry at index 0 never gets a slide of its own: its content is
    /// dropped even when present.
    pub fn from_project(project: &Project, contents: &[Content]) -> Self {
        let latest = latest_by_section(contents);
        let mut slides = vec![Slide::Title {
            title: project.topic.clone(),
            subtitle: PRESENTATION_SUBTITLE.to_string(),
        }];

        for entry in project.outline.iter().skip(1) {
            if let Some(content) = latest.get(entry.id.as_str()) {
                slides.push(Slide::Content {
                    title: entry.title.clone(),
                    body: content.content_text.clone(),
                    font_size_pt: SLIDE_FONT_SIZE_PT,
                });
            }
        }

        Self {
            title: project.title.clone(),
            slides,
        }
    }

    pub fn to_bytes(&self) -> PortResult<Vec<u8>> {
        pptx::render(self)
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Exports projects as `.docx` or `.pptx` files.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfficeExporter;

impl OfficeExporter {
    pub fn new() -> Self {
        Self
    }
}

/// A file name derived from the project title. Characters that would break a
/// `Content-Disposition` header or a path are replaced; Unicode is kept.
pub fn export_file_name(title: &str, kind: DocumentKind) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' | ';' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.trim().is_empty() {
        "document".to_string()
    } else {
        stem
    };
    format!("{}.{}", stem, kind.file_extension())
}

impl DocumentExporter for OfficeExporter {
    fn export(&self, project: &Project, contents: &[Content]) -> PortResult<ExportedDocument> {
        let bytes = match project.kind {
            DocumentKind::Docx => WordDocument::from_project(project, contents).to_bytes()?,
            DocumentKind::Pptx => SlideDeck::from_project(project, contents).to_bytes()?,
        };

        Ok(ExportedDocument {
            file_name: export_file_name(&project.title, project.kind),
            mime_type: project.kind.mime_type(),
            bytes,
        })
    }
}
