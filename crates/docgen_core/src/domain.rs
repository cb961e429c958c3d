//! crates/docgen_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// The two kinds of office document a project can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A word-processor document.
    Docx,
    /// A slide deck.
    Pptx,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Pptx => "pptx",
        }
    }

    /// Prefix used for outline entry ids: `section_0`, `slide_0`, ...
    pub fn entry_id_prefix(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "section",
            DocumentKind::Pptx => "slide",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docx" => Ok(DocumentKind::Docx),
            "pptx" => Ok(DocumentKind::Pptx),
            other => Err(PortError::Invalid(format!(
                "Unsupported document type '{}'",
                other
            ))),
        }
    }
}

/// A single section (docx) or slide (pptx) in a project's outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub id: String,
    pub title: String,
}

impl OutlineEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A user's document project.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub kind: DocumentKind,
    pub topic: String,
    pub outline: Vec<OutlineEntry>,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to create a project; ids and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: Uuid,
    pub title: String,
    pub kind: DocumentKind,
    pub topic: String,
    pub outline: Vec<OutlineEntry>,
}

/// One version of the generated text for a section.
#[derive(Debug, Clone)]
pub struct Content {
    pub id: i64,
    pub project_id: Uuid,
    pub section_id: String,
    pub section_title: String,
    pub content_text: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub section_id: String,
    pub section_title: String,
    pub content_text: String,
}

/// A user's verdict on a refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }
}

impl FromStr for Feedback {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Feedback::Like),
            "dislike" => Ok(Feedback::Dislike),
            other => Err(PortError::Invalid(format!("Unsupported feedback '{}'", other))),
        }
    }
}

/// Audit record of a single refinement. Not consulted when generating.
#[derive(Debug, Clone)]
pub struct RefinementHistory {
    pub id: i64,
    pub project_id: Uuid,
    pub section_id: String,
    pub prompt: String,
    pub old_content: String,
    pub new_content: String,
    pub feedback: Option<Feedback>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Where a piece of generated text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource {
    /// Returned by the remote model.
    Live,
    /// Produced from the deterministic templates.
    Fallback,
}

/// Generated text tagged with its source, so callers can decide what to do
/// with fallback output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated<T> {
    pub value: T,
    pub source: GenerationSource,
}

impl<T> Generated<T> {
    pub fn live(value: T) -> Self {
        Self {
            value,
            source: GenerationSource::Live,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            source: GenerationSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == GenerationSource::Fallback
    }
}

/// A serialized office document ready to be sent to the client.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}
