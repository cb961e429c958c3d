//! crates/docgen_core/src/fallback.rs
//!
//! Deterministic stand-ins for the remote model, used whenever it cannot be
//! reached or has rejected the client.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::DocumentKind;

const DOCX_OUTLINE: &[&str] = &[
    "Introduction",
    "Background",
    "Analysis",
    "Recommendations",
    "Conclusion",
];

const PPTX_OUTLINE: &[&str] = &[
    "Title Slide",
    "Introduction",
    "Key Points",
    "Analysis",
    "Recommendations",
    "Conclusion",
];

const FORMAL_SUFFIX: &str =
    " This refined content maintains professional standards suitable for business documentation.";

/// Fixed outline titles: five sections for documents, six slides for decks.
pub fn fallback_outline(kind: DocumentKind) -> &'static [&'static str] {
    match kind {
        DocumentKind::Docx => DOCX_OUTLINE,
        DocumentKind::Pptx => PPTX_OUTLINE,
    }
}

/// The fallback outline encoded the way the model is asked to answer.
pub fn fallback_outline_text(kind: DocumentKind) -> String {
    serde_json::Value::from(fallback_outline(kind).to_vec()).to_string()
}

pub fn fallback_section_content(section_title: &str, topic: &str) -> String {
    fallback_section_content_with(section_title, topic, &mut rand::thread_rng())
}

/// Picks a templated paragraph from keywords in the section title, or a
/// random generic one when none match.
pub fn fallback_section_content_with<R: Rng + ?Sized>(
    section_title: &str,
    topic: &str,
    rng: &mut R,
) -> String {
    let topic = topic.trim();
    let or = |default: &'static str| or_default(topic, default);
    let title = section_title.to_lowercase();

    if title.contains("introduction") {
        return format!(
            "Introduction to {}\n\n\
             This document provides a focused overview of {}. The introduction establishes context, \
             defines key terms, and outlines the document structure.\n\n\
             Key objectives include providing background information, establishing relevance, and \
             previewing main sections. This analysis aims to deliver valuable insights for informed \
             decision-making.",
            or("the Topic"),
            or("the chosen subject"),
        );
    }
    if title.contains("conclusion") {
        return format!(
            "Conclusion and Recommendations\n\n\
             Based on the analysis presented, key conclusions regarding {} include identified \
             opportunities, current challenges, and strategic recommendations.\n\n\
             Main findings suggest potential for improvement and optimization. Recommendations \
             focus on implementation strategies and success measurement.",
            or("the subject matter"),
        );
    }
    if title.contains("background") {
        return format!(
            "Background and Context\n\n\
             Understanding {} requires examining historical development and current conditions. \
             This section provides essential foundation information.\n\n\
             Key aspects include major developments, influential factors, current trends, and \
             existing frameworks. This background establishes necessary context for subsequent \
             analysis.",
            or("this field"),
        );
    }

    let section = if section_title.trim().is_empty() {
        "this section"
    } else {
        section_title.trim()
    };
    let generic = [
        format!(
            "This {} provides a focused analysis of {}. Key aspects include fundamental concepts, \
             current trends, and practical applications.\n\n\
             The content is structured to deliver clear insights and actionable information \
             suitable for business documentation.",
            section,
            or("the topic"),
        ),
        format!(
            "In this {}, we examine core concepts related to {}. The discussion covers essential \
             information, relevant examples, and practical implications.\n\n\
             This concise analysis provides a balanced perspective on the subject matter.",
            section,
            or("this subject"),
        ),
        format!(
            "This segment explores fundamental aspects of {}. It presents key information \
             organized for easy understanding and practical application.\n\n\
             The analysis is based on careful consideration of available information and expert \
             perspectives.",
            or("the main topic"),
        ),
    ];
    generic
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| generic[0].clone())
}

/// Rewrites text according to a natural-language instruction without a model.
pub trait RefinementRewriter: Send + Sync {
    fn rewrite(&self, text: &str, instruction: &str) -> String;
}

/// Matches instruction keywords (`shorten`, `bullet`, `formal`) in that order.
/// Anything else leaves the text as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordRewriter;

impl RefinementRewriter for KeywordRewriter {
    fn rewrite(&self, text: &str, instruction: &str) -> String {
        let instruction = instruction.to_lowercase();

        if instruction.contains("shorten") {
            let sentences = sentences(text);
            if sentences.len() > 2 {
                return format!("{}.", sentences[..2].join(". "));
            }
            return text.to_string();
        }

        if instruction.contains("bullet") {
            return sentences(text)
                .into_iter()
                .take(4)
                .map(|s| format!("• {}", s))
                .collect::<Vec<_>>()
                .join("\n");
        }

        if instruction.contains("formal") {
            return format!("{}{}", text, FORMAL_SUFFIX);
        }

        text.to_string()
    }
}

fn or_default<'a>(topic: &'a str, default: &'a str) -> &'a str {
    if topic.is_empty() {
        default
    } else {
        topic
    }
}

fn sentences(text: &str) -> Vec<&str> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
