//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini `generateContent` API.
//! It implements the `ContentGenerationService` port from the `core` crate and
//! answers from the fallback templates whenever the API cannot be used.

use async_trait::async_trait;
use docgen_core::{
    domain::{DocumentKind, Generated, GenerationSource},
    fallback::{self, KeywordRewriter, RefinementRewriter},
    ports::ContentGenerationService,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Statuses that mean the API will keep refusing this client.
const LATCHING_STATUSES: [StatusCode; 4] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
];

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Section content and refinements.
    pub const PROSE: Self = Self {
        temperature: 0.7,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 500,
    };

    /// Outlines: lower temperature, shorter output.
    pub const OUTLINE: Self = Self {
        temperature: 0.3,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 300,
    };
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Why a remote call produced no text.
#[derive(Debug)]
enum CallFailure {
    /// The API answered with a non-success status.
    Status(StatusCode),
    /// Network error, timeout, or an unreadable body. The request URL is
    /// stripped since it carries the API key.
    Transport(reqwest::Error),
    /// A successful response without any candidate text.
    Empty,
}

impl CallFailure {
    fn transport(error: reqwest::Error) -> Self {
        Self::Transport(error.without_url())
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Connection settings for [`GeminiAdapter`].
#[derive(Clone, Debug)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// An adapter that implements `ContentGenerationService` using the Gemini API.
///
/// Once the API rejects a request with 400, 401, 403 or 404 the adapter
/// stops calling it for the rest of its lifetime and serves templates only.
/// Other failures fall back for that one call.
pub struct GeminiAdapter {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    fallback_latched: AtomicBool,
    rewriter: Arc<dyn RefinementRewriter>,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`. Without an API key it starts latched.
    pub fn new(settings: GeminiSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        );
        let latched = settings.api_key.is_none();
        if latched {
            info!("No Gemini API key configured; using template content only.");
        }

        Ok(Self {
            http,
            endpoint,
            api_key: settings.api_key.unwrap_or_default(),
            fallback_latched: AtomicBool::new(latched),
            rewriter: Arc::new(KeywordRewriter),
        })
    }

    /// Replaces the rewriter used for fallback refinements.
    pub fn with_rewriter(mut self, rewriter: Arc<dyn RefinementRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    async fn call_model(&self, prompt: &str, config: GenerationConfig) -> Result<String, CallFailure> {
        let body = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: config,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(CallFailure::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallFailure::Status(status));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(CallFailure::transport)?;
        parsed.into_first_text().ok_or(CallFailure::Empty)
    }

    /// Calls the model unless latched, and applies the fallback rules.
    async fn generate_or_else<F>(
        &self,
        operation: &'static str,
        prompt: &str,
        config: GenerationConfig,
        fallback: F,
    ) -> Generated<String>
    where
        F: FnOnce() -> String,
    {
        if self.fallback_latched() {
            return Generated::fallback(fallback());
        }

        match self.call_model(prompt, config).await {
            Ok(text) => Generated::live(text),
            Err(CallFailure::Status(status)) if LATCHING_STATUSES.contains(&status) => {
                self.fallback_latched.store(true, Ordering::SeqCst);
                warn!(
                    operation,
                    status = status.as_u16(),
                    "Gemini rejected the request; switching to template content permanently"
                );
                Generated::fallback(fallback())
            }
            Err(failure) => {
                warn!(operation, ?failure, "Gemini call failed; using template content");
                Generated::fallback(fallback())
            }
        }
    }
}

/// Strips the Markdown code fence models like to wrap JSON in.
fn strip_code_fence(text: &str) -> String {
    text.trim()
        .trim_matches('`')
        .replace("json\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn outline_prompt(topic: &str, kind: DocumentKind) -> String {
    match kind {
        DocumentKind::Docx => format!(
            "Generate a concise outline for a document about: {topic}\n\n\
             Return ONLY a valid JSON array of 4-6 section headers maximum. Example format:\n\
             [\"Introduction\", \"Background\", \"Analysis\", \"Conclusion\"]\n\n\
             Make the sections relevant to the topic: {topic}"
        ),
        DocumentKind::Pptx => format!(
            "Generate slide titles for a presentation about: {topic}\n\n\
             Return ONLY a valid JSON array of 5-7 slide titles maximum. Example format:\n\
             [\"Title Slide\", \"Introduction\", \"Key Findings\", \"Analysis\", \"Conclusion\"]\n\n\
             Make the slide titles relevant to the topic: {topic}"
        ),
    }
}

fn section_prompt(section_title: &str, topic: &str) -> String {
    let task = format!(
        "Write concise, focused content for the section: '{section_title}' about: {topic}. \
         Keep it brief and to the point - maximum 150-200 words suitable for one page/slide."
    );
    format!(
        "Context: {topic}\n\nTask: {task}\n\n\
         Please generate concise, focused content that fits on one page/slide (150-200 words maximum). \
         Use clear, professional language suitable for business documents."
    )
}

fn refine_prompt(text: &str, instruction: &str) -> String {
    format!(
        "Original content: {text}\n\n\
         Refinement request: {instruction}\n\n\
         Please refine the content above according to the refinement request.\n\
         Keep the content concise and focused (150-200 words maximum).\n\
         Return only the refined content without any additional explanations."
    )
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for GeminiAdapter {
    async fn generate_outline(&self, topic: &str, kind: DocumentKind) -> Generated<String> {
        let generated = self
            .generate_or_else(
                "outline",
                &outline_prompt(topic, kind),
                GenerationConfig::OUTLINE,
                || fallback::fallback_outline_text(kind),
            )
            .await;

        match generated.source {
            GenerationSource::Live => Generated::live(strip_code_fence(&generated.value)),
            GenerationSource::Fallback => generated,
        }
    }

    async fn generate_section(&self, section_title: &str, topic: &str) -> Generated<String> {
        self.generate_or_else(
            "section",
            &section_prompt(section_title, topic),
            GenerationConfig::PROSE,
            || fallback::fallback_section_content(section_title, topic),
        )
        .await
    }

    async fn refine(&self, text: &str, instruction: &str) -> Generated<String> {
        self.generate_or_else(
            "refine",
            &refine_prompt(text, instruction),
            GenerationConfig::PROSE,
            || self.rewriter.rewrite(text, instruction),
        )
        .await
    }

    fn fallback_latched(&self) -> bool {
        self.fallback_latched.load(Ordering::SeqCst)
    }
}
