//! services/api/src/web/generation.rs
//!
//! Handlers that call the content generator or the exporter: outline
//! suggestions, section generation, refinement with its history, and the
//! document download.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use docgen_core::{
    domain::{DocumentKind, Feedback, NewContent, RefinementHistory},
    outline::{default_outline, outline_from_titles, parse_outline_titles},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::{
    error::{ErrorBody, WebError, WebResult},
    middleware::CurrentUser,
    rest::{load_owned_project, OutlineEntryDto},
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct GenerateResponse {
    pub message: String,
    /// Number of sections that received new content.
    pub generated: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct RefineRequest {
    pub section_id: Option<String>,
    /// The natural-language refinement instruction.
    pub prompt: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RefineResponse {
    pub refined_content: String,
    pub version: i64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only return refinements of this section.
    pub section_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub id: i64,
    pub section_id: String,
    pub prompt: String,
    pub old_content: String,
    pub new_content: String,
    /// `like`, `dislike` or absent.
    pub user_feedback: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RefinementHistory> for HistoryResponse {
    fn from(history: RefinementHistory) -> Self {
        Self {
            id: history.id,
            section_id: history.section_id,
            prompt: history.prompt,
            old_content: history.old_content,
            new_content: history.new_content,
            user_feedback: history.feedback.map(|f| f.as_str().to_string()),
            comments: history.comments,
            created_at: history.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct FeedbackRequest {
    /// `like` or `dislike`.
    pub feedback: String,
    pub comments: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct OutlineRequest {
    pub topic: Option<String>,
    pub document_type: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct OutlineResponse {
    pub outline: Vec<OutlineEntryDto>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Generate content for every outline entry of a project.
///
/// Sections that already have content get a new version.
#[utoipa::path(
    post,
    path = "/api/projects/{id}/generate",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Content generated", body = GenerateResponse),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
        (status = 500, description = "Failed to save content", body = ErrorBody)
    )
)]
pub async fn generate_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
) -> WebResult<Json<GenerateResponse>> {
    let project = load_owned_project(&state, project_id, user_id).await?;

    let mut contents = Vec::with_capacity(project.outline.len());
    let mut fallback_sections = 0;
    for entry in &project.outline {
        let generated = state
            .generator
            .generate_section(&entry.title, &project.topic)
            .await;
        if generated.is_fallback() {
            fallback_sections += 1;
        }
        if generated.value.trim().is_empty() {
            warn!(section_id = %entry.id, "Generator returned no text; skipping section");
            continue;
        }
        contents.push(NewContent {
            section_id: entry.id.clone(),
            section_title: entry.title.clone(),
            content_text: generated.value,
        });
    }

    let saved = state
        .db
        .save_generated_contents(project.id, contents)
        .await
        .map_err(|e| WebError::from_port(e, "Failed to save generated content"))?;

    info!(
        project_id = %project.id,
        generated = saved.len(),
        fallback_sections,
        "Generated project content"
    );
    Ok(Json(GenerateResponse {
        message: format!("Content generated successfully for {} sections", saved.len()),
        generated: saved.len(),
    }))
}

/// Refine the latest version of one section.
#[utoipa::path(
    post,
    path = "/api/projects/{id}/refine",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = RefineRequest,
    responses(
        (status = 200, description = "Refined content, stored as a new version", body = RefineResponse),
        (status = 400, description = "Missing section id or prompt", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project or content not found", body = ErrorBody),
        (status = 409, description = "The section changed while refining", body = ErrorBody),
        (status = 500, description = "Failed to refine content", body = ErrorBody)
    )
)]
pub async fn refine_content_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
    payload: Result<Json<RefineRequest>, JsonRejection>,
) -> WebResult<Json<RefineResponse>> {
    let Json(req) = payload?;
    let (Some(section_id), Some(prompt)) = (
        req.section_id.filter(|s| !s.trim().is_empty()),
        req.prompt.filter(|p| !p.trim().is_empty()),
    ) else {
        return Err(WebError::bad_request("Section id and prompt required"));
    };

    let project = load_owned_project(&state, project_id, user_id).await?;

    let current = match state.db.latest_content(project.id, &section_id).await {
        Ok(content) => content,
        Err(PortError::NotFound(_)) => return Err(WebError::not_found("Content not found")),
        Err(e) => return Err(WebError::from_port(e, "Failed to refine content")),
    };

    let refined = state.generator.refine(&current.content_text, &prompt).await;
    if refined.value.trim().is_empty() {
        error!(section_id = %section_id, "Refinement produced no text");
        return Err(WebError::internal("Failed to refine content"));
    }

    let saved = match state
        .db
        .record_refinement(&current, &prompt, &refined.value)
        .await
    {
        Ok(saved) => saved,
        Err(PortError::Conflict(reason)) => {
            warn!(section_id = %section_id, %reason, "Refinement lost to a concurrent update");
            return Err(WebError::new(
                StatusCode::CONFLICT,
                "Content was changed by another request, please retry",
            ));
        }
        Err(e) => return Err(WebError::from_port(e, "Failed to refine content")),
    };

    info!(
        project_id = %project.id,
        section_id = %saved.section_id,
        version = saved.version,
        fallback = refined.is_fallback(),
        "Refined section"
    );
    Ok(Json(RefineResponse {
        refined_content: saved.content_text,
        version: saved.version,
    }))
}

/// List a project's refinement history, oldest first.
#[utoipa::path(
    get,
    path = "/api/projects/{id}/history",
    params(("id" = Uuid, Path, description = "Project id"), HistoryQuery),
    responses(
        (status = 200, description = "Refinement history", body = [HistoryResponse]),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody)
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> WebResult<Json<Vec<HistoryResponse>>> {
    let project = load_owned_project(&state, project_id, user_id).await?;
    let history = state
        .db
        .list_refinements(project.id, query.section_id.as_deref())
        .await
        .map_err(|e| WebError::from_port(e, "Failed to load refinement history"))?;
    Ok(Json(history.into_iter().map(HistoryResponse::from).collect()))
}

/// Record a like/dislike and optional comments on one refinement.
#[utoipa::path(
    post,
    path = "/api/projects/{id}/history/{history_id}/feedback",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("history_id" = i64, Path, description = "Refinement history id")
    ),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Updated history entry", body = HistoryResponse),
        (status = 400, description = "Unknown feedback value", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project or history entry not found", body = ErrorBody)
    )
)]
pub async fn feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path((project_id, history_id)): Path<(Uuid, i64)>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> WebResult<Json<HistoryResponse>> {
    let Json(req) = payload?;
    let feedback: Feedback = req.feedback.trim().to_ascii_lowercase().parse()?;

    let project = load_owned_project(&state, project_id, user_id).await?;
    let comments = req.comments.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let updated = state
        .db
        .set_refinement_feedback(project.id, history_id, feedback, comments)
        .await
        .map_err(|e| WebError::from_port(e, "Failed to save feedback"))?;
    Ok(Json(HistoryResponse::from(updated)))
}

/// Suggest an outline for a topic. Unreadable model output is replaced by a
/// fixed four-entry outline.
#[utoipa::path(
    post,
    path = "/api/generate-outline",
    request_body = OutlineRequest,
    responses(
        (status = 200, description = "Suggested outline", body = OutlineResponse),
        (status = 400, description = "Missing topic or unknown document type", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody)
    )
)]
pub async fn generate_outline_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OutlineRequest>, JsonRejection>,
) -> WebResult<Json<OutlineResponse>> {
    let Json(req) = payload?;
    let topic = req
        .topic
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| WebError::bad_request("Topic required"))?;
    let kind: DocumentKind = req
        .document_type
        .as_deref()
        .ok_or_else(|| WebError::bad_request("Document type required"))?
        .parse()?;

    let generated = state.generator.generate_outline(&topic, kind).await;
    let outline = match parse_outline_titles(&generated.value) {
        Ok(titles) if !titles.is_empty() => outline_from_titles(kind, &titles),
        Ok(_) => default_outline(kind),
        Err(e) => {
            warn!("Outline text is not a JSON array ({}); using the default outline", e);
            default_outline(kind)
        }
    };

    Ok(Json(OutlineResponse {
        outline: outline.iter().map(OutlineEntryDto::from).collect(),
    }))
}

/// An `attachment` disposition for `file_name`. Non-ASCII names get an ASCII
/// `filename` fallback plus an RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> String {
    if file_name.is_ascii() {
        return format!("attachment; filename=\"{}\"", file_name);
    }
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Download the project as a `.docx` or `.pptx` file.
#[utoipa::path(
    get,
    path = "/api/projects/{id}/export",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The office document", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
        (status = 500, description = "Failed to export document", body = ErrorBody)
    )
)]
pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let project = load_owned_project(&state, project_id, user_id).await?;
    let contents = state
        .db
        .latest_contents(project.id)
        .await
        .map_err(|e| WebError::from_port(e, "Failed to export document"))?;

    let document = state
        .exporter
        .export(&project, &contents)
        .map_err(|e| WebError::from_port(e, "Failed to export document"))?;

    info!(
        project_id = %project.id,
        bytes = document.bytes.len(),
        "Exported document"
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.mime_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&document.file_name),
            ),
        ],
        document.bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_names_get_an_encoded_disposition() {
        assert_eq!(
            content_disposition("Report.docx"),
            "attachment; filename=\"Report.docx\""
        );
        assert_eq!(
            content_disposition("Café Plan.pptx"),
            "attachment; filename=\"Caf_ Plan.pptx\"; filename*=UTF-8''Caf%C3%A9%20Plan.pptx"
        );
    }
}
