//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the project REST endpoints and the master
//! definition for the OpenAPI document.

use crate::web::{
    auth, generation,
    error::{ErrorBody, WebError, WebResult},
    middleware::CurrentUser,
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use docgen_core::{
    domain::{Content, DocumentKind, NewProject, OutlineEntry, Project},
    outline::validate_outline,
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::check_auth_handler,
        list_projects_handler,
        create_project_handler,
        get_project_handler,
        delete_project_handler,
        generation::generate_content_handler,
        generation::refine_content_handler,
        generation::list_history_handler,
        generation::feedback_handler,
        generation::generate_outline_handler,
        generation::export_handler,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            auth::CredentialsRequest,
            auth::AuthResponse,
            auth::MessageResponse,
            auth::CheckAuthResponse,
            OutlineEntryDto,
            ProjectResponse,
            ProjectDetailResponse,
            ContentResponse,
            CreateProjectRequest,
            CreateProjectResponse,
            generation::GenerateResponse,
            generation::RefineRequest,
            generation::RefineResponse,
            generation::HistoryResponse,
            generation::FeedbackRequest,
            generation::OutlineRequest,
            generation::OutlineResponse,
        )
    ),
    tags(
        (name = "AI Document Generator API", description = "Outline, generate, refine and export office documents.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// One outline entry as it travels over the wire.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct OutlineEntryDto {
    pub id: String,
    pub title: String,
}

impl From<&OutlineEntry> for OutlineEntryDto {
    fn from(entry: &OutlineEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
        }
    }
}

impl From<OutlineEntryDto> for OutlineEntry {
    fn from(dto: OutlineEntryDto) -> Self {
        OutlineEntry::new(dto.id.trim(), dto.title.trim())
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub title: String,
    /// `docx` or `pptx`.
    pub document_type: String,
    pub topic: String,
    pub outline: Vec<OutlineEntryDto>,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectResponse {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
            document_type: project.kind.as_str().to_string(),
            topic: project.topic.clone(),
            outline: project.outline.iter().map(OutlineEntryDto::from).collect(),
            created_at: project.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ContentResponse {
    pub id: i64,
    pub section_id: String,
    pub section_title: String,
    pub content_text: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Content> for ContentResponse {
    fn from(content: Content) -> Self {
        Self {
            id: content.id,
            section_id: content.section_id,
            section_title: content.section_title,
            content_text: content.content_text,
            version: content.version,
            created_at: content.created_at,
        }
    }
}

/// A project with the latest content of each section.
#[derive(Serialize, ToSchema)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub contents: Vec<ContentResponse>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub outline: Vec<OutlineEntryDto>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateProjectResponse {
    pub project_id: Uuid,
    pub message: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Loads a project the current user owns, or 404.
pub(crate) async fn load_owned_project(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> WebResult<Project> {
    state
        .db
        .get_project_for_user(project_id, user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => WebError::not_found("Project not found"),
            other => WebError::from_port(other, "Failed to load project"),
        })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness plus a database round trip.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unavailable", body = ErrorBody)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> WebResult<Json<HealthResponse>> {
    state.db.ping().await.map_err(|e| {
        error!("Health check failed: {:?}", e);
        WebError::new(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    })?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// List the current user's projects, newest first.
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Projects owned by the caller", body = [ProjectResponse]),
        (status = 401, description = "Not logged in", body = ErrorBody)
    )
)]
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> WebResult<Json<Vec<ProjectResponse>>> {
    let projects = state
        .db
        .list_projects(user_id)
        .await
        .map_err(|e| WebError::from_port(e, "Failed to list projects"))?;
    Ok(Json(projects.iter().map(ProjectResponse::from).collect()))
}

/// Create a project. The outline may be empty and filled in later by
/// re-creating the project with a generated outline.
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = CreateProjectResponse),
        (status = 400, description = "Missing fields, unknown document type or duplicate outline ids", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 500, description = "Failed to create project", body = ErrorBody)
    )
)]
pub async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> WebResult<impl IntoResponse> {
    let Json(req) = payload?;

    let (Some(title), Some(document_type), Some(topic)) = (
        non_blank(req.title),
        non_blank(req.document_type),
        non_blank(req.topic),
    ) else {
        return Err(WebError::bad_request(
            "Title, document type and topic required",
        ));
    };
    let kind: DocumentKind = document_type.parse()?;

    let outline: Vec<OutlineEntry> = req.outline.into_iter().map(OutlineEntry::from).collect();
    validate_outline(&outline)?;

    let project = state
        .db
        .create_project(NewProject {
            user_id,
            title,
            kind,
            topic,
            outline,
        })
        .await
        .map_err(|e| WebError::from_port(e, "Failed to create project"))?;

    info!(project_id = %project.id, kind = %project.kind, "Created project");
    Ok((
        StatusCode::CREATED,
        Json(CreateProjectResponse {
            project_id: project.id,
            message: "Project created successfully".to_string(),
        }),
    ))
}

/// Fetch a project with the latest version of each section's content.
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project", body = ProjectDetailResponse),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody)
    )
)]
pub async fn get_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
) -> WebResult<Json<ProjectDetailResponse>> {
    let project = load_owned_project(&state, project_id, user_id).await?;
    let contents = state
        .db
        .latest_contents(project.id)
        .await
        .map_err(|e| WebError::from_port(e, "Failed to load project contents"))?;

    Ok(Json(ProjectDetailResponse {
        project: ProjectResponse::from(&project),
        contents: contents.into_iter().map(ContentResponse::from).collect(),
    }))
}

/// Delete a project with all of its contents and refinement history.
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project deleted", body = auth::MessageResponse),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
        (status = 500, description = "Failed to delete project", body = ErrorBody)
    )
)]
pub async fn delete_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
) -> WebResult<Json<auth::MessageResponse>> {
    let project = load_owned_project(&state, project_id, user_id).await?;

    state
        .db
        .delete_project(project.id)
        .await
        .map_err(|e| WebError::from_port(e, "Failed to delete project"))?;

    info!(project_id = %project.id, "Deleted project");
    Ok(Json(auth::MessageResponse {
        message: "Project deleted successfully".to_string(),
    }))
}
