//! crates/docgen_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Content, DocumentKind, ExportedDocument, Feedback, Generated, NewContent, NewProject,
    Project, RefinementHistory, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Project Management ---
    async fn create_project(&self, project: NewProject) -> PortResult<Project>;

    /// Projects owned by `user_id`, newest first.
    async fn list_projects(&self, user_id: Uuid) -> PortResult<Vec<Project>>;

    /// Loads a project only if `user_id` owns it; `NotFound` otherwise.
    async fn get_project_for_user(&self, project_id: Uuid, user_id: Uuid)
        -> PortResult<Project>;

    /// Deletes the project together with its contents and refinement history
    /// as one unit.
    async fn delete_project(&self, project_id: Uuid) -> PortResult<()>;

    // --- Content Management ---
    /// The highest version of every section of a project.
    async fn latest_contents(&self, project_id: Uuid) -> PortResult<Vec<Content>>;

    async fn latest_content(&self, project_id: Uuid, section_id: &str) -> PortResult<Content>;

    /// Stores generated text, each row at the next version for its section.
    async fn save_generated_contents(
        &self,
        project_id: Uuid,
        contents: Vec<NewContent>,
    ) -> PortResult<Vec<Content>>;

    /// Appends a history row and the refined text as the next version of
    /// `previous.section_id`. Fails with `Conflict`, writing nothing, when
    /// `previous` is no longer the latest version.
    async fn record_refinement(
        &self,
        previous: &Content,
        prompt: &str,
        refined_text: &str,
    ) -> PortResult<Content>;

    // --- Refinement History ---
    async fn list_refinements(
        &self,
        project_id: Uuid,
        section_id: Option<&str>,
    ) -> PortResult<Vec<RefinementHistory>>;

    async fn set_refinement_feedback(
        &self,
        project_id: Uuid,
        history_id: i64,
        feedback: Feedback,
        comments: Option<&str>,
    ) -> PortResult<RefinementHistory>;

    async fn ping(&self) -> PortResult<()>;
}

/// Produces outline, section and refined text. Implementations absorb remote
/// failures and answer from templates instead, so none of these calls fail.
#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Raw outline text, expected to be a JSON array of titles.
    async fn generate_outline(&self, topic: &str, kind: DocumentKind) -> Generated<String>;

    async fn generate_section(&self, section_title: &str, topic: &str) -> Generated<String>;

    async fn refine(&self, text: &str, instruction: &str) -> Generated<String>;

    /// True once the service has stopped calling the remote model for good.
    fn fallback_latched(&self) -> bool;
}

pub trait DocumentExporter: Send + Sync {
    /// Renders `project` using the latest content of each section.
    fn export(&self, project: &Project, contents: &[Content]) -> PortResult<ExportedDocument>;
}
