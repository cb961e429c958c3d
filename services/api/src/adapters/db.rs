//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docgen_core::domain::{
    Content, DocumentKind, Feedback, NewContent, NewProject, OutlineEntry, Project,
    RefinementHistory, User, UserCredentials,
};
use docgen_core::ports::{DatabaseService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `database_url`, creating the database file if needed.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            email: self.email,
            created_at: self.created_at,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Shape of one element of the `projects.outline` JSON column.
#[derive(Serialize, Deserialize)]
struct OutlineRecord {
    id: String,
    title: String,
}

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    document_type: String,
    topic: String,
    outline: Json<Vec<OutlineRecord>>,
    created_at: DateTime<Utc>,
}
impl ProjectRecord {
    fn to_domain(self) -> PortResult<Project> {
        let kind = DocumentKind::from_str(&self.document_type)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Project {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            kind,
            topic: self.topic,
            outline: self
                .outline
                .0
                .into_iter()
                .map(|entry| OutlineEntry::new(entry.id, entry.title))
                .collect(),
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ContentRecord {
    id: i64,
    project_id: Uuid,
    section_id: String,
    section_title: String,
    content_text: String,
    version: i64,
    created_at: DateTime<Utc>,
}
impl ContentRecord {
    fn to_domain(self) -> Content {
        Content {
            id: self.id,
            project_id: self.project_id,
            section_id: self.section_id,
            section_title: self.section_title,
            content_text: self.content_text,
            version: self.version,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct RefinementRecord {
    id: i64,
    project_id: Uuid,
    section_id: String,
    prompt: String,
    old_content: String,
    new_content: String,
    user_feedback: Option<String>,
    comments: Option<String>,
    created_at: DateTime<Utc>,
}
impl RefinementRecord {
    fn to_domain(self) -> PortResult<RefinementHistory> {
        let feedback = self
            .user_feedback
            .as_deref()
            .map(Feedback::from_str)
            .transpose()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(RefinementHistory {
            id: self.id,
            project_id: self.project_id,
            section_id: self.section_id,
            prompt: self.prompt,
            old_content: self.old_content,
            new_content: self.new_content,
            feedback,
            comments: self.comments,
            created_at: self.created_at,
        })
    }
}

const PROJECT_COLUMNS: &str = "id, user_id, title, document_type, topic, outline, created_at";
const CONTENT_COLUMNS: &str =
    "id, project_id, section_id, section_title, content_text, version, created_at";
const REFINEMENT_COLUMNS: &str =
    "id, project_id, section_id, prompt, old_content, new_content, user_feedback, comments, created_at";

/// Next version number for a section, read inside the caller's transaction.
async fn next_version(
    conn: &mut SqliteConnection,
    project_id: Uuid,
    section_id: &str,
) -> PortResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM contents WHERE project_id = ? AND section_id = ?",
    )
    .bind(project_id)
    .bind(section_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(unexpected)
}

async fn insert_content(
    conn: &mut SqliteConnection,
    project_id: Uuid,
    section_id: &str,
    section_title: &str,
    content_text: &str,
) -> PortResult<Content> {
    let version = next_version(conn, project_id, section_id).await?;
    let record = sqlx::query_as::<_, ContentRecord>(&format!(
        "INSERT INTO contents (project_id, section_id, section_title, content_text, version, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
        CONTENT_COLUMNS
    ))
    .bind(project_id)
    .bind(section_id)
    .bind(section_title)
    .bind(content_text)
    .bind(version)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(record.to_domain())
}

/// Inserts `previous.version + 1` only while `previous` is still the latest
/// version of its section. A refinement that lost the race gets `Conflict`.
async fn insert_refined_content(
    conn: &mut SqliteConnection,
    previous: &Content,
    refined_text: &str,
) -> PortResult<Content> {
    let stale = || {
        PortError::Conflict(format!(
            "Section {} changed after version {}",
            previous.section_id, previous.version
        ))
    };

    let record = sqlx::query_as::<_, ContentRecord>(&format!(
        "INSERT INTO contents (project_id, section_id, section_title, content_text, version, created_at) \
         SELECT ?, ?, ?, ?, ?, ? \
         WHERE (SELECT MAX(version) FROM contents WHERE project_id = ? AND section_id = ?) = ? \
         RETURNING {}",
        CONTENT_COLUMNS
    ))
    .bind(previous.project_id)
    .bind(&previous.section_id)
    .bind(&previous.section_title)
    .bind(refined_text)
    .bind(previous.version + 1)
    .bind(Utc::now())
    .bind(previous.project_id)
    .bind(&previous.section_id)
    .bind(previous.version)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => stale(),
        e => unexpected(e),
    })?;

    record.map(ContentRecord::to_domain).ok_or_else(stale)
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?) \
             RETURNING id, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PortError::Conflict(format!("User with email {} already exists", email))
            }
            other => unexpected(other),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            self.delete_auth_session(session_id).await?;
            return Err(PortError::Unauthorized);
        }
        Ok(record.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_project(&self, project: NewProject) -> PortResult<Project> {
        let outline: Vec<OutlineRecord> = project
            .outline
            .into_iter()
            .map(|entry| OutlineRecord {
                id: entry.id,
                title: entry.title,
            })
            .collect();

        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            "INSERT INTO projects (id, user_id, title, document_type, topic, outline, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(project.user_id)
        .bind(&project.title)
        .bind(project.kind.as_str())
        .bind(&project.topic)
        .bind(Json(outline))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_projects(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {} FROM projects WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(ProjectRecord::to_domain).collect()
    }

    async fn get_project_for_user(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Project> {
        sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {} FROM projects WHERE id = ? AND user_id = ?",
            PROJECT_COLUMNS
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Project {} not found", project_id)))?
        .to_domain()
    }

    async fn delete_project(&self, project_id: Uuid) -> PortResult<()> {
        // An uncommitted transaction rolls back when dropped.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query("DELETE FROM contents WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query("DELETE FROM refinement_history WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        let deleted = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();

        if deleted == 0 {
            return Err(PortError::NotFound(format!("Project {} not found", project_id)));
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn latest_contents(&self, project_id: Uuid) -> PortResult<Vec<Content>> {
        let records = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {} FROM contents c WHERE c.project_id = ? AND c.version = ( \
                 SELECT MAX(version) FROM contents \
                 WHERE project_id = c.project_id AND section_id = c.section_id) \
             ORDER BY c.section_id",
            CONTENT_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(ContentRecord::to_domain).collect())
    }

    async fn latest_content(&self, project_id: Uuid, section_id: &str) -> PortResult<Content> {
        let record = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {} FROM contents WHERE project_id = ? AND section_id = ? \
             ORDER BY version DESC LIMIT 1",
            CONTENT_COLUMNS
        ))
        .bind(project_id)
        .bind(section_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Content for section {} not found", section_id)))?;
        Ok(record.to_domain())
    }

    async fn save_generated_contents(
        &self,
        project_id: Uuid,
        contents: Vec<NewContent>,
    ) -> PortResult<Vec<Content>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let mut saved = Vec::with_capacity(contents.len());
        for content in &contents {
            let row = insert_content(
                &mut tx,
                project_id,
                &content.section_id,
                &content.section_title,
                &content.content_text,
            )
            .await?;
            saved.push(row);
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(saved)
    }

    async fn record_refinement(
        &self,
        previous: &Content,
        prompt: &str,
        refined_text: &str,
    ) -> PortResult<Content> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The guarded insert goes first so the write lock is taken before
        // anything is read.
        let refined = insert_refined_content(&mut tx, previous, refined_text).await?;

        sqlx::query(
            "INSERT INTO refinement_history \
             (project_id, section_id, prompt, old_content, new_content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(previous.project_id)
        .bind(&previous.section_id)
        .bind(prompt)
        .bind(&previous.content_text)
        .bind(refined_text)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(refined)
    }

    async fn list_refinements(
        &self,
        project_id: Uuid,
        section_id: Option<&str>,
    ) -> PortResult<Vec<RefinementHistory>> {
        let records = sqlx::query_as::<_, RefinementRecord>(&format!(
            "SELECT {} FROM refinement_history \
             WHERE project_id = ? AND (? IS NULL OR section_id = ?) \
             ORDER BY id ASC",
            REFINEMENT_COLUMNS
        ))
        .bind(project_id)
        .bind(section_id)
        .bind(section_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(RefinementRecord::to_domain).collect()
    }

    async fn set_refinement_feedback(
        &self,
        project_id: Uuid,
        history_id: i64,
        feedback: Feedback,
        comments: Option<&str>,
    ) -> PortResult<RefinementHistory> {
        sqlx::query_as::<_, RefinementRecord>(&format!(
            "UPDATE refinement_history SET user_feedback = ?, comments = ? \
             WHERE id = ? AND project_id = ? RETURNING {}",
            REFINEMENT_COLUMNS
        ))
        .bind(feedback.as_str())
        .bind(comments)
        .bind(history_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Refinement {} not found", history_id)))?
        .to_domain()
    }

    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
