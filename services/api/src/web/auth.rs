//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and session checks.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use docgen_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::web::{
    error::{ErrorBody, WebError, WebResult},
    middleware::{authenticated_user, session_id_from_headers, SESSION_COOKIE},
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

//=========================================================================================
// Session Cookie Helpers
//=========================================================================================

fn session_cookie(config: &Config, value: &str, max_age_secs: i64) -> String {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        SESSION_COOKIE, value, max_age_secs, secure
    )
}

/// Creates a DB-backed auth session and returns the `Set-Cookie` value for it.
async fn start_session(state: &AppState, user_id: Uuid) -> WebResult<String> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = state.config.session_ttl;

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            WebError::internal("Failed to create session")
        })?;

    Ok(session_cookie(&state.config, &auth_session_id, ttl.num_seconds()))
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

/// Both fields present and non-blank.
fn required_credentials(req: CredentialsRequest) -> Option<(String, String)> {
    let email = req.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty())?;
    let password = req.password.filter(|p| !p.is_empty())?;
    Some((email, password))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/register - Create a new user account and log it in
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing fields or email already registered", body = ErrorBody),
        (status = 500, description = "Registration failed", body = ErrorBody)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> WebResult<impl IntoResponse> {
    let Json(req) = payload?;
    let (email, password) = required_credentials(req)
        .ok_or_else(|| WebError::bad_request("Email and password required"))?;

    let password_hash = hash_password(&password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        WebError::internal("Registration failed")
    })?;

    let user = match state.db.create_user_with_email(&email, &password_hash).await {
        Ok(user) => user,
        Err(PortError::Conflict(_)) => return Err(WebError::bad_request("Email already exists")),
        Err(e) => {
            error!("Failed to create user: {:?}", e);
            return Err(WebError::internal("Registration failed"));
        }
    };

    let cookie = start_session(&state, user.user_id).await?;
    info!(user_id = %user.user_id, "Registered new user");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            user_id: user.user_id,
            email: user.email,
        }),
    ))
}

/// POST /api/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> WebResult<impl IntoResponse> {
    let invalid = || WebError::new(StatusCode::UNAUTHORIZED, "Invalid credentials");

    let Json(req) = payload?;
    let (email, password) = required_credentials(req).ok_or_else(invalid)?;

    let user_creds = match state.db.get_user_by_email(&email).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => {
            error!("Failed to get user: {:?}", e);
            return Err(WebError::internal("Login failed"));
        }
    };

    if !verify_password(&password, &user_creds.hashed_password) {
        return Err(invalid());
    }

    let cookie = start_session(&state, user_creds.user_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user_id: user_creds.user_id,
            email: user_creds.email,
        }),
    ))
}

/// POST /api/logout - Invalidate the current session, if any
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(auth_session_id) = session_id_from_headers(&headers) {
        if let Err(e) = state.db.delete_auth_session(auth_session_id).await {
            error!("Failed to delete auth session: {:?}", e);
        }
    }

    (
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state.config, "", 0))],
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    )
}

/// GET /api/check-auth - Report whether the session cookie is valid
#[utoipa::path(
    get,
    path = "/api/check-auth",
    responses(
        (status = 200, description = "Authenticated", body = CheckAuthResponse),
        (status = 401, description = "Not authenticated", body = CheckAuthResponse)
    )
)]
pub async fn check_auth_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let anonymous = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(CheckAuthResponse {
                authenticated: false,
                user_id: None,
                email: None,
            }),
        )
            .into_response()
    };

    let Some(user_id) = authenticated_user(&state, &headers).await else {
        return anonymous();
    };

    match state.db.get_user_by_id(user_id).await {
        Ok(user) => Json(CheckAuthResponse {
            authenticated: true,
            user_id: Some(user.user_id),
            email: Some(user.email),
        })
        .into_response(),
        Err(e) => {
            error!("Failed to load user for session: {:?}", e);
            anonymous()
        }
    }
}
