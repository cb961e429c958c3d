//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use docgen_core::ports::PortError;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::web::{error::WebError, state::AppState};

pub const SESSION_COOKIE: &str = "session";

/// The id of the authenticated user, inserted into request extensions by
/// [`require_auth`].
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Uuid);

/// Reads the `session` cookie value out of the request headers.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
        })
}

/// Resolves the session cookie to a user id, if it names a live session.
pub async fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Option<Uuid> {
    let session_id = session_id_from_headers(headers)?;
    match state.db.validate_auth_session(session_id).await {
        Ok(user_id) => Some(user_id),
        Err(PortError::Unauthorized) => {
            debug!("Rejected unknown or expired auth session");
            None
        }
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            None
        }
    }
}

/// Middleware that validates the auth session cookie and extracts the user_id.
///
/// If valid, inserts a [`CurrentUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let user_id = authenticated_user(&state, req.headers())
        .await
        .ok_or_else(WebError::unauthorized)?;

    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}
