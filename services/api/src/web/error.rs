//! services/api/src/web/error.rs
//!
//! The error type returned by HTTP handlers. Every error renders as
//! `{"error": message}` with the matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docgen_core::ports::PortError;
use serde::Serialize;
use utoipa::ToSchema;

/// The JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Maps a port error, logging it and replacing server-side details with
    /// `context`, the per-operation message shown to the client.
    pub fn from_port(e: PortError, context: &str) -> Self {
        match e {
            PortError::NotFound(what) => Self::not_found(what),
            PortError::Invalid(message) | PortError::Conflict(message) => {
                Self::bad_request(message)
            }
            PortError::Unauthorized => Self::unauthorized(),
            PortError::Unexpected(detail) => {
                tracing::error!("{}: {}", context, detail);
                Self::internal(context)
            }
        }
    }
}

impl From<PortError> for WebError {
    fn from(e: PortError) -> Self {
        Self::from_port(e, "Internal server error")
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_statuses() {
        let cases = [
            (PortError::NotFound("Project not found".into()), StatusCode::NOT_FOUND),
            (PortError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
            (PortError::Conflict("taken".into()), StatusCode::BAD_REQUEST),
            (PortError::Unauthorized, StatusCode::UNAUTHORIZED),
            (PortError::Unexpected("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(WebError::from(error).status, status);
        }
    }

    #[test]
    fn unexpected_details_are_hidden() {
        let error = WebError::from_port(
            PortError::Unexpected("constraint failed: secret".into()),
            "Failed to delete project",
        );
        assert_eq!(error.message, "Failed to delete project");
    }

    #[tokio::test]
    async fn renders_error_json() {
        let response = WebError::not_found("Content not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Content not found"}));
    }
}
