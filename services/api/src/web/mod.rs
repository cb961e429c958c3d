pub mod auth;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

use auth::{check_auth_handler, login_handler, logout_handler, register_handler};
use generation::{
    export_handler, feedback_handler, generate_content_handler, generate_outline_handler,
    list_history_handler, refine_content_handler,
};
use rest::{
    create_project_handler, delete_project_handler, get_project_handler, health_handler,
    list_projects_handler,
};

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            warn!("CORS_ORIGIN '{}' is not a valid header value; cross-origin requests are disabled", origin);
            AllowOrigin::list(std::iter::empty())
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Builds the complete application: public and protected API routes, CORS,
/// request tracing and the Swagger UI.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/check-auth", get(check_auth_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/projects",
            get(list_projects_handler).post(create_project_handler),
        )
        .route(
            "/api/projects/{id}",
            get(get_project_handler).delete(delete_project_handler),
        )
        .route("/api/projects/{id}/generate", post(generate_content_handler))
        .route("/api/projects/{id}/refine", post(refine_content_handler))
        .route("/api/projects/{id}/history", get(list_history_handler))
        .route(
            "/api/projects/{id}/history/{history_id}/feedback",
            post(feedback_handler),
        )
        .route("/api/projects/{id}/export", get(export_handler))
        .route("/api/generate-outline", post(generate_outline_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origin))
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
