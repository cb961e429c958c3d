#![allow(dead_code)]

use api_lib::{
    adapters::{DbAdapter, OfficeExporter},
    config::Config,
    web::{build_router, AppState},
};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use docgen_core::{
    domain::{DocumentKind, Generated},
    ports::ContentGenerationService,
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// A generator with predictable output.
pub struct StubGenerator {
    pub outline_text: String,
    /// How long `refine` waits before answering.
    pub refine_delay: Duration,
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self {
            outline_text: r#"["Overview", "Details", "Summary"]"#.to_string(),
            refine_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ContentGenerationService for StubGenerator {
    async fn generate_outline(&self, _topic: &str, _kind: DocumentKind) -> Generated<String> {
        Generated::live(self.outline_text.clone())
    }

    async fn generate_section(&self, section_title: &str, topic: &str) -> Generated<String> {
        Generated::live(format!("{} of {}.\nSecond line.", section_title, topic))
    }

    async fn refine(&self, text: &str, instruction: &str) -> Generated<String> {
        tokio::time::sleep(self.refine_delay).await;
        Generated::live(format!("{} [{}]", text, instruction))
    }

    fn fallback_latched(&self) -> bool {
        false
    }
}

/// A single-connection in-memory database with the schema applied.
pub async fn test_db() -> DbAdapter {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let db = DbAdapter::new(pool);
    db.run_migrations().await.expect("migrations");
    db
}

pub struct TestApp {
    pub router: Router,
    pub db: DbAdapter,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_generator(Arc::new(StubGenerator::default())).await
    }

    pub async fn with_generator(generator: Arc<dyn ContentGenerationService>) -> Self {
        let db = test_db().await;
        let config = Config::from_lookup(|_| None).expect("default config");
        let state = Arc::new(AppState {
            db: Arc::new(db.clone()),
            config: Arc::new(config),
            generator,
            exporter: Arc::new(OfficeExporter::new()),
        });
        Self {
            router: build_router(state),
            db,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(cookie), Some(body)).await
    }

    /// Registers a user and returns the `Cookie` header value for its session.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(serde_json::json!({"email": email, "password": password})),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.session_cookie().expect("session cookie")
    }

    /// Creates a project and returns its id.
    pub async fn create_project(&self, cookie: &str, body: Value) -> String {
        let response = self.post("/api/projects", cookie, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["project_id"]
            .as_str()
            .expect("project id")
            .to_string()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// The `name=value` part of the `Set-Cookie` header.
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|c| c.split(';').next().map(str::to_string))
    }
}
