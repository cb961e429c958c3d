mod common;

use api_lib::adapters::{GeminiAdapter, GeminiSettings};
use axum::http::{header, Method, StatusCode};
use common::{StubGenerator, TestApp};
use docgen_core::fallback::{KeywordRewriter, RefinementRewriter};
use serde_json::json;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

fn read_zip_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

async fn count_rows(app: &TestApp, table: &str, project_id: &str) -> i64 {
    let project_id = uuid::Uuid::parse_str(project_id).unwrap();
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {} WHERE project_id = ?",
        table
    ))
    .bind(project_id)
    .fetch_one(app.db.pool())
    .await
    .unwrap()
}

fn docx_project(outline: serde_json::Value) -> serde_json::Value {
    json!({
        "title": "Energy Report",
        "document_type": "docx",
        "topic": "Renewable Energy",
        "outline": outline
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let response = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"status": "ok"}));
}

#[tokio::test]
async fn register_login_logout_round() {
    let app = TestApp::new().await;
    let cookie = app.register("ada@example.com", "lovelace").await;

    let check = app.get("/api/check-auth", &cookie).await;
    assert_eq!(check.status, StatusCode::OK);
    assert_eq!(check.json()["authenticated"], true);
    assert_eq!(check.json()["email"], "ada@example.com");

    let duplicate = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({"email": "ada@example.com", "password": "other"})),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json(), json!({"error": "Email already exists"}));

    let missing = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({"email": "bob@example.com"})),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["error"], "Email and password required");

    let wrong = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "babbage"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["error"], "Invalid credentials");

    let login = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "lovelace"})),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.json()["message"], "Login successful");
    let second_cookie = login.session_cookie().unwrap();

    let logout = app
        .send(Method::POST, "/api/logout", Some(&second_cookie), None)
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.set_cookie().unwrap().contains("Max-Age=0"));

    let after = app.get("/api/check-auth", &second_cookie).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.json(), json!({"authenticated": false}));

    // The registration session is independent of the one logged out.
    assert_eq!(app.get("/api/check-auth", &cookie).await.status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_unknown_sessions() {
    let app = TestApp::new().await;

    let anonymous = app.send(Method::GET, "/api/projects", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json(), json!({"error": "Unauthorized"}));

    let forged = app.get("/api/projects", "session=not-a-session").await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let outline = app
        .send(
            Method::POST,
            "/api/generate-outline",
            None,
            Some(json!({"topic": "X", "document_type": "docx"})),
        )
        .await;
    assert_eq!(outline.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_project_validates_input() {
    let app = TestApp::new().await;
    let cookie = app.register("val@example.com", "pw").await;

    let missing = app
        .post("/api/projects", &cookie, json!({"title": "T", "document_type": "docx"}))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let bad_kind = app
        .post(
            "/api/projects",
            &cookie,
            json!({"title": "T", "document_type": "xlsx", "topic": "X"}),
        )
        .await;
    assert_eq!(bad_kind.status, StatusCode::BAD_REQUEST);

    let duplicate_ids = app
        .post(
            "/api/projects",
            &cookie,
            docx_project(json!([
                {"id": "s0", "title": "A"},
                {"id": "s0", "title": "B"}
            ])),
        )
        .await;
    assert_eq!(duplicate_ids.status, StatusCode::BAD_REQUEST);

    let listed = app.get("/api/projects", &cookie).await;
    assert_eq!(listed.json(), json!([]));
}

#[tokio::test]
async fn outline_endpoint_numbers_titles_and_substitutes_default() {
    let app = TestApp::new().await;
    let cookie = app.register("outline@example.com", "pw").await;

    let response = app
        .post(
            "/api/generate-outline",
            &cookie,
            json!({"topic": "Rust", "document_type": "pptx"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"outline": [
            {"id": "slide_0", "title": "Overview"},
            {"id": "slide_1", "title": "Details"},
            {"id": "slide_2", "title": "Summary"}
        ]})
    );

    let garbled = TestApp::with_generator(Arc::new(StubGenerator {
        outline_text: "I cannot produce JSON today.".to_string(),
        ..StubGenerator::default()
    }))
    .await;
    let cookie = garbled.register("garbled@example.com", "pw").await;
    let response = garbled
        .post(
            "/api/generate-outline",
            &cookie,
            json!({"topic": "Rust", "document_type": "docx"}),
        )
        .await;
    let outline = response.json()["outline"].clone();
    assert_eq!(
        outline,
        json!([
            {"id": "section_0", "title": "Introduction"},
            {"id": "section_1", "title": "Background"},
            {"id": "section_2", "title": "Main Content"},
            {"id": "section_3", "title": "Conclusion"}
        ])
    );
}

#[tokio::test]
async fn end_to_end_docx_with_template_fallback() {
    // No API key: every call is served from the templates.
    let generator = GeminiAdapter::new(GeminiSettings {
        api_key: None,
        model: "gemini-test".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(1),
    })
    .unwrap();
    let app = TestApp::with_generator(Arc::new(generator)).await;
    let cookie = app.register("e2e@example.com", "pw").await;

    let outline = app
        .post(
            "/api/generate-outline",
            &cookie,
            json!({"topic": "Renewable Energy", "document_type": "docx"}),
        )
        .await
        .json()["outline"]
        .clone();
    assert_eq!(outline.as_array().unwrap().len(), 5);
    assert_eq!(outline[0]["id"], "section_0");

    let project_id = app.create_project(&cookie, docx_project(outline)).await;

    let generated = app
        .post(&format!("/api/projects/{}/generate", project_id), &cookie, json!({}))
        .await;
    assert_eq!(generated.status, StatusCode::OK);
    assert_eq!(generated.json()["generated"], 5);

    let export = app
        .get(&format!("/api/projects/{}/export", project_id), &cookie)
        .await;
    assert_eq!(export.status, StatusCode::OK);
    assert_eq!(
        export.headers[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(
        export.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Energy Report.docx\""
    );

    let xml = read_zip_part(&export.bytes, "word/document.xml");
    let title_at = xml.find("<w:pStyle w:val=\"Title\"").unwrap();
    let topic_at = xml.find("Renewable Energy").unwrap();
    assert!(title_at < topic_at);
    assert!(xml[title_at..topic_at].contains("<w:jc w:val=\"center\""));
    assert!(xml.contains("Introduction"));
    assert_eq!(xml.matches("<w:pStyle w:val=\"Heading1\"").count(), 5);
}

#[tokio::test]
async fn pptx_export_skips_first_outline_entry() {
    let app = TestApp::new().await;
    let cookie = app.register("slides@example.com", "pw").await;
    let project_id = app
        .create_project(
            &cookie,
            json!({
                "title": "Café Deck",
                "document_type": "pptx",
                "topic": "Tides",
                "outline": [{"id": "s0", "title": "Intro"}]
            }),
        )
        .await;
    app.post(&format!("/api/projects/{}/generate", project_id), &cookie, json!({}))
        .await;

    let export = app
        .get(&format!("/api/projects/{}/export", project_id), &cookie)
        .await;
    assert_eq!(export.status, StatusCode::OK);
    assert_eq!(
        export.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Caf_ Deck.pptx\"; filename*=UTF-8''Caf%C3%A9%20Deck.pptx"
    );
    let presentation = read_zip_part(&export.bytes, "ppt/presentation.xml");
    assert_eq!(presentation.matches("<p:sldId ").count(), 1);
    let title = read_zip_part(&export.bytes, "ppt/slides/slide1.xml");
    assert!(title.contains("<a:t>Tides</a:t>"));
}

#[tokio::test]
async fn refine_creates_next_version_and_history() {
    let app = TestApp::new().await;
    let cookie = app.register("refine@example.com", "pw").await;
    let project_id = app
        .create_project(
            &cookie,
            docx_project(json!([
                {"id": "s0", "title": "Intro"},
                {"id": "s1", "title": "Body"}
            ])),
        )
        .await;
    app.post(&format!("/api/projects/{}/generate", project_id), &cookie, json!({}))
        .await;

    let refine_uri = format!("/api/projects/{}/refine", project_id);
    let refined = app
        .post(&refine_uri, &cookie, json!({"section_id": "s0", "prompt": "shorten"}))
        .await;
    assert_eq!(refined.status, StatusCode::OK);
    assert_eq!(refined.json()["version"], 2);
    assert_eq!(
        refined.json()["refined_content"],
        "Intro of Renewable Energy.\nSecond line. [shorten]"
    );

    let missing = app
        .post(&refine_uri, &cookie, json!({"section_id": "nope", "prompt": "shorten"}))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json(), json!({"error": "Content not found"}));

    let detail = app
        .get(&format!("/api/projects/{}", project_id), &cookie)
        .await
        .json();
    let contents = detail["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 2);
    let s0 = contents.iter().find(|c| c["section_id"] == "s0").unwrap();
    assert_eq!(s0["version"], 2);

    let history = app
        .get(&format!("/api/projects/{}/history?section_id=s0", project_id), &cookie)
        .await
        .json();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["prompt"], "shorten");
    assert_eq!(entries[0]["old_content"], "Intro of Renewable Energy.\nSecond line.");
    assert!(entries[0]["user_feedback"].is_null());

    let none_for_s1 = app
        .get(&format!("/api/projects/{}/history?section_id=s1", project_id), &cookie)
        .await
        .json();
    assert_eq!(none_for_s1, json!([]));

    let history_id = entries[0]["id"].as_i64().unwrap();
    let feedback_uri = format!("/api/projects/{}/history/{}/feedback", project_id, history_id);
    let feedback = app
        .post(&feedback_uri, &cookie, json!({"feedback": "like", "comments": "crisp"}))
        .await;
    assert_eq!(feedback.status, StatusCode::OK);
    assert_eq!(feedback.json()["user_feedback"], "like");
    assert_eq!(feedback.json()["comments"], "crisp");

    let invalid = app
        .post(&feedback_uri, &cookie, json!({"feedback": "meh"}))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_refinements_never_overwrite_each_other() {
    let app = TestApp::with_generator(Arc::new(StubGenerator {
        refine_delay: Duration::from_millis(200),
        ..StubGenerator::default()
    }))
    .await;
    let cookie = app.register("race@example.com", "pw").await;
    let project_id = app
        .create_project(&cookie, docx_project(json!([{"id": "s0", "title": "Intro"}])))
        .await;
    app.post(&format!("/api/projects/{}/generate", project_id), &cookie, json!({}))
        .await;

    let refine_uri = format!("/api/projects/{}/refine", project_id);
    let (first, second) = tokio::join!(
        app.post(&refine_uri, &cookie, json!({"section_id": "s0", "prompt": "one"})),
        app.post(&refine_uri, &cookie, json!({"section_id": "s0", "prompt": "two"})),
    );
    let mut statuses = vec![first.status, second.status];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    let winner = if first.status == StatusCode::OK { &first } else { &second };
    assert_eq!(winner.json()["version"], 2);

    let retried = app
        .post(&refine_uri, &cookie, json!({"section_id": "s0", "prompt": "three"}))
        .await;
    assert_eq!(retried.status, StatusCode::OK);
    assert_eq!(retried.json()["version"], 3);

    let history = app
        .get(&format!("/api/projects/{}/history", project_id), &cookie)
        .await
        .json();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["old_content"], "Intro of Renewable Energy.\nSecond line.");
    assert_eq!(entries[1]["old_content"], entries[0]["new_content"]);
}

#[tokio::test]
async fn template_refinement_follows_keywords() {
    let generator = GeminiAdapter::new(GeminiSettings {
        api_key: None,
        model: "gemini-test".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(1),
    })
    .unwrap();
    let app = TestApp::with_generator(Arc::new(generator)).await;
    let cookie = app.register("keywords@example.com", "pw").await;
    let project_id = app
        .create_project(&cookie, docx_project(json!([{"id": "s0", "title": "Introduction"}])))
        .await;
    app.post(&format!("/api/projects/{}/generate", project_id), &cookie, json!({}))
        .await;

    let detail = app
        .get(&format!("/api/projects/{}", project_id), &cookie)
        .await
        .json();
    let original = detail["contents"][0]["content_text"].as_str().unwrap().to_string();

    let refined = app
        .post(
            &format!("/api/projects/{}/refine", project_id),
            &cookie,
            json!({"section_id": "s0", "prompt": "Please SHORTEN this"}),
        )
        .await
        .json();
    assert_eq!(
        refined["refined_content"],
        KeywordRewriter.rewrite(&original, "Please SHORTEN this")
    );
}

#[tokio::test]
async fn regeneration_writes_next_version() {
    let app = TestApp::new().await;
    let cookie = app.register("regen@example.com", "pw").await;
    let project_id = app
        .create_project(&cookie, docx_project(json!([{"id": "s0", "title": "Intro"}])))
        .await;

    let uri = format!("/api/projects/{}/generate", project_id);
    app.post(&uri, &cookie, json!({})).await;
    let second = app.post(&uri, &cookie, json!({})).await;
    assert_eq!(second.json()["generated"], 1);

    let detail = app
        .get(&format!("/api/projects/{}", project_id), &cookie)
        .await
        .json();
    assert_eq!(detail["contents"].as_array().unwrap().len(), 1);
    assert_eq!(detail["contents"][0]["version"], 2);
    assert_eq!(count_rows(&app, "contents", &project_id).await, 2);
}

#[tokio::test]
async fn delete_removes_contents_and_history() {
    let app = TestApp::new().await;
    let cookie = app.register("delete@example.com", "pw").await;
    let project_id = app
        .create_project(&cookie, docx_project(json!([{"id": "s0", "title": "Intro"}])))
        .await;
    app.post(&format!("/api/projects/{}/generate", project_id), &cookie, json!({}))
        .await;
    app.post(
        &format!("/api/projects/{}/refine", project_id),
        &cookie,
        json!({"section_id": "s0", "prompt": "formal"}),
    )
    .await;
    assert_eq!(count_rows(&app, "contents", &project_id).await, 2);
    assert_eq!(count_rows(&app, "refinement_history", &project_id).await, 1);

    let uri = format!("/api/projects/{}", project_id);
    let deleted = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.json()["message"], "Project deleted successfully");

    assert_eq!(count_rows(&app, "contents", &project_id).await, 0);
    assert_eq!(count_rows(&app, "refinement_history", &project_id).await, 0);
    assert_eq!(app.get(&uri, &cookie).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_users_projects_are_invisible() {
    let app = TestApp::new().await;
    let owner = app.register("owner@example.com", "pw").await;
    let intruder = app.register("intruder@example.com", "pw").await;
    let project_id = app
        .create_project(&owner, docx_project(json!([{"id": "s0", "title": "Intro"}])))
        .await;
    app.post(&format!("/api/projects/{}/generate", project_id), &owner, json!({}))
        .await;

    let base = format!("/api/projects/{}", project_id);
    let attempts = [
        app.get(&base, &intruder).await,
        app.get(&format!("{}/export", base), &intruder).await,
        app.get(&format!("{}/history", base), &intruder).await,
        app.post(&format!("{}/generate", base), &intruder, json!({})).await,
        app.post(
            &format!("{}/refine", base),
            &intruder,
            json!({"section_id": "s0", "prompt": "shorten"}),
        )
        .await,
        app.send(Method::DELETE, &base, Some(&intruder), None).await,
    ];
    for response in attempts {
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json(), json!({"error": "Project not found"}));
    }

    assert_eq!(app.get("/api/projects", &intruder).await.json(), json!([]));
    assert_eq!(count_rows(&app, "contents", &project_id).await, 1);
}
