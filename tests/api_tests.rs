//! HTTP API tests (tower test utilities, no server needed).

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use clipshare::ai::{AiError, TextModel, compose_prompt};
use clipshare::app::{AppState, build_router};
use clipshare::session::{
    MemorySessionStorage, MissingSessionPolicy, SessionConfig, SessionManager,
};
use clipshare::uploads::UploadStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "clipshare-test-boundary";

struct EchoModel;

#[async_trait]
impl TextModel for EchoModel {
    async fn ask(&self, prompt: &str, context: &str) -> Result<String, AiError> {
        Ok(format!("echo: {}", compose_prompt(prompt, context)))
    }
}

struct TestApp {
    router: Router,
    uploads: TempDir,
}

fn test_config() -> SessionConfig {
    SessionConfig {
        max_content_bytes: 64,
        max_files: 2,
        max_chat_messages: 5,
        ..SessionConfig::default()
    }
}

fn create_test_app(config: SessionConfig, ai: Option<Arc<dyn TextModel>>) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let storage = Arc::new(MemorySessionStorage::new(config.limits(), config.ttl()));
    let sessions = Arc::new(SessionManager::new(storage, config));
    let store = UploadStore::new(uploads.path(), "/uploads", 1024);

    let state = AppState::new(sessions, store, ai);
    TestApp {
        router: build_router(state, 1024 * 1024),
        uploads,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json_request(
    app: &TestApp,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let (status, bytes) = send(app, request).await;
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!({}));
    (status, json)
}

async fn upload(app: &TestApp, id: &str, filename: &str, contents: &str) -> (StatusCode, Value) {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = contents
    );
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{}/files", id))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(json!({})))
}

async fn new_session(app: &TestApp) -> String {
    let (status, json) = send_json_request(app, "POST", "/api/sessions/new", None).await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

fn stored_file_count(app: &TestApp) -> usize {
    std::fs::read_dir(app.uploads.path()).unwrap().count()
}

// Health

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(test_config(), None);

    let (status, json) = send_json_request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"]["backend"], "memory");
    assert_eq!(json["ai"], false);
}

// Sessions

#[tokio::test]
async fn test_create_and_load_session() {
    let app = create_test_app(test_config(), None);
    let id = new_session(&app).await;
    assert_eq!(id.len(), 6);

    let (status, json) = send_json_request(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["content"], "");
    assert_eq!(json["files"], json!([]));
    assert_eq!(json["chatMessages"], json!([]));
    assert!(json["createdAt"].is_string());
    assert!(json["expiresAt"].is_string());

    // Short link form, lowercase
    let uri = format!("/api/sessions/s/{}", id.to_lowercase());
    let (status, json) = send_json_request(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = create_test_app(test_config(), None);

    let (status, json) = send_json_request(&app, "GET", "/api/sessions/ZZZZZZ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "session_not_found");

    let (status, _) = send_json_request(
        &app,
        "POST",
        "/api/sessions/ZZZZZZ/content",
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auto_create_policy() {
    let config = SessionConfig {
        missing_session_policy: MissingSessionPolicy::AutoCreate,
        ..test_config()
    };
    let app = create_test_app(config, None);

    let (status, json) = send_json_request(&app, "GET", "/api/sessions/ab23cd", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "AB23CD");
}

#[tokio::test]
async fn test_save_content() {
    let app = create_test_app(test_config(), None);
    let id = new_session(&app).await;
    let uri = format!("/api/sessions/{}/content", id);

    let (status, json) =
        send_json_request(&app, "POST", &uri, Some(json!({ "content": "shared text" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) =
        send_json_request(&app, "POST", &uri, Some(json!({ "content": "x".repeat(65) }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "content_too_large");

    let (_, json) = send_json_request(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(json["content"], "shared text");
}

#[tokio::test]
async fn test_malformed_requests_use_error_body() {
    let app = create_test_app(test_config(), None);
    let id = new_session(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{}/content", id))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, bytes) = send(&app, request).await;
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_request");
    assert!(json["error"].is_string());

    let (status, json) = send_json_request(
        &app,
        "POST",
        &format!("/api/sessions/{}/content", id),
        Some(json!({ "text": "wrong field" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "invalid_request");

    let (status, json) = send_json_request(
        &app,
        "DELETE",
        &format!("/api/sessions/{}/files/first", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_request");
}

#[tokio::test]
async fn test_save_chat_messages() {
    let app = create_test_app(test_config(), None);
    let id = new_session(&app).await;
    let uri = format!("/api/sessions/{}/chat-messages", id);

    // Legacy client shape: `type` with "ai"
    let messages = json!([
        { "type": "user", "text": "summarize", "timestamp": "2024-05-01T10:00:00Z" },
        { "type": "ai", "text": "a summary", "timestamp": "2024-05-01T10:00:02Z" }
    ]);
    let (status, _) =
        send_json_request(&app, "POST", &uri, Some(json!({ "messages": messages }))).await;
    assert_eq!(status, StatusCode::OK);

    let too_many: Vec<Value> = (0..6)
        .map(|i| json!({ "role": "user", "text": format!("m{}", i), "timestamp": "2024-05-01T10:00:00Z" }))
        .collect();
    let (status, json) =
        send_json_request(&app, "POST", &uri, Some(json!({ "messages": too_many }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["error"].as_str().unwrap().contains("too large"));

    let (_, json) = send_json_request(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    let stored = json["chatMessages"].as_array().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1]["role"], "assistant");

    // Clearing the chat
    let (status, _) = send_json_request(&app, "POST", &uri, Some(json!({ "messages": [] }))).await;
    assert_eq!(status, StatusCode::OK);
}

// Files

#[tokio::test]
async fn test_upload_serve_and_delete_file() {
    let app = create_test_app(test_config(), None);
    let id = new_session(&app).await;

    let (status, meta) = upload(&app, &id, "notes.txt", "hello world").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meta["name"], "notes.txt");
    assert_eq!(meta["type"], "text/plain");
    assert_eq!(meta["size"], 11);
    let url = meta["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));

    let (_, session) = send_json_request(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(session["files"].as_array().unwrap().len(), 1);

    let (status, bytes) = send(&app, Request::get(&url).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"hello world");

    let (status, json) =
        send_json_request(&app, "DELETE", &format!("/api/sessions/{}/files/5", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "file_index_out_of_range");

    let (status, _) =
        send_json_request(&app, "DELETE", &format!("/api/sessions/{}/files/0", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_file_count(&app), 0);

    let (_, session) = send_json_request(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(session["files"], json!([]));
}

#[tokio::test]
async fn test_upload_over_file_cap_leaves_no_bytes() {
    let app = create_test_app(test_config(), None);
    let id = new_session(&app).await;

    for name in ["a.txt", "b.txt"] {
        let (status, _) = upload(&app, &id, name, "data").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = upload(&app, &id, "c.txt", "data").await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "too_many_files");
    assert_eq!(stored_file_count(&app), 2);
}

#[tokio::test]
async fn test_upload_to_unknown_session() {
    let app = create_test_app(test_config(), None);

    let (status, _) = upload(&app, "ZZZZZZ", "a.txt", "data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(stored_file_count(&app), 0);
}

// AI

#[tokio::test]
async fn test_ai_not_configured() {
    let app = create_test_app(test_config(), None);

    let (status, json) =
        send_json_request(&app, "POST", "/api/ai/ask", Some(json!({ "prompt": "hi" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "ai_not_configured");
}

#[tokio::test]
async fn test_ai_ask() {
    let app = create_test_app(test_config(), Some(Arc::new(EchoModel)));

    let (status, json) = send_json_request(
        &app,
        "POST",
        "/api/ai/ask",
        Some(json!({ "prompt": "summarize", "content": "notes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reply"], "echo: Context: notes\n\nTask: summarize");

    let (status, _) =
        send_json_request(&app, "POST", "/api/ai/ask", Some(json!({ "prompt": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
