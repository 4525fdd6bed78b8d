//! Integration tests for Favored Prompts
//!
//! These tests drive the HTTP router end to end against an in-memory
//! database and an in-memory Gist store, and run the local store's sync
//! against a live server.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use favored_prompts::api::build_router;
use favored_prompts::app::AppState;
use favored_prompts::auth::SessionUser;
use favored_prompts::config::Config;
use favored_prompts::database::create_memory_pool;
use favored_prompts::gist::{MemoryDocumentStore, MemoryGistConnector};
use favored_prompts::local::{LocalStore, ManualClock, MemoryStorage};
use favored_prompts::remote::ApiClient;

/// Helper to build the router over fresh in-memory backends
async fn create_test_app() -> (Router, AppState, Arc<MemoryDocumentStore>) {
    let pool = create_memory_pool().await.unwrap();
    let gists = Arc::new(MemoryDocumentStore::new());
    let state = AppState::new(
        Config::for_tests(),
        pool,
        reqwest::Client::new(),
        Arc::new(MemoryGistConnector::new(gists.clone())),
    );

    (build_router(state.clone()), state, gists)
}

fn api_key(state: &AppState) -> String {
    state
        .sessions
        .issue(&SessionUser {
            id: 42,
            username: "octo".to_string(),
            access_token: "gho_test".to_string(),
        })
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn authed(method: &str, uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", key)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_and_fallback() {
    let (app, _, _) = create_test_app().await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_submission_moderation_workflow() {
    let (app, state, _) = create_test_app().await;

    // Missing guest name
    let (status, body) = send(
        &app,
        json_request("POST", "/api/prompts", None, json!({ "text": "Summarize this" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please fill in all required fields.");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/prompts",
            None,
            json!({
                "text": "Summarize this article in three bullet points",
                "guestName": "Ada",
                "category": "Writing",
                "tags": ["summary"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["prompt"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["prompt"]["status"], "pending");

    // Pending submissions are not listed
    let (_, body) = send(&app, get("/api/prompts")).await;
    assert_eq!(body["prompts"].as_array().unwrap().len(), 0);

    state.submissions.approve(&id).await.unwrap();

    let (_, body) = send(&app, get("/api/prompts")).await;
    let prompts = body["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["guest_name"], "Ada");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/prompts/{id}/comments"),
            None,
            json!({ "author": "Grace", "text": "Works well" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get(&format!("/api/prompts/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"]["id"], id.as_str());
    assert_eq!(body["discussions"][0]["author"], "Grace");

    let (status, _) = send(&app, get("/api/prompts/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_library_requires_session() {
    let (app, _, _) = create_test_app().await;

    let (status, body) = send(&app, get("/api/library/index")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Unauthorized"));

    let (status, _) = send(&app, authed("GET", "/api/library/index", "not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_personal_library_crud() {
    let (app, state, _) = create_test_app().await;
    let key = api_key(&state);

    let (status, body) = send(&app, authed("GET", "/api/library/index", &key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompts"].as_array().unwrap().len(), 0);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/library/prompt",
            Some(&key),
            json!({ "title": "", "content": "body" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title and content are required");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/library/prompt",
            Some(&key),
            json!({
                "title": "Code review",
                "content": "Review this diff for bugs",
                "category": "Code Review",
                "tags": ["review"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let gist_id = body["gistId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/library/prompt/{gist_id}"),
            Some(&key),
            json!({ "category": "Research" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        authed("GET", &format!("/api/library/prompt/{gist_id}"), &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Review this diff for bugs");
    assert_eq!(body["category"], "Research");

    let (status, body) = send(
        &app,
        authed("POST", &format!("/api/library/fork/{gist_id}"), &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fork_id = body["gistId"].as_str().unwrap().to_string();
    assert_ne!(fork_id, gist_id);

    let (_, body) = send(&app, authed("GET", "/api/library/index", &key)).await;
    let titles: Vec<&str> = body["prompts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Code review", "Fork of Code review"]);
    assert_eq!(body["prompts"][0]["category"], "Research");

    let (status, _) = send(
        &app,
        authed("DELETE", &format!("/api/library/prompt/{gist_id}"), &key),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, authed("GET", "/api/library/index", &key)).await;
    assert_eq!(body["prompts"].as_array().unwrap().len(), 1);
    assert_eq!(body["prompts"][0]["gistId"], fork_id.as_str());
}

#[tokio::test]
async fn test_community_nomination_to_discovery() {
    let (app, state, _) = create_test_app().await;
    let key = api_key(&state);

    let create = |is_public: bool| {
        json_request(
            "POST",
            "/api/library/prompt",
            Some(&key),
            json!({
                "title": "Shared prompt",
                "content": "Explain like I'm five",
                "category": "Education",
                "isPublic": is_public
            }),
        )
    };

    let (_, body) = send(&app, create(false)).await;
    let private_id = body["gistId"].as_str().unwrap().to_string();
    let (_, body) = send(&app, create(true)).await;
    let public_id = body["gistId"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/community/nominate",
            Some(&key),
            json!({ "gistId": private_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/community/nominate",
            Some(&key),
            json!({ "gistId": public_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let nomination_id = body["nominationId"].as_str().unwrap().to_string();

    let (status, _) = send(&app, get(&format!("/api/community/prompt/{public_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    state
        .community
        .approve_nomination(&nomination_id)
        .await
        .unwrap();

    let (status, body) = send(&app, get("/api/community/discover?limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    let prompts = body["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0]["gist_id"], public_id.as_str());
    assert_eq!(prompts[0]["author_username"], "octo");

    let (_, body) = send(&app, get("/api/community/discover?featured=true")).await;
    assert_eq!(body["prompts"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/community/prompt/{public_id}/comments"),
            None,
            json!({ "author": "Lin", "text": "Great for onboarding" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get(&format!("/api/community/prompt/{public_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"]["title"], "Shared prompt");
    assert_eq!(body["discussions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_classify_without_gateway_key() {
    let (app, _, _) = create_test_app().await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/classify", None, json!({ "text": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/classify",
            None,
            json!({ "text": "Write a haiku about distributed consensus" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestedTitle"], "AI-Generated Title (Mock)");
    assert_eq!(body["category"], "Research");
}

#[tokio::test]
async fn test_session_endpoints() {
    let (app, state, _) = create_test_app().await;
    let key = api_key(&state);

    let (status, body) = send(&app, get("/api/session")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].is_null());

    let request = Request::get("/api/session")
        .header(header::COOKIE, format!("session={key}"))
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, request).await;
    assert_eq!(body["user"]["username"], "octo");
    assert!(body["user"].get("accessToken").is_none());

    // A cookie that no longer verifies is cleared
    let request = Request::get("/api/session")
        .header(header::COOKIE, "session=stale")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));

    let (status, body) = send(&app, authed("GET", "/api/connect", &key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apiKey"], key.as_str());
    assert_eq!(body["origin"], "http://localhost:5173");
}

#[tokio::test]
async fn test_oauth_login_and_state_check() {
    let (app, _, _) = create_test_app().await;

    let response = app.clone().oneshot(get("/auth/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://github.com/login/oauth/authorize"));
    assert!(location.contains("client_id=client-id"));
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("github_oauth_state="));

    let request = Request::get("/auth/callback?code=abc&state=forged")
        .header(header::COOKIE, "github_oauth_state=expected")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid OAuth state");

    let response = app.clone().oneshot(get("/auth/logout")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn test_mcp_endpoints_reject_bad_requests() {
    let (app, _, _) = create_test_app().await;

    let (status, _) = send(&app, get("/api/mcp")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/mcp?apiKey=bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/mcp", None, json!({ "jsonrpc": "2.0", "method": "ping", "id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/mcp?sessionId=unknown",
            None,
            json!({ "jsonrpc": "2.0", "method": "ping", "id": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
}

#[tokio::test]
async fn test_local_store_syncs_through_live_server() {
    let (app, state, gists) = create_test_app().await;
    let key = api_key(&state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base_url = format!("http://{addr}");

    // First device: write locally, mirrored to the server
    let first = LocalStore::open(
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::new(1_000)),
    )
    .await;
    let report = first
        .connect(Arc::new(ApiClient::new(
            reqwest::Client::new(),
            base_url.clone(),
            key.clone(),
        )))
        .await
        .unwrap();
    assert!(!report.changed());

    let prompt = first
        .add_prompt("Draft a release note\nfor version 2", Some("Writing".to_string()), vec![], vec![])
        .await;
    first.flush().await;

    let synced = first.snapshot().prompt(&prompt.id).cloned().unwrap();
    let remote_id = synced.remote_id.expect("create should record the remote id");
    assert!(gists.snapshot(&remote_id).is_some());

    // Second device: the index arrives without bodies, hydrated on demand
    let second = LocalStore::open(
        Arc::new(MemoryStorage::new()),
        Arc::new(ManualClock::new(5_000)),
    )
    .await;
    let report = second
        .connect(Arc::new(ApiClient::new(reqwest::Client::new(), base_url, key)))
        .await
        .unwrap();
    assert_eq!(report.prompts_added, 1);

    let state = second.snapshot();
    let pulled = &state.prompts[0];
    assert_eq!(pulled.remote_id.as_deref(), Some(remote_id.as_str()));
    assert_eq!(pulled.category, "Writing");
    assert_eq!(pulled.title.as_deref(), Some("Draft a release note"));
    assert!(pulled.text.is_empty());

    let hydrated = second.hydrate_prompt(&pulled.id).await.unwrap();
    assert_eq!(hydrated.text, "Draft a release note\nfor version 2");
}
