//! HTTP transport: session ids and routing.

use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use quarry_core::{GuardrailsConfig, McpConfig};
use quarry_mcp::{HttpTransportState, SESSION_HEADER, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn router(ctx: TestContext) -> (axum::Router, Arc<HttpTransportState>, TestContext) {
    let state = Arc::new(HttpTransportState::new(Arc::new(ctx.server.clone())));
    (create_router(state.clone()), state, ctx)
}

fn post(body: Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn initialize(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(post(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get(SESSION_HEADER)
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string()
}

fn call(tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    })
}

#[tokio::test]
async fn health_endpoint() {
    let (app, _, _ctx) = router(TestContext::setup());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn requests_need_a_known_session() {
    let (app, _, _ctx) = router(TestContext::setup());

    let response = app
        .clone()
        .oneshot(post(call("list_databases", json!({})), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post(call("list_databases", json!({})), Some("not-a-session")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_keep_separate_databases() {
    let (app, state, _ctx) = router(TestContext::setup());
    let alice = initialize(&app).await;
    let bob = initialize(&app).await;
    assert_ne!(alice, bob);
    assert_eq!(state.sessions().len(), 2);

    let response = app
        .clone()
        .oneshot(post(call("use_database", json!({ "db": "crm" })), Some(&alice)))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["result"]["isError"], false);

    let response = app
        .clone()
        .oneshot(post(call("current_database", json!({})), Some(&alice)))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await["result"]["content"][0]["json"]["db"],
        "crm"
    );

    let response = app
        .clone()
        .oneshot(post(call("current_database", json!({})), Some(&bob)))
        .await
        .unwrap();
    assert_eq!(
        json_body(response).await["result"]["content"][0]["json"]["db"],
        Value::Null
    );
}

#[tokio::test]
async fn notifications_are_accepted_without_body() {
    let (app, _, _ctx) = router(TestContext::setup());
    let session = initialize(&app).await;
    let response = app
        .oneshot(post(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            Some(&session),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn delete_ends_session() {
    let (app, state, _ctx) = router(TestContext::setup());
    let session = initialize(&app).await;

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header(SESSION_HEADER, session.as_str())
            .body(Body::empty())
            .unwrap()
    };
    let response = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.sessions().is_empty());

    let response = app.oneshot(delete()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oldest_session_is_evicted_at_capacity() {
    let project = project(&[]);
    let server = mcp_server(
        Arc::new(MutableSource::new(shop_metadata())),
        Arc::new(RecordingExecutor::default()),
        project.path(),
        &GuardrailsConfig::default(),
        McpConfig {
            max_sessions: 1,
            ..McpConfig::default()
        },
    );
    let state = Arc::new(HttpTransportState::new(Arc::new(server)));
    let app = create_router(state.clone());

    let first = initialize(&app).await;
    let second = initialize(&app).await;
    assert_eq!(state.sessions().len(), 1);

    let response = app
        .clone()
        .oneshot(post(call("current_database", json!({})), Some(&first)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post(call("current_database", json!({})), Some(&second)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
