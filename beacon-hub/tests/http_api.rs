//! Black-box HTTP tests driven with `tower::ServiceExt::oneshot`, the same
//! in-process request style the teacher uses for its MCP server
//! (`tests/common/mcp_process.rs`), adapted from a stdio JSON-RPC process
//! to an in-memory `axum::Router`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use beacon_core::AgentRegistry;
use beacon_core::Session;
use beacon_hub::Dispatcher;
use beacon_hub::http;
use beacon_protocol::Action;
use beacon_protocol::CommandResponse;
use beacon_protocol::ExecuteCommandRequest;
use beacon_protocol::RpcEnvelope;
use beacon_protocol::decode_payload;
use beacon_protocol::encode_payload;
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Attaches a fake agent session to `registry` and spawns a responder task
/// that answers the first `ExecuteCommand` request with a canned success
/// response, mirroring what a real agent's executor would return for
/// `/bin/echo hi`.
async fn attach_fake_agent(registry: &Arc<AgentRegistry>, agent_id: &str) {
    let (tx, mut rx) = mpsc::channel(8);
    let session = Session::new(tx);
    registry.attach(agent_id.to_string(), session.clone()).await;

    tokio::spawn(async move {
        let Some(inbound) = rx.recv().await else {
            return;
        };
        let response = CommandResponse {
            exit_code: 0,
            stdout: "hi\n".to_string(),
            stderr: String::new(),
            error: String::new(),
            duration_ms: 4,
        };
        let reply = RpcEnvelope::response(
            inbound.id,
            Action::ExecuteCommand,
            encode_payload(&response).unwrap(),
            None,
        );
        session.dispatch_inbound(reply).await;
    });
}

fn test_router(registry: Arc<AgentRegistry>) -> axum::Router {
    let dispatcher = Arc::new(Dispatcher::new(registry, std::time::Duration::from_secs(2)));
    http::router(dispatcher)
}

#[tokio::test]
async fn happy_echo_returns_200_with_the_command_result() {
    let registry = Arc::new(AgentRegistry::new());
    attach_fake_agent(&registry, "host-1").await;
    let app = test_router(registry);

    let body = r#"{"command":"/bin/echo","args":["hi"],"timeout":5}"#;
    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/host-1/commands/execute")
        .header("authorization", "Bearer caller-token")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["exitCode"], 0);
    assert_eq!(json["stdout"], "hi\n");
}

#[tokio::test]
async fn missing_bearer_token_is_unauthenticated() {
    let registry = Arc::new(AgentRegistry::new());
    let app = test_router(registry);

    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/host-1/commands/execute")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"command":"/bin/echo"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_agent_is_404() {
    let registry = Arc::new(AgentRegistry::new());
    let app = test_router(registry);

    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/ghost/commands/execute")
        .header("authorization", "Bearer caller-token")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"command":"/bin/echo"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn offline_agent_is_503_per_spec_scenario_six() {
    let registry = Arc::new(AgentRegistry::new());
    let (tx, _rx) = mpsc::channel(1);
    let session = Session::new(tx);
    registry.attach("host-1".to_string(), session).await;
    registry.detach("host-1").await;
    let app = test_router(registry);

    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/host-1/commands/execute")
        .header("authorization", "Bearer caller-token")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"command":"/bin/echo"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "agent is offline");
}

#[tokio::test]
async fn empty_command_is_400() {
    let registry = Arc::new(AgentRegistry::new());
    attach_fake_agent(&registry, "host-1").await;
    let app = test_router(registry);

    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/host-1/commands/execute")
        .header("authorization", "Bearer caller-token")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"command":""}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_body_is_400() {
    let registry = Arc::new(AgentRegistry::new());
    attach_fake_agent(&registry, "host-1").await;
    let app = test_router(registry);

    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/host-1/commands/execute")
        .header("authorization", "Bearer caller-token")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn the_bearer_token_is_plumbed_through_as_the_executors_client_key() {
    let registry = Arc::new(AgentRegistry::new());
    let (tx, mut rx) = mpsc::channel(8);
    let session = Session::new(tx);
    registry.attach("host-1".to_string(), session.clone()).await;

    let responder = tokio::spawn(async move {
        let inbound = rx.recv().await.unwrap();
        let decoded: ExecuteCommandRequest = decode_payload(&inbound.payload).unwrap();
        let response = CommandResponse {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            error: String::new(),
            duration_ms: 0,
        };
        let reply = RpcEnvelope::response(
            inbound.id,
            Action::ExecuteCommand,
            encode_payload(&response).unwrap(),
            None,
        );
        session.dispatch_inbound(reply).await;
        decoded.client_key
    });

    let app = test_router(registry);
    let request = Request::builder()
        .method("POST")
        .uri("/api/default/agents/host-1/commands/execute")
        .header("authorization", "Bearer the-caller-identity")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"command":"/bin/true"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let client_key = responder.await.unwrap();
    assert_eq!(client_key, "the-caller-identity");
}

#[tokio::test]
async fn history_route_returns_entries_oldest_to_newest() {
    use beacon_protocol::HistoryEntry;
    use beacon_protocol::HistoryResponse;

    let registry = Arc::new(AgentRegistry::new());
    let (tx, mut rx) = mpsc::channel(8);
    let session = Session::new(tx);
    registry.attach("host-1".to_string(), session.clone()).await;

    tokio::spawn(async move {
        let inbound = rx.recv().await.unwrap();
        let history = HistoryResponse {
            history: vec![
                HistoryEntry {
                    command: "/bin/echo".to_string(),
                    args: vec!["a".to_string()],
                    started_at_unix_ms: 1,
                    duration_ms: 1,
                    exit_code: 0,
                    workdir: None,
                },
                HistoryEntry {
                    command: "/bin/echo".to_string(),
                    args: vec!["b".to_string()],
                    started_at_unix_ms: 2,
                    duration_ms: 1,
                    exit_code: 0,
                    workdir: None,
                },
            ],
        };
        let reply = RpcEnvelope::response(
            inbound.id,
            Action::GetCommandHistory,
            encode_payload(&history).unwrap(),
            None,
        );
        session.dispatch_inbound(reply).await;
    });

    let app = test_router(registry);
    let request = Request::builder()
        .method("GET")
        .uri("/api/default/agents/host-1/commands/history?limit=5")
        .header("authorization", "Bearer caller-token")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["history"][0]["args"][0], "a");
    assert_eq!(json["history"][1]["args"][0], "b");
}
