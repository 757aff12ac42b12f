// crates/callgate-gateway/src/server/tests.rs
// ============================================================================
// Module: Gateway Server Unit Tests
// Description: Unit tests for routing, CORS, and transport behavior.
// Purpose: Validate server module behavior with in-memory fixtures.
// Dependencies: callgate-gateway
// ============================================================================

//! ## Overview
//! Exercises the request router and both HTTP transport adapters with direct
//! handler calls: health check, CORS echo, protocol error mapping, SSE
//! session lifecycle, and streamable HTTP session lifecycle.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS;
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::header::ORIGIN;
use axum::response::Response;
use callgate_config::ServerConfig;
use callgate_core::Dispatcher;
use callgate_core::ExecutionResult;
use callgate_core::ExecutorError;
use callgate_core::InvocationContext;
use callgate_core::ParamKind;
use callgate_core::ParamSpec;
use callgate_core::ToolDefinition;
use callgate_core::ToolExecutor;
use serde_json::Value;
use serde_json::json;
use tokio_stream::StreamExt;

use super::ActiveTransport;
use super::GatewayState;
use super::RouterState;
use super::build_gateway_state;
use super::dispatch_endpoint;
use super::fallback_entry;
use super::health_entry;
use crate::audit::AuditSink;
use crate::audit::GatewayAuditEvent;
use crate::audit::NoopAuditSink;
use crate::rpc::RequestScope;
use crate::rpc::handle_payload;
use crate::sse::NO_ACTIVE_TRANSPORT;
use crate::streamable::SESSION_ID_HEADER;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::MetricEvent;
use crate::telemetry::NoopMetrics;
use crate::telemetry::RpcMethod;
use crate::telemetry::RpcOutcome;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Metrics sink recording every event for assertions.
#[derive(Default)]
pub(crate) struct TestMetrics {
    /// Recorded request events.
    pub(crate) events: Mutex<Vec<MetricEvent>>,
    /// Recorded latency observations.
    pub(crate) latencies: Mutex<Vec<(MetricEvent, Duration)>>,
}

impl GatewayMetrics for TestMetrics {
    fn record_request(&self, event: MetricEvent) {
        self.events.lock().expect("events lock").push(event);
    }

    fn record_latency(&self, event: MetricEvent, latency: Duration) {
        self.latencies.lock().expect("latencies lock").push((event, latency));
    }
}

/// Audit sink recording every event for assertions.
#[derive(Default)]
pub(crate) struct TestAudit {
    /// Recorded audit events.
    pub(crate) events: Mutex<Vec<GatewayAuditEvent>>,
}

impl AuditSink for TestAudit {
    fn record(&self, event: &GatewayAuditEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }
}

/// Executor backing the test tool set.
struct TestExecutor;

impl ToolExecutor for TestExecutor {
    fn execute(
        &self,
        name: &str,
        args: &BTreeMap<String, Value>,
        _context: &InvocationContext,
    ) -> Result<ExecutionResult, ExecutorError> {
        match name {
            "echo" => {
                let message = args.get("message").and_then(Value::as_str).unwrap_or_default();
                Ok(ExecutionResult::ok(Value::String(message.to_string())))
            }
            "boom" => panic!("boom tool detonated"),
            _ => Err(ExecutorError::Failed(format!("no handler for {name}"))),
        }
    }
}

fn test_dispatcher() -> Dispatcher {
    let echo = ToolDefinition::new("echo", "Echo a message").with_parameters(
        [("message".to_string(), ParamSpec::new(ParamKind::String).required())]
            .into_iter()
            .collect(),
    );
    let boom = ToolDefinition::new("boom", "Always panics");
    Dispatcher::new(vec![echo, boom], Arc::new(TestExecutor), InvocationContext::default())
}

/// Builds gateway state over the test tool set with no-op sinks.
pub(crate) fn sample_state() -> GatewayState {
    sample_state_with(Arc::new(NoopAuditSink), Arc::new(NoopMetrics))
}

/// Builds gateway state with explicit audit and metrics sinks.
pub(crate) fn sample_state_with(
    audit: Arc<dyn AuditSink>,
    metrics: Arc<dyn GatewayMetrics>,
) -> GatewayState {
    build_gateway_state(test_dispatcher(), &ServerConfig::default(), audit, metrics)
}

fn router_state(active: ActiveTransport) -> RouterState {
    RouterState {
        gateway: Arc::new(sample_state()),
        active,
    }
}

fn call_payload(name: &str, arguments: Value) -> Bytes {
    Bytes::from(
        serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
        }))
        .expect("payload bytes"),
    )
}

async fn body_text(response: Response) -> String {
    let mut stream = response.into_body().into_data_stream();
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        collected.extend_from_slice(&chunk.expect("body chunk"));
    }
    String::from_utf8_lossy(&collected).into_owned()
}

async fn dispatch(
    state: &RouterState,
    method: Method,
    uri: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let uri: Uri = uri.parse().expect("uri");
    dispatch_endpoint(state, None, &method, &uri, &headers, &body).await
}

// ============================================================================
// SECTION: Health and CORS
// ============================================================================

#[tokio::test]
async fn ping_answers_pong_unconditionally() {
    let response = health_entry(Method::GET, HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "pong");
}

#[tokio::test]
async fn preflight_echoes_origin_verbatim() {
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static("http://localhost:5173"));
    let response = health_entry(Method::OPTIONS, headers).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let allow_origin = response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).expect("allow origin");
    assert_eq!(allow_origin, "http://localhost:5173");
    assert_ne!(allow_origin, "*");
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_CREDENTIALS).expect("credentials"),
        "true"
    );
}

#[tokio::test]
async fn preflight_without_origin_emits_no_allow_origin() {
    let response = health_entry(Method::OPTIONS, HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn unmatched_path_is_generic_not_found() {
    let response = fallback_entry(Method::GET, HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn endpoint_responses_carry_cors_echo() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static("http://127.0.0.1:3000"));
    let response =
        dispatch(&state, Method::POST, "/mcp", headers, call_payload("echo", json!({"message": "x"})))
            .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).expect("allow origin"),
        "http://127.0.0.1:3000"
    );
}

#[tokio::test]
async fn unsupported_method_on_endpoint_is_not_found() {
    let state = router_state(ActiveTransport::Sse);
    let response =
        dispatch(&state, Method::DELETE, "/mcp", HeaderMap::new(), Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// SECTION: Protocol Error Mapping
// ============================================================================

#[tokio::test]
async fn oversized_payload_maps_to_body_too_large() {
    let state = sample_state();
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let oversized = vec![b'x'; state.max_body_bytes + 1];
    let (status, response) = handle_payload(&state, &scope, &oversized);
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.error.expect("error").code, -32_070);
}

#[tokio::test]
async fn unparseable_payload_maps_to_parse_error() {
    let state = sample_state();
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let (status, response) = handle_payload(&state, &scope, b"not json at all");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.expect("error").code, -32_700);
}

#[tokio::test]
async fn wrong_version_maps_to_invalid_request() {
    let state = sample_state();
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let payload = serde_json::to_vec(&json!({
        "jsonrpc": "1.0",
        "id": 1,
        "method": "tools/list",
    }))
    .expect("payload bytes");
    let (status, response) = handle_payload(&state, &scope, &payload);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.expect("error").code, -32_600);
}

#[tokio::test]
async fn unknown_method_maps_to_method_not_found() {
    let state = sample_state();
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let payload = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "resources/list",
    }))
    .expect("payload bytes");
    let (status, response) = handle_payload(&state, &scope, &payload);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error.expect("error").code, -32_601);
}

#[tokio::test]
async fn tools_list_reports_input_schemas() {
    let state = sample_state();
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let payload = serde_json::to_vec(&json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/list",
    }))
    .expect("payload bytes");
    let (status, response) = handle_payload(&state, &scope, &payload);
    assert_eq!(status, StatusCode::OK);
    let result = response.result.expect("result");
    let tools = result.get("tools").and_then(Value::as_array).expect("tools array");
    assert_eq!(tools.len(), 2);
    let echo = tools.iter().find(|tool| tool["name"] == json!("echo")).expect("echo tool");
    assert_eq!(echo["inputSchema"]["required"], json!(["message"]));
}

#[tokio::test]
async fn tool_panic_stays_inside_the_envelope() {
    let state = sample_state();
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let payload = call_payload("boom", json!({}));
    let (status, response) = handle_payload(&state, &scope, &payload);
    assert_eq!(status, StatusCode::OK);
    let result = response.result.expect("result");
    assert_eq!(result["isError"], json!(true));
    assert!(result["content"][0]["text"].as_str().expect("text").contains("detonated"));
}

#[tokio::test]
async fn metrics_and_audit_recorded_for_tools_call() {
    let metrics = Arc::new(TestMetrics::default());
    let audit = Arc::new(TestAudit::default());
    let state = sample_state_with(audit.clone(), metrics.clone());
    let scope = RequestScope::http(callgate_config::ServerTransport::StreamableHttp, None, None);
    let payload = call_payload("echo", json!({"message": "hi"}));
    let (status, _) = handle_payload(&state, &scope, &payload);
    assert_eq!(status, StatusCode::OK);

    let events = metrics.events.lock().expect("events lock");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].method, RpcMethod::ToolsCall);
    assert_eq!(events[0].outcome, RpcOutcome::Ok);
    assert!(events[0].response_bytes > 0);
    drop(events);

    let latencies = metrics.latencies.lock().expect("latencies lock");
    assert_eq!(latencies.len(), 1);
    drop(latencies);

    let audited = audit.events.lock().expect("audit lock");
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].tool.as_deref(), Some("echo"));
    assert_eq!(audited[0].outcome, RpcOutcome::Ok);
    drop(audited);
}

// ============================================================================
// SECTION: SSE Transport
// ============================================================================

/// Extracts the minted session id from the initial endpoint frame.
fn session_id_from_endpoint_frame(frame: &str) -> String {
    let start = frame.find("sessionId=").expect("sessionId in frame") + "sessionId=".len();
    frame[start ..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect()
}

#[tokio::test]
async fn sse_get_establishes_session_and_sends_endpoint_frame() {
    let state = router_state(ActiveTransport::Sse);
    let response = dispatch(&state, Method::GET, "/mcp", HeaderMap::new(), Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.gateway.registry.len(), 1);

    let mut stream = response.into_body().into_data_stream();
    let first = stream.next().await.expect("endpoint frame").expect("bytes");
    let text = String::from_utf8_lossy(&first).into_owned();
    assert!(text.contains("event: endpoint"));
    let session_id = session_id_from_endpoint_frame(&text);
    assert_eq!(session_id.len(), 32);
    assert!(state.gateway.registry.lookup(&session_id).is_some());

    // Dropping the stream tears the session down exactly once.
    drop(stream);
    assert!(state.gateway.registry.is_empty());
}

#[tokio::test]
async fn sse_post_with_unknown_session_is_rejected() {
    let state = router_state(ActiveTransport::Sse);
    let response = dispatch(
        &state,
        Method::POST,
        "/mcp?sessionId=deadbeefdeadbeefdeadbeefdeadbeef",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "hi"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, NO_ACTIVE_TRANSPORT);
}

#[tokio::test]
async fn sse_post_without_session_parameter_is_rejected() {
    let state = router_state(ActiveTransport::Sse);
    let response = dispatch(
        &state,
        Method::POST,
        "/mcp",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "hi"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("sessionId"));
}

#[tokio::test]
async fn sse_post_frames_response_onto_stream() {
    let state = router_state(ActiveTransport::Sse);
    let establish = dispatch(&state, Method::GET, "/mcp", HeaderMap::new(), Bytes::new()).await;
    let mut stream = establish.into_body().into_data_stream();
    let first = stream.next().await.expect("endpoint frame").expect("bytes");
    let session_id = session_id_from_endpoint_frame(&String::from_utf8_lossy(&first));

    let uri = format!("/mcp?sessionId={session_id}");
    let post = dispatch(
        &state,
        Method::POST,
        &uri,
        HeaderMap::new(),
        call_payload("echo", json!({"message": "hi"})),
    )
    .await;
    assert_eq!(post.status(), StatusCode::ACCEPTED);
    assert_eq!(body_text(post).await, "Accepted");

    let frame = stream.next().await.expect("message frame").expect("bytes");
    let text = String::from_utf8_lossy(&frame).into_owned();
    assert!(text.contains("event: message"));
    assert!(text.contains("\\\"isError\\\":false") || text.contains("\"isError\":false"));
    assert!(text.contains("hi"));
}

#[tokio::test]
async fn sse_post_never_creates_a_session() {
    let state = router_state(ActiveTransport::Sse);
    let response = dispatch(
        &state,
        Method::POST,
        "/mcp?sessionId=00000000000000000000000000000000",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "hi"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(state.gateway.registry.is_empty());
}

// ============================================================================
// SECTION: Streamable HTTP Transport
// ============================================================================

#[tokio::test]
async fn streamable_post_without_header_mints_session() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let response = dispatch(
        &state,
        Method::POST,
        "/mcp",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "hello"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let minted = response
        .headers()
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .expect("session header")
        .to_string();
    assert_eq!(minted.len(), 32);
    assert!(state.gateway.registry.lookup(&minted).is_some());
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(body["result"]["isError"], json!(false));
    assert_eq!(body["result"]["content"][0]["text"], json!("hello"));
}

#[tokio::test]
async fn streamable_post_resumes_with_header() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let first = dispatch(
        &state,
        Method::POST,
        "/mcp",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "one"})),
    )
    .await;
    let minted = first.headers().get(SESSION_ID_HEADER).expect("session header").clone();

    let mut headers = HeaderMap::new();
    headers.insert(SESSION_ID_HEADER, minted.clone());
    let second = dispatch(
        &state,
        Method::POST,
        "/mcp",
        headers,
        call_payload("echo", json!({"message": "two"})),
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get(SESSION_ID_HEADER), Some(&minted));
    assert_eq!(state.gateway.registry.len(), 1);
}

#[tokio::test]
async fn streamable_post_with_unknown_header_is_not_found() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let mut headers = HeaderMap::new();
    headers.insert(SESSION_ID_HEADER, HeaderValue::from_static("feedfacefeedfacefeedfacefeedface"));
    let response = dispatch(
        &state,
        Method::POST,
        "/mcp",
        headers,
        call_payload("echo", json!({"message": "x"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(body["error"]["code"], json!(-32_001));
    assert!(state.gateway.registry.is_empty());
}

#[tokio::test]
async fn streamable_parse_failure_reports_stable_code() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let response = dispatch(
        &state,
        Method::POST,
        "/mcp",
        HeaderMap::new(),
        Bytes::from_static(b"{ definitely not json"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).expect("json body");
    assert_eq!(body["error"]["code"], json!(-32_700));
}

#[tokio::test]
async fn streamable_delete_is_idempotent() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let minted = dispatch(
        &state,
        Method::POST,
        "/mcp",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "x"})),
    )
    .await
    .headers()
    .get(SESSION_ID_HEADER)
    .expect("session header")
    .clone();

    let mut headers = HeaderMap::new();
    headers.insert(SESSION_ID_HEADER, minted.clone());
    let first = dispatch(&state, Method::DELETE, "/mcp", headers.clone(), Bytes::new()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let id = minted.to_str().expect("header text");
    assert!(state.gateway.registry.lookup(id).is_none());

    let second = dispatch(&state, Method::DELETE, "/mcp", headers, Bytes::new()).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(second).await, "session not found");
}

#[tokio::test]
async fn streamable_delete_without_header_is_bad_request() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let response = dispatch(&state, Method::DELETE, "/mcp", HeaderMap::new(), Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn streamable_subscribe_allows_one_stream_per_session() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let minted = dispatch(
        &state,
        Method::POST,
        "/mcp",
        HeaderMap::new(),
        call_payload("echo", json!({"message": "x"})),
    )
    .await
    .headers()
    .get(SESSION_ID_HEADER)
    .expect("session header")
    .clone();

    let mut headers = HeaderMap::new();
    headers.insert(SESSION_ID_HEADER, minted);
    let first = dispatch(&state, Method::GET, "/mcp", headers.clone(), Bytes::new()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let second = dispatch(&state, Method::GET, "/mcp", headers.clone(), Bytes::new()).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    // Closing the first stream frees the slot while the session stays live.
    drop(first);
    let third = dispatch(&state, Method::GET, "/mcp", headers, Bytes::new()).await;
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(state.gateway.registry.len(), 1);
}

#[tokio::test]
async fn streamable_subscribe_unknown_session_is_not_found() {
    let state = router_state(ActiveTransport::StreamableHttp);
    let mut headers = HeaderMap::new();
    headers.insert(SESSION_ID_HEADER, HeaderValue::from_static("feedfacefeedfacefeedfacefeedface"));
    let response = dispatch(&state, Method::GET, "/mcp", headers, Bytes::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
