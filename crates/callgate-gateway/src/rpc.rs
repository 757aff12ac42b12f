// crates/callgate-gateway/src/rpc.rs
// ============================================================================
// Module: JSON-RPC Request Handling
// Description: Shared JSON-RPC 2.0 parsing and dispatch for all transports.
// Purpose: Guarantee identical request semantics on pipe, SSE, and HTTP.
// Dependencies: callgate-core, axum, serde
// ============================================================================

//! ## Overview
//! Every transport hands its buffered payload to [`handle_payload`], which
//! enforces the body limit, parses the JSON-RPC envelope, routes the method,
//! and emits one audit and metric event per request. Tool-level failures are
//! JSON-RPC *results* carrying an error envelope; only protocol-level faults
//! become JSON-RPC errors with an HTTP status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::time::Instant;

use axum::http::StatusCode;
use callgate_config::ServerTransport;
use callgate_core::Dispatcher;
use callgate_core::ResponseEnvelope;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::audit::GatewayAuditEvent;
use crate::audit::GatewayAuditEventParams;
use crate::server::GatewayState;
use crate::telemetry::MetricEvent;
use crate::telemetry::RpcMethod;
use crate::telemetry::RpcOutcome;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// JSON-RPC parse error.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC invalid request.
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC invalid params.
pub const INVALID_PARAMS: i64 = -32602;
/// Request body exceeded the configured limit.
pub const BODY_TOO_LARGE: i64 = -32070;
/// Unknown or expired session referenced by the request.
pub const SESSION_NOT_FOUND: i64 = -32001;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool summaries.
    tools: Vec<ToolSummary>,
}

/// One tool entry in a `tools/list` response.
#[derive(Debug, Serialize)]
struct ToolSummary {
    /// Tool name.
    name: String,
    /// Tool description.
    description: String,
    /// JSON-Schema-shaped input description.
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

// ============================================================================
// SECTION: Request Scope
// ============================================================================

/// Per-request transport context carried into audit events.
#[derive(Debug, Clone)]
pub struct RequestScope {
    /// Transport that carried the request.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Session identifier when the transport is stateful.
    pub session_id: Option<String>,
}

impl RequestScope {
    /// Scope for the singleton pipe session.
    #[must_use]
    pub const fn pipe(session_id: String) -> Self {
        Self {
            transport: ServerTransport::Pipe,
            peer_ip: None,
            session_id: Some(session_id),
        }
    }

    /// Scope for an HTTP-carried request.
    #[must_use]
    pub const fn http(
        transport: ServerTransport,
        peer_ip: Option<IpAddr>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            transport,
            peer_ip,
            session_id,
        }
    }
}

// ============================================================================
// SECTION: Response Builders
// ============================================================================

/// Builds a successful JSON-RPC response.
pub(crate) const fn result_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds a JSON-RPC error response.
pub(crate) fn error_response(id: Value, code: i64, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.into(),
        }),
    }
}

// ============================================================================
// SECTION: Payload Handling
// ============================================================================

/// Handles one buffered request payload end to end.
///
/// Applies the body limit, parses the JSON-RPC envelope, dispatches the
/// method, and records audit and metric events. Never fails: every fault is
/// reflected in the returned status/response pair.
pub(crate) fn handle_payload(
    state: &GatewayState,
    scope: &RequestScope,
    bytes: &[u8],
) -> (StatusCode, JsonRpcResponse) {
    let started = Instant::now();
    let (status, response, method, tool) = route_payload(state, bytes);
    record_request(state, scope, method, tool, bytes.len(), &response, started);
    (status, response)
}

/// Routes one payload to the matching method handler.
fn route_payload(
    state: &GatewayState,
    bytes: &[u8],
) -> (StatusCode, JsonRpcResponse, RpcMethod, Option<String>) {
    if bytes.len() > state.max_body_bytes {
        let response =
            error_response(Value::Null, BODY_TOO_LARGE, "request body too large");
        return (StatusCode::PAYLOAD_TOO_LARGE, response, RpcMethod::Unknown, None);
    }
    let request: JsonRpcRequest = match serde_json::from_slice(bytes) {
        Ok(request) => request,
        Err(_) => {
            let response = error_response(Value::Null, PARSE_ERROR, "invalid json-rpc payload");
            return (StatusCode::BAD_REQUEST, response, RpcMethod::Unknown, None);
        }
    };
    if request.jsonrpc != "2.0" {
        let response =
            error_response(request.id, INVALID_REQUEST, "invalid json-rpc version");
        return (StatusCode::BAD_REQUEST, response, RpcMethod::Unknown, None);
    }
    match request.method.as_str() {
        "tools/list" => {
            let (status, response) = handle_tools_list(state, request.id);
            (status, response, RpcMethod::ToolsList, None)
        }
        "tools/call" => {
            let (status, response, tool) = handle_tools_call(state, request.id, request.params);
            (status, response, RpcMethod::ToolsCall, tool)
        }
        _ => {
            let response = error_response(request.id, METHOD_NOT_FOUND, "method not found");
            (StatusCode::BAD_REQUEST, response, RpcMethod::Unknown, None)
        }
    }
}

/// Handles a `tools/list` request.
fn handle_tools_list(state: &GatewayState, id: Value) -> (StatusCode, JsonRpcResponse) {
    let tools = state
        .dispatcher
        .definitions()
        .into_iter()
        .map(|definition| ToolSummary {
            input_schema: definition.input_schema(),
            name: definition.name,
            description: definition.description,
        })
        .collect();
    match serde_json::to_value(ToolListResult {
        tools,
    }) {
        Ok(value) => (StatusCode::OK, result_response(id, value)),
        Err(_) => (
            StatusCode::OK,
            error_response(id, INVALID_REQUEST, "tool list serialization failed"),
        ),
    }
}

/// Handles a `tools/call` request.
fn handle_tools_call(
    state: &GatewayState,
    id: Value,
    params: Option<Value>,
) -> (StatusCode, JsonRpcResponse, Option<String>) {
    let params = params.unwrap_or(Value::Null);
    let call: ToolCallParams = match serde_json::from_value(params) {
        Ok(call) => call,
        Err(_) => {
            let response = error_response(id, INVALID_PARAMS, "invalid tool params");
            return (StatusCode::BAD_REQUEST, response, None);
        }
    };
    let envelope = call_tool_with_blocking(&state.dispatcher, &call.name, &call.arguments);
    let response = match serde_json::to_value(&envelope) {
        Ok(value) => result_response(id, value),
        Err(_) => error_response(id, INVALID_REQUEST, "envelope serialization failed"),
    };
    (StatusCode::OK, response, Some(call.name))
}

/// Executes a tool call, shifting to a blocking context when available.
///
/// Executors may perform I/O; on a multithread runtime the call moves onto a
/// blocking-capable thread so it cannot starve the reactor.
fn call_tool_with_blocking(dispatcher: &Dispatcher, name: &str, args: &Value) -> ResponseEnvelope {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| dispatcher.handle(name, args))
        }
        _ => dispatcher.handle(name, args),
    }
}

/// Records audit and metric events for one handled request.
fn record_request(
    state: &GatewayState,
    scope: &RequestScope,
    method: RpcMethod,
    tool: Option<String>,
    request_bytes: usize,
    response: &JsonRpcResponse,
    started: Instant,
) {
    let response_bytes = serde_json::to_vec(response).map_or(0, |payload| payload.len());
    let (outcome, error_code) = response
        .error
        .as_ref()
        .map_or((RpcOutcome::Ok, None), |error| (RpcOutcome::Error, Some(error.code)));
    let event = MetricEvent {
        method,
        outcome,
        error_code,
        response_bytes,
    };
    state.metrics.record_request(event);
    state.metrics.record_latency(event, started.elapsed());
    state.audit.record(&GatewayAuditEvent::new(GatewayAuditEventParams {
        transport: scope.transport,
        peer_ip: scope.peer_ip.map(|ip| ip.to_string()),
        session_id: scope.session_id.clone(),
        method,
        tool,
        outcome,
        error_code,
        request_bytes,
        response_bytes,
    }));
}
