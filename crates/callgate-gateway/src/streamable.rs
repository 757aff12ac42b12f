// crates/callgate-gateway/src/streamable.rs
// ============================================================================
// Module: Streamable HTTP Transport
// Description: Bidirectional HTTP binding with header-carried sessions.
// Purpose: Serve request/response tool calls with explicit session lifecycle.
// Dependencies: axum, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! Streamable HTTP carries the session identifier in the `mcp-session-id`
//! header. A POST without the header mints a session and returns the id in
//! the response header; later POSTs resume it and receive their response in
//! the POST body. GET opens a subscribe-only event stream for the session
//! (one per session), and DELETE terminates the session idempotently: the
//! first call answers 200, every later one 404, and neither crashes the
//! handler. Bodies are buffered fully before parsing; a malformed body is a
//! protocol error with a stable negative code, never an HTTP-level fault.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use callgate_config::ServerTransport;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::rpc;
use crate::rpc::RequestScope;
use crate::rpc::handle_payload;
use crate::server::GatewayState;
use crate::session::STREAM_CHANNEL_CAPACITY;
use crate::session::StreamAttachError;
use crate::session::StreamDetach;
use crate::session::StreamFrame;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the session identifier on this transport.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles a POSTed request, minting a session when none is named.
pub(crate) async fn post(
    state: &Arc<GatewayState>,
    peer_ip: Option<IpAddr>,
    headers: &HeaderMap,
    bytes: &[u8],
) -> Response {
    let session_id = match session_header(headers) {
        Some(id) => {
            if state.registry.lookup(&id).is_none() {
                return session_not_found();
            }
            id
        }
        None => state.registry.create(ServerTransport::StreamableHttp).id,
    };
    let scope =
        RequestScope::http(ServerTransport::StreamableHttp, peer_ip, Some(session_id.clone()));
    let (status, response) = handle_payload(state, &scope, bytes);
    let mut reply = (status, axum::Json(response)).into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        reply.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    reply
}

/// Opens the subscribe-only event stream for an established session.
pub(crate) fn subscribe(state: &Arc<GatewayState>, headers: &HeaderMap) -> Response {
    let Some(session_id) = session_header(headers) else {
        return missing_session_header();
    };
    let (sender, receiver) = mpsc::channel::<StreamFrame>(STREAM_CHANNEL_CAPACITY);
    match state.registry.attach_stream(&session_id, sender) {
        Ok(()) => {}
        Err(StreamAttachError::NotFound) => return session_not_found(),
        Err(StreamAttachError::AlreadyAttached) => {
            return (StatusCode::CONFLICT, "session stream already attached").into_response();
        }
    }
    let detach = StreamDetach::new(Arc::clone(&state.registry), session_id);
    let stream = ReceiverStream::new(receiver).map(move |frame| {
        let _held = &detach;
        Ok::<Event, Infallible>(Event::default().event(frame.event).data(frame.data))
    });
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// Terminates a session; repeated termination reports not-found.
pub(crate) fn terminate(state: &Arc<GatewayState>, headers: &HeaderMap) -> Response {
    let Some(session_id) = session_header(headers) else {
        return missing_session_header();
    };
    if state.registry.remove(&session_id).is_some() {
        (StatusCode::OK, "session terminated").into_response()
    } else {
        (StatusCode::NOT_FOUND, "session not found").into_response()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts a non-empty session id from the request headers.
fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Protocol error for a request naming an unknown session.
fn session_not_found() -> Response {
    let body = rpc::error_response(Value::Null, rpc::SESSION_NOT_FOUND, "session not found");
    (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}

/// Protocol error for a request missing the session header.
fn missing_session_header() -> Response {
    let body = rpc::error_response(
        Value::Null,
        rpc::INVALID_REQUEST,
        format!("{SESSION_ID_HEADER} header required"),
    );
    (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
}
