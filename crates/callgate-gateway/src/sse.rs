// crates/callgate-gateway/src/sse.rs
// ============================================================================
// Module: SSE Transport
// Description: Server-Sent Events binding with a session-establishing GET leg.
// Purpose: Stream responses to long-lived clients that POST requests separately.
// Dependencies: axum, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! SSE splits one logical connection across two HTTP legs. A long-lived GET
//! allocates the session and keeps the event stream open; each POST carries
//! one request and must name its session through the `sessionId` query
//! parameter. A POST never creates a session. Responses are framed onto the
//! session's stream as `message` events; the POST itself only acknowledges
//! acceptance. Session teardown rides a drop guard owned by the stream, so
//! client close, stream error, and request error all funnel into one
//! idempotent removal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use callgate_config::ServerTransport;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::rpc::RequestScope;
use crate::rpc::handle_payload;
use crate::server::GatewayState;
use crate::session::STREAM_CHANNEL_CAPACITY;
use crate::session::SessionCleanup;
use crate::session::StreamFrame;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Body returned when a POST names a session that is not live.
pub(crate) const NO_ACTIVE_TRANSPORT: &str = "No active transport";

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Establishes a session and returns the long-lived event stream.
pub(crate) fn establish(state: &Arc<GatewayState>) -> Response {
    let (sender, receiver) = mpsc::channel::<StreamFrame>(STREAM_CHANNEL_CAPACITY);
    let session = state.registry.create_with_stream(ServerTransport::Sse, sender.clone());
    let endpoint_frame = StreamFrame {
        event: "endpoint",
        data: format!("{}?sessionId={}", state.endpoint, session.id),
    };
    // Capacity is fresh, so the connection-established frame cannot be refused.
    let _ = sender.try_send(endpoint_frame);
    let cleanup = SessionCleanup::new(Arc::clone(&state.registry), session.id);
    let stream = ReceiverStream::new(receiver).map(move |frame| {
        let _held = &cleanup;
        Ok::<Event, Infallible>(Event::default().event(frame.event).data(frame.data))
    });
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// Handles one POSTed request for an established session.
pub(crate) async fn post(
    state: &Arc<GatewayState>,
    peer_ip: Option<IpAddr>,
    session_id: Option<String>,
    bytes: &[u8],
) -> Response {
    let Some(session_id) = session_id else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId query parameter").into_response();
    };
    let Some(session) = state.registry.lookup(&session_id) else {
        return (StatusCode::BAD_REQUEST, NO_ACTIVE_TRANSPORT).into_response();
    };
    let scope = RequestScope::http(ServerTransport::Sse, peer_ip, Some(session_id.clone()));
    let (status, response) = handle_payload(state, &scope, bytes);
    if !status.is_success() {
        // Protocol-level faults answer on the POST leg with their status.
        return (status, axum::Json(response)).into_response();
    }
    let Ok(payload) = serde_json::to_string(&response) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "response serialization failed")
            .into_response();
    };
    let frame = StreamFrame {
        event: "message",
        data: payload,
    };
    if session.push(frame).await.is_err() {
        // The stream side is gone; evict the session so later POSTs fail fast.
        let _ = state.registry.remove(&session_id);
        return (StatusCode::BAD_REQUEST, NO_ACTIVE_TRANSPORT).into_response();
    }
    (StatusCode::ACCEPTED, "Accepted").into_response()
}
