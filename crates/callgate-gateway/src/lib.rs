// crates/callgate-gateway/src/lib.rs
// ============================================================================
// Module: Callgate Gateway
// Description: Transport bindings and session tracking for Callgate.
// Purpose: Expose the tool dispatcher over pipe, SSE, and streamable HTTP.
// Dependencies: callgate-core, callgate-config, axum, tokio
// ============================================================================

//! ## Overview
//! The gateway multiplexes one tool dispatcher across three transports with
//! identical call semantics: a newline-delimited pipe over stdin/stdout,
//! Server-Sent Events with a session-establishing GET leg, and bidirectional
//! streamable HTTP with header-carried sessions. Transport selection happens
//! once, from configuration, at process start.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
mod pipe;
mod rpc;
pub mod server;
pub mod session;
mod sse;
mod streamable;
pub mod telemetry;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::GatewayAuditEvent;
pub use audit::GatewayAuditEventParams;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::build_audit_sink;
pub use rpc::BODY_TOO_LARGE;
pub use rpc::INVALID_PARAMS;
pub use rpc::INVALID_REQUEST;
pub use rpc::METHOD_NOT_FOUND;
pub use rpc::PARSE_ERROR;
pub use rpc::SESSION_NOT_FOUND;
pub use server::GatewayServer;
pub use server::GatewayServerError;
pub use session::Session;
pub use session::SessionCleanup;
pub use session::SessionRegistry;
pub use session::StreamAttachError;
pub use session::StreamDetach;
pub use session::StreamFrame;
pub use session::StreamPushError;
pub use streamable::SESSION_ID_HEADER;
pub use telemetry::GatewayMetrics;
pub use telemetry::LATENCY_BUCKETS_MS;
pub use telemetry::MetricEvent;
pub use telemetry::NoopMetrics;
pub use telemetry::RpcMethod;
pub use telemetry::RpcOutcome;
