// crates/callgate-gateway/src/audit.rs
// ============================================================================
// Module: Gateway Audit Logging
// Description: Structured audit events for gateway request handling.
// Purpose: Emit request audit logs without hard dependencies.
// Dependencies: callgate-config, serde
// ============================================================================

//! ## Overview
//! This module defines the audit event payload and sinks for gateway request
//! logging. It is intentionally lightweight so deployments can route events
//! to their preferred logging pipeline without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use callgate_config::AuditConfig;
use callgate_config::AuditMode;
use callgate_config::ServerTransport;
use serde::Serialize;

use crate::telemetry::RpcMethod;
use crate::telemetry::RpcOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gateway audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Transport that carried the request.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Session identifier when the transport is stateful.
    pub session_id: Option<String>,
    /// JSON-RPC method classification.
    pub method: RpcMethod,
    /// Tool name when available (tools/call).
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: RpcOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Constructor parameters for [`GatewayAuditEvent`].
#[derive(Debug, Clone)]
pub struct GatewayAuditEventParams {
    /// Transport that carried the request.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Session identifier when the transport is stateful.
    pub session_id: Option<String>,
    /// JSON-RPC method classification.
    pub method: RpcMethod,
    /// Tool name when available.
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: RpcOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

impl GatewayAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: GatewayAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "gateway_request",
            timestamp_ms,
            transport: params.transport,
            peer_ip: params.peer_ip,
            session_id: params.session_id,
            method: params.method,
            tool: params.tool,
            outcome: params.outcome,
            error_code: params.error_code,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gateway request events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &GatewayAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &GatewayAuditEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when a file sink cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    match config.mode {
        AuditMode::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditMode::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "file audit mode requires path")
            })?;
            Ok(Arc::new(FileAuditSink::new(path)?))
        }
        AuditMode::Off => Ok(Arc::new(NoopAuditSink)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
