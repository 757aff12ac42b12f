// crates/callgate-gateway/src/telemetry.rs
// ============================================================================
// Module: Gateway Telemetry
// Description: Metric events and sink traits for gateway request handling.
// Purpose: Let deployments plug in metrics without a hard dependency.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The gateway records one metric event per handled request and one latency
//! observation per completed dispatch. Backends implement [`GatewayMetrics`];
//! the default [`NoopMetrics`] discards everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suggested latency histogram buckets in milliseconds.
pub const LATENCY_BUCKETS_MS: [u64; 10] = [1, 2, 5, 10, 25, 50, 100, 250, 1_000, 5_000];

// ============================================================================
// SECTION: Types
// ============================================================================

/// JSON-RPC method classification for metrics and audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcMethod {
    /// `tools/list` request.
    ToolsList,
    /// `tools/call` request.
    ToolsCall,
    /// Any other or unparseable method.
    Unknown,
}

impl RpcMethod {
    /// Returns a stable label for this method classification.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::Unknown => "unknown",
        }
    }
}

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcOutcome {
    /// The request produced a result.
    Ok,
    /// The request produced a protocol or tool error.
    Error,
}

/// One recorded request event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricEvent {
    /// Method classification.
    pub method: RpcMethod,
    /// Outcome classification.
    pub outcome: RpcOutcome,
    /// JSON-RPC error code when the outcome is an error.
    pub error_code: Option<i64>,
    /// Serialized response size in bytes.
    pub response_bytes: usize,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for gateway request handling.
pub trait GatewayMetrics: Send + Sync {
    /// Records one handled request.
    fn record_request(&self, event: MetricEvent);

    /// Records the latency of one handled request.
    fn record_latency(&self, event: MetricEvent, latency: Duration);
}

/// Metrics sink that discards all events.
pub struct NoopMetrics;

impl GatewayMetrics for NoopMetrics {
    fn record_request(&self, _event: MetricEvent) {}

    fn record_latency(&self, _event: MetricEvent, _latency: Duration) {}
}
