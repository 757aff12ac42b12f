// crates/callgate-gateway/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: Request router and serve loops for all gateway transports.
// Purpose: Expose the tool dispatcher over pipe, SSE, and streamable HTTP.
// Dependencies: callgate-core, callgate-config, axum, tokio
// ============================================================================

//! ## Overview
//! One gateway process serves exactly one transport, selected from
//! configuration at startup. The HTTP-based transports share a single
//! listener and router; the router applies uniform CORS and health-check
//! behavior before any transport-specific logic runs. The origin header is
//! echoed verbatim into the CORS allow-origin header, never a wildcard,
//! because credentialed requests are allowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS;
use axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS;
use axum::http::header::ACCESS_CONTROL_ALLOW_METHODS;
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::header::ACCESS_CONTROL_EXPOSE_HEADERS;
use axum::http::header::ACCESS_CONTROL_MAX_AGE;
use axum::http::header::ACCESS_CONTROL_REQUEST_HEADERS;
use axum::http::header::ORIGIN;
use axum::http::header::VARY;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use bytes::Bytes;
use callgate_config::GatewayConfig;
use callgate_config::HEALTH_PATH;
use callgate_config::ServerConfig;
use callgate_config::ServerTransport;
use callgate_core::Dispatcher;
use callgate_core::InvocationContext;
use callgate_core::ToolCatalog;
use callgate_core::ToolExecutor;

use crate::audit::AuditSink;
use crate::audit::build_audit_sink;
use crate::pipe;
use crate::session::SessionRegistry;
use crate::sse;
use crate::streamable;
use crate::streamable::SESSION_ID_HEADER;
use crate::telemetry::GatewayMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Gateway State
// ============================================================================

/// Shared state behind every transport of one gateway instance.
pub struct GatewayState {
    /// Dispatcher holding the compiled catalog snapshot.
    pub(crate) dispatcher: Dispatcher,
    /// Registry owning all live sessions.
    pub(crate) registry: Arc<SessionRegistry>,
    /// Endpoint path served by the HTTP transports.
    pub(crate) endpoint: String,
    /// Maximum request body size in bytes.
    pub(crate) max_body_bytes: usize,
    /// Audit sink for request events.
    pub(crate) audit: Arc<dyn AuditSink>,
    /// Metrics sink for request events.
    pub(crate) metrics: Arc<dyn GatewayMetrics>,
}

/// Builds gateway state from its parts.
pub(crate) fn build_gateway_state(
    dispatcher: Dispatcher,
    server: &ServerConfig,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<dyn GatewayMetrics>,
) -> GatewayState {
    GatewayState {
        dispatcher,
        registry: Arc::new(SessionRegistry::new()),
        endpoint: server.endpoint.clone(),
        max_body_bytes: server.max_body_bytes,
        audit,
        metrics,
    }
}

// ============================================================================
// SECTION: Gateway Server
// ============================================================================

/// Gateway server instance.
pub struct GatewayServer {
    /// Server configuration.
    config: GatewayConfig,
    /// Shared per-instance state.
    state: Arc<GatewayState>,
}

impl GatewayServer {
    /// Builds a gateway from configuration and its external collaborators.
    ///
    /// Snapshots the catalog once for the configured context tag; tools added
    /// to the catalog later are not picked up by a running gateway.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when configuration is invalid or the
    /// audit sink cannot be initialized.
    pub fn from_config(
        config: GatewayConfig,
        catalog: &dyn ToolCatalog,
        executor: Arc<dyn ToolExecutor>,
        context: InvocationContext,
    ) -> Result<Self, GatewayServerError> {
        config.validate().map_err(|err| GatewayServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.server.audit)
            .map_err(|err| GatewayServerError::Init(err.to_string()))?;
        let dispatcher =
            Dispatcher::from_catalog(catalog, &config.catalog.context_tag, executor, context);
        let state = Arc::new(build_gateway_state(
            dispatcher,
            &config.server,
            audit,
            Arc::new(NoopMetrics),
        ));
        Ok(Self {
            config,
            state,
        })
    }

    /// Serves requests on the configured transport until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayServerError`] when the transport fails. Startup
    /// failures (bad bind address, socket in use) abort entirely; there is no
    /// partial-transport degraded mode.
    pub async fn serve(self) -> Result<(), GatewayServerError> {
        match self.config.server.transport {
            ServerTransport::Pipe => pipe::serve(&self.state),
            ServerTransport::Sse => {
                serve_http(&self.config, self.state, ActiveTransport::Sse).await
            }
            ServerTransport::StreamableHttp => {
                serve_http(&self.config, self.state, ActiveTransport::StreamableHttp).await
            }
        }
    }
}

/// Serves the HTTP listener shared by the SSE and streamable transports.
async fn serve_http(
    config: &GatewayConfig,
    state: Arc<GatewayState>,
    active: ActiveTransport,
) -> Result<(), GatewayServerError> {
    let bind = config
        .server
        .bind
        .as_ref()
        .ok_or_else(|| GatewayServerError::Config("bind address required".to_string()))?;
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| GatewayServerError::Config("invalid bind address".to_string()))?;
    let app = build_router(state, active);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| GatewayServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| GatewayServerError::Transport("http server failed".to_string()))
}

// ============================================================================
// SECTION: Request Router
// ============================================================================

/// HTTP transport active on the shared listener.
///
/// Exactly one of the two is selected at startup; both adapters stay
/// compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActiveTransport {
    /// Serve the endpoint with the SSE adapter.
    Sse,
    /// Serve the endpoint with the streamable HTTP adapter.
    StreamableHttp,
}

/// Router state shared by all HTTP handlers.
#[derive(Clone)]
pub(crate) struct RouterState {
    /// Shared gateway state.
    pub(crate) gateway: Arc<GatewayState>,
    /// Adapter selected for the endpoint path.
    pub(crate) active: ActiveTransport,
}

/// Builds the axum router for the HTTP-based transports.
pub(crate) fn build_router(gateway: Arc<GatewayState>, active: ActiveTransport) -> Router {
    let endpoint = gateway.endpoint.clone();
    let max_body_bytes = gateway.max_body_bytes;
    let state = RouterState {
        gateway,
        active,
    };
    Router::new()
        .route(HEALTH_PATH, any(health_entry))
        .route(&endpoint, any(endpoint_entry))
        .fallback(fallback_entry)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Axum entry point for the configured endpoint path.
async fn endpoint_entry(
    State(state): State<RouterState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch_endpoint(&state, Some(peer.ip()), &method, &uri, &headers, &body).await
}

/// Axum entry point for the health-check path.
async fn health_entry(method: Method, headers: HeaderMap) -> Response {
    let origin = headers.get(ORIGIN).cloned();
    if method == Method::OPTIONS {
        return preflight_response(origin.as_ref(), &headers);
    }
    with_cors((StatusCode::OK, "pong").into_response(), origin.as_ref())
}

/// Axum entry point for unmatched paths.
async fn fallback_entry(method: Method, headers: HeaderMap) -> Response {
    let origin = headers.get(ORIGIN).cloned();
    if method == Method::OPTIONS {
        return preflight_response(origin.as_ref(), &headers);
    }
    with_cors((StatusCode::NOT_FOUND, "not found").into_response(), origin.as_ref())
}

/// Routes one endpoint request to the active transport adapter.
pub(crate) async fn dispatch_endpoint(
    state: &RouterState,
    peer_ip: Option<IpAddr>,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    let origin = headers.get(ORIGIN).cloned();
    if method == Method::OPTIONS {
        return preflight_response(origin.as_ref(), headers);
    }
    let response = match state.active {
        ActiveTransport::Sse => {
            if method == Method::GET {
                sse::establish(&state.gateway)
            } else if method == Method::POST {
                sse::post(&state.gateway, peer_ip, session_id_from_query(uri), body).await
            } else {
                (StatusCode::NOT_FOUND, "not found").into_response()
            }
        }
        ActiveTransport::StreamableHttp => {
            if method == Method::POST {
                streamable::post(&state.gateway, peer_ip, headers, body).await
            } else if method == Method::GET {
                streamable::subscribe(&state.gateway, headers)
            } else if method == Method::DELETE {
                streamable::terminate(&state.gateway, headers)
            } else {
                (StatusCode::NOT_FOUND, "not found").into_response()
            }
        }
    };
    with_cors(response, origin.as_ref())
}

/// Extracts the `sessionId` query parameter, if present and non-empty.
fn session_id_from_query(uri: &Uri) -> Option<String> {
    uri.query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("sessionId="))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

// ============================================================================
// SECTION: CORS Policy
// ============================================================================

/// Builds the echo-origin CORS headers shared by all HTTP responses.
///
/// The origin is echoed verbatim and never replaced with a wildcard, since
/// credentialed requests are allowed. Without an origin header no CORS
/// headers are emitted at all.
fn cors_headers(origin: Option<&HeaderValue>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(origin) = origin {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        headers.insert(VARY, HeaderValue::from_static("origin"));
    }
    headers
}

/// Answers a preflight request with the negotiated CORS headers.
fn preflight_response(origin: Option<&HeaderValue>, request_headers: &HeaderMap) -> Response {
    let mut headers = cors_headers(origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    let allow_headers = request_headers
        .get(ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("content-type, mcp-session-id"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(SESSION_ID_HEADER));
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// Merges the echo-origin CORS headers into a response.
fn with_cors(mut response: Response, origin: Option<&HeaderValue>) -> Response {
    for (name, value) in cors_headers(origin) {
        if let Some(name) = name {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests;
