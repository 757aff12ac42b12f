// crates/callgate-config/src/config.rs
// ============================================================================
// Module: Callgate Configuration
// Description: Configuration loading and validation for the Callgate gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and encoding
//! limits. Missing or inconsistent configuration fails closed: the gateway
//! refuses to start rather than guessing. Transport selection is made here,
//! once, at process start.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "callgate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "CALLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length for the config file.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the configured endpoint path.
pub(crate) const MAX_ENDPOINT_LENGTH: usize = 256;
/// Default maximum request body size in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
/// Health-check path served unconditionally by the HTTP router.
pub const HEALTH_PATH: &str = "/ping";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Callgate gateway configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    /// Server and transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Tool catalog configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.catalog.validate()?;
        Ok(())
    }
}

/// Server configuration for gateway transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport selected for this process.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP-based transports.
    #[serde(default)]
    pub bind: Option<String>,
    /// Endpoint path served by the HTTP-based transports.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Allow binding to a non-loopback address (explicit opt-in).
    #[serde(default)]
    pub allow_remote: bool,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Pipe,
            bind: None,
            endpoint: default_endpoint(),
            max_body_bytes: default_max_body_bytes(),
            allow_remote: false,
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server and transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        validate_endpoint(&self.endpoint)?;
        self.audit.validate()?;
        match self.transport {
            ServerTransport::Sse | ServerTransport::StreamableHttp => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "sse/streamable_http transport requires bind address".to_string(),
                    ));
                }
                let addr: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
                if !addr.ip().is_loopback() && !self.allow_remote {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind disallowed without allow_remote".to_string(),
                    ));
                }
            }
            ServerTransport::Pipe => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "pipe transport does not use a bind address".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Transport selected for one gateway process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Newline-delimited frames over stdin/stdout.
    #[default]
    Pipe,
    /// Server-Sent Events with a session-establishing GET leg.
    Sse,
    /// Bidirectional streamable HTTP with header-carried sessions.
    StreamableHttp,
}

impl ServerTransport {
    /// Returns a stable label for audit output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pipe => "pipe",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable_http",
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// No audit output.
    Off,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub mode: AuditMode,
    /// Log file path, required when `mode` is `file`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == AuditMode::File && self.path.is_none() {
            return Err(ConfigError::Invalid("file audit mode requires path".to_string()));
        }
        Ok(())
    }
}

/// Tool catalog configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Context tag passed to the catalog snapshot at startup.
    #[serde(default = "default_context_tag")]
    pub context_tag: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            context_tag: default_context_tag(),
        }
    }
}

impl CatalogConfig {
    /// Validates catalog configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.context_tag.trim().is_empty() {
            return Err(ConfigError::Invalid("catalog context_tag must be set".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults and Helpers
// ============================================================================

/// Default endpoint path for HTTP-based transports.
fn default_endpoint() -> String {
    "/mcp".to_string()
}

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default catalog context tag.
fn default_context_tag() -> String {
    "default".to_string()
}

/// Resolves the config path from an explicit argument or the environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the configured endpoint path shape.
fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    if endpoint.len() > MAX_ENDPOINT_LENGTH {
        return Err(ConfigError::Invalid("endpoint exceeds max length".to_string()));
    }
    if !endpoint.starts_with('/') || endpoint.len() < 2 {
        return Err(ConfigError::Invalid(
            "endpoint must start with '/' and name a path".to_string(),
        ));
    }
    if endpoint == HEALTH_PATH {
        return Err(ConfigError::Invalid("endpoint must not shadow the health path".to_string()));
    }
    if endpoint.chars().any(|ch| ch.is_whitespace() || ch == '?' || ch == '#') {
        return Err(ConfigError::Invalid("endpoint contains disallowed characters".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
