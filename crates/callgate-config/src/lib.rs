// crates/callgate-config/src/lib.rs
// ============================================================================
// Module: Callgate Config
// Description: Canonical configuration model for the Callgate gateway.
// Purpose: Centralize config loading so every crate shares one source of truth.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! This crate owns the configuration model for the gateway: transport
//! selection, bind policy, endpoint shape, body limits, and audit sink
//! selection. Parsing is strict and validation fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditMode;
pub use config::CatalogConfig;
pub use config::ConfigError;
pub use config::GatewayConfig;
pub use config::HEALTH_PATH;
pub use config::ServerConfig;
pub use config::ServerTransport;
