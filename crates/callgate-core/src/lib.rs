// crates/callgate-core/src/lib.rs
// ============================================================================
// Module: Callgate Core
// Description: Schema compilation, dispatch, and envelope model for Callgate.
// Purpose: Provide transport-independent tool-call semantics.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Callgate core holds everything the transports share: parameter descriptors
//! compiled into validators, the tool catalog and executor interfaces, the
//! dispatcher, and the uniform response envelope. Transports frame bytes;
//! this crate decides what a call means.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatch;
pub mod envelope;
pub mod execute;
pub mod schema;
pub mod tool;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatch::Dispatcher;
pub use envelope::ContentBlock;
pub use envelope::ResponseEnvelope;
pub use execute::ExecutionResult;
pub use execute::ExecutorError;
pub use execute::InvocationContext;
pub use execute::ToolExecutor;
pub use schema::CompiledValidator;
pub use schema::ParamKind;
pub use schema::ParamSpec;
pub use schema::ParameterSpec;
pub use schema::ValidationError;
pub use tool::StaticToolCatalog;
pub use tool::ToolCatalog;
pub use tool::ToolDefinition;
