// crates/callgate-core/src/execute.rs
// ============================================================================
// Module: Executor Boundary
// Description: Interfaces between the gateway and external tool executors.
// Purpose: Define the execution contract the dispatcher consumes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The gateway never contains tool business logic. Work is delegated through
//! [`ToolExecutor`], and the executor's outcome comes back as an
//! [`ExecutionResult`] the gateway inspects only through the
//! success/data/error contract. The [`InvocationContext`] handed to every
//! call is whatever the embedding application supplied at construction; the
//! gateway carries it verbatim and never looks inside.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Invocation Context
// ============================================================================

/// Opaque context threaded through to executor calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Application-defined payload; opaque to the gateway.
    payload: Value,
}

impl InvocationContext {
    /// Wraps an application-defined payload.
    #[must_use]
    pub const fn new(payload: Value) -> Self {
        Self {
            payload,
        }
    }

    /// Returns the wrapped payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }
}

// ============================================================================
// SECTION: Execution Result
// ============================================================================

/// Outcome reported by an executor for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the tool completed successfully.
    pub success: bool,
    /// Result payload on success.
    #[serde(default)]
    pub data: Option<Value>,
    /// Failure message when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Creates a successful result carrying the given payload.
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed result carrying a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// SECTION: Executor Interface
// ============================================================================

/// Executor-side failure for one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The executor could not complete the call.
    #[error("{0}")]
    Failed(String),
}

/// External collaborator performing the actual tool work.
///
/// Implementations may block; the gateway shifts calls onto a blocking
/// context before invoking them from async handlers.
pub trait ToolExecutor: Send + Sync {
    /// Executes the named tool with validated, normalized arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] when the executor itself fails; tool-level
    /// failures are reported through [`ExecutionResult`] instead.
    fn execute(
        &self,
        name: &str,
        args: &BTreeMap<String, Value>,
        context: &InvocationContext,
    ) -> Result<ExecutionResult, ExecutorError>;
}
