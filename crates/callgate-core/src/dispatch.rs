// crates/callgate-core/src/dispatch.rs
// ============================================================================
// Module: Tool Call Dispatcher
// Description: Validates and dispatches tool calls to the executor.
// Purpose: Guarantee identical call semantics on every transport.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The dispatcher is the single funnel every transport feeds into. It takes
//! one catalog snapshot at construction, compiles one validator per tool, and
//! answers every call with a [`ResponseEnvelope`]: unknown tools, invalid
//! arguments, executor failures, and executor panics all land in the envelope
//! rather than escaping through a transport. A tool failure must never take
//! down the listening process or another session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;

use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::execute::InvocationContext;
use crate::execute::ToolExecutor;
use crate::schema::CompiledValidator;
use crate::tool::ToolCatalog;
use crate::tool::ToolDefinition;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// One registered tool with its compiled validator.
#[derive(Debug, Clone)]
struct RegisteredTool {
    /// Immutable tool definition.
    definition: ToolDefinition,
    /// Validator compiled from the definition's parameters.
    validator: CompiledValidator,
}

/// Validates inbound calls and dispatches them to the executor.
///
/// # Invariants
/// - Validators are compiled exactly once, at construction.
/// - `handle` returns an envelope for every input; it never fails.
/// - The executor is never invoked with arguments that failed validation.
pub struct Dispatcher {
    /// Registered tools keyed by name; later duplicates replace earlier ones.
    tools: BTreeMap<String, RegisteredTool>,
    /// External executor performing tool work.
    executor: Arc<dyn ToolExecutor>,
    /// Opaque context forwarded verbatim to every executor call.
    context: InvocationContext,
}

impl Dispatcher {
    /// Builds a dispatcher over a fixed definition list.
    #[must_use]
    pub fn new(
        definitions: Vec<ToolDefinition>,
        executor: Arc<dyn ToolExecutor>,
        context: InvocationContext,
    ) -> Self {
        let tools = definitions
            .into_iter()
            .map(|definition| {
                let validator = CompiledValidator::compile(&definition.parameters);
                (
                    definition.name.clone(),
                    RegisteredTool {
                        definition,
                        validator,
                    },
                )
            })
            .collect();
        Self {
            tools,
            executor,
            context,
        }
    }

    /// Builds a dispatcher from a one-shot catalog snapshot.
    #[must_use]
    pub fn from_catalog(
        catalog: &dyn ToolCatalog,
        tag: &str,
        executor: Arc<dyn ToolExecutor>,
        context: InvocationContext,
    ) -> Self {
        Self::new(catalog.list_tools(tag), executor, context)
    }

    /// Returns the registered definitions in name order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition.clone()).collect()
    }

    /// Returns whether a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Handles one tool call, normalizing every outcome into an envelope.
    #[must_use]
    pub fn handle(&self, name: &str, raw_args: &Value) -> ResponseEnvelope {
        let Some(tool) = self.tools.get(name) else {
            return ResponseEnvelope::error(format!("tool not found: {name}"));
        };
        let args = match tool.validator.validate(raw_args) {
            Ok(args) => args,
            Err(error) => return ResponseEnvelope::error(error.to_string()),
        };
        let outcome =
            catch_unwind(AssertUnwindSafe(|| self.executor.execute(name, &args, &self.context)));
        match outcome {
            Ok(Ok(result)) => {
                if result.success {
                    ResponseEnvelope::text(render_data(result.data))
                } else {
                    ResponseEnvelope::error(
                        result.error.unwrap_or_else(|| "tool execution failed".to_string()),
                    )
                }
            }
            Ok(Err(error)) => ResponseEnvelope::error(error.to_string()),
            Err(payload) => ResponseEnvelope::error(panic_message(payload.as_ref())),
        }
    }
}

/// Serializes a success payload: strings verbatim, everything else pretty.
fn render_data(data: Option<Value>) -> String {
    match data {
        Some(Value::String(text)) => text,
        Some(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        }
        None => String::new(),
    }
}

/// Extracts a human-readable message from a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool execution panicked".to_string()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
