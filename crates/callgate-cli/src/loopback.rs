// crates/callgate-cli/src/loopback.rs
// ============================================================================
// Module: Loopback Tool Set
// Description: Built-in demonstration tools served by the CLI.
// Purpose: Give the gateway a working executor without external collaborators.
// Dependencies: callgate-core, serde_json
// ============================================================================

//! ## Overview
//! The loopback tool set makes `callgate serve` useful out of the box and
//! doubles as a smoke-test surface: `echo` exercises string and boolean
//! parameters, `clock` an enum-narrowed string, and `sum` a numeric array.
//! Embedding applications replace this module with their own catalog and
//! executor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use callgate_core::ExecutionResult;
use callgate_core::ExecutorError;
use callgate_core::InvocationContext;
use callgate_core::ParamKind;
use callgate_core::ParamSpec;
use callgate_core::StaticToolCatalog;
use callgate_core::ToolDefinition;
use callgate_core::ToolExecutor;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Builds the loopback tool catalog.
#[must_use]
pub fn catalog() -> StaticToolCatalog {
    StaticToolCatalog::new(vec![echo_tool(), clock_tool(), sum_tool()])
}

/// Invocation context identifying the loopback surface.
#[must_use]
pub fn context() -> InvocationContext {
    InvocationContext::new(json!({ "surface": "loopback" }))
}

/// Definition of the `echo` tool.
fn echo_tool() -> ToolDefinition {
    ToolDefinition::new("echo", "Echo a message back to the caller").with_parameters(
        [
            (
                "message".to_string(),
                ParamSpec::new(ParamKind::String)
                    .required()
                    .with_description("Message to echo")
                    .with_example(json!("hello")),
            ),
            (
                "uppercase".to_string(),
                ParamSpec::new(ParamKind::Boolean)
                    .with_description("Return the message uppercased"),
            ),
        ]
        .into_iter()
        .collect(),
    )
}

/// Definition of the `clock` tool.
fn clock_tool() -> ToolDefinition {
    ToolDefinition::new("clock", "Report the current unix time").with_parameters(
        [(
            "unit".to_string(),
            ParamSpec::new(ParamKind::String)
                .with_enum_values(["seconds", "millis"])
                .with_description("Resolution of the reported timestamp"),
        )]
        .into_iter()
        .collect(),
    )
}

/// Definition of the `sum` tool.
fn sum_tool() -> ToolDefinition {
    ToolDefinition::new("sum", "Sum a list of numbers").with_parameters(
        [(
            "values".to_string(),
            ParamSpec::new(ParamKind::Array)
                .required()
                .with_item_kind(ParamKind::Number)
                .with_description("Numbers to add")
                .with_example(json!([1, 2, 3])),
        )]
        .into_iter()
        .collect(),
    )
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor backing the loopback tool set.
pub struct LoopbackExecutor;

impl ToolExecutor for LoopbackExecutor {
    fn execute(
        &self,
        name: &str,
        args: &BTreeMap<String, Value>,
        _context: &InvocationContext,
    ) -> Result<ExecutionResult, ExecutorError> {
        match name {
            "echo" => Ok(run_echo(args)),
            "clock" => Ok(run_clock(args)),
            "sum" => Ok(run_sum(args)),
            other => Err(ExecutorError::Failed(format!("no loopback handler for {other}"))),
        }
    }
}

/// Echoes the message, optionally uppercased.
fn run_echo(args: &BTreeMap<String, Value>) -> ExecutionResult {
    let message = args.get("message").and_then(Value::as_str).unwrap_or_default();
    let uppercase = args.get("uppercase").and_then(Value::as_bool).unwrap_or(false);
    let text = if uppercase { message.to_uppercase() } else { message.to_string() };
    ExecutionResult::ok(Value::String(text))
}

/// Reports the current unix time in the requested unit.
fn run_clock(args: &BTreeMap<String, Value>) -> ExecutionResult {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    let unit = args.get("unit").and_then(Value::as_str).unwrap_or("seconds");
    let value = if unit == "millis" {
        json!({ "unit": "millis", "value": elapsed.as_millis() })
    } else {
        json!({ "unit": "seconds", "value": elapsed.as_secs() })
    };
    ExecutionResult::ok(value)
}

/// Sums the validated numeric array.
fn run_sum(args: &BTreeMap<String, Value>) -> ExecutionResult {
    let values = args.get("values").and_then(Value::as_array).cloned().unwrap_or_default();
    let total: f64 = values.iter().filter_map(Value::as_f64).sum();
    serde_json::Number::from_f64(total).map_or_else(
        || ExecutionResult::failed("sum is not a representable number"),
        |number| ExecutionResult::ok(json!({ "total": Value::Number(number) })),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
