// crates/callgate-core/src/tool.rs
// ============================================================================
// Module: Tool Definitions and Catalog
// Description: Tool metadata and the catalog interface consumed at startup.
// Purpose: Describe invokable operations and their parameter descriptors.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A tool is a named, schema-described operation. Definitions are immutable
//! once registered; the gateway takes a read-only snapshot from a
//! [`ToolCatalog`] at construction time and never reloads it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::schema::ParameterSpec;

// ============================================================================
// SECTION: Tool Definition
// ============================================================================

/// Definition of one invokable tool.
///
/// # Invariants
/// - `name` is unique within a catalog snapshot.
/// - The definition is immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// Parameter descriptors keyed by parameter name.
    #[serde(default)]
    pub parameters: ParameterSpec,
}

impl ToolDefinition {
    /// Creates a definition with an empty parameter map.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSpec::new(),
        }
    }

    /// Replaces the parameter descriptors.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ParameterSpec) -> Self {
        self.parameters = parameters;
        self
    }

    /// Renders the parameter descriptors as a JSON-Schema-shaped object.
    ///
    /// Used by tool listings so clients see one conventional schema shape
    /// regardless of how a parameter was declared.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, param) in &self.parameters {
            let mut property = Map::new();
            if let Some(kind) = param.kind.schema_type() {
                property.insert("type".to_string(), Value::String(kind.to_string()));
            }
            if let Some(values) = &param.enum_values {
                property.insert("enum".to_string(), json!(values));
            }
            if let Some(item_kind) = param.item_kind
                && let Some(kind) = item_kind.schema_type()
            {
                property.insert("items".to_string(), json!({ "type": kind }));
            }
            if let Some(description) = &param.description {
                property.insert("description".to_string(), Value::String(description.clone()));
            }
            if let Some(example) = &param.example {
                property.insert("example".to_string(), example.clone());
            }
            properties.insert(name.clone(), Value::Object(property));
            if param.required {
                required.push(Value::String(name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

// ============================================================================
// SECTION: Catalog Interface
// ============================================================================

/// Read-only source of tool definitions for one invocation context.
pub trait ToolCatalog: Send + Sync {
    /// Lists the tools available under the given context tag.
    fn list_tools(&self, tag: &str) -> Vec<ToolDefinition>;
}

/// Catalog backed by a fixed in-memory list.
///
/// Serves the same definitions for every context tag; intended for tests and
/// embeddings that assemble their tool set up front.
#[derive(Debug, Clone, Default)]
pub struct StaticToolCatalog {
    /// Definitions returned for every tag.
    tools: Vec<ToolDefinition>,
}

impl StaticToolCatalog {
    /// Creates a catalog from a fixed definition list.
    #[must_use]
    pub const fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools,
        }
    }
}

impl ToolCatalog for StaticToolCatalog {
    fn list_tools(&self, _tag: &str) -> Vec<ToolDefinition> {
        self.tools.clone()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
