// crates/callgate-core/src/schema.rs
// ============================================================================
// Module: Parameter Schema Compiler
// Description: Compiles parameter descriptors into runtime argument validators.
// Purpose: Validate tool-call arguments before any executor is invoked.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Tool parameters are described with a small, closed descriptor vocabulary
//! and compiled into validators once, when a tool is registered. Compilation
//! never fails: a descriptor kind this gateway does not recognize degrades to
//! an accept-anything check, because tool authors own their descriptors and
//! partial validation beats refusing registration. Validation collects every
//! field error in one pass so callers get the full picture in a single round
//! trip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Parameter Descriptors
// ============================================================================

/// Declared kind of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// UTF-8 string value.
    String,
    /// Integer or floating point number.
    Number,
    /// Boolean value.
    Boolean,
    /// Homogeneous array; element kind comes from `item_kind`.
    Array,
    /// Unrecognized or intentionally unconstrained kind.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ParamKind {
    /// Returns the JSON Schema type label for this kind.
    #[must_use]
    pub const fn schema_type(self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Array => Some("array"),
            Self::Unknown => None,
        }
    }
}

/// Descriptor for a single named tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Declared value kind.
    #[serde(default)]
    pub kind: ParamKind,
    /// Whether the parameter must be present in call arguments.
    #[serde(default)]
    pub required: bool,
    /// Closed value set for string parameters.
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    /// Element kind for array parameters; defaults to string.
    #[serde(default)]
    pub item_kind: Option<ParamKind>,
    /// Example value, carried as documentation metadata only.
    #[serde(default)]
    pub example: Option<Value>,
    /// Human-readable parameter description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ParamSpec {
    /// Creates a descriptor of the given kind with everything else defaulted.
    #[must_use]
    pub const fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            required: false,
            enum_values: None,
            item_kind: None,
            example: None,
            description: None,
        }
    }

    /// Marks the parameter required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Narrows a string parameter to a closed value set.
    #[must_use]
    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the element kind for an array parameter.
    #[must_use]
    pub fn with_item_kind(mut self, kind: ParamKind) -> Self {
        self.item_kind = Some(kind);
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches an example value (documentation metadata only).
    #[must_use]
    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }
}

/// Ordered mapping from parameter name to descriptor.
pub type ParameterSpec = BTreeMap<String, ParamSpec>;

// ============================================================================
// SECTION: Validation Errors
// ============================================================================

/// Argument validation failure carrying every field-level issue.
///
/// # Invariants
/// - `issues` is non-empty and each entry is qualified with a field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field-qualified issue messages in declaration order.
    issues: Vec<String>,
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Creates a validation error from collected issues.
    #[must_use]
    pub const fn new(issues: Vec<String>) -> Self {
        Self {
            issues,
        }
    }

    /// Returns the individual field-qualified issues.
    #[must_use]
    pub fn issues(&self) -> &[String] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.issues.join("; "))
    }
}

// ============================================================================
// SECTION: Compiled Validators
// ============================================================================

/// Value-level check selected from a parameter kind at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ValueCheck {
    /// Accept any string.
    String,
    /// Accept strings drawn from a closed set.
    StringEnum(BTreeSet<String>),
    /// Accept any JSON number.
    Number,
    /// Accept booleans.
    Boolean,
    /// Accept arrays whose elements pass the inner check.
    Array(Box<ValueCheck>),
    /// Accept anything.
    Any,
}

impl ValueCheck {
    /// Checks a single value, reporting the first issue qualified by `field`.
    fn check(&self, field: &str, value: &Value) -> Option<String> {
        match self {
            Self::String => {
                value.as_str().map_or_else(|| Some(expected(field, "string", value)), |_| None)
            }
            Self::StringEnum(allowed) => match value.as_str() {
                Some(text) if allowed.contains(text) => None,
                Some(text) => Some(format!(
                    "{field}: value {text:?} is not one of [{}]",
                    allowed.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
                )),
                None => Some(expected(field, "string", value)),
            },
            Self::Number => {
                if value.is_number() {
                    None
                } else {
                    Some(expected(field, "number", value))
                }
            }
            Self::Boolean => {
                if value.is_boolean() {
                    None
                } else {
                    Some(expected(field, "boolean", value))
                }
            }
            Self::Array(element) => match value.as_array() {
                Some(items) => items
                    .iter()
                    .enumerate()
                    .find_map(|(index, item)| element.check(&format!("{field}[{index}]"), item)),
                None => Some(expected(field, "array", value)),
            },
            Self::Any => None,
        }
    }
}

/// Formats a type-mismatch issue for one field.
fn expected(field: &str, wanted: &str, got: &Value) -> String {
    format!("{field}: expected {wanted}, got {}", type_label(got))
}

/// Returns a short label for a JSON value's type.
const fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-parameter compiled validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldRule {
    /// Whether the parameter must be present.
    required: bool,
    /// Value check applied when the parameter is present.
    check: ValueCheck,
}

/// Compiled argument validator for one tool.
///
/// # Invariants
/// - Compilation is deterministic: equal descriptors yield equal validators.
/// - Validation never mutates the descriptor it was compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledValidator {
    /// Compiled rules keyed by parameter name.
    fields: BTreeMap<String, FieldRule>,
}

impl CompiledValidator {
    /// Compiles a parameter descriptor into a validator.
    ///
    /// Never fails: unrecognized kinds compile to an accept-anything check.
    #[must_use]
    pub fn compile(spec: &ParameterSpec) -> Self {
        let fields = spec
            .iter()
            .map(|(name, param)| {
                (
                    name.clone(),
                    FieldRule {
                        required: param.required,
                        check: compile_check(param),
                    },
                )
            })
            .collect();
        Self {
            fields,
        }
    }

    /// Validates call arguments against the compiled rules.
    ///
    /// Declared parameters are checked; undeclared arguments pass through
    /// unchanged to stay forward compatible with tools upgraded independently
    /// of the gateway. A missing or `null` argument payload validates as an
    /// empty argument map.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] carrying every field-level issue found.
    pub fn validate(&self, args: &Value) -> Result<BTreeMap<String, Value>, ValidationError> {
        let entries = match args {
            Value::Null => BTreeMap::new(),
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            other => {
                return Err(ValidationError::new(vec![format!(
                    "arguments: expected object, got {}",
                    type_label(other)
                )]));
            }
        };
        let mut issues = Vec::new();
        for (name, rule) in &self.fields {
            match entries.get(name) {
                Some(value) => {
                    if let Some(issue) = rule.check.check(name, value) {
                        issues.push(issue);
                    }
                }
                None => {
                    if rule.required {
                        issues.push(format!("{name}: required parameter is missing"));
                    }
                }
            }
        }
        if issues.is_empty() {
            Ok(entries)
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

/// Selects the value check for one parameter descriptor.
fn compile_check(param: &ParamSpec) -> ValueCheck {
    match param.kind {
        ParamKind::String => param.enum_values.as_ref().map_or(ValueCheck::String, |values| {
            ValueCheck::StringEnum(values.iter().cloned().collect())
        }),
        ParamKind::Number => ValueCheck::Number,
        ParamKind::Boolean => ValueCheck::Boolean,
        ParamKind::Array => {
            let element = param.item_kind.unwrap_or(ParamKind::String);
            ValueCheck::Array(Box::new(leaf_check(element)))
        }
        ParamKind::Unknown => ValueCheck::Any,
    }
}

/// Builds the leaf check for an array element kind.
fn leaf_check(kind: ParamKind) -> ValueCheck {
    match kind {
        ParamKind::String => ValueCheck::String,
        ParamKind::Number => ValueCheck::Number,
        ParamKind::Boolean => ValueCheck::Boolean,
        // Nested arrays are not part of the descriptor vocabulary; treat the
        // elements as unconstrained rather than rejecting the descriptor.
        ParamKind::Array | ParamKind::Unknown => ValueCheck::Any,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
