//! Function choice and naming policies for LLM function-calling.
//!
//! `fnkernel` sits between a registry of callable functions and the layer
//! that talks to a model provider. For every request it answers three
//! questions:
//!
//! 1. **Which functions should the model see?** A
//!    [`FunctionChoiceBehavior`](choice::FunctionChoiceBehavior) resolves the
//!    candidate list from an explicit subset or the whole
//!    [`FunctionRegistry`](functions::FunctionRegistry), optionally narrowed
//!    by a [`FunctionSelector`](choice::FunctionSelector).
//! 2. **What are they called on the wire?** A
//!    [`FunctionNamePolicy`](naming::FunctionNamePolicy) builds the fully
//!    qualified name (`Plugin-Function` by default) and parses it back,
//!    including recovery from hallucinated separators.
//! 3. **May the caller invoke them automatically?** Auto-invocation is only
//!    granted for functions that actually exist in the registry; the check
//!    fails fast before anything is advertised.
//!
//! # Getting started
//!
//! ```
//! use fnkernel::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), fnkernel::KernelError> {
//! let plugin = KernelPlugin::from_functions(
//!     "Utils",
//!     [FnFunction::new(
//!         FunctionMetadata::new("GetTime", "Current UTC time", json!({"type": "object"})),
//!         |_: serde_json::Value| async { "12:00".to_string() },
//!     )],
//! )?;
//! let registry = FunctionRegistry::new().with_plugin(plugin)?;
//!
//! let config = FunctionChoiceBehavior::auto()
//!     .configuration(&ChoiceContext::new(Some(&registry)))?;
//! assert!(config.auto_invoke());
//!
//! let policy = FunctionNamePolicy::default();
//! let tools = config.tool_definitions(&policy);
//! assert_eq!(tools[0].function.name, "Utils-GetTime");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`functions`] | [`KernelFunction`](functions::KernelFunction) trait, [`FnFunction`](functions::FnFunction), plugins and the [`FunctionRegistry`](functions::FunctionRegistry) |
//! | [`naming`] | [`FunctionNamePolicy`](naming::FunctionNamePolicy), custom and fallback FQN parsers |
//! | [`choice`] | [`FunctionChoiceBehavior`](choice::FunctionChoiceBehavior) resolution and selectors |
//! | [`invoke`] | [`FunctionInvoker`](invoke::FunctionInvoker) for executing model tool calls |
//! | [`history`] | [`ChatHistory`](history::ChatHistory) and message types |
//! | [`settings`] | serde-loadable execution settings and plugin manifests |

pub mod choice;
pub mod error;
pub mod functions;
pub mod history;
pub mod invoke;
pub mod naming;
pub mod prelude;
pub mod settings;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use error::{KernelError, KernelResult};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Schema generation ──────────────────────────────────────────────

/// Parameter schema for a function whose arguments deserialize into `T`.
///
/// The root `$schema` and `title` keys are removed. Falls back to an empty
/// object schema.
///
/// # Example
///
/// ```
/// use fnkernel::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct WeatherArgs {
///     city: String,
///     #[serde(default)]
///     date: Option<String>,
/// }
///
/// let schema = json_schema_for::<WeatherArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema.get("$schema").is_none());
/// assert!(schema["required"].as_array().unwrap().contains(&"city".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(mut root)) => {
            root.remove("$schema");
            root.remove("title");
            serde_json::Value::Object(root)
        }
        _ => serde_json::json!({"type": "object", "properties": {}}),
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition advertised to the model (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    /// Create a function-calling tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool call returned by the model. `function.name` is the fully
/// qualified name the model chose, which may not match any registered
/// function.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

impl ToolCall {
    /// Create a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}
