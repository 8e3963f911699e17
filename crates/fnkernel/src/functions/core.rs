//! Function abstraction for LLM function-calling.
//!
//! The [`KernelFunction`] trait defines the interface every callable unit
//! implements: immutable [`FunctionMetadata`] (plugin, name, description,
//! JSON schema) and an async `invoke` method. Functions are grouped into
//! [`KernelPlugin`](super::KernelPlugin)s and collected in a
//! [`FunctionRegistry`](super::FunctionRegistry).

use crate::KernelResult;
use crate::error::KernelError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Maximum size (in bytes) for function output before truncation.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 30_000;

/// Boxed future returned by [`KernelFunction::invoke`].
pub type FunctionFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

/// Shared handle to a registered function.
///
/// Choice configurations and explicit subsets hold these handles; the
/// function itself is never copied or mutated.
pub type KernelFunctionRef = Arc<dyn KernelFunction>;

// ── FunctionMetadata ───────────────────────────────────────────────

/// Identity and schema of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Owning plugin, if any. Set when the function is added to a plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    /// Function name, unique within its plugin.
    pub name: String,
    /// Description advertised to the model.
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the function's arguments.
    #[serde(default = "empty_object_schema")]
    pub parameters: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl FunctionMetadata {
    /// Create metadata for a function that does not belong to a plugin yet.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            plugin_name: None,
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Create metadata whose parameter schema is derived from `A`.
    pub fn for_args<A: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, description, crate::json_schema_for::<A>())
    }

    /// Return a copy scoped to the given plugin.
    pub fn in_plugin(mut self, plugin_name: impl Into<String>) -> Self {
        self.plugin_name = Some(plugin_name.into());
        self
    }

    /// Plugin name, treating an empty string as absent.
    pub fn plugin(&self) -> Option<&str> {
        self.plugin_name.as_deref().filter(|p| !p.is_empty())
    }

    /// Display identity used in diagnostics: `Plugin.Function`, or just the
    /// function name when there is no plugin.
    pub fn qualified_name(&self) -> String {
        match self.plugin() {
            Some(plugin) => format!("{plugin}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Whether this metadata identifies the given (plugin, function) pair.
    ///
    /// Names compare ASCII case-insensitively, matching registry lookup.
    pub fn is(&self, plugin_name: Option<&str>, function_name: &str) -> bool {
        let plugin_matches = match (self.plugin(), plugin_name.filter(|p| !p.is_empty())) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        };
        plugin_matches && self.name.eq_ignore_ascii_case(function_name)
    }
}

impl fmt::Display for FunctionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Validate a plugin or function name.
///
/// Names must be non-empty ASCII alphanumerics or underscores, so they can
/// never contain the default `-` separator.
pub fn validate_name(name: &str) -> KernelResult<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(KernelError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ── KernelFunction trait ───────────────────────────────────────────

/// A function a model can request via function-calling.
///
/// Implementors provide immutable [`FunctionMetadata`] and an async
/// [`KernelFunction::invoke`] that receives the raw JSON arguments string.
/// Errors should be returned as `"Error: ..."` strings rather than
/// panicking: the result goes back to the model either way.
pub trait KernelFunction: Send + Sync {
    /// Identity and schema of this function.
    fn metadata(&self) -> &FunctionMetadata;

    /// Invoke the function with the given raw JSON arguments.
    fn invoke(&self, arguments: &str) -> FunctionFuture<'_>;

    /// The function's name.
    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// The owning plugin's name, if any.
    fn plugin_name(&self) -> Option<&str> {
        self.metadata().plugin()
    }
}

impl fmt::Debug for dyn KernelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernelFunction({})", self.metadata().qualified_name())
    }
}

// ── FnFunction ────────────────────────────────────────────────────

/// Type-erased async handler for [`FnFunction`].
type ErasedHandler =
    Box<dyn Fn(String) -> Pin<Box<dyn Future<Output = String> + Send>> + Send + Sync>;

/// A closure-based function that auto-parses its arguments.
///
/// # Example
///
/// ```
/// use fnkernel::functions::{FnFunction, FunctionMetadata};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct AddArgs {
///     a: i64,
///     b: i64,
/// }
///
/// let add = FnFunction::new(
///     FunctionMetadata::for_args::<AddArgs>("Add", "Add two integers"),
///     |args: AddArgs| async move { (args.a + args.b).to_string() },
/// );
/// ```
pub struct FnFunction {
    metadata: FunctionMetadata,
    handler: ErasedHandler,
}

impl FnFunction {
    /// Create a new closure-based function.
    ///
    /// The handler receives arguments of type `A` deserialized from the raw
    /// JSON string. An empty argument string is treated as `{}`. Parse
    /// errors are formatted for the model.
    pub fn new<A, F, Fut>(metadata: FunctionMetadata, handler: F) -> Self
    where
        A: serde::de::DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let erased = move |raw: String| -> Pin<Box<dyn Future<Output = String> + Send>> {
            let raw = if raw.trim().is_empty() {
                "{}".to_string()
            } else {
                raw
            };
            let args: A = match serde_json::from_str(&raw) {
                Ok(a) => a,
                Err(e) => {
                    return Box::pin(async move {
                        format!(
                            "Error: invalid function arguments: {e}. \
                             Please provide valid JSON matching the function's parameter schema."
                        )
                    });
                }
            };
            Box::pin(handler(args))
        };

        Self {
            metadata,
            handler: Box::new(erased),
        }
    }
}

impl KernelFunction for FnFunction {
    fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    fn invoke(&self, arguments: &str) -> FunctionFuture<'_> {
        Box::pin((self.handler)(arguments.to_string()))
    }
}

impl fmt::Debug for FnFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFunction")
            .field("name", &self.metadata.qualified_name())
            .finish()
    }
}

// ── DeclaredFunction ───────────────────────────────────────────────

/// A function that is declared but has no implementation in this host.
///
/// Useful for advertising functions loaded from a manifest: the model sees
/// the name, description, and schema, but invocation always returns an
/// error result.
#[derive(Debug, Clone)]
pub struct DeclaredFunction {
    metadata: FunctionMetadata,
}

impl DeclaredFunction {
    pub fn new(metadata: FunctionMetadata) -> Self {
        Self { metadata }
    }
}

impl KernelFunction for DeclaredFunction {
    fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    fn invoke(&self, _arguments: &str) -> FunctionFuture<'_> {
        let msg = format!(
            "Error: function '{}' is declared but has no implementation in this host",
            self.metadata.qualified_name()
        );
        Box::pin(async move { msg })
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Validate arguments against the function's declared JSON Schema.
///
/// Returns `None` if valid, or `Some(error_string)` formatted for the model
/// to self-correct.
pub fn validate_arguments(function: &dyn KernelFunction, arguments: &str) -> Option<String> {
    let metadata = function.metadata();
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    let args_value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            return Some(format!(
                "Error: invalid JSON arguments for function '{}': {e}. \
                 Please provide valid JSON matching the function's parameter schema.",
                metadata.qualified_name()
            ));
        }
    };

    // An unusable schema disables validation rather than blocking the call.
    let validator = match jsonschema::validator_for(&metadata.parameters) {
        Ok(v) => v,
        Err(_) => return None,
    };

    let errors: Vec<String> = validator
        .iter_errors(&args_value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Error: argument validation failed for function '{}':\n{}\n\
             Please fix the arguments and try again.",
            metadata.qualified_name(),
            errors.join("\n")
        ))
    }
}

const ARGUMENT_PREVIEW_CHARS: usize = 120;

/// Record that `fqn` is about to run. Arguments are shortened at INFO and
/// logged in full at TRACE.
pub fn log_invocation(fqn: &str, arguments: &str) {
    let mut chars = arguments.chars();
    let preview: String = chars.by_ref().take(ARGUMENT_PREVIEW_CHARS).collect();
    let ellipsis = if chars.next().is_some() { "..." } else { "" };
    info!("Invoking {fqn} with {preview}{ellipsis}");
    debug!("Arguments for {fqn}: {} bytes", arguments.len());
    trace!("Arguments for {fqn}: {arguments}");
}

/// Truncate a string to at most `max` bytes (on a char boundary), appending
/// a notice if trimmed.
pub fn truncate_result(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let total = s.len();
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    format!("{s}...\n[truncated: {total} bytes total]")
}
