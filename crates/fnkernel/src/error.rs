//! Error types for registry construction, choice resolution, and settings.

use thiserror::Error;

/// Errors raised by the kernel.
///
/// Resolution errors are configuration errors: they are raised before any
/// function is advertised to a model and are never retried. A model asking
/// for an unknown function is *not* an error here; the
/// [`FunctionInvoker`](crate::invoke::FunctionInvoker) reports it back to the
/// model as a tool result instead.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Auto-invocation was requested but no registry was supplied.
    #[error("Auto-invocation is not supported when no kernel is provided.")]
    AutoInvokeWithoutRegistry,

    /// Auto-invocation was requested for a function missing from the registry.
    #[error("The specified function {function} is not available in the kernel.")]
    FunctionNotAvailable {
        /// Display name (`Plugin.Function`) of the missing function.
        function: String,
    },

    /// A function reference in settings does not match any registered function.
    #[error("The specified function {function} was not found.")]
    FunctionNotFound {
        /// The reference as written in the settings.
        function: String,
    },

    /// A plugin with the same name already exists in the registry.
    #[error("Plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    /// A function with the same name already exists in the plugin.
    #[error("Function '{function}' is already registered in plugin '{plugin}'")]
    DuplicateFunction {
        /// Plugin that already holds the function.
        plugin: String,
        /// Name of the conflicting function.
        function: String,
    },

    /// Plugin or function name is empty or contains invalid characters.
    #[error(
        "Invalid name '{0}': must be non-empty and contain only ASCII letters, \
         digits, or underscores"
    )]
    InvalidName(String),

    /// A settings or manifest file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file as given by the caller.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings or manifest content is not valid JSON for the expected shape.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
