//! Serde-loadable execution settings and plugin manifests.
//!
//! Settings let a host configure function choice from JSON instead of code:
//!
//! ```json
//! {
//!   "function_choice_behavior": {
//!     "type": "required",
//!     "functions": ["MyPlugin.Function1", "MyPlugin.Function2"],
//!     "auto_invoke": false
//!   },
//!   "function_name_policy": { "separator": "_", "fallback_separators": ["-"] },
//!   "invocation": { "timeout_secs": 10, "sequential": true }
//! }
//! ```
//!
//! Function references are written `Plugin.Function` (split on the first
//! `.`) or as a bare function name, and are resolved against a registry.

use crate::KernelResult;
use crate::choice::{FunctionChoice, FunctionChoiceBehavior};
use crate::error::KernelError;
use crate::functions::{
    DEFAULT_MAX_RESULT_BYTES, DeclaredFunction, FunctionMetadata, FunctionRegistry, KernelPlugin,
};
use crate::invoke::{DEFAULT_TIMEOUT, InvokerConfig};
use crate::naming::{DEFAULT_FUNCTION_NAME_SEPARATOR, FallbackSeparatorParser, FunctionNamePolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

fn read_file(path: &Path) -> KernelResult<String> {
    std::fs::read_to_string(path).map_err(|source| KernelError::Read {
        path: path.display().to_string(),
        source,
    })
}

// ── ExecutionSettings ──────────────────────────────────────────────

/// Per-request execution settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionSettings {
    /// Absent means function calling is not configured for the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_choice_behavior: Option<FunctionChoiceBehaviorSettings>,
    #[serde(default)]
    pub function_name_policy: FunctionNamePolicySettings,
    #[serde(default)]
    pub invocation: InvocationSettings,
}

impl ExecutionSettings {
    pub fn from_json(json: &str) -> KernelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> KernelResult<Self> {
        let settings = Self::from_json(&read_file(path)?)?;
        debug!("Loaded execution settings from {}", path.display());
        Ok(settings)
    }
}

// ── FunctionChoiceBehaviorSettings ─────────────────────────────────

fn default_auto_invoke() -> bool {
    true
}

/// Serialized form of a [`FunctionChoiceBehavior`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FunctionChoiceBehaviorSettings {
    #[serde(rename = "type")]
    pub choice: FunctionChoice,
    /// Explicit subset. Absent means every registered function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<String>>,
    /// Ignored for `none`.
    #[serde(default = "default_auto_invoke")]
    pub auto_invoke: bool,
    #[serde(default)]
    pub allow_any_requested_function: bool,
}

impl FunctionChoiceBehaviorSettings {
    pub fn new(choice: FunctionChoice) -> Self {
        Self {
            choice,
            functions: None,
            auto_invoke: true,
            allow_any_requested_function: false,
        }
    }

    /// Build the behavior, resolving function references against `registry`.
    ///
    /// # Errors
    ///
    /// [`KernelError::FunctionNotFound`] for the first reference that does
    /// not name a registered function, or for any reference at all when no
    /// registry is given.
    pub fn to_behavior(
        &self,
        registry: Option<&FunctionRegistry>,
    ) -> KernelResult<FunctionChoiceBehavior> {
        let mut behavior = FunctionChoiceBehavior::for_choice(self.choice)
            .with_auto_invoke(self.auto_invoke)
            .with_allow_any_requested_function(self.allow_any_requested_function);

        if let Some(references) = &self.functions {
            let functions = references
                .iter()
                .map(|reference| {
                    let (plugin, name) = match reference.split_once('.') {
                        Some((plugin, name)) => (Some(plugin), name),
                        None => (None, reference.as_str()),
                    };
                    registry
                        .and_then(|r| r.get_function(plugin, name))
                        .cloned()
                        .ok_or_else(|| KernelError::FunctionNotFound {
                            function: reference.clone(),
                        })
                })
                .collect::<KernelResult<Vec<_>>>()?;
            behavior = behavior.with_functions(functions);
        }

        Ok(behavior)
    }
}

// ── FunctionNamePolicySettings ─────────────────────────────────────

fn default_separator() -> String {
    DEFAULT_FUNCTION_NAME_SEPARATOR.to_string()
}

/// Serialized form of a [`FunctionNamePolicy`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FunctionNamePolicySettings {
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub use_function_name_only: bool,
    /// Extra separators to accept when parsing model names. When set, the
    /// policy tries `separator` first, then these, keeping the first split
    /// that names a registered function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_separators: Vec<String>,
}

impl Default for FunctionNamePolicySettings {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            use_function_name_only: false,
            fallback_separators: Vec::new(),
        }
    }
}

impl FunctionNamePolicySettings {
    pub fn to_policy(&self) -> FunctionNamePolicy {
        let policy = FunctionNamePolicy::custom(self.separator.clone())
            .with_function_name_only(self.use_function_name_only);
        if self.use_function_name_only || self.fallback_separators.is_empty() {
            return policy;
        }
        let separators = std::iter::once(self.separator.clone())
            .chain(self.fallback_separators.iter().cloned());
        policy.with_parser(FallbackSeparatorParser::new(separators))
    }
}

// ── InvocationSettings ─────────────────────────────────────────────

/// Serialized form of an [`InvokerConfig`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InvocationSettings {
    /// Per-call timeout in seconds. `0` disables timeouts.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
    #[serde(default = "default_validate_arguments")]
    pub validate_arguments: bool,
    #[serde(default)]
    pub sequential: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_result_bytes() -> usize {
    DEFAULT_MAX_RESULT_BYTES
}

fn default_validate_arguments() -> bool {
    true
}

impl Default for InvocationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            validate_arguments: true,
            sequential: false,
        }
    }
}

impl InvocationSettings {
    pub fn to_config(&self) -> InvokerConfig {
        let timeout = (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs));
        InvokerConfig::default()
            .with_timeout(timeout)
            .with_max_result_bytes(self.max_result_bytes)
            .with_validate_arguments(self.validate_arguments)
            .with_sequential(self.sequential)
    }
}

// ── PluginManifest ─────────────────────────────────────────────────

/// Declarative description of plugins and their function signatures.
///
/// Functions loaded this way are [`DeclaredFunction`]s: they can be
/// advertised and resolved, but invoking them returns an error result.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PluginEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub functions: Vec<FunctionMetadata>,
}

impl PluginManifest {
    pub fn from_json(json: &str) -> KernelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> KernelResult<Self> {
        Self::from_json(&read_file(path)?)
    }

    /// Build a registry of declared functions, in manifest order.
    pub fn into_registry(self) -> KernelResult<FunctionRegistry> {
        let mut registry = FunctionRegistry::new();
        for entry in self.plugins {
            let functions = entry.functions.into_iter().map(DeclaredFunction::new);
            let plugin = KernelPlugin::from_functions(entry.name, functions)?
                .with_description(entry.description);
            registry.add_plugin(plugin)?;
        }
        Ok(registry)
    }
}
