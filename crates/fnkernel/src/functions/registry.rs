//! Registry of plugins and their functions.

use super::core::{FunctionMetadata, KernelFunction, KernelFunctionRef};
use super::plugin::KernelPlugin;
use crate::KernelResult;
use crate::error::KernelError;
use std::fmt;
use tracing::debug;

/// The set of functions a host can invoke, grouped by plugin.
///
/// Built once while owned (`&mut self` / builder methods), then shared
/// read-only, typically behind an `Arc`. Plugin names are unique (ASCII
/// case-insensitive) and enumeration is plugin-then-registration order.
///
/// # Example
///
/// ```ignore
/// let registry = FunctionRegistry::new()
///     .with_plugin(KernelPlugin::from_functions("Math", [add, subtract])?)?
///     .with_plugin(KernelPlugin::from_functions("Time", [now])?)?;
///
/// let add = registry.get_function(Some("Math"), "Add");
/// ```
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    plugins: Vec<KernelPlugin>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("plugins", &self.plugins)
            .finish()
    }
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin. Fails if a plugin with the same name exists.
    pub fn add_plugin(&mut self, plugin: KernelPlugin) -> KernelResult<()> {
        if self.plugin(plugin.name()).is_some() {
            return Err(KernelError::DuplicatePlugin(plugin.name().to_string()));
        }
        debug!(
            "Registered plugin {} with {} function(s)",
            plugin.name(),
            plugin.len()
        );
        self.plugins.push(plugin);
        Ok(())
    }

    /// Add a plugin (builder pattern).
    pub fn with_plugin(mut self, plugin: KernelPlugin) -> KernelResult<Self> {
        self.add_plugin(plugin)?;
        Ok(self)
    }

    /// Build a plugin from functions and add it.
    pub fn add_from_functions<F>(
        &mut self,
        plugin_name: impl Into<String>,
        functions: impl IntoIterator<Item = F>,
    ) -> KernelResult<()>
    where
        F: KernelFunction + 'static,
    {
        self.add_plugin(KernelPlugin::from_functions(plugin_name, functions)?)
    }

    /// Look up a plugin by name (ASCII case-insensitive).
    pub fn plugin(&self, name: &str) -> Option<&KernelPlugin> {
        self.plugins
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Plugins in registration order.
    pub fn plugins(&self) -> &[KernelPlugin] {
        &self.plugins
    }

    /// Look up a function by (plugin, function) pair.
    ///
    /// With no plugin name (or an empty one), the first function with a
    /// matching name in any plugin is returned.
    pub fn get_function(
        &self,
        plugin_name: Option<&str>,
        function_name: &str,
    ) -> Option<&KernelFunctionRef> {
        match plugin_name.filter(|p| !p.is_empty()) {
            Some(plugin) => self.plugin(plugin)?.get(function_name),
            None => self.plugins.iter().find_map(|p| p.get(function_name)),
        }
    }

    /// Whether a function with the same identity is registered.
    pub fn contains(&self, metadata: &FunctionMetadata) -> bool {
        self.get_function(metadata.plugin(), &metadata.name).is_some()
    }

    /// All functions in plugin-then-registration order.
    pub fn functions(&self) -> Vec<KernelFunctionRef> {
        self.plugins
            .iter()
            .flat_map(|p| p.functions().iter().cloned())
            .collect()
    }

    /// Metadata of all functions in enumeration order.
    pub fn metadata(&self) -> Vec<FunctionMetadata> {
        self.plugins
            .iter()
            .flat_map(|p| p.functions().iter().map(|f| f.metadata().clone()))
            .collect()
    }

    /// Total number of registered functions.
    pub fn len(&self) -> usize {
        self.plugins.iter().map(KernelPlugin::len).sum()
    }

    /// Whether no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
