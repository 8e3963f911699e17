//! Named groups of functions.

use super::core::{
    FunctionFuture, FunctionMetadata, KernelFunction, KernelFunctionRef, validate_name,
};
use crate::KernelResult;
use crate::error::KernelError;
use std::fmt;
use std::sync::Arc;

/// A function re-scoped to the plugin it was added to.
struct PluginFunction {
    metadata: FunctionMetadata,
    inner: Box<dyn KernelFunction>,
}

impl KernelFunction for PluginFunction {
    fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }

    fn invoke(&self, arguments: &str) -> FunctionFuture<'_> {
        self.inner.invoke(arguments)
    }
}

/// A named, ordered group of functions.
///
/// Adding a function stamps the plugin name onto its metadata. Function
/// names are unique within a plugin (ASCII case-insensitive), and
/// registration order is preserved.
#[derive(Clone)]
pub struct KernelPlugin {
    name: String,
    description: String,
    functions: Vec<KernelFunctionRef>,
}

impl fmt::Debug for KernelPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelPlugin")
            .field("name", &self.name)
            .field(
                "functions",
                &self.functions.iter().map(|func| func.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl KernelPlugin {
    /// Create an empty plugin. Fails if the name is invalid.
    pub fn new(name: impl Into<String>) -> KernelResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            description: String::new(),
            functions: Vec::new(),
        })
    }

    /// Create a plugin from a list of functions, in order.
    pub fn from_functions<F>(
        name: impl Into<String>,
        functions: impl IntoIterator<Item = F>,
    ) -> KernelResult<Self>
    where
        F: KernelFunction + 'static,
    {
        let mut plugin = Self::new(name)?;
        for function in functions {
            plugin.add(function)?;
        }
        Ok(plugin)
    }

    /// Set the plugin description (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a function, returning the shared handle to the scoped function.
    ///
    /// Fails if the function name is invalid or already present.
    pub fn add(
        &mut self,
        function: impl KernelFunction + 'static,
    ) -> KernelResult<KernelFunctionRef> {
        let name = function.name().to_string();
        validate_name(&name)?;
        if self.get(&name).is_some() {
            return Err(KernelError::DuplicateFunction {
                plugin: self.name.clone(),
                function: name,
            });
        }

        let metadata = function.metadata().clone().in_plugin(self.name.clone());
        let scoped: KernelFunctionRef = Arc::new(PluginFunction {
            metadata,
            inner: Box::new(function),
        });
        self.functions.push(scoped.clone());
        Ok(scoped)
    }

    /// Add a function (builder pattern).
    pub fn with(mut self, function: impl KernelFunction + 'static) -> KernelResult<Self> {
        self.add(function)?;
        Ok(self)
    }

    /// Plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Look up a function by name (ASCII case-insensitive).
    pub fn get(&self, function_name: &str) -> Option<&KernelFunctionRef> {
        self.functions
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(function_name))
    }

    /// Functions in registration order.
    pub fn functions(&self) -> &[KernelFunctionRef] {
        &self.functions
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the plugin has no functions.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
