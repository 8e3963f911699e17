//! Mapping between model-visible function names and registry identities.
//!
//! A model sees each function under a fully qualified name (FQN), by default
//! `Plugin-Function`. When the model calls a function, the FQN it sends back
//! is parsed into a (plugin, function) pair and looked up in the registry.
//!
//! Parsing never fails. A name that does not resolve surfaces at lookup
//! time, and the invoker reports it to the model as an error result.
//!
//! Names are not escaped: a separator that can occur inside plugin or
//! function names makes the split ambiguous. Registered names are limited to
//! `[A-Za-z0-9_]`, so the default `-` separator is always unambiguous while
//! `_` is not.

use crate::functions::{FunctionMetadata, FunctionRegistry, KernelFunctionRef};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Default separator between plugin and function names.
pub const DEFAULT_FUNCTION_NAME_SEPARATOR: &str = "-";

/// Result of parsing a fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFunctionName {
    pub plugin_name: Option<String>,
    pub function_name: String,
}

impl ParsedFunctionName {
    pub fn new(plugin_name: Option<&str>, function_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.map(str::to_string),
            function_name: function_name.into(),
        }
    }

    /// Look the pair up in a registry.
    pub fn resolve<'r>(&self, registry: &'r FunctionRegistry) -> Option<&'r KernelFunctionRef> {
        registry.get_function(self.plugin_name.as_deref(), &self.function_name)
    }
}

/// Input to a custom [`FqnParser`].
#[derive(Debug, Clone, Copy)]
pub struct ParseFqnContext<'a> {
    /// The name the model used.
    pub fqn: &'a str,
    /// The registry, when available, for parsers that probe candidates.
    pub registry: Option<&'a FunctionRegistry>,
}

/// Custom FQN parsing strategy.
///
/// When configured on a [`FunctionNamePolicy`], the parser's answer is
/// authoritative. Closures with the matching signature implement this trait.
pub trait FqnParser: Send + Sync {
    fn parse(&self, context: &ParseFqnContext<'_>) -> ParsedFunctionName;
}

impl<F> FqnParser for F
where
    F: Fn(&ParseFqnContext<'_>) -> ParsedFunctionName + Send + Sync,
{
    fn parse(&self, context: &ParseFqnContext<'_>) -> ParsedFunctionName {
        self(context)
    }
}

/// Split `fqn` on the first occurrence of `separator`.
///
/// Without a separator match (or with an empty separator) the whole string
/// is the function name.
pub fn split_fqn(fqn: &str, separator: &str) -> ParsedFunctionName {
    if separator.is_empty() {
        return ParsedFunctionName::new(None, fqn);
    }
    match fqn.split_once(separator) {
        Some((plugin, function)) => ParsedFunctionName::new(Some(plugin), function),
        None => ParsedFunctionName::new(None, fqn),
    }
}

// ── FunctionNamePolicy ─────────────────────────────────────────────

/// Policy for building and parsing fully qualified function names.
///
/// # Example
///
/// ```
/// use fnkernel::naming::{FunctionNamePolicy, ParsedFunctionName};
///
/// let policy = FunctionNamePolicy::custom("_");
/// assert_eq!(
///     policy.parse_fqn("Utils_GetTime", None),
///     ParsedFunctionName::new(Some("Utils"), "GetTime"),
/// );
/// ```
#[derive(Clone)]
pub struct FunctionNamePolicy {
    separator: String,
    use_function_name_only: bool,
    parser: Option<Arc<dyn FqnParser>>,
}

impl fmt::Debug for FunctionNamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionNamePolicy")
            .field("separator", &self.separator)
            .field("use_function_name_only", &self.use_function_name_only)
            .field("custom_parser", &self.parser.is_some())
            .finish()
    }
}

impl Default for FunctionNamePolicy {
    fn default() -> Self {
        Self {
            separator: DEFAULT_FUNCTION_NAME_SEPARATOR.to_string(),
            use_function_name_only: false,
            parser: None,
        }
    }
}

impl FunctionNamePolicy {
    /// Policy using a custom separator.
    pub fn custom(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..Self::default()
        }
    }

    /// Policy that advertises and looks up functions by name only, ignoring
    /// plugin names.
    pub fn function_name_only() -> Self {
        Self {
            use_function_name_only: true,
            ..Self::default()
        }
    }

    /// Attach a custom parser (builder pattern).
    pub fn with_parser(mut self, parser: impl FqnParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Set the separator (builder pattern).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set function-name-only mode (builder pattern).
    pub fn with_function_name_only(mut self, enabled: bool) -> Self {
        self.use_function_name_only = enabled;
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn uses_function_name_only(&self) -> bool {
        self.use_function_name_only
    }

    pub fn has_custom_parser(&self) -> bool {
        self.parser.is_some()
    }

    /// Build the name advertised to the model.
    pub fn build_fqn(&self, metadata: &FunctionMetadata) -> String {
        if self.use_function_name_only {
            return metadata.name.clone();
        }
        match metadata.plugin() {
            Some(plugin) => format!("{plugin}{}{}", self.separator, metadata.name),
            None => metadata.name.clone(),
        }
    }

    /// Parse a model-supplied name into a (plugin, function) pair.
    pub fn parse_fqn(&self, fqn: &str, registry: Option<&FunctionRegistry>) -> ParsedFunctionName {
        let parsed = if let Some(parser) = &self.parser {
            parser.parse(&ParseFqnContext { fqn, registry })
        } else if self.use_function_name_only {
            ParsedFunctionName::new(None, fqn)
        } else {
            split_fqn(fqn, &self.separator)
        };
        trace!(
            "Parsed function name {fqn} -> plugin={:?}, function={}",
            parsed.plugin_name, parsed.function_name
        );
        parsed
    }

    /// Parse and look up in one step.
    pub fn resolve<'r>(
        &self,
        fqn: &str,
        registry: &'r FunctionRegistry,
    ) -> Option<&'r KernelFunctionRef> {
        self.parse_fqn(fqn, Some(registry)).resolve(registry)
    }
}

// ── FallbackSeparatorParser ────────────────────────────────────────

/// Parser that recovers names written with an unexpected separator.
///
/// Models sometimes call `foo_bar` when `foo-bar` was advertised. This parser
/// tries each separator in order, at every position it occurs, and accepts
/// the first split whose pair is registered. If nothing matches, the whole
/// name is returned as the function name.
///
/// # Example
///
/// ```ignore
/// let policy = FunctionNamePolicy::default()
///     .with_parser(FallbackSeparatorParser::new(["-", "_"]));
/// ```
#[derive(Debug, Clone)]
pub struct FallbackSeparatorParser {
    separators: Vec<String>,
}

impl FallbackSeparatorParser {
    pub fn new<S: Into<String>>(separators: impl IntoIterator<Item = S>) -> Self {
        Self {
            separators: separators
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn separators(&self) -> &[String] {
        &self.separators
    }
}

impl FqnParser for FallbackSeparatorParser {
    fn parse(&self, context: &ParseFqnContext<'_>) -> ParsedFunctionName {
        let Some(registry) = context.registry else {
            return ParsedFunctionName::new(None, context.fqn);
        };

        for separator in &self.separators {
            for (idx, _) in context.fqn.match_indices(separator.as_str()) {
                let (Some(plugin), Some(function)) = (
                    context.fqn.get(..idx),
                    context.fqn.get(idx + separator.len()..),
                ) else {
                    continue;
                };
                if registry.get_function(Some(plugin), function).is_some() {
                    return ParsedFunctionName::new(Some(plugin), function);
                }
            }
        }

        ParsedFunctionName::new(None, context.fqn)
    }
}
