//! Dynamic narrowing of candidate functions.

use crate::functions::{FunctionRegistry, KernelFunction, KernelFunctionRef};
use crate::history::ChatHistory;
use crate::naming::FunctionNamePolicy;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Everything a selector may inspect.
#[derive(Debug, Clone, Copy)]
pub struct SelectorContext<'a> {
    /// Candidates after resolving the explicit subset or the registry.
    pub functions: &'a [KernelFunctionRef],
    pub history: &'a ChatHistory,
    pub registry: Option<&'a FunctionRegistry>,
}

/// Narrows or reorders candidate functions per request.
///
/// Returning `Some(list)` replaces the candidates, even with an empty list.
/// Returning `None` leaves them unchanged. Closures with the matching
/// signature implement this trait.
pub trait FunctionSelector: Send + Sync {
    fn select(&self, context: &SelectorContext<'_>) -> Option<Vec<KernelFunctionRef>>;
}

impl<F> FunctionSelector for F
where
    F: Fn(&SelectorContext<'_>) -> Option<Vec<KernelFunctionRef>> + Send + Sync,
{
    fn select(&self, context: &SelectorContext<'_>) -> Option<Vec<KernelFunctionRef>> {
        self(context)
    }
}

// ── CallLimitSelector ──────────────────────────────────────────────

/// Stops advertising functions the model has already called enough times.
///
/// Call counts come from the tool calls recorded in the chat history. Each
/// name the model used is parsed under `policy` and resolved through the
/// registry, so a name recovered by a fallback parser counts against the
/// function it resolved to. The policy must be the one the functions were
/// advertised with.
///
/// # Example
///
/// ```ignore
/// // Advertise Math-Add until the model has used it once.
/// let behavior = FunctionChoiceBehavior::auto()
///     .with_selector(CallLimitSelector::new(1, FunctionNamePolicy::default()));
/// ```
#[derive(Debug, Clone)]
pub struct CallLimitSelector {
    max_calls: usize,
    policy: FunctionNamePolicy,
    always_include: HashSet<String>,
}

impl CallLimitSelector {
    pub fn new(max_calls: usize, policy: FunctionNamePolicy) -> Self {
        Self {
            max_calls,
            policy,
            always_include: HashSet::new(),
        }
    }

    /// Exempt a function (by FQN) from the limit (builder pattern).
    pub fn with_always_include(mut self, fqn: impl Into<String>) -> Self {
        self.always_include.insert(fqn.into());
        self
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Calls per function identity, from the tool calls in the history.
    fn call_counts(&self, context: &SelectorContext<'_>) -> HashMap<(String, String), usize> {
        let mut counts = HashMap::new();
        for call in context.history.tool_calls() {
            let parsed = self.policy.parse_fqn(&call.function.name, context.registry);
            let key = identity(
                parsed.plugin_name.as_deref(),
                &parsed.function_name,
                context.registry,
            );
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }
}

/// Case-folded (plugin, function) key, taken from the registry entry the
/// pair resolves to when there is one.
fn identity(
    plugin_name: Option<&str>,
    function_name: &str,
    registry: Option<&FunctionRegistry>,
) -> (String, String) {
    let entry = registry.and_then(|r| r.get_function(plugin_name, function_name));
    let (plugin, name) = match entry {
        Some(f) => (f.plugin_name(), f.name()),
        None => (plugin_name, function_name),
    };
    (
        plugin.unwrap_or_default().to_ascii_lowercase(),
        name.to_ascii_lowercase(),
    )
}

impl FunctionSelector for CallLimitSelector {
    fn select(&self, context: &SelectorContext<'_>) -> Option<Vec<KernelFunctionRef>> {
        let counts = self.call_counts(context);
        if counts.is_empty() {
            return None;
        }

        let selected: Vec<KernelFunctionRef> = context
            .functions
            .iter()
            .filter(|f| {
                let fqn = self.policy.build_fqn(f.metadata());
                if self.always_include.contains(&fqn) {
                    return true;
                }
                let metadata = f.metadata();
                let key = identity(metadata.plugin(), &metadata.name, context.registry);
                let calls = counts.get(&key).copied().unwrap_or(0);
                if calls >= self.max_calls {
                    debug!("Call limit reached for {fqn} ({calls}/{})", self.max_calls);
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();
        Some(selected)
    }
}
