//! Choice modes and their resolution into a per-request configuration.

use super::selector::{FunctionSelector, SelectorContext};
use crate::error::KernelError;
use crate::functions::{FunctionRegistry, KernelFunction, KernelFunctionRef};
use crate::history::ChatHistory;
use crate::naming::FunctionNamePolicy;
use crate::{KernelResult, ToolDef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// How the model is asked to use the advertised functions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FunctionChoice {
    /// The model may call zero or more functions.
    Auto,
    /// The model must call at least one function.
    Required,
    /// Functions are advertised for context only and never called.
    None,
}

impl FunctionChoice {
    /// Wire value for the provider's `tool_choice` field.
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionChoice::Auto => "auto",
            FunctionChoice::Required => "required",
            FunctionChoice::None => "none",
        }
    }
}

impl fmt::Display for FunctionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Per-mode options ───────────────────────────────────────────────

/// Options for modes that may lead to invocation (`Auto`, `Required`).
#[derive(Clone)]
pub struct InvocableChoice {
    /// Explicit subset. `None` means every registered function; an empty
    /// list advertises nothing.
    pub functions: Option<Vec<KernelFunctionRef>>,
    pub auto_invoke: bool,
    pub selector: Option<Arc<dyn FunctionSelector>>,
    /// Let the invoker run functions the model requests even when they were
    /// not advertised, as long as they are registered.
    pub allow_any_requested_function: bool,
}

impl Default for InvocableChoice {
    fn default() -> Self {
        Self {
            functions: None,
            auto_invoke: true,
            selector: None,
            allow_any_requested_function: false,
        }
    }
}

impl fmt::Debug for InvocableChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocableChoice")
            .field("functions", &self.functions)
            .field("auto_invoke", &self.auto_invoke)
            .field("selector", &self.selector.is_some())
            .field(
                "allow_any_requested_function",
                &self.allow_any_requested_function,
            )
            .finish()
    }
}

/// Options for the advertise-only `None` mode.
#[derive(Clone, Default)]
pub struct AdvertisedChoice {
    pub functions: Option<Vec<KernelFunctionRef>>,
    pub selector: Option<Arc<dyn FunctionSelector>>,
}

impl fmt::Debug for AdvertisedChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvertisedChoice")
            .field("functions", &self.functions)
            .field("selector", &self.selector.is_some())
            .finish()
    }
}

// ── FunctionChoiceBehavior ─────────────────────────────────────────

/// A request for which functions to advertise and whether to auto-invoke.
///
/// Resolve it per request with [`configuration`](Self::configuration).
///
/// # Example
///
/// ```ignore
/// let behavior = FunctionChoiceBehavior::required()
///     .with_functions([registry.get_function(Some("Math"), "Add").unwrap().clone()])
///     .with_auto_invoke(false);
/// let config = behavior.configuration(&ChoiceContext::new(Some(&registry)))?;
/// ```
#[derive(Debug, Clone)]
pub enum FunctionChoiceBehavior {
    Auto(InvocableChoice),
    Required(InvocableChoice),
    None(AdvertisedChoice),
}

impl Default for FunctionChoiceBehavior {
    fn default() -> Self {
        Self::auto()
    }
}

impl FunctionChoiceBehavior {
    pub fn auto() -> Self {
        Self::Auto(InvocableChoice::default())
    }

    pub fn required() -> Self {
        Self::Required(InvocableChoice::default())
    }

    pub fn none() -> Self {
        Self::None(AdvertisedChoice::default())
    }

    /// The default behavior for `choice`.
    pub fn for_choice(choice: FunctionChoice) -> Self {
        match choice {
            FunctionChoice::Auto => Self::auto(),
            FunctionChoice::Required => Self::required(),
            FunctionChoice::None => Self::none(),
        }
    }

    pub fn choice(&self) -> FunctionChoice {
        match self {
            Self::Auto(_) => FunctionChoice::Auto,
            Self::Required(_) => FunctionChoice::Required,
            Self::None(_) => FunctionChoice::None,
        }
    }

    /// Restrict candidates to an explicit subset (builder pattern).
    pub fn with_functions(
        mut self,
        functions: impl IntoIterator<Item = KernelFunctionRef>,
    ) -> Self {
        let functions = Some(functions.into_iter().collect());
        match &mut self {
            Self::Auto(opts) | Self::Required(opts) => opts.functions = functions,
            Self::None(opts) => opts.functions = functions,
        }
        self
    }

    /// Set the auto-invoke flag (builder pattern). Ignored for `None`.
    pub fn with_auto_invoke(mut self, auto_invoke: bool) -> Self {
        match &mut self {
            Self::Auto(opts) | Self::Required(opts) => opts.auto_invoke = auto_invoke,
            Self::None(_) => trace!("Ignoring auto_invoke={auto_invoke} for none choice"),
        }
        self
    }

    /// Attach a dynamic selector (builder pattern).
    pub fn with_selector(mut self, selector: impl FunctionSelector + 'static) -> Self {
        let selector: Arc<dyn FunctionSelector> = Arc::new(selector);
        match &mut self {
            Self::Auto(opts) | Self::Required(opts) => opts.selector = Some(selector),
            Self::None(opts) => opts.selector = Some(selector),
        }
        self
    }

    /// Allow invoking registered functions that were not advertised
    /// (builder pattern). Ignored for `None`.
    pub fn with_allow_any_requested_function(mut self, allow: bool) -> Self {
        if let Self::Auto(opts) | Self::Required(opts) = &mut self {
            opts.allow_any_requested_function = allow;
        }
        self
    }

    /// Resolve the functions to advertise and the effective auto-invoke flag.
    ///
    /// Candidates come from the explicit subset, or every registered
    /// function, then pass through the selector. When auto-invocation is
    /// requested every remaining candidate must be registered.
    ///
    /// # Errors
    ///
    /// - [`KernelError::AutoInvokeWithoutRegistry`] if auto-invocation is
    ///   requested without a registry.
    /// - [`KernelError::FunctionNotAvailable`] for the first candidate that is
    ///   not registered.
    pub fn configuration(
        &self,
        context: &ChoiceContext<'_>,
    ) -> KernelResult<FunctionChoiceConfiguration> {
        let choice = self.choice();
        let (functions, selector, auto_invoke, allow_any) = match self {
            Self::Auto(opts) | Self::Required(opts) => (
                &opts.functions,
                &opts.selector,
                opts.auto_invoke,
                opts.allow_any_requested_function,
            ),
            Self::None(opts) => (&opts.functions, &opts.selector, false, false),
        };

        let mut candidates = match functions {
            Some(explicit) => explicit.clone(),
            None => context
                .registry
                .map(FunctionRegistry::functions)
                .unwrap_or_default(),
        };

        if let Some(selector) = selector {
            let selected = selector.select(&SelectorContext {
                functions: &candidates,
                history: context.history,
                registry: context.registry,
            });
            if let Some(selected) = selected {
                debug!(
                    "Selector narrowed {choice} candidates from {} to {}",
                    candidates.len(),
                    selected.len()
                );
                candidates = selected;
            }
        }

        if auto_invoke {
            let registry = context
                .registry
                .ok_or(KernelError::AutoInvokeWithoutRegistry)?;
            if let Some(missing) = candidates
                .iter()
                .find(|f| !registry.contains(f.metadata()))
            {
                return Err(KernelError::FunctionNotAvailable {
                    function: missing.metadata().qualified_name(),
                });
            }
        }

        debug!(
            "Resolved {choice} function choice: {} function(s), auto_invoke={auto_invoke}",
            candidates.len()
        );

        Ok(FunctionChoiceConfiguration {
            choice,
            functions: candidates,
            auto_invoke,
            allow_any_requested_function: allow_any,
        })
    }
}

// ── ChoiceContext ──────────────────────────────────────────────────

static EMPTY_HISTORY: ChatHistory = ChatHistory::new();

/// Inputs available while resolving a behavior.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceContext<'a> {
    pub registry: Option<&'a FunctionRegistry>,
    pub history: &'a ChatHistory,
}

impl<'a> ChoiceContext<'a> {
    /// Context with an empty chat history.
    pub fn new(registry: Option<&'a FunctionRegistry>) -> Self {
        Self {
            registry,
            history: &EMPTY_HISTORY,
        }
    }

    pub fn with_history(mut self, history: &'a ChatHistory) -> Self {
        self.history = history;
        self
    }
}

// ── FunctionChoiceConfiguration ────────────────────────────────────

/// The resolved outcome of a [`FunctionChoiceBehavior`] for one request.
#[derive(Debug, Clone)]
pub struct FunctionChoiceConfiguration {
    choice: FunctionChoice,
    functions: Vec<KernelFunctionRef>,
    auto_invoke: bool,
    allow_any_requested_function: bool,
}

impl FunctionChoiceConfiguration {
    pub fn choice(&self) -> FunctionChoice {
        self.choice
    }

    /// Functions to advertise, in order.
    pub fn functions(&self) -> &[KernelFunctionRef] {
        &self.functions
    }

    pub fn auto_invoke(&self) -> bool {
        self.auto_invoke
    }

    pub fn allow_any_requested_function(&self) -> bool {
        self.allow_any_requested_function
    }

    /// Whether `function`, a registry entry, is advertised.
    ///
    /// Each candidate is resolved through `registry` with the same lookup
    /// the auto-invoke check uses, so a candidate without a plugin name
    /// matches whichever entry that lookup returns.
    pub fn is_advertised(
        &self,
        function: &KernelFunctionRef,
        registry: &FunctionRegistry,
    ) -> bool {
        self.functions.iter().any(|candidate| {
            if Arc::ptr_eq(candidate, function) {
                return true;
            }
            let metadata = candidate.metadata();
            registry
                .get_function(metadata.plugin(), &metadata.name)
                .is_some_and(|entry| Arc::ptr_eq(entry, function))
        })
    }

    /// Tool definitions for the provider request, named under `policy`.
    pub fn tool_definitions(&self, policy: &FunctionNamePolicy) -> Vec<ToolDef> {
        self.functions
            .iter()
            .map(|f| {
                let metadata = f.metadata();
                ToolDef::new(
                    policy.build_fqn(metadata),
                    metadata.description.clone(),
                    metadata.parameters.clone(),
                )
            })
            .collect()
    }

    /// Value for the provider's `tool_choice` field, or `None` when nothing
    /// is advertised and the field should be omitted.
    pub fn tool_choice(&self) -> Option<&'static str> {
        if self.functions.is_empty() {
            None
        } else {
            Some(self.choice.as_str())
        }
    }
}
