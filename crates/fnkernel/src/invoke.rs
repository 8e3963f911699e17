//! Executing the function calls a model returns.
//!
//! [`FunctionInvoker::invoke_calls`] takes the raw [`ToolCall`]s from a
//! response and, when the resolved configuration permits auto-invocation,
//! runs them against the registry. Every failure the model could correct
//! (unknown name, bad arguments, timeout) becomes an `"Error: ..."` result
//! rather than a Rust error, so the conversation can continue.

use crate::ToolCall;
use crate::choice::FunctionChoiceConfiguration;
use crate::functions::{
    DEFAULT_MAX_RESULT_BYTES, FunctionRegistry, KernelFunction, truncate_result,
    validate_arguments,
};
use crate::functions::core::log_invocation;
use crate::history::{ChatHistory, Message};
use crate::naming::FunctionNamePolicy;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Default per-call timeout (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ── Call and result content ────────────────────────────────────────

/// A function call requested by the model, with its name parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallContent {
    pub id: String,
    /// The name exactly as the model sent it.
    pub fqn: String,
    pub plugin_name: Option<String>,
    pub function_name: String,
    /// Raw JSON arguments.
    pub arguments: String,
}

impl FunctionCallContent {
    /// Parse a model tool call under `policy`.
    pub fn from_tool_call(
        call: &ToolCall,
        policy: &FunctionNamePolicy,
        registry: Option<&FunctionRegistry>,
    ) -> Self {
        let parsed = policy.parse_fqn(&call.function.name, registry);
        Self {
            id: call.id.clone(),
            fqn: call.function.name.clone(),
            plugin_name: parsed.plugin_name,
            function_name: parsed.function_name,
            arguments: call.function.arguments.clone(),
        }
    }

    /// `Plugin.Function` display identity.
    pub fn qualified_name(&self) -> String {
        match self.plugin_name.as_deref().filter(|p| !p.is_empty()) {
            Some(plugin) => format!("{plugin}.{}", self.function_name),
            None => self.function_name.clone(),
        }
    }

    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall::function(&self.id, &self.fqn, &self.arguments)
    }
}

/// The outcome of one function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResultContent {
    pub call_id: String,
    pub fqn: String,
    pub result: String,
}

impl FunctionResultContent {
    /// Whether the result reports a failure to the model.
    pub fn is_error(&self) -> bool {
        self.result.starts_with("Error:")
    }

    /// Tool message for the chat history.
    pub fn to_message(&self) -> Message {
        Message::tool_result(&self.call_id, &self.result)
    }
}

/// What [`FunctionInvoker::invoke_calls`] did with the calls.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// Auto-invocation is off; the caller decides what to run.
    Manual(Vec<FunctionCallContent>),
    /// Calls were executed, results in call order.
    Invoked(Vec<FunctionResultContent>),
}

impl InvocationOutcome {
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual(_))
    }

    /// Append results as tool messages. Does nothing for manual outcomes.
    pub fn append_to(&self, history: &mut ChatHistory) {
        if let Self::Invoked(results) = self {
            for result in results {
                history.add(result.to_message());
            }
        }
    }
}

// ── InvokerConfig ──────────────────────────────────────────────────

/// Execution limits for [`FunctionInvoker`].
///
/// # Example
///
/// ```
/// use fnkernel::invoke::InvokerConfig;
/// use std::time::Duration;
///
/// let config = InvokerConfig::default()
///     .with_timeout(Some(Duration::from_secs(5)))
///     .with_sequential(true);
/// assert_eq!(config.max_result_bytes, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InvokerConfig {
    /// Results longer than this are truncated.
    pub max_result_bytes: usize,
    /// Per-call timeout. `None` disables timeouts.
    pub timeout: Option<Duration>,
    /// Validate arguments against each function's JSON Schema first.
    pub validate_arguments: bool,
    /// Run calls one at a time instead of concurrently.
    pub sequential: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            timeout: Some(DEFAULT_TIMEOUT),
            validate_arguments: true,
            sequential: false,
        }
    }
}

impl InvokerConfig {
    pub fn with_max_result_bytes(mut self, max: usize) -> Self {
        self.max_result_bytes = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_validate_arguments(mut self, enabled: bool) -> Self {
        self.validate_arguments = enabled;
        self
    }

    pub fn with_sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }
}

// ── FunctionInvoker ────────────────────────────────────────────────

/// Runs model function calls against a registry.
#[derive(Debug, Clone)]
pub struct FunctionInvoker<'a> {
    registry: &'a FunctionRegistry,
    policy: &'a FunctionNamePolicy,
    config: InvokerConfig,
}

impl<'a> FunctionInvoker<'a> {
    pub fn new(registry: &'a FunctionRegistry, policy: &'a FunctionNamePolicy) -> Self {
        Self {
            registry,
            policy,
            config: InvokerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InvokerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Handle the tool calls of one model response.
    ///
    /// Without auto-invocation the parsed calls are handed back untouched.
    /// Otherwise every call is executed and its result returned in call
    /// order.
    pub async fn invoke_calls(
        &self,
        configuration: &FunctionChoiceConfiguration,
        calls: &[ToolCall],
    ) -> InvocationOutcome {
        let calls: Vec<FunctionCallContent> = calls
            .iter()
            .map(|c| FunctionCallContent::from_tool_call(c, self.policy, Some(self.registry)))
            .collect();

        if !configuration.auto_invoke() {
            debug!(
                "Auto-invocation disabled; returning {} call(s) to the caller",
                calls.len()
            );
            return InvocationOutcome::Manual(calls);
        }

        let results = if self.config.sequential || calls.len() <= 1 {
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                results.push(self.invoke(configuration, call).await);
            }
            results
        } else {
            let futures: Vec<_> = calls
                .iter()
                .map(|call| self.invoke(configuration, call))
                .collect();
            futures::future::join_all(futures).await
        };

        InvocationOutcome::Invoked(results)
    }

    /// Execute a single parsed call.
    pub async fn invoke(
        &self,
        configuration: &FunctionChoiceConfiguration,
        call: &FunctionCallContent,
    ) -> FunctionResultContent {
        let result = self.run(configuration, call).await;
        FunctionResultContent {
            call_id: call.id.clone(),
            fqn: call.fqn.clone(),
            result,
        }
    }

    async fn run(
        &self,
        configuration: &FunctionChoiceConfiguration,
        call: &FunctionCallContent,
    ) -> String {
        let fqn = call.fqn.as_str();
        let function = match self
            .registry
            .get_function(call.plugin_name.as_deref(), &call.function_name)
        {
            Some(f) => f,
            None => {
                warn!("Model requested unknown function {fqn}");
                return format!(
                    "Error: function '{fqn}' is not available. \
                     Call one of the functions you were given."
                );
            }
        };

        if !configuration.allow_any_requested_function()
            && !configuration.is_advertised(function, self.registry)
        {
            warn!("Model requested function {fqn} that was not advertised");
            return format!("Error: function '{fqn}' was not offered for this request.");
        }

        if self.config.validate_arguments
            && let Some(error) = validate_arguments(function.as_ref(), &call.arguments)
        {
            return error;
        }

        log_invocation(fqn, &call.arguments);
        let start = Instant::now();

        let result = if let Some(limit) = self.config.timeout {
            match tokio::time::timeout(limit, function.invoke(&call.arguments)).await {
                Ok(r) => r,
                Err(_) => {
                    info!(
                        "Function {fqn} timed out after {:.1}s (limit: {:.0}s)",
                        start.elapsed().as_secs_f64(),
                        limit.as_secs_f64(),
                    );
                    format!(
                        "Error: function '{fqn}' timed out after {:.0} seconds.",
                        limit.as_secs_f64(),
                    )
                }
            }
        } else {
            function.invoke(&call.arguments).await
        };

        debug!(
            "Function {fqn} completed in {:.0}ms ({} bytes)",
            start.elapsed().as_secs_f64() * 1000.0,
            result.len()
        );
        trace!(
            "Function {fqn} result preview: {}",
            result.chars().take(300).collect::<String>()
        );

        truncate_result(result, self.config.max_result_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::{ChoiceContext, FunctionChoiceBehavior};
    use crate::functions::{FnFunction, FunctionMetadata, KernelFunctionRef};
    use crate::naming::FallbackSeparatorParser;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Deserialize, JsonSchema)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    fn registry() -> FunctionRegistry {
        let add = FnFunction::new(
            FunctionMetadata::for_args::<AddArgs>("Add", "Add two integers"),
            |args: AddArgs| async move { (args.a + args.b).to_string() },
        );
        let sleep = FnFunction::new(
            FunctionMetadata::new("Sleep", "Sleep for a while", json!({"type": "object"})),
            |_: serde_json::Value| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done".to_string()
            },
        );
        let big = FnFunction::new(
            FunctionMetadata::new("Big", "Large output", json!({"type": "object"})),
            |_: serde_json::Value| async { "x".repeat(100) },
        );
        let mut registry = FunctionRegistry::new();
        registry.add_from_functions("Math", [add]).unwrap();
        registry.add_from_functions("Util", [sleep, big]).unwrap();
        registry
    }

    fn auto(registry: &FunctionRegistry) -> FunctionChoiceConfiguration {
        FunctionChoiceBehavior::auto()
            .configuration(&ChoiceContext::new(Some(registry)))
            .unwrap()
    }

    fn results(outcome: InvocationOutcome) -> Vec<FunctionResultContent> {
        match outcome {
            InvocationOutcome::Invoked(results) => results,
            InvocationOutcome::Manual(_) => panic!("expected invoked outcome"),
        }
    }

    #[test]
    fn parses_tool_call_under_policy() {
        let call = ToolCall::function("c1", "Math-Add", "{}");
        let content =
            FunctionCallContent::from_tool_call(&call, &FunctionNamePolicy::default(), None);
        assert_eq!(content.plugin_name.as_deref(), Some("Math"));
        assert_eq!(content.function_name, "Add");
        assert_eq!(content.qualified_name(), "Math.Add");
        assert_eq!(content.to_tool_call(), call);
    }

    #[tokio::test]
    async fn invokes_advertised_functions_in_order() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let invoker = FunctionInvoker::new(&registry, &policy);
        let outcome = invoker
            .invoke_calls(
                &auto(&registry),
                &[
                    ToolCall::function("c1", "Math-Add", r#"{"a": 1, "b": 2}"#),
                    ToolCall::function("c2", "Math-Add", r#"{"a": 3, "b": 4}"#),
                ],
            )
            .await;
        let results = results(outcome);
        assert_eq!(results[0].call_id, "c1");
        assert_eq!(results[0].result, "3");
        assert_eq!(results[1].result, "7");
        assert!(!results[1].is_error());
    }

    #[tokio::test]
    async fn manual_configuration_does_not_invoke() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let config = FunctionChoiceBehavior::auto()
            .with_auto_invoke(false)
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        let outcome = FunctionInvoker::new(&registry, &policy)
            .invoke_calls(&config, &[ToolCall::function("c1", "Math-Add", "{}")])
            .await;
        assert!(outcome.is_manual());

        let mut history = ChatHistory::new();
        outcome.append_to(&mut history);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn unknown_function_is_an_error_result() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let results = results(
            FunctionInvoker::new(&registry, &policy)
                .invoke_calls(
                    &auto(&registry),
                    &[ToolCall::function("c1", "Math-Divide", "{}")],
                )
                .await,
        );
        assert!(results[0].is_error());
        assert!(results[0].result.contains("Math-Divide"));
    }

    #[tokio::test]
    async fn rejects_functions_that_were_not_advertised() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let add = registry.get_function(Some("Math"), "Add").unwrap().clone();
        let call = [ToolCall::function("c1", "Util-Big", "{}")];

        let config = FunctionChoiceBehavior::auto()
            .with_functions([add.clone()])
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        let invoker = FunctionInvoker::new(&registry, &policy);
        let rejected = results(invoker.invoke_calls(&config, &call).await);
        assert!(rejected[0].result.contains("was not offered"));

        let config = FunctionChoiceBehavior::auto()
            .with_functions([add])
            .with_allow_any_requested_function(true)
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        let allowed = results(invoker.invoke_calls(&config, &call).await);
        assert!(!allowed[0].is_error());
    }

    #[tokio::test]
    async fn pluginless_candidate_is_invocable() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let bare: KernelFunctionRef = Arc::new(FnFunction::new(
            FunctionMetadata::for_args::<AddArgs>("Add", "Add two integers"),
            |_: AddArgs| async { String::new() },
        ));
        let config = FunctionChoiceBehavior::auto()
            .with_functions([bare])
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        assert!(config.auto_invoke());

        let results = results(
            FunctionInvoker::new(&registry, &policy)
                .invoke_calls(&config, &[ToolCall::function("c1", "Add", r#"{"a": 1, "b": 1}"#)])
                .await,
        );
        assert_eq!(results[0].result, "2");
    }

    #[tokio::test]
    async fn reports_schema_violations() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let results = results(
            FunctionInvoker::new(&registry, &policy)
                .invoke_calls(
                    &auto(&registry),
                    &[ToolCall::function("c1", "Math-Add", r#"{"a": 1}"#)],
                )
                .await,
        );
        assert!(results[0].result.contains("argument validation failed"));
    }

    #[tokio::test]
    async fn reports_timeouts() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let invoker = FunctionInvoker::new(&registry, &policy).with_config(
            InvokerConfig::default().with_timeout(Some(Duration::from_millis(50))),
        );
        let results = results(
            invoker
                .invoke_calls(&auto(&registry), &[ToolCall::function("c1", "Util-Sleep", "{}")])
                .await,
        );
        assert!(results[0].is_error());
        assert!(results[0].result.contains("timed out"));
    }

    #[tokio::test]
    async fn truncates_large_results() {
        let registry = registry();
        let policy = FunctionNamePolicy::default();
        let invoker = FunctionInvoker::new(&registry, &policy).with_config(
            InvokerConfig::default()
                .with_max_result_bytes(10)
                .with_sequential(true),
        );
        let results = results(
            invoker
                .invoke_calls(&auto(&registry), &[ToolCall::function("c1", "Util-Big", "{}")])
                .await,
        );
        assert!(results[0].result.starts_with("xxxxxxxxxx..."));
        assert!(results[0].result.contains("[truncated: 100 bytes total]"));
    }

    #[tokio::test]
    async fn recovers_hallucinated_separator_and_records_history() {
        let registry = registry();
        let policy =
            FunctionNamePolicy::default().with_parser(FallbackSeparatorParser::new(["-", "_"]));
        let calls = vec![ToolCall::function("c1", "Math_Add", r#"{"a": 2, "b": 2}"#)];

        let mut history = ChatHistory::new();
        history.add_tool_calls(calls.clone());
        let outcome = FunctionInvoker::new(&registry, &policy)
            .invoke_calls(&auto(&registry), &calls)
            .await;
        outcome.append_to(&mut history);

        assert_eq!(history.len(), 2);
        let last = &history.messages()[1];
        assert_eq!(last.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(last.content.as_deref(), Some("4"));
    }
}
