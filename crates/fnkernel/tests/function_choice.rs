//! End-to-end function choice resolution over a sample plugin.
//!
//! Uses the `MyPlugin` fixture with `Function1`, `Function2` and
//! `Function3`, exercising resolution, naming and invocation together.

use fnkernel::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn echo(name: &'static str) -> FnFunction {
    FnFunction::new(
        FunctionMetadata::new(name, format!("{name} description"), json!({"type": "object"})),
        move |_: serde_json::Value| async move { format!("{name} result") },
    )
}

fn my_plugin() -> KernelPlugin {
    KernelPlugin::from_functions(
        "MyPlugin",
        [echo("Function1"), echo("Function2"), echo("Function3")],
    )
    .unwrap()
}

fn registry() -> FunctionRegistry {
    FunctionRegistry::new().with_plugin(my_plugin()).unwrap()
}

fn qualified(config: &FunctionChoiceConfiguration) -> Vec<String> {
    config
        .functions()
        .iter()
        .map(|f| f.metadata().qualified_name())
        .collect()
}

// ── Resolution ───────────────────────────────────────────────────────

#[test]
fn auto_without_subset_advertises_every_function() {
    let registry = registry();
    let config = FunctionChoiceBehavior::auto()
        .configuration(&ChoiceContext::new(Some(&registry)))
        .unwrap();
    assert_eq!(
        qualified(&config),
        vec!["MyPlugin.Function1", "MyPlugin.Function2", "MyPlugin.Function3"]
    );
    assert!(config.auto_invoke());
    assert_eq!(config.choice(), FunctionChoice::Auto);
}

#[test]
fn auto_with_subset_advertises_exactly_that_subset() {
    let registry = registry();
    let f1 = registry.get_function(Some("MyPlugin"), "Function1").unwrap().clone();
    let f2 = registry.get_function(Some("MyPlugin"), "Function2").unwrap().clone();
    let config = FunctionChoiceBehavior::auto()
        .with_functions([f1, f2])
        .configuration(&ChoiceContext::new(Some(&registry)))
        .unwrap();
    assert_eq!(qualified(&config), vec!["MyPlugin.Function1", "MyPlugin.Function2"]);
}

#[test]
fn required_with_unregistered_function_fails() {
    // Function1 exists in a plugin, but that plugin was never registered.
    let plugin = my_plugin();
    let f1: KernelFunctionRef = plugin.get("Function1").unwrap().clone();
    let empty = FunctionRegistry::new();

    let err = FunctionChoiceBehavior::required()
        .with_functions([f1])
        .with_auto_invoke(true)
        .configuration(&ChoiceContext::new(Some(&empty)))
        .unwrap_err();
    assert!(matches!(
        &err,
        KernelError::FunctionNotAvailable { function } if function == "MyPlugin.Function1"
    ));
    assert_eq!(
        err.to_string(),
        "The specified function MyPlugin.Function1 is not available in the kernel."
    );
}

#[test]
fn auto_invoke_without_registry_fails() {
    for behavior in [FunctionChoiceBehavior::auto(), FunctionChoiceBehavior::required()] {
        let err = behavior.configuration(&ChoiceContext::new(None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Auto-invocation is not supported when no kernel is provided."
        );
    }
}

#[test]
fn every_mode_returns_all_functions_in_order() {
    let mut registry = registry();
    registry
        .add_from_functions("Other", [echo("Alpha"), echo("Beta")])
        .unwrap();
    let expected = registry.len();

    for choice in [FunctionChoice::Auto, FunctionChoice::Required, FunctionChoice::None] {
        let config = FunctionChoiceBehavior::for_choice(choice)
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        assert_eq!(config.functions().len(), expected);
        assert_eq!(qualified(&config)[3], "Other.Alpha");
    }
}

#[test]
fn none_forces_auto_invoke_off() {
    let registry = registry();
    for requested in [true, false] {
        let config = FunctionChoiceBehavior::none()
            .with_auto_invoke(requested)
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        assert!(!config.auto_invoke());
        assert_eq!(config.tool_choice(), Some("none"));
    }
}

#[test]
fn auto_invoke_flag_follows_request() {
    let registry = registry();
    for requested in [true, false] {
        let config = FunctionChoiceBehavior::required()
            .with_auto_invoke(requested)
            .configuration(&ChoiceContext::new(Some(&registry)))
            .unwrap();
        assert_eq!(config.auto_invoke(), requested);
    }
}

#[test]
fn empty_subset_ignores_registry() {
    let registry = registry();
    let config = FunctionChoiceBehavior::required()
        .with_functions(Vec::<KernelFunctionRef>::new())
        .configuration(&ChoiceContext::new(Some(&registry)))
        .unwrap();
    assert!(config.functions().is_empty());
    assert_eq!(config.tool_choice(), None);
}

#[test]
fn selector_returning_empty_clears_candidates() {
    let registry = registry();
    let selector: Arc<dyn FunctionSelector> =
        Arc::new(|_: &SelectorContext<'_>| -> Option<Vec<KernelFunctionRef>> {
            Some(Vec::new())
        });
    let behavior = FunctionChoiceBehavior::Auto(fnkernel::choice::InvocableChoice {
        selector: Some(selector),
        ..Default::default()
    });
    let config = behavior
        .configuration(&ChoiceContext::new(Some(&registry)))
        .unwrap();
    assert!(config.functions().is_empty());
}

// ── Naming ───────────────────────────────────────────────────────────

#[test]
fn default_policy_round_trips_every_function() {
    let registry = registry();
    let policy = FunctionNamePolicy::default();
    for function in registry.functions() {
        let fqn = policy.build_fqn(function.metadata());
        let parsed = policy.parse_fqn(&fqn, Some(&registry));
        assert_eq!(parsed.plugin_name.as_deref(), function.plugin_name());
        assert_eq!(parsed.function_name, function.name());
    }
}

#[test]
fn tool_definitions_use_policy_names() {
    let registry = registry();
    let config = FunctionChoiceBehavior::auto()
        .configuration(&ChoiceContext::new(Some(&registry)))
        .unwrap();

    let tools = config.tool_definitions(&FunctionNamePolicy::default());
    assert_eq!(tools[0].function.name, "MyPlugin-Function1");

    let tools = config.tool_definitions(&FunctionNamePolicy::function_name_only());
    assert_eq!(tools[1].function.name, "Function2");

    let json = serde_json::to_value(&tools).unwrap();
    assert_eq!(json[2]["type"], "function");
    assert_eq!(json[2]["function"]["description"], "Function3 description");
}

#[test]
fn fallback_parser_recovers_underscore() {
    let registry = registry();
    let policy =
        FunctionNamePolicy::default().with_parser(FallbackSeparatorParser::new(["-", "_"]));
    let parsed = policy.parse_fqn("MyPlugin_Function1", Some(&registry));
    assert_eq!(parsed, ParsedFunctionName::new(Some("MyPlugin"), "Function1"));

    // Without the fallback the name does not resolve.
    let plain = FunctionNamePolicy::default();
    assert!(plain.resolve("MyPlugin_Function1", &registry).is_none());
}

// ── Invocation round ─────────────────────────────────────────────────

#[tokio::test]
async fn full_round_with_call_limit() {
    let registry = registry();
    let policy = FunctionNamePolicy::default();
    let behavior = FunctionChoiceBehavior::auto()
        .with_selector(CallLimitSelector::new(1, policy.clone()));

    let mut history = ChatHistory::new();
    history.add_user_message("Run Function1");

    let config = behavior
        .configuration(&ChoiceContext::new(Some(&registry)).with_history(&history))
        .unwrap();
    assert_eq!(config.functions().len(), 3);

    // The model asks for Function1.
    let calls = vec![ToolCall::function("call-1", "MyPlugin-Function1", "{}")];
    history.add_tool_calls(calls.clone());
    let outcome = FunctionInvoker::new(&registry, &policy)
        .invoke_calls(&config, &calls)
        .await;
    assert!(!outcome.is_manual());
    outcome.append_to(&mut history);
    assert_eq!(
        history.messages().last().unwrap().content.as_deref(),
        Some("Function1 result")
    );

    // Next request: Function1 has been used up.
    let config = behavior
        .configuration(&ChoiceContext::new(Some(&registry)).with_history(&history))
        .unwrap();
    assert_eq!(
        qualified(&config),
        vec!["MyPlugin.Function2", "MyPlugin.Function3"]
    );
}

#[tokio::test]
async fn manual_round_hands_calls_back() {
    let registry = registry();
    let policy = FunctionNamePolicy::default();
    let config = FunctionChoiceBehavior::required()
        .with_auto_invoke(false)
        .configuration(&ChoiceContext::new(Some(&registry)))
        .unwrap();

    let outcome = FunctionInvoker::new(&registry, &policy)
        .invoke_calls(&config, &[ToolCall::function("call-1", "MyPlugin-Function2", "{}")])
        .await;
    match outcome {
        InvocationOutcome::Manual(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].qualified_name(), "MyPlugin.Function2");
        }
        InvocationOutcome::Invoked(_) => panic!("auto-invocation was disabled"),
    }
}
