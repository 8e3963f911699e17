//! Integration tests for the `fnkernel` binary.
//!
//! Each test writes a manifest (and optionally settings) to a temp dir and
//! checks the JSON printed on stdout.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const MANIFEST: &str = r#"{
    "plugins": [
        {
            "name": "MyPlugin",
            "functions": [
                {"name": "Function1", "description": "First"},
                {"name": "Function2", "description": "Second"},
                {"name": "Function3", "description": "Third"}
            ]
        }
    ]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn fnkernel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fnkernel"))
        .args(args)
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn resolve_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = write(dir.path(), "plugins.json", MANIFEST);

    let json = stdout_json(&fnkernel(&["resolve", "--plugins", plugins.to_str().unwrap()]));
    assert_eq!(json["tool_choice"], "auto");
    assert_eq!(json["auto_invoke"], true);
    let tools = json["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[0]["function"]["name"], "MyPlugin-Function1");
}

#[test]
fn resolve_with_settings() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = write(dir.path(), "plugins.json", MANIFEST);
    let settings = write(
        dir.path(),
        "settings.json",
        r#"{
            "function_choice_behavior": {
                "type": "none",
                "functions": ["MyPlugin.Function3"]
            },
            "function_name_policy": {"separator": "_"}
        }"#,
    );

    let json = stdout_json(&fnkernel(&[
        "resolve",
        "--plugins",
        plugins.to_str().unwrap(),
        "--settings",
        settings.to_str().unwrap(),
    ]));
    assert_eq!(json["tool_choice"], "none");
    assert_eq!(json["auto_invoke"], false);
    assert_eq!(json["tools"][0]["function"]["name"], "MyPlugin_Function3");
    assert_eq!(json["tools"].as_array().unwrap().len(), 1);
}

#[test]
fn resolve_reports_unknown_function() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = write(dir.path(), "plugins.json", MANIFEST);
    let settings = write(
        dir.path(),
        "settings.json",
        r#"{"function_choice_behavior": {"type": "auto", "functions": ["MyPlugin.Missing"]}}"#,
    );

    let output = fnkernel(&[
        "resolve",
        "--plugins",
        plugins.to_str().unwrap(),
        "--settings",
        settings.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: The specified function MyPlugin.Missing was not found."));
}

#[test]
fn parse_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = write(dir.path(), "plugins.json", MANIFEST);

    let json = stdout_json(&fnkernel(&[
        "parse",
        "MyPlugin_Function2",
        "--plugins",
        plugins.to_str().unwrap(),
        "--fallback",
        "_",
    ]));
    assert_eq!(json["plugin_name"], "MyPlugin");
    assert_eq!(json["function_name"], "Function2");
    assert_eq!(json["resolved"], "MyPlugin.Function2");

    let json = stdout_json(&fnkernel(&[
        "parse",
        "MyPlugin_Function2",
        "--plugins",
        plugins.to_str().unwrap(),
    ]));
    assert!(json["plugin_name"].is_null());
    assert!(json["resolved"].is_null());
}

#[test]
fn missing_manifest_fails() {
    let output = fnkernel(&["resolve", "--plugins", "/nonexistent/plugins.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: failed to read /nonexistent/plugins.json"));
}

#[test]
fn function_name_only_overrides_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = write(dir.path(), "plugins.json", MANIFEST);

    let json = stdout_json(&fnkernel(&[
        "parse",
        "MyPlugin_Function2",
        "--plugins",
        plugins.to_str().unwrap(),
        "--fallback",
        "_",
        "--function-name-only",
    ]));
    assert!(json["plugin_name"].is_null());
    assert_eq!(json["function_name"], "MyPlugin_Function2");
    assert!(json["resolved"].is_null());
}
