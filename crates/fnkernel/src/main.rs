//! Inspect function choice resolution and name parsing offline.
//!
//! Plugins come from a JSON manifest of declared functions, so no function
//! is ever executed.
//!
//! # Examples
//!
//! ```sh
//! # Tool definitions the model would see with default settings
//! fnkernel resolve --plugins plugins.json
//!
//! # Same, with a choice behavior and naming policy from settings
//! fnkernel resolve --plugins plugins.json --settings settings.json
//!
//! # How a model-supplied name maps back to the registry
//! fnkernel parse MyPlugin_Function1 --plugins plugins.json --fallback _
//! ```
//!
//! Set `RUST_LOG=fnkernel=debug` to trace resolution on stderr.

use clap::{Parser, Subcommand};
use fnkernel::{KernelError, KernelResult};
use fnkernel::choice::{ChoiceContext, FunctionChoiceBehavior};
use fnkernel::functions::FunctionRegistry;
use fnkernel::settings::{ExecutionSettings, FunctionNamePolicySettings, PluginManifest};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Inspect function choice resolution and name parsing.
#[derive(Parser)]
#[command(name = "fnkernel", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tool definitions, tool choice and auto-invoke flag a
    /// request would use
    Resolve {
        /// Plugin manifest (JSON)
        #[arg(long)]
        plugins: PathBuf,

        /// Execution settings (JSON). Defaults to auto choice over every
        /// function with the default naming policy.
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Parse a model-supplied function name and look it up
    Parse {
        /// The fully qualified name as the model sent it
        fqn: String,

        /// Plugin manifest (JSON)
        #[arg(long)]
        plugins: PathBuf,

        /// Separator between plugin and function names
        #[arg(long, default_value = "-")]
        separator: String,

        /// Extra separators to try, comma-separated. Ignored with
        /// --function-name-only.
        #[arg(long, value_delimiter = ',')]
        fallback: Vec<String>,

        /// Treat the whole name as the function name
        #[arg(long)]
        function_name_only: bool,
    },
}

fn load_registry(path: &Path) -> KernelResult<FunctionRegistry> {
    PluginManifest::load(path)?.into_registry()
}

fn resolve(plugins: &Path, settings: Option<&Path>) -> KernelResult<serde_json::Value> {
    let registry = load_registry(plugins)?;
    let settings = match settings {
        Some(path) => ExecutionSettings::load(path)?,
        None => ExecutionSettings::default(),
    };

    let behavior = match &settings.function_choice_behavior {
        Some(s) => s.to_behavior(Some(&registry))?,
        None => FunctionChoiceBehavior::auto(),
    };
    let policy = settings.function_name_policy.to_policy();
    let config = behavior.configuration(&ChoiceContext::new(Some(&registry)))?;

    Ok(json!({
        "tool_choice": config.tool_choice(),
        "auto_invoke": config.auto_invoke(),
        "tools": config.tool_definitions(&policy),
    }))
}

fn parse(
    fqn: &str,
    plugins: &Path,
    separator: &str,
    fallback: &[String],
    function_name_only: bool,
) -> KernelResult<serde_json::Value> {
    let registry = load_registry(plugins)?;
    let policy = FunctionNamePolicySettings {
        separator: separator.to_string(),
        use_function_name_only: function_name_only,
        fallback_separators: fallback.to_vec(),
    }
    .to_policy();

    let parsed = policy.parse_fqn(fqn, Some(&registry));
    let resolved = parsed
        .resolve(&registry)
        .map(|f| f.metadata().qualified_name());

    Ok(json!({
        "plugin_name": parsed.plugin_name,
        "function_name": parsed.function_name,
        "resolved": resolved,
    }))
}

fn run(cli: &Cli) -> KernelResult<serde_json::Value> {
    match &cli.command {
        Command::Resolve { plugins, settings } => resolve(plugins, settings.as_deref()),
        Command::Parse {
            fqn,
            plugins,
            separator,
            fallback,
            function_name_only,
        } => parse(fqn, plugins, separator, fallback, *function_name_only),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output = run(&cli)
        .and_then(|v| serde_json::to_string_pretty(&v).map_err(KernelError::from));

    match output {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
