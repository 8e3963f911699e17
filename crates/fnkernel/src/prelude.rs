//! Convenience re-exports for common `fnkernel` types.
//!
//! ```ignore
//! use fnkernel::prelude::*;
//! ```
//!
//! Covers building a registry, resolving a choice behavior, naming
//! functions on the wire and invoking the calls a model returns. Settings
//! and manifest types live in [`settings`](crate::settings).

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{KernelError, KernelResult, ToolCall, ToolDef, json_schema_for};

// ── Functions ───────────────────────────────────────────────────────
pub use crate::functions::{
    DeclaredFunction, FnFunction, FunctionFuture, FunctionMetadata, FunctionRegistry,
    KernelFunction, KernelFunctionRef, KernelPlugin,
};

// ── Choice ──────────────────────────────────────────────────────────
pub use crate::choice::{
    CallLimitSelector, ChoiceContext, FunctionChoice, FunctionChoiceBehavior,
    FunctionChoiceConfiguration, FunctionSelector, SelectorContext,
};

// ── Naming ──────────────────────────────────────────────────────────
pub use crate::naming::{
    FallbackSeparatorParser, FqnParser, FunctionNamePolicy, ParseFqnContext, ParsedFunctionName,
};

// ── Invocation and history ──────────────────────────────────────────
pub use crate::history::{ChatHistory, Message, MessageRole};
pub use crate::invoke::{
    FunctionCallContent, FunctionInvoker, FunctionResultContent, InvocationOutcome, InvokerConfig,
};
