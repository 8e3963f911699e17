//! Function abstractions and the function registry.
//!
//! Every capability a model can call is a [`KernelFunction`] implementor.
//! Functions are grouped into [`KernelPlugin`]s and collected in a
//! [`FunctionRegistry`], which the choice engine and invoker query.
//!
//! # Defining functions
//!
//! - **[`FnFunction`]**: closure-based, auto-parses arguments. Best for
//!   simple functions.
//! - **`impl KernelFunction`**: full struct with manual metadata and
//!   `invoke`. Best for functions with state.
//! - **[`DeclaredFunction`]**: metadata only; invocation returns an error.
//!   Used for functions loaded from a manifest.
//!
//! # Submodules
//!
//! - [`core`]: [`KernelFunction`] trait, [`FunctionMetadata`], [`FnFunction`],
//!   [`DeclaredFunction`], validation and truncation helpers.
//! - [`plugin`]: [`KernelPlugin`].
//! - [`registry`]: [`FunctionRegistry`].

pub mod core;
pub mod plugin;
pub mod registry;

pub use core::{
    DEFAULT_MAX_RESULT_BYTES, DeclaredFunction, FnFunction, FunctionFuture, FunctionMetadata,
    KernelFunction, KernelFunctionRef, truncate_result, validate_arguments, validate_name,
};
pub use plugin::KernelPlugin;
pub use registry::FunctionRegistry;
