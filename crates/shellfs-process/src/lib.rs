//! Blocking external process invocation for shellfs
//!
//! This crate provides the [`ProcessInvoker`] used by every shell backend,
//! and [`ExternalTool`] for driving the tool under test. It handles:
//!
//! - Separate capture of stdout and stderr
//! - Optional piped input from memory or a file
//! - Environment overrides scoped to the child process
//! - A bounded timeout that kills runaway children
//!
//! It knows nothing about file semantics; classification of the captured
//! output lives in the `shellfs` crate.

pub mod error;
pub mod invoker;
pub mod tool;

pub use error::{ProcessError, Result};
pub use invoker::{DEFAULT_TIMEOUT, Invocation, InvocationResult, ProcessInvoker, Stdin};
pub use tool::{ExternalTool, ToolOutput};
