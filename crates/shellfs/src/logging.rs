//! Tracing setup for test binaries and tools built on shellfs

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directive used when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Install a compact stderr subscriber filtered by `RUST_LOG`.
///
/// Set `RUST_LOG=shellfs=debug` to see every rendered command and its
/// classification. Fails if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with(DEFAULT_DIRECTIVE)
}

/// Like [`init`], falling back to `directive` instead of `info`
pub fn init_with(directive: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
