//! Shared test utilities for the shellfs workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixture`] — [`TestDir`] scratch directories
//! - [`should`] — assertions that verify state through a chosen backend
//! - [`logs`] — dump log files when a test fails
//! - [`backends`] — which backends can actually run on this host

pub mod backends;
pub mod fixture;
pub mod logs;
pub mod should;

pub use backends::{available_backends, session_file_systems};
pub use fixture::TestDir;
pub use should::{OutcomeShould, PathShould};
