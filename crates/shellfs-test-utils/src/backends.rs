//! Which backends can run on this host.
//!
//! A backend is available when a trivial existence check through it
//! succeeds: the shell starts, and its output classifies as expected.

use std::sync::OnceLock;
use std::time::Duration;

use shellfs::{Backend, FileSystemOperations, SessionConfig};
use shellfs_process::ProcessInvoker;

use crate::TestDir;

/// Probe timeout; a shell that cannot list a directory by then is unusable
const PROBE_TIMEOUT: Duration = Duration::from_secs(20);

fn probe(backend: Backend) -> bool {
    if !backend.is_shell() {
        return true;
    }
    let dir = TestDir::new();
    let marker = dir.create_dir("probe");
    let fs =
        FileSystemOperations::with_invoker(backend, ProcessInvoker::with_timeout(PROBE_TIMEOUT));
    match fs.directory_exists(&marker) {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!(%backend, "Backend runs but cannot see a fresh directory");
            false
        }
        Err(e) => {
            tracing::info!(%backend, error = %e, "Backend unavailable");
            false
        }
    }
}

/// Backends from [`Backend::all_for_platform`] that actually work here.
///
/// Probed once per process, which also installs the `RUST_LOG`-filtered
/// subscriber from [`shellfs::logging`].
pub fn available_backends() -> &'static [Backend] {
    static AVAILABLE: OnceLock<Vec<Backend>> = OnceLock::new();
    AVAILABLE.get_or_init(|| {
        // Another harness may already own the global subscriber
        let _ = shellfs::logging::init();
        Backend::all_for_platform()
            .into_iter()
            .filter(|&backend| probe(backend))
            .collect()
    })
}

/// Whether `backend` can run on this host
pub fn is_available(backend: Backend) -> bool {
    available_backends().contains(&backend)
}

/// Façades for the session's configured backends that are available.
///
/// Reads `SHELLFS_*` from the environment. With no configuration this is
/// every available backend, so plain `cargo test` exercises all of them.
///
/// # Panics
///
/// Panics on malformed `SHELLFS_*` values.
pub fn session_file_systems() -> Vec<FileSystemOperations> {
    let mut config = SessionConfig::from_env()
        .unwrap_or_else(|e| panic!("session_file_systems: bad configuration: {e}"));
    if std::env::var_os(shellfs::config::BACKENDS_VAR).is_none() {
        config.backends = available_backends().to_vec();
    }
    config.backends.retain(|&backend| {
        let available = is_available(backend);
        if !available {
            tracing::warn!(%backend, "Skipping unavailable backend");
        }
        available
    });
    config.file_systems()
}
