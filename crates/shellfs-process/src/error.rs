//! Error types for process invocation

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while invoking an external process
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The executable could not be located or started
    #[error("Failed to start '{program}': {source}")]
    Launch {
        /// Program that was requested
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The file meant to feed standard input could not be opened
    #[error("Failed to open input file {path}: {source}")]
    Input {
        /// Path of the input file
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while waiting on the child process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Subprocess exited with non-zero status
    #[error("Command failed (exit code {code}): {stderr}")]
    CommandFailed {
        /// Exit code from the subprocess
        code: i32,
        /// Captured stderr output
        stderr: String,
    },

    /// Subprocess was killed after exceeding its timeout
    #[error("'{program}' timed out after {timeout:?}")]
    TimedOut {
        /// Program that was killed
        program: String,
        /// Timeout that was applied
        timeout: Duration,
    },
}

/// Result type alias for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
