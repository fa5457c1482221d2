//! Shell backends
//!
//! Each shell is a [`ShellDialect`]: a [`CommandFormatter`] that renders an
//! [`Operation`] into a [`ShellCommand`], and an [`OutputClassifier`] that
//! maps what the shell printed back onto a [`ClassifiedOutcome`].

pub mod bash;
pub mod cmd;
pub mod powershell;

use std::fmt::Debug;
use std::path::PathBuf;

use shellfs_process::{Invocation, InvocationResult};

use crate::backend::Backend;
use crate::classify::{self, Rule};
use crate::error::{Error, Result};
use crate::operation::{Operation, OperationKind};
use crate::outcome::ClassifiedOutcome;

pub use bash::BashDialect;
pub use cmd::CmdDialect;
pub use powershell::PowerShellDialect;

/// A fully rendered shell command, ready to invoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    /// Arguments placed before the script
    pub args: Vec<String>,
    pub script: String,
    /// Pass the script verbatim instead of quoting it for the platform
    pub raw_script: bool,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>, args: &[&str], script: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            script: script.into(),
            raw_script: false,
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn raw(mut self) -> Self {
        self.raw_script = true;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Run from the operation's working directory, if it has one
    pub fn in_dir_of(mut self, op: &Operation) -> Self {
        self.working_dir = op.working_dir().map(|dir| dir.to_native());
        self
    }

    pub fn to_invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(&self.program).args(&self.args);
        invocation = if self.raw_script {
            invocation.raw_arg(&self.script)
        } else {
            invocation.arg(&self.script)
        };
        if let Some(dir) = &self.working_dir {
            invocation = invocation.current_dir(dir);
        }
        invocation.envs(self.env.iter().map(|(k, v)| (k, v)))
    }
}

/// Renders operations into backend-specific command syntax
pub trait CommandFormatter {
    /// Render `op`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] when an argument cannot be expressed in
    /// this shell, [`Error::Capability`] for kinds the shell lacks.
    fn format(&self, op: &Operation) -> Result<ShellCommand>;
}

/// Maps a shell's free-text output onto the shared failure taxonomy
pub trait OutputClassifier {
    /// Ordered rule table, first match wins
    fn rules(&self) -> &'static [Rule];

    /// Whether a non-zero exit means failure for this kind
    fn trusts_exit_code(&self, _kind: OperationKind) -> bool {
        true
    }

    fn classify(&self, op: &Operation, result: &InvocationResult) -> ClassifiedOutcome {
        classify::classify_with_paths(
            self.rules(),
            op.kind(),
            result,
            self.trusts_exit_code(op.kind()),
            &op.mentioned_paths(),
        )
    }

    /// Recover file contents from a successful read's stdout
    fn normalize_read(&self, stdout: &str) -> String {
        stdout.to_string()
    }

    /// Whether one line of an existence-check listing names `name`
    fn entry_matches(&self, kind: OperationKind, line: &str, name: &str) -> bool;
}

/// A complete shell backend
pub trait ShellDialect: CommandFormatter + OutputClassifier + Send + Sync + Debug {
    fn backend(&self) -> Backend;
}

/// The dialect behind a shell backend, `None` for [`Backend::Native`]
pub fn dialect_for(backend: Backend) -> Option<Box<dyn ShellDialect>> {
    match backend {
        Backend::Native => None,
        Backend::Bash => Some(Box::new(BashDialect)),
        Backend::Cmd => Some(Box::new(CmdDialect)),
        Backend::PowerShell => Some(Box::new(PowerShellDialect)),
    }
}

/// Compare listing names the way the host file system does
pub fn names_equal(a: &str, b: &str) -> bool {
    if cfg!(any(windows, target_os = "macos")) {
        a.to_lowercase() == b.to_lowercase()
    } else {
        a == b
    }
}

fn unsupported(backend: Backend, op: &Operation) -> Error {
    Error::Capability {
        backend,
        kind: op.kind(),
    }
}
