//! Invocation of external tools under test
//!
//! Tests drive the tool being validated (a VCS, a maintenance daemon) as an
//! opaque process and then observe the file system. Environment overrides
//! given here reach the spawned process only, never the caller.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::{ProcessError, Result};
use crate::invoker::{Invocation, InvocationResult, ProcessInvoker, Stdin};

/// An external executable bound to a working directory and base environment
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    working_dir: PathBuf,
    env: Vec<(OsString, OsString)>,
    invoker: ProcessInvoker,
}

impl ExternalTool {
    /// Bind `program` to run inside `working_dir`
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            env: Vec::new(),
            invoker: ProcessInvoker::default(),
        }
    }

    /// Add a variable to every invocation of this tool
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Use a specific invoker (and therefore timeout)
    pub fn with_invoker(mut self, invoker: ProcessInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    /// Program path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Working directory
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run with arguments only
    pub fn run(&self, args: &[&str]) -> Result<ToolOutput> {
        self.run_with_input(args, &[], Stdin::Null)
    }

    /// Run with per-call environment overrides
    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Result<ToolOutput> {
        self.run_with_input(args, env, Stdin::Null)
    }

    /// Run with per-call environment overrides and piped input.
    ///
    /// Per-call variables are applied after the tool's base environment and
    /// win on conflicts.
    pub fn run_with_input(
        &self,
        args: &[&str],
        env: &[(&str, &str)],
        stdin: Stdin,
    ) -> Result<ToolOutput> {
        let invocation = Invocation::new(&self.program)
            .current_dir(&self.working_dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())))
            .envs(env.iter().copied())
            .args(args)
            .stdin(stdin);

        let result = self.invoker.invoke(&invocation)?;
        Ok(ToolOutput {
            program: self.program.to_string_lossy().into_owned(),
            timeout: self.invoker.timeout(),
            result,
        })
    }
}

/// Result of running an [`ExternalTool`]
#[derive(Debug, Clone)]
pub struct ToolOutput {
    program: String,
    timeout: std::time::Duration,
    result: InvocationResult,
}

impl ToolOutput {
    /// Raw invocation result
    pub fn result(&self) -> &InvocationResult {
        &self.result
    }

    /// Captured stdout
    pub fn stdout(&self) -> &str {
        &self.result.stdout
    }

    /// Captured stderr
    pub fn stderr(&self) -> &str {
        &self.result.stderr
    }

    /// Convert a failed run into an error.
    ///
    /// # Errors
    ///
    /// [`ProcessError::TimedOut`] if the tool was killed, and
    /// [`ProcessError::CommandFailed`] for a non-zero exit code.
    pub fn ensure_success(self) -> Result<InvocationResult> {
        if self.result.timed_out {
            return Err(ProcessError::TimedOut {
                program: self.program,
                timeout: self.timeout,
            });
        }
        if self.result.exit_code != 0 {
            return Err(ProcessError::CommandFailed {
                code: self.result.exit_code,
                stderr: self.result.stderr,
            });
        }
        Ok(self.result)
    }
}
