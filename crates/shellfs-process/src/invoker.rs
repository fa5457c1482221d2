//! Blocking process invocation
//!
//! Spawns one process per call, optionally feeds it standard input, and
//! captures stdout and stderr into separate buffers. Every call is bounded
//! by a timeout; a child that outlives it is killed and the result is
//! flagged as `timed_out` instead of blocking the caller forever.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ProcessError, Result};

/// Timeout applied when neither the invoker nor the invocation sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for stream readers once the child's process tree has
/// been killed.
///
/// Grandchildren may keep the pipes open after the direct child is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Source for a child's standard input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stdin {
    /// No input; the child sees a closed stream
    #[default]
    Null,
    /// In-memory bytes
    Bytes(Vec<u8>),
    /// Contents of a file, streamed
    File(PathBuf),
}

impl Stdin {
    fn open(&self) -> Result<Option<Box<dyn Read + Send>>> {
        match self {
            Stdin::Null => Ok(None),
            Stdin::Bytes(bytes) => Ok(Some(Box::new(Cursor::new(bytes.clone())))),
            Stdin::File(path) => {
                let file = File::open(path).map_err(|source| ProcessError::Input {
                    path: path.clone(),
                    source,
                })?;
                Ok(Some(Box::new(file)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Quoted(OsString),
    Raw(OsString),
}

/// A single process invocation: program, arguments, and environment.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: OsString,
    args: Vec<Arg>,
    working_dir: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    stdin: Stdin,
    timeout: Option<Duration>,
}

impl Invocation {
    /// Start building an invocation of `program`
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            stdin: Stdin::Null,
            timeout: None,
        }
    }

    /// Append an argument, quoted by the platform's usual rules
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(Arg::Quoted(arg.as_ref().to_os_string()));
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(Arg::Quoted(arg.as_ref().to_os_string()));
        }
        self
    }

    /// Append an argument verbatim to the command line.
    ///
    /// On Windows the text is not quoted or escaped, which `cmd.exe /C`
    /// needs to see its script unchanged. Elsewhere this is the same as
    /// [`Invocation::arg`].
    pub fn raw_arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(Arg::Raw(arg.as_ref().to_os_string()));
        self
    }

    /// Set the child's working directory
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable on the child only
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Set several environment variables on the child only
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, value) in vars {
            self.env
                .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        }
        self
    }

    /// Feed the child's standard input
    pub fn stdin(mut self, stdin: Stdin) -> Self {
        self.stdin = stdin;
        self
    }

    /// Override the invoker's timeout for this call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program to run
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments as lossy strings, in order
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| match arg {
                Arg::Quoted(a) | Arg::Raw(a) => a.to_string_lossy().into_owned(),
            })
            .collect()
    }

    /// Working directory, if one was set
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Environment overrides, in order
    pub fn env_vars(&self) -> &[(OsString, OsString)] {
        &self.env
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        for arg in &self.args {
            match arg {
                Arg::Quoted(a) => {
                    cmd.arg(a);
                }
                Arg::Raw(a) => push_raw(&mut cmd, a),
            }
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        own_process_group(&mut cmd);
        cmd
    }
}

#[cfg(windows)]
fn push_raw(cmd: &mut Command, arg: &OsStr) {
    use std::os::windows::process::CommandExt;
    cmd.raw_arg(arg);
}

#[cfg(not(windows))]
fn push_raw(cmd: &mut Command, arg: &OsStr) {
    cmd.arg(arg);
}

/// Lead a new process group so a timeout can kill the whole tree
#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let group = Pid::from_raw(child.id() as i32);
    // ESRCH once every member is gone
    let _ = killpg(group, Signal::SIGKILL);
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Outcome of one process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Exit code, `-1` when the process was terminated without one
    pub exit_code: i32,
    /// Captured standard output (lossy UTF-8)
    pub stdout: String,
    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
    /// Whether the process was killed after exceeding its timeout
    pub timed_out: bool,
}

impl InvocationResult {
    /// Whether the process ran to completion with exit code zero
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// stderr followed by stdout, the text classifiers match against
    pub fn combined_output(&self) -> String {
        match (self.stderr.is_empty(), self.stdout.is_empty()) {
            (true, _) => self.stdout.clone(),
            (false, true) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stderr, self.stdout),
        }
    }
}

/// Runs [`Invocation`]s synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInvoker {
    timeout: Duration,
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProcessInvoker {
    /// Create an invoker with the default timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an invoker with a custom default timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Default timeout for invocations that do not set their own
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `invocation` to completion or timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Launch`] when the program cannot be started
    /// and [`ProcessError::Input`] when a stdin file cannot be opened. A
    /// non-zero exit or a timeout is not an error; both are reported in the
    /// returned [`InvocationResult`].
    pub fn invoke(&self, invocation: &Invocation) -> Result<InvocationResult> {
        let timeout = invocation.timeout.unwrap_or(self.timeout);
        let input = invocation.stdin.open()?;

        let mut cmd = invocation.command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        tracing::debug!(
            program = %invocation.program_name(),
            args = ?invocation.arg_strings(),
            cwd = ?invocation.working_dir,
            "Invoking process"
        );

        let mut child = cmd.spawn().map_err(|source| ProcessError::Launch {
            program: invocation.program_name(),
            source,
        })?;

        let writer = match (child.stdin.take(), input) {
            (Some(mut pipe), Some(mut source)) => Some(thread::spawn(move || {
                let copied = io::copy(&mut source, &mut pipe);
                // Dropping the pipe closes the child's stdin
                drop(pipe);
                copied
            })),
            _ => None,
        };
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let (status, mut timed_out) = wait_with_deadline(&mut child, deadline)?;
        if timed_out {
            tracing::warn!(
                program = %invocation.program_name(),
                ?timeout,
                "Process timed out and was killed"
            );
        }

        // Output collection shares the child's deadline
        let drain_until = if timed_out {
            Instant::now() + DRAIN_GRACE
        } else {
            deadline
        };
        let mut out = collect(&stdout, drain_until);
        let mut err = collect(&stderr, drain_until);
        if out.is_none() || err.is_none() {
            if !timed_out {
                tracing::warn!(
                    program = %invocation.program_name(),
                    ?timeout,
                    "Process exited but its output stayed open past the timeout"
                );
                timed_out = true;
            }
            kill_tree(&mut child);
            let grace = Instant::now() + DRAIN_GRACE;
            out = out.or_else(|| collect(&stdout, grace));
            err = err.or_else(|| collect(&stderr, grace));
        }

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => {
                    tracing::warn!(error = %e, "Failed to write process input");
                }
                Err(_) => tracing::warn!("Input writer thread panicked"),
                _ => {}
            }
        }

        let result = InvocationResult {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.unwrap_or_default()).into_owned(),
            stderr: String::from_utf8_lossy(&err.unwrap_or_default()).into_owned(),
            timed_out,
        };

        tracing::trace!(
            exit_code = result.exit_code,
            stdout = %result.stdout,
            stderr = %result.stderr,
            "Process finished"
        );

        Ok(result)
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    match stream {
        Some(mut stream) => {
            thread::spawn(move || {
                let mut buf = Vec::new();
                // Whatever was read before an error stays in `buf`
                let _ = stream.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }
        None => {
            let _ = tx.send(Vec::new());
        }
    }
    rx
}

/// Bytes a reader produced by `until`, `None` while it is still blocked
fn collect(rx: &Receiver<Vec<u8>>, until: Instant) -> Option<Vec<u8>> {
    match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(bytes),
        // The reader thread died without sending
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<(ExitStatus, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            // The child may exit between try_wait and kill
            kill_tree(child);
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
