//! The file-system operations façade
//!
//! [`FileSystemOperations`] runs the operation contract through one
//! backend. Expected failures come back as [`ClassifiedOutcome`]s; `Err` is
//! reserved for malformed operations, capability mismatches, processes that
//! cannot be started, and existence checks whose answer is unknowable.

use std::path::Path;

use shellfs_process::ProcessInvoker;

use crate::backend::Backend;
use crate::classify::listing_entries;
use crate::error::{Error, Result};
use crate::native::{self, HeldFile};
use crate::operation::{Operation, OperationKind};
use crate::outcome::{Category, Classified, ClassifiedOutcome};
use crate::retry::{DeletionOutcome, DirectoryRemover, RetryPolicy, RetryingDirectoryDeleter};
use crate::shell::{ShellDialect, dialect_for, names_equal};

/// Result of executing one operation: its outcome and, on success, the
/// backend's payload (file contents, listing, size text)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub outcome: ClassifiedOutcome,
    pub output: String,
}

impl Execution {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            outcome: ClassifiedOutcome::success(""),
            output: output.into(),
        }
    }

    pub fn failed(outcome: ClassifiedOutcome) -> Self {
        Self {
            outcome,
            output: String::new(),
        }
    }
}

#[derive(Debug)]
enum Engine {
    Native,
    Shell {
        dialect: Box<dyn ShellDialect>,
        invoker: ProcessInvoker,
    },
}

/// One backend's implementation of the operation contract
#[derive(Debug)]
pub struct FileSystemOperations {
    backend: Backend,
    engine: Engine,
}

impl FileSystemOperations {
    pub fn new(backend: Backend) -> Self {
        Self::with_invoker(backend, ProcessInvoker::new())
    }

    /// Use `invoker` (and its timeout) for shell processes
    pub fn with_invoker(backend: Backend, invoker: ProcessInvoker) -> Self {
        let engine = match dialect_for(backend) {
            Some(dialect) => Engine::Shell { dialect, invoker },
            None => Engine::Native,
        };
        Self { backend, engine }
    }

    pub fn native() -> Self {
        Self::new(Backend::Native)
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Capability-check, validate and run `op`.
    ///
    /// Unsupported kinds are rejected before their arguments are looked at.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`], [`Error::Capability`], or
    /// [`Error::Process`] when the shell could not be started.
    pub fn execute(&self, op: &Operation) -> Result<Execution> {
        self.backend.check(op.kind())?;
        op.validate()?;

        let execution = match &self.engine {
            Engine::Native => native::run(op),
            Engine::Shell { dialect, invoker } => {
                let command = dialect.format(op)?;
                tracing::debug!(
                    backend = %self.backend,
                    kind = ?op.kind(),
                    script = %command.script,
                    "Running shell command"
                );
                let result = invoker.invoke(&command.to_invocation())?;
                let outcome = dialect.classify(op, &result);
                let output = match (outcome.succeeded(), op.kind()) {
                    (true, OperationKind::Read) => dialect.normalize_read(&result.stdout),
                    (true, _) => result.stdout,
                    (false, _) => String::new(),
                };
                Execution { outcome, output }
            }
        };

        if !execution.outcome.succeeded() {
            tracing::debug!(
                backend = %self.backend,
                kind = ?op.kind(),
                path = %op.path(),
                outcome = %execution.outcome,
                "Operation did not succeed"
            );
        }
        Ok(execution)
    }

    fn outcome(&self, op: Operation) -> Result<ClassifiedOutcome> {
        Ok(self.execute(&op)?.outcome)
    }

    fn payload(&self, op: Operation) -> Result<Classified<String>> {
        let execution = self.execute(&op)?;
        Ok(if execution.outcome.succeeded() {
            Classified::ok(execution.outcome, execution.output)
        } else {
            Classified::failed(execution.outcome)
        })
    }

    fn entry_matches(&self, kind: OperationKind, line: &str, name: &str) -> bool {
        match &self.engine {
            Engine::Native => names_equal(line, name),
            Engine::Shell { dialect, .. } => dialect.entry_matches(kind, line, name),
        }
    }

    /// Resolve an existence check by listing the parent directory
    fn exists(&self, op: Operation) -> Result<bool> {
        let execution = self.execute(&op)?;
        let name = op.entry_name()?;
        match execution.outcome.category() {
            Category::Success => Ok(listing_entries(&execution.output)
                .any(|line| self.entry_matches(op.kind(), line, name))),
            Category::NotFound => Ok(false),
            _ => Err(Error::Indeterminate {
                path: op.path().to_string(),
                outcome: execution.outcome,
            }),
        }
    }

    /// Whether `path` names an existing file (not a directory)
    pub fn file_exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        self.exists(Operation::file_exists(path))
    }

    pub fn directory_exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        self.exists(Operation::directory_exists(path))
    }

    /// Create a zero-length file, truncating any existing one
    pub fn create_empty_file(&self, path: impl AsRef<Path>) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::create_file(path))
    }

    pub fn create_directory(&self, path: impl AsRef<Path>) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::create_directory(path))
    }

    pub fn delete_file(&self, path: impl AsRef<Path>) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::delete_file(path))
    }

    /// Recursively and forcefully delete a directory
    pub fn delete_directory(&self, path: impl AsRef<Path>) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::delete_directory(path))
    }

    /// Move a file; [`Category::AlreadyExists`] if `target` exists
    pub fn move_file(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::move_file(source, target))
    }

    /// Move a file over `target`
    pub fn replace_file(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::replace(source, target))
    }

    pub fn move_directory(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::move_directory(source, target))
    }

    /// Rename `source` to `new_name` inside `working_dir`
    pub fn rename_directory(
        &self,
        working_dir: impl AsRef<Path>,
        source: &str,
        new_name: &str,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::rename_directory(working_dir, source, new_name))
    }

    pub fn read_all_text(&self, path: impl AsRef<Path>) -> Result<Classified<String>> {
        self.payload(Operation::read(path))
    }

    /// Write `content` without adding a line terminator
    pub fn write_all_text(
        &self,
        path: impl AsRef<Path>,
        content: &str,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::write(path, content))
    }

    pub fn append_all_text(
        &self,
        path: impl AsRef<Path>,
        content: &str,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::append(path, content))
    }

    pub fn create_hard_link(
        &self,
        new_link: impl AsRef<Path>,
        existing: impl AsRef<Path>,
    ) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::hard_link(new_link, existing))
    }

    /// The backend's own listing format
    pub fn enumerate_directory(&self, path: impl AsRef<Path>) -> Result<Classified<String>> {
        self.payload(Operation::enumerate(path))
    }

    /// Size in bytes. Output that is not a number is an
    /// [`Category::Unknown`] outcome.
    pub fn file_size(&self, path: impl AsRef<Path>) -> Result<Classified<u64>> {
        let execution = self.execute(&Operation::size(path))?;
        if !execution.outcome.succeeded() {
            return Ok(Classified::failed(execution.outcome));
        }
        match execution.output.trim().parse::<u64>() {
            Ok(size) => Ok(Classified::ok(execution.outcome, size)),
            Err(_) => Ok(Classified::failed(ClassifiedOutcome::new(
                Category::Unknown,
                format!("unexpected size output: {:?}", execution.output),
            ))),
        }
    }

    pub fn change_mode(&self, path: impl AsRef<Path>, mode: u32) -> Result<ClassifiedOutcome> {
        self.outcome(Operation::change_mode(path, mode))
    }

    /// Write `content` and keep the file open exclusively until the
    /// returned guard is dropped
    pub fn open_file_and_write(
        &self,
        path: impl AsRef<Path>,
        content: &str,
    ) -> Result<Classified<HeldFile>> {
        let op = Operation::open_and_write(path, content);
        self.backend.check(op.kind())?;
        op.validate()?;

        let path = native::resolve(&op, op.path());
        match HeldFile::open(&path, content) {
            Ok(held) => Ok(Classified::ok(ClassifiedOutcome::success(""), held)),
            Err(e) => Ok(Classified::failed(ClassifiedOutcome::new(
                native::category_of(&e),
                format!("{}: {e}", path.display()),
            ))),
        }
    }

    /// Delete a directory, retrying within `policy`
    pub fn delete_directory_with_retries(
        &self,
        path: impl AsRef<Path>,
        policy: &RetryPolicy,
    ) -> DeletionOutcome {
        RetryingDirectoryDeleter::new(policy.clone()).delete(self, path.as_ref())
    }
}

impl DirectoryRemover for FileSystemOperations {
    fn directory_exists(&self, path: &Path) -> Result<bool> {
        FileSystemOperations::directory_exists(self, path)
    }

    fn remove_directory(&self, path: &Path) -> Result<ClassifiedOutcome> {
        self.delete_directory(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_capability_is_checked_before_running() {
        let ops = FileSystemOperations::new(Backend::Cmd);
        let err = ops.change_mode("C:/f", 0o644).unwrap_err();
        assert!(matches!(
            err,
            Error::Capability {
                backend: Backend::Cmd,
                kind: OperationKind::ChangeMode
            }
        ));
    }

    #[test]
    fn test_capability_wins_over_malformed_arguments() {
        let capability = |err: Error, backend, kind| {
            matches!(err, Error::Capability { backend: b, kind: k } if b == backend && k == kind)
        };
        let cmd = FileSystemOperations::new(Backend::Cmd);
        assert!(capability(
            cmd.change_mode("", 0o644).unwrap_err(),
            Backend::Cmd,
            OperationKind::ChangeMode
        ));
        assert!(capability(
            cmd.change_mode("/x", 0o17777).unwrap_err(),
            Backend::Cmd,
            OperationKind::ChangeMode
        ));

        let bash = FileSystemOperations::new(Backend::Bash);
        assert!(capability(
            bash.open_file_and_write("", "x").unwrap_err(),
            Backend::Bash,
            OperationKind::OpenAndWrite
        ));
    }

    #[test]
    fn test_invalid_operation_is_rejected_before_running() {
        let ops = FileSystemOperations::new(Backend::Bash);
        assert!(matches!(
            ops.write_all_text("", "x").unwrap_err(),
            Error::InvalidOperation { .. }
        ));
    }

    #[test]
    fn test_native_existence_distinguishes_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let ops = FileSystemOperations::native();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("file"), "").unwrap();

        assert!(ops.directory_exists(temp.path().join("sub")).unwrap());
        assert!(!ops.file_exists(temp.path().join("sub")).unwrap());
        assert!(ops.file_exists(temp.path().join("file")).unwrap());
        assert!(!ops.file_exists(temp.path().join("missing/file")).unwrap());
    }

    #[test]
    fn test_native_size_and_read() {
        let temp = TempDir::new().unwrap();
        let ops = FileSystemOperations::native();
        let file = temp.path().join("f");
        assert!(ops.write_all_text(&file, "hello").unwrap().succeeded());
        assert!(ops.append_all_text(&file, " world").unwrap().succeeded());

        assert_eq!(ops.file_size(&file).unwrap().into_result(), Ok(11));
        assert_eq!(
            ops.read_all_text(&file).unwrap().value().map(String::as_str),
            Some("hello world")
        );
    }

    #[test]
    fn test_native_open_file_and_write_holds_the_file() {
        let temp = TempDir::new().unwrap();
        let ops = FileSystemOperations::native();
        let file = temp.path().join("held");
        let held = ops.open_file_and_write(&file, "x").unwrap().into_result().unwrap();
        assert_eq!(held.path(), file);
    }

    #[test]
    fn test_delete_directory_with_retries_removes_tree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("tree");
        fs::create_dir_all(dir.join("a/b")).unwrap();
        fs::write(dir.join("a/b/f"), "x").unwrap();

        let outcome = FileSystemOperations::native()
            .delete_directory_with_retries(&dir, &RetryPolicy::default());
        assert_eq!(outcome, DeletionOutcome::Succeeded { attempts: 1 });
        assert!(!dir.exists());
    }
}
