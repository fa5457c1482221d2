//! Native backend: operations as direct `std::fs` calls
//!
//! Failures are mapped from [`io::Error`] onto the same categories the
//! shell backends produce, with the error's display text as raw output.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::operation::{Operation, OperationKind};
use crate::ops::Execution;
use crate::outcome::{Category, ClassifiedOutcome};

/// Map an I/O error onto the shared taxonomy
pub fn category_of(err: &io::Error) -> Category {
    if is_sharing_violation(err) {
        return Category::Busy;
    }
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => Category::NotFound,
        ErrorKind::AlreadyExists => Category::AlreadyExists,
        ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => Category::PermissionDenied,
        ErrorKind::ResourceBusy | ErrorKind::ExecutableFileBusy | ErrorKind::WouldBlock => {
            Category::Busy
        }
        ErrorKind::Unsupported | ErrorKind::CrossesDevices => Category::Unsupported,
        _ => Category::Unknown,
    }
}

#[cfg(windows)]
fn is_sharing_violation(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(windows))]
fn is_sharing_violation(err: &io::Error) -> bool {
    // EBUSY, ETXTBSY
    matches!(err.raw_os_error(), Some(16) | Some(26))
}

fn failure(path: &Path, err: io::Error) -> Execution {
    Execution::failed(ClassifiedOutcome::new(
        category_of(&err),
        format!("{}: {err}", path.display()),
    ))
}

/// Resolve `path` against the operation's working directory
pub(crate) fn resolve(op: &Operation, path: &crate::NormalizedPath) -> PathBuf {
    let native = path.to_native();
    match op.working_dir() {
        Some(dir) if native.is_relative() => dir.to_native().join(native),
        _ => native,
    }
}

/// Execute `op` in-process. Never fails hard; every error is an outcome.
pub fn run(op: &Operation) -> Execution {
    let path = resolve(op, op.path());
    let target = op.target().map(|t| resolve(op, t));
    tracing::debug!(kind = ?op.kind(), path = %path.display(), "Running natively");

    let result = match op.kind() {
        OperationKind::FileExists | OperationKind::DirectoryExists => {
            let parent = resolve(op, &op.parent_dir());
            return match list_kind(&parent, op.kind()) {
                Ok(names) => Execution::succeeded(names.join("\n")),
                Err(err) => failure(&parent, err),
            };
        }
        OperationKind::CreateFile => File::create(&path).map(|_| String::new()),
        OperationKind::CreateDirectory => fs::create_dir(&path).map(|_| String::new()),
        OperationKind::DeleteFile => fs::remove_file(&path).map(|_| String::new()),
        OperationKind::DeleteDirectory => remove_directory(&path).map(|_| String::new()),
        OperationKind::Move | OperationKind::MoveDirectory | OperationKind::RenameDirectory => {
            let target = target.unwrap_or_default();
            if fs::symlink_metadata(&target).is_ok() {
                return Execution::failed(ClassifiedOutcome::new(
                    Category::AlreadyExists,
                    format!("{}: destination already exists", target.display()),
                ));
            }
            fs::rename(&path, &target).map(|_| String::new())
        }
        OperationKind::Replace => {
            fs::rename(&path, target.unwrap_or_default()).map(|_| String::new())
        }
        OperationKind::Read => {
            fs::read(&path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        }
        OperationKind::Write => {
            fs::write(&path, op.content().unwrap_or_default()).map(|_| String::new())
        }
        OperationKind::Append => {
            append(&path, op.content().unwrap_or_default()).map(|_| String::new())
        }
        OperationKind::HardLink => {
            fs::hard_link(target.unwrap_or_default(), &path).map(|_| String::new())
        }
        OperationKind::Enumerate => enumerate(&path),
        OperationKind::Size => size(&path).map(|len| len.to_string()),
        OperationKind::ChangeMode => {
            change_mode(&path, op.mode().unwrap_or_default()).map(|_| String::new())
        }
        OperationKind::OpenAndWrite => {
            HeldFile::open(&path, op.content().unwrap_or_default()).map(|_| String::new())
        }
    };

    match result {
        Ok(output) => Execution::succeeded(output),
        Err(err) => failure(&path, err),
    }
}

fn list_kind(parent: &Path, kind: OperationKind) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        // A link counts as what it points to; a dangling one is a plain
        // entry. Matches `ls -L`, `dir` and `Get-ChildItem`.
        let is_dir = match entry.path().metadata() {
            Ok(meta) => meta.is_dir(),
            Err(_) => false,
        };
        let wanted = match kind {
            OperationKind::DirectoryExists => is_dir,
            _ => !is_dir,
        };
        if wanted {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn remove_directory(path: &Path) -> io::Result<()> {
    if !fs::symlink_metadata(path)?.is_dir() {
        return Err(io::Error::new(ErrorKind::NotADirectory, "not a directory"));
    }
    fs::remove_dir_all(path)
}

fn append(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    file.write_all(content.as_bytes())
}

fn enumerate(path: &Path) -> io::Result<String> {
    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path().display().to_string()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries.join("\n"))
}

fn size(path: &Path) -> io::Result<u64> {
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
        return Err(io::Error::new(ErrorKind::IsADirectory, "is a directory"));
    }
    Ok(meta.len())
}

#[cfg(unix)]
fn change_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn change_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Err(io::Error::new(
        ErrorKind::Unsupported,
        "permission bits are not supported on this platform",
    ))
}

/// A file kept open with an exclusive handle until dropped.
///
/// While held, other processes see the file as busy: on Windows the handle
/// shares nothing, elsewhere it carries an exclusive advisory lock.
#[derive(Debug)]
pub struct HeldFile {
    file: File,
    path: PathBuf,
}

impl HeldFile {
    /// Open (creating or truncating) `path`, lock it and write `content`
    pub fn open(path: &Path, content: &str) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            options.share_mode(0);
        }
        let mut file = options.open(path)?;
        file.try_lock_exclusive()?;
        file.set_len(0)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        tracing::debug!(path = %path.display(), "Holding file open");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the handle now
    pub fn release(self) {}
}

impl Drop for HeldFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        tracing::debug!(path = %self.path.display(), "Released held file");
    }
}
