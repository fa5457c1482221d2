//! Logical file-system operations
//!
//! An [`Operation`] is an immutable value describing *what* to do. Backends
//! decide *how*: a shell backend renders it into a command, the native
//! backend maps it onto `std::fs` calls.

use std::path::Path;

use crate::error::{Error, Result};
use crate::path::NormalizedPath;

/// Every operation the contract knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    FileExists,
    DirectoryExists,
    CreateFile,
    CreateDirectory,
    DeleteFile,
    DeleteDirectory,
    Move,
    Replace,
    MoveDirectory,
    RenameDirectory,
    Read,
    Write,
    Append,
    HardLink,
    Enumerate,
    Size,
    ChangeMode,
    OpenAndWrite,
}

impl OperationKind {
    /// All kinds, in declaration order
    pub const ALL: [OperationKind; 18] = [
        OperationKind::FileExists,
        OperationKind::DirectoryExists,
        OperationKind::CreateFile,
        OperationKind::CreateDirectory,
        OperationKind::DeleteFile,
        OperationKind::DeleteDirectory,
        OperationKind::Move,
        OperationKind::Replace,
        OperationKind::MoveDirectory,
        OperationKind::RenameDirectory,
        OperationKind::Read,
        OperationKind::Write,
        OperationKind::Append,
        OperationKind::HardLink,
        OperationKind::Enumerate,
        OperationKind::Size,
        OperationKind::ChangeMode,
        OperationKind::OpenAndWrite,
    ];

    /// Kinds that resolve by listing the parent directory
    pub fn is_existence_check(self) -> bool {
        matches!(self, OperationKind::FileExists | OperationKind::DirectoryExists)
    }

    /// Kinds whose stdout carries data rather than diagnostics
    pub fn produces_output(self) -> bool {
        matches!(
            self,
            OperationKind::FileExists
                | OperationKind::DirectoryExists
                | OperationKind::Read
                | OperationKind::Enumerate
                | OperationKind::Size
        )
    }

    fn needs_target(self) -> bool {
        matches!(
            self,
            OperationKind::Move
                | OperationKind::Replace
                | OperationKind::MoveDirectory
                | OperationKind::RenameDirectory
                | OperationKind::HardLink
        )
    }

    fn needs_content(self) -> bool {
        matches!(
            self,
            OperationKind::Write | OperationKind::Append | OperationKind::OpenAndWrite
        )
    }
}

/// One logical operation with its arguments.
///
/// For two-path operations `path` is the source (or, for hard links, the
/// new link) and `target` the destination (or the existing file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    kind: OperationKind,
    path: NormalizedPath,
    target: Option<NormalizedPath>,
    content: Option<String>,
    mode: Option<u32>,
    working_dir: Option<NormalizedPath>,
}

impl Operation {
    fn single(kind: OperationKind, path: impl AsRef<Path>) -> Self {
        Self {
            kind,
            path: NormalizedPath::new(path),
            target: None,
            content: None,
            mode: None,
            working_dir: None,
        }
    }

    fn pair(kind: OperationKind, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            target: Some(NormalizedPath::new(target)),
            ..Self::single(kind, path)
        }
    }

    fn with_content(kind: OperationKind, path: impl AsRef<Path>, content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            ..Self::single(kind, path)
        }
    }

    pub fn file_exists(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::FileExists, path)
    }

    pub fn directory_exists(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::DirectoryExists, path)
    }

    pub fn create_file(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::CreateFile, path)
    }

    pub fn create_directory(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::CreateDirectory, path)
    }

    pub fn delete_file(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::DeleteFile, path)
    }

    pub fn delete_directory(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::DeleteDirectory, path)
    }

    /// Move `source` to `target`, failing if `target` exists
    pub fn move_file(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self::pair(OperationKind::Move, source, target)
    }

    /// Move `source` to `target`, overwriting `target`
    pub fn replace(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self::pair(OperationKind::Replace, source, target)
    }

    pub fn move_directory(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self::pair(OperationKind::MoveDirectory, source, target)
    }

    /// Rename `source` to `new_name`, both relative to `working_dir`
    pub fn rename_directory(
        working_dir: impl AsRef<Path>,
        source: &str,
        new_name: &str,
    ) -> Self {
        Self {
            working_dir: Some(NormalizedPath::new(working_dir)),
            ..Self::pair(OperationKind::RenameDirectory, source, new_name)
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::Read, path)
    }

    pub fn write(path: impl AsRef<Path>, content: &str) -> Self {
        Self::with_content(OperationKind::Write, path, content)
    }

    pub fn append(path: impl AsRef<Path>, content: &str) -> Self {
        Self::with_content(OperationKind::Append, path, content)
    }

    /// Create `new_link` as a hard link to `existing`
    pub fn hard_link(new_link: impl AsRef<Path>, existing: impl AsRef<Path>) -> Self {
        Self::pair(OperationKind::HardLink, new_link, existing)
    }

    pub fn enumerate(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::Enumerate, path)
    }

    pub fn size(path: impl AsRef<Path>) -> Self {
        Self::single(OperationKind::Size, path)
    }

    pub fn change_mode(path: impl AsRef<Path>, mode: u32) -> Self {
        Self {
            mode: Some(mode),
            ..Self::single(OperationKind::ChangeMode, path)
        }
    }

    pub fn open_and_write(path: impl AsRef<Path>, content: &str) -> Self {
        Self::with_content(OperationKind::OpenAndWrite, path, content)
    }

    /// Run this operation from `dir` instead of the caller's directory
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(NormalizedPath::new(dir));
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn target(&self) -> Option<&NormalizedPath> {
        self.target.as_ref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn mode(&self) -> Option<u32> {
        self.mode
    }

    pub fn working_dir(&self) -> Option<&NormalizedPath> {
        self.working_dir.as_ref()
    }

    /// Target path, or an error for operations built without one
    pub fn require_target(&self) -> Result<&NormalizedPath> {
        self.target
            .as_ref()
            .ok_or_else(|| Error::invalid(self.kind, "missing target path"))
    }

    /// Content, or an error for operations built without any
    pub fn require_content(&self) -> Result<&str> {
        self.content
            .as_deref()
            .ok_or_else(|| Error::invalid(self.kind, "missing content"))
    }

    /// Name of the entry an existence check looks for in its parent
    pub fn entry_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .ok_or_else(|| Error::invalid(self.kind, format!("'{}' has no file name", self.path)))
    }

    /// Directory listed by an existence check (`.` for bare names)
    pub fn parent_dir(&self) -> NormalizedPath {
        self.path.parent().unwrap_or_else(|| NormalizedPath::new("."))
    }

    /// Every spelling of this operation's paths a shell may echo back,
    /// longest first
    pub fn mentioned_paths(&self) -> Vec<String> {
        let parent = self.path.parent();
        let candidates = [
            Some(&self.path),
            self.target(),
            self.working_dir(),
            parent.as_ref(),
        ];
        let mut paths: Vec<String> = candidates
            .into_iter()
            .flatten()
            .filter(|path| !path.is_empty())
            .flat_map(|path| [path.render('/'), path.render('\\')])
            .collect();
        paths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        paths.dedup();
        paths
    }

    /// Check the arguments are complete and well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] for empty paths, missing targets,
    /// content or mode, and content containing NUL bytes.
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::invalid(self.kind, "empty path"));
        }
        if self.kind.needs_target() {
            let target = self.require_target()?;
            if target.is_empty() {
                return Err(Error::invalid(self.kind, "empty target path"));
            }
        }
        if self.kind.needs_content() && self.require_content()?.contains('\0') {
            return Err(Error::invalid(self.kind, "content contains a NUL byte"));
        }
        if self.kind == OperationKind::ChangeMode {
            match self.mode {
                Some(mode) if mode <= 0o7777 => {}
                Some(mode) => {
                    return Err(Error::invalid(self.kind, format!("mode {mode:o} out of range")));
                }
                None => return Err(Error::invalid(self.kind, "missing mode")),
            }
        }
        if self.kind.is_existence_check() {
            self.entry_name()?;
        }
        if self.kind == OperationKind::RenameDirectory && self.working_dir.is_none() {
            return Err(Error::invalid(self.kind, "missing working directory"));
        }
        Ok(())
    }
}
