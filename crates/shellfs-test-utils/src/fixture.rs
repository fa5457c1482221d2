//! [`TestDir`] scratch directories for file-system tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory with helpers for arranging test state.
///
/// Arrangement helpers use `std::fs` directly so a test never depends on
/// the backend it is verifying.
///
/// # Example
///
/// ```rust,no_run
/// use shellfs_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let file = dir.write_file("sub/notes.txt", "hello");
/// assert!(file.ends_with("sub/notes.txt"));
/// ```
pub struct TestDir {
    /// Deletes the directory on drop
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDir {
    /// Create an empty temporary directory.
    ///
    /// The path is canonicalized so listings and shell output agree with it
    /// on hosts where the temp root is a symlink.
    pub fn new() -> Self {
        let temp_dir = TempDir::new()
            .unwrap_or_else(|e| panic!("TestDir::new: failed to create temp dir: {e}"));
        let root = canonical(temp_dir.path());
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `relative` inside the directory (not created).
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("TestDir::write_file: failed to create {}: {e}", parent.display())
            });
        }
        fs::write(&path, content).unwrap_or_else(|e| {
            panic!("TestDir::write_file: failed to write {}: {e}", path.display())
        });
        path
    }

    /// Create `relative` and any missing parents.
    pub fn create_dir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).unwrap_or_else(|e| {
            panic!("TestDir::create_dir: failed to create {}: {e}", path.display())
        });
        path
    }

    /// Read `relative` directly from disk.
    pub fn read_file(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("TestDir::read_file: failed to read {}: {e}", path.display())
        })
    }
}

fn canonical(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    shellfs::NormalizedPath::new(&canonical).to_native()
}
