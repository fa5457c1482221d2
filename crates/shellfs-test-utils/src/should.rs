//! Should-style assertions checked through a backend.
//!
//! Every panic message names the backend and carries the raw output the
//! verdict was derived from, because free-text classification is lossy.

use std::path::Path;

use shellfs::{Category, ClassifiedOutcome, FileSystemOperations};

/// Assertions about a path, verified through `fs`
pub trait PathShould {
    fn should_be_a_file(&self, fs: &FileSystemOperations) -> &Self;
    fn should_be_a_directory(&self, fs: &FileSystemOperations) -> &Self;
    fn should_not_exist_on_disk(&self, fs: &FileSystemOperations) -> &Self;
    fn should_contain_text(&self, fs: &FileSystemOperations, expected: &str) -> &Self;
}

impl<P: AsRef<Path> + ?Sized> PathShould for P {
    fn should_be_a_file(&self, fs: &FileSystemOperations) -> &Self {
        let path = self.as_ref();
        match fs.file_exists(path) {
            Ok(true) => {}
            Ok(false) => {
                let dir = fs.directory_exists(path).unwrap_or(false);
                panic!(
                    "[{}] expected {} to be a file, but it {}",
                    fs.backend(),
                    path.display(),
                    if dir { "is a directory" } else { "does not exist" }
                );
            }
            Err(e) => panic!("[{}] could not check {}: {e}", fs.backend(), path.display()),
        }
        self
    }

    fn should_be_a_directory(&self, fs: &FileSystemOperations) -> &Self {
        let path = self.as_ref();
        match fs.directory_exists(path) {
            Ok(true) => {}
            Ok(false) => panic!(
                "[{}] expected {} to be a directory",
                fs.backend(),
                path.display()
            ),
            Err(e) => panic!("[{}] could not check {}: {e}", fs.backend(), path.display()),
        }
        self
    }

    fn should_not_exist_on_disk(&self, fs: &FileSystemOperations) -> &Self {
        let path = self.as_ref();
        let file = fs
            .file_exists(path)
            .unwrap_or_else(|e| {
                panic!("[{}] could not check {}: {e}", fs.backend(), path.display())
            });
        let dir = fs
            .directory_exists(path)
            .unwrap_or_else(|e| {
                panic!("[{}] could not check {}: {e}", fs.backend(), path.display())
            });
        assert!(
            !file && !dir,
            "[{}] expected {} not to exist",
            fs.backend(),
            path.display()
        );
        self
    }

    fn should_contain_text(&self, fs: &FileSystemOperations, expected: &str) -> &Self {
        let path = self.as_ref();
        let read = fs
            .read_all_text(path)
            .unwrap_or_else(|e| {
                panic!("[{}] could not read {}: {e}", fs.backend(), path.display())
            });
        match read.value() {
            Some(actual) => assert_eq!(
                actual,
                expected,
                "[{}] unexpected contents of {}",
                fs.backend(),
                path.display()
            ),
            None => panic!(
                "[{}] reading {} failed: {}",
                fs.backend(),
                path.display(),
                read.outcome()
            ),
        }
        self
    }
}

/// Assertions about a classified outcome
pub trait OutcomeShould {
    fn should_succeed(&self) -> &Self;
    fn should_fail_with(&self, expected: Category) -> &Self;
}

impl OutcomeShould for ClassifiedOutcome {
    fn should_succeed(&self) -> &Self {
        assert!(
            self.succeeded(),
            "expected success, got {}\nraw output:\n{}",
            self.category(),
            self.raw_text()
        );
        self
    }

    fn should_fail_with(&self, expected: Category) -> &Self {
        assert_eq!(
            self.category(),
            expected,
            "unexpected outcome category\nraw output:\n{}",
            self.raw_text()
        );
        self
    }
}
