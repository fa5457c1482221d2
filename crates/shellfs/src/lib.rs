//! Shell-backed file-system operations
//!
//! One operation contract (exists, create, delete, move, read, write,
//! enumerate, size, permissions...) executed by interchangeable backends:
//! direct `std::fs` calls, or `bash`, `cmd.exe` and PowerShell processes.
//! Tests use a second backend to check file-system state through a path
//! independent of the code under test.
//!
//! ```no_run
//! use shellfs::{Backend, FileSystemOperations};
//!
//! let fs = FileSystemOperations::new(Backend::Bash);
//! fs.write_all_text("/tmp/greeting", "hello")?;
//! assert!(fs.file_exists("/tmp/greeting")?);
//! # Ok::<(), shellfs::Error>(())
//! ```

pub mod backend;
pub mod classify;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod native;
pub mod operation;
pub mod ops;
pub mod outcome;
pub mod path;
pub mod retry;
pub mod shell;

pub use backend::Backend;
pub use config::{ConfigStore, SessionConfig};
pub use error::{Error, Result};
pub use lock::{ExclusiveLockProbe, ProbeResult, ShareMode};
pub use native::HeldFile;
pub use operation::{Operation, OperationKind};
pub use ops::{Execution, FileSystemOperations};
pub use outcome::{Category, Classified, ClassifiedOutcome};
pub use path::NormalizedPath;
pub use retry::{DeletionOutcome, DirectoryRemover, RetryPolicy, RetryingDirectoryDeleter};
pub use shell::{CommandFormatter, OutputClassifier, ShellCommand, ShellDialect};
