//! Probe whether a lock file is held by someone else

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// What other handles may do while the probe holds the file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShareMode {
    /// No concurrent access at all
    #[default]
    None,
    /// Concurrent readers allowed
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// The probe got the access it asked for, so nobody else holds the file
    pub acquired: bool,
}

/// Opens a file with restricted sharing and releases it at once.
///
/// A process holding a lock file open is detected without modifying the
/// file: the open (Windows) or the lock (POSIX) fails while it is held.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveLockProbe {
    share: ShareMode,
}

impl ExclusiveLockProbe {
    pub fn new(share: ShareMode) -> Self {
        Self { share }
    }

    pub fn share_mode(&self) -> ShareMode {
        self.share
    }

    /// Try to take the file. Creates it if missing.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] for failures other than contention, such as a missing
    /// parent directory.
    pub fn probe(&self, path: impl AsRef<Path>) -> Result<ProbeResult> {
        let path = path.as_ref();
        let acquired = match self.open(path) {
            Ok(file) => self.lock(&file).map_err(|e| Error::io(path, e))?,
            Err(e) if is_contention(&e) => false,
            Err(e) => return Err(Error::io(path, e)),
        };
        tracing::debug!(path = %path.display(), share = ?self.share, acquired, "Probed lock file");
        Ok(ProbeResult { acquired })
    }

    fn open(&self, path: &Path) -> std::io::Result<File> {
        match self.options(false).open(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => self.options(true).open(path),
            other => other,
        }
    }

    fn options(&self, create: bool) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(true);
        if create {
            options.append(true).create(true);
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            const FILE_SHARE_READ: u32 = 0x1;
            options.share_mode(match self.share {
                ShareMode::None => 0,
                ShareMode::Read => FILE_SHARE_READ,
            });
        }
        options
    }

    #[cfg(windows)]
    fn lock(&self, _file: &File) -> std::io::Result<bool> {
        // The share mode already did the work
        Ok(true)
    }

    #[cfg(not(windows))]
    fn lock(&self, file: &File) -> std::io::Result<bool> {
        use fs2::FileExt;

        let attempt = match self.share {
            ShareMode::None => FileExt::try_lock_exclusive(file),
            ShareMode::Read => FileExt::try_lock_shared(file),
        };
        match attempt {
            Ok(()) => {
                FileExt::unlock(file)?;
                Ok(true)
            }
            Err(e) if is_contention(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn is_contention(err: &std::io::Error) -> bool {
    if err.kind() == ErrorKind::WouldBlock {
        return true;
    }
    // fs2 reports a held lock with the platform's lock error code
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33)))
}
