//! Separator-neutral paths for command rendering

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// A path stored with `/` separators and rendered per backend.
///
/// Shells disagree about separators (`cmd.exe` reads `a/b` as `a` plus the
/// switch `/b`), so the separator is only chosen when a command is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    text: String,
}

impl NormalizedPath {
    /// Normalize any path-like input.
    ///
    /// The Windows verbatim prefix (`\\?\`) is dropped where a plain path
    /// means the same thing; command shells reject it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let plain = dunce::simplified(path.as_ref());
        Self {
            text: plain.to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The same path with the host separator, for `std::fs`
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(self.render(MAIN_SEPARATOR))
    }

    /// Text of the path using `separator`
    pub fn render(&self, separator: char) -> String {
        match separator {
            '/' => self.text.clone(),
            other => self.text.chars().map(|c| if c == '/' { other } else { c }).collect(),
        }
    }

    /// Split at the last separator, ignoring trailing ones
    fn split_last(&self) -> Option<(&str, &str)> {
        let trimmed = self.text.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        Some((&trimmed[..idx], &trimmed[idx + 1..]))
    }

    /// Containing directory, or `None` for a bare name.
    ///
    /// `C:/x` yields `C:/`, not `C:`, which would mean the drive's current
    /// directory.
    pub fn parent(&self) -> Option<Self> {
        let (head, _) = self.split_last()?;
        let text = match head {
            "" => "/".to_string(),
            drive if drive.ends_with(':') => format!("{drive}/"),
            dir => dir.to_string(),
        };
        Some(Self { text })
    }

    /// Last component; `None` for roots and empty paths
    pub fn file_name(&self) -> Option<&str> {
        let name = match self.split_last() {
            Some((_, name)) => name,
            None => self.text.trim_end_matches('/'),
        };
        (!name.is_empty()).then_some(name)
    }

    /// Extension of the last component. Dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.text)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

macro_rules! from_path_like {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for NormalizedPath {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

from_path_like!(&str, String, &Path, PathBuf, &PathBuf);

impl From<&NormalizedPath> for NormalizedPath {
    fn from(value: &NormalizedPath) -> Self {
        value.clone()
    }
}
