//! Backends and their capability tables

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::operation::OperationKind;

/// A concrete execution strategy for the operation contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Direct `std::fs` calls
    Native,
    /// `bash -c`
    Bash,
    /// `cmd.exe /C`
    Cmd,
    /// `powershell -Command`
    PowerShell,
}

#[cfg(unix)]
const NATIVE_UNSUPPORTED: &[OperationKind] = &[];
#[cfg(not(unix))]
const NATIVE_UNSUPPORTED: &[OperationKind] = &[OperationKind::ChangeMode];

/// Operations each backend rejects before anything is executed
const UNSUPPORTED: &[(Backend, &[OperationKind])] = &[
    (Backend::Native, NATIVE_UNSUPPORTED),
    (Backend::Bash, &[OperationKind::OpenAndWrite]),
    (
        Backend::Cmd,
        &[OperationKind::ChangeMode, OperationKind::OpenAndWrite],
    ),
    (
        Backend::PowerShell,
        &[OperationKind::ChangeMode, OperationKind::OpenAndWrite],
    ),
];

impl Backend {
    /// All backends, in declaration order
    pub const ALL: [Backend; 4] = [
        Backend::Native,
        Backend::Bash,
        Backend::Cmd,
        Backend::PowerShell,
    ];

    /// Lowercase name used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Bash => "bash",
            Backend::Cmd => "cmd",
            Backend::PowerShell => "powershell",
        }
    }

    /// Whether operations run through an external shell process
    pub fn is_shell(&self) -> bool {
        !matches!(self, Backend::Native)
    }

    /// Operations this backend does not implement
    pub fn unsupported(&self) -> &'static [OperationKind] {
        UNSUPPORTED
            .iter()
            .find(|(backend, _)| backend == self)
            .map(|(_, kinds)| *kinds)
            .unwrap_or(&[])
    }

    /// Whether this backend implements `kind`
    pub fn supports(&self, kind: OperationKind) -> bool {
        !self.unsupported().contains(&kind)
    }

    /// Reject `kind` up front if this backend does not implement it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capability`] for unsupported kinds.
    pub fn check(&self, kind: OperationKind) -> Result<()> {
        if self.supports(kind) {
            Ok(())
        } else {
            Err(Error::Capability {
                backend: *self,
                kind,
            })
        }
    }

    /// Backends used when no full suite is requested
    pub fn default_set() -> Vec<Backend> {
        vec![Backend::Native]
    }

    /// Every backend that can run on the current platform
    pub fn all_for_platform() -> Vec<Backend> {
        if cfg!(windows) {
            vec![
                Backend::Native,
                Backend::Cmd,
                Backend::PowerShell,
                Backend::Bash,
            ]
        } else {
            vec![Backend::Native, Backend::Bash]
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" | "systemio" => Ok(Backend::Native),
            "bash" => Ok(Backend::Bash),
            "cmd" => Ok(Backend::Cmd),
            "powershell" | "pwsh" => Ok(Backend::PowerShell),
            other => Err(Error::ConfigValue {
                key: "backend".into(),
                message: format!("unknown backend '{other}'"),
            }),
        }
    }
}
