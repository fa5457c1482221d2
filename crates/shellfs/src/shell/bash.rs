//! Bash backend (`bash -c`)

use crate::backend::Backend;
use crate::classify::Rule;
use crate::error::{Error, Result};
use crate::operation::{Operation, OperationKind};
use crate::outcome::Category;
use crate::path::NormalizedPath;

use super::{
    CommandFormatter, OutputClassifier, ShellCommand, ShellDialect, names_equal, unsupported,
};

static RULES: &[Rule] = &[
    Rule::contains("Text file busy", Category::Busy),
    Rule::contains("Device or resource busy", Category::Busy),
    Rule::contains("Resource busy", Category::Busy),
    Rule::contains("Permission denied", Category::PermissionDenied),
    Rule::contains("Operation not permitted", Category::PermissionDenied),
    Rule::contains("Read-only file system", Category::PermissionDenied),
    Rule::contains("File exists", Category::AlreadyExists),
    Rule::contains("No such file or directory", Category::NotFound),
    Rule::contains("Not a directory", Category::NotFound),
    Rule::contains("Invalid cross-device link", Category::Unsupported),
    Rule::contains("Operation not supported", Category::Unsupported),
    Rule::contains("Function not implemented", Category::Unsupported),
];

/// POSIX shell commands, run with `LC_ALL=C` so messages are stable
#[derive(Debug, Clone, Copy, Default)]
pub struct BashDialect;

/// Quote `text` as a single POSIX shell word
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn path(op: &Operation, path: &NormalizedPath) -> Result<String> {
    if path.as_str().contains('\0') {
        return Err(Error::invalid(op.kind(), "path contains a NUL byte"));
    }
    Ok(quote(path.as_str()))
}

/// Fail with `message` (formatted with `arg`) when `test` holds
fn guard(test: &str, message: &str, arg: &str) -> String {
    format!("if {test}; then printf '{message}\\n' {arg} >&2; exit 1; fi; ")
}

impl CommandFormatter for BashDialect {
    fn format(&self, op: &Operation) -> Result<ShellCommand> {
        let p = path(op, op.path())?;
        let script = match op.kind() {
            OperationKind::FileExists | OperationKind::DirectoryExists => {
                let parent = path(op, &op.parent_dir())?;
                // -L marks linked directories with `/`; dangling links stay
                // plain entries and their complaints are dropped
                format!(
                    "{}{}ls -A1pL -- {parent} 2>/dev/null; exit 0",
                    guard(
                        &format!("[ ! -d {parent} ]"),
                        "ls: cannot access %s: No such file or directory",
                        &parent
                    ),
                    guard(
                        &format!("[ ! -r {parent} ] || [ ! -x {parent} ]"),
                        "ls: cannot open directory %s: Permission denied",
                        &parent
                    ),
                )
            }
            OperationKind::CreateFile => format!(": > {p}"),
            OperationKind::CreateDirectory => format!("mkdir -- {p}"),
            OperationKind::DeleteFile => format!("rm -- {p}"),
            OperationKind::DeleteDirectory => format!(
                "{}rm -rf -- {p}",
                guard(
                    &format!("[ ! -d {p} ]"),
                    "rm: cannot remove %s: No such file or directory",
                    &p
                )
            ),
            OperationKind::Move | OperationKind::MoveDirectory | OperationKind::RenameDirectory => {
                let t = path(op, op.require_target()?)?;
                format!(
                    "{}mv -- {p} {t}",
                    guard(
                        &format!("[ -e {t} ] || [ -L {t} ]"),
                        "mv: cannot move to %s: File exists",
                        &t
                    )
                )
            }
            OperationKind::Replace => {
                format!("mv -f -- {p} {}", path(op, op.require_target()?)?)
            }
            OperationKind::Read => format!("cat -- {p}"),
            OperationKind::Write => format!("printf '%s' {} > {p}", quote(op.require_content()?)),
            OperationKind::Append => format!("printf '%s' {} >> {p}", quote(op.require_content()?)),
            OperationKind::HardLink => {
                format!("ln -- {} {p}", path(op, op.require_target()?)?)
            }
            OperationKind::Enumerate => format!("ls -la -- {p}"),
            OperationKind::Size => format!("wc -c < {p}"),
            OperationKind::ChangeMode => {
                let mode = op
                    .mode()
                    .ok_or_else(|| Error::invalid(op.kind(), "missing mode"))?;
                format!("chmod {mode:o} -- {p}")
            }
            OperationKind::OpenAndWrite => return Err(unsupported(Backend::Bash, op)),
        };

        Ok(ShellCommand::new("bash", &["-c"], script)
            .env("LC_ALL", "C")
            .in_dir_of(op))
    }
}

impl OutputClassifier for BashDialect {
    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn entry_matches(&self, kind: OperationKind, line: &str, name: &str) -> bool {
        match line.strip_suffix('/') {
            Some(dir) => kind == OperationKind::DirectoryExists && names_equal(dir, name),
            None => kind == OperationKind::FileExists && names_equal(line, name),
        }
    }
}

impl ShellDialect for BashDialect {
    fn backend(&self) -> Backend {
        Backend::Bash
    }
}
