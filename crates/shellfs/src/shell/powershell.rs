//! PowerShell backend
//!
//! Scripts run with `$ErrorActionPreference = 'Stop'` inside a `try` block
//! whose `catch` prints only the exception message and the error id. The
//! default error view echoes the failing script line, and guard messages
//! in that line would otherwise be matched by the rules.

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
    Rule::contains("being used by another process", Category::Busy),
    Rule::contains("PermissionDenied", Category::PermissionDenied),
    Rule::contains("UnauthorizedAccess", Category::PermissionDenied),
    Rule::contains("Access to the path", Category::PermissionDenied),
    Rule::contains("already exists", Category::AlreadyExists),
    Rule::contains("ResourceExists", Category::AlreadyExists),
    Rule::contains("Cannot find path", Category::NotFound),
    Rule::contains("ItemNotFound", Category::NotFound),
    Rule::contains("PathNotFound", Category::NotFound),
    Rule::contains("Could not find a part of the path", Category::NotFound),
    Rule::contains("Could not find file", Category::NotFound),
    Rule::contains("The request is not supported", Category::Unsupported),
    Rule::contains("NotSupported", Category::Unsupported),
];

#[cfg(windows)]
const PROGRAM: &str = "powershell.exe";
#[cfg(not(windows))]
const PROGRAM: &str = "pwsh";

const ARGS: &[&str] = &["-NoProfile", "-NonInteractive", "-Command"];

/// Single-quote characters PowerShell accepts, including typographic ones
const QUOTES: &[char] = &['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellDialect;

/// Quote `text` as a PowerShell verbatim string
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if QUOTES.contains(&c) {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

fn path(op: &Operation, path: &NormalizedPath) -> Result<String> {
    if path.as_str().contains('\0') {
        return Err(Error::invalid(op.kind(), "path contains a NUL byte"));
    }
    Ok(quote(&path.render(std::path::MAIN_SEPARATOR)))
}

/// Content is written as ASCII, anything else would be transcoded
fn content(op: &Operation) -> Result<String> {
    let text = op.require_content()?;
    if !text.is_ascii() {
        return Err(Error::invalid(op.kind(), "content must be ASCII"));
    }
    Ok(quote(text))
}

/// Throw `template` (with `{0}` replaced by `arg`) when `test` holds
fn guard(test: &str, template: &str, arg: &str) -> String {
    format!("if ({test}) {{ throw ({} -f {arg}) }}; ", quote(template))
}

fn wrap(body: &str) -> String {
    format!(
        "$ErrorActionPreference = 'Stop'; try {{ {body} }} catch {{ \
         [Console]::Error.WriteLine($_.Exception.Message + ' (' + $_.FullyQualifiedErrorId + ')'); exit 1 }}"
    )
}

fn move_item(op: &Operation, force: bool) -> Result<String> {
    let p = path(op, op.path())?;
    let t = path(op, op.require_target()?)?;
    if force {
        return Ok(format!("Move-Item -Force -LiteralPath {p} -Destination {t}"));
    }
    Ok(format!(
        "{}Move-Item -LiteralPath {p} -Destination {t}",
        guard(
            &format!("Test-Path -LiteralPath {t}"),
            "An item with the specified name {0} already exists.",
            &t
        )
    ))
}

impl CommandFormatter for PowerShellDialect {
    fn format(&self, op: &Operation) -> Result<ShellCommand> {
        let p = path(op, op.path())?;
        let body = match op.kind() {
            OperationKind::FileExists | OperationKind::DirectoryExists => {
                let filter = if op.kind() == OperationKind::FileExists {
                    "-not $_.PSIsContainer"
                } else {
                    "$_.PSIsContainer"
                };
                let parent = path(op, &op.parent_dir())?;
                format!(
                    "{}Get-ChildItem -Force -LiteralPath {parent} | \
                     Where-Object {{ {filter} }} | ForEach-Object {{ $_.Name }}",
                    guard(
                        &format!("-not (Test-Path -LiteralPath {parent} -PathType Container)"),
                        "Cannot find path '{0}' because it does not exist.",
                        &parent
                    )
                )
            }
            OperationKind::CreateFile => {
                // New-Item -Force would create missing parents
                let parent = path(op, &op.parent_dir())?;
                format!(
                    "{}New-Item -ItemType File -Force -Path {p} | Out-Null",
                    guard(
                        &format!("-not (Test-Path -LiteralPath {parent} -PathType Container)"),
                        "Could not find a part of the path '{0}'.",
                        &p
                    )
                )
            }
            OperationKind::CreateDirectory => {
                format!("New-Item -ItemType Directory -Path {p} | Out-Null")
            }
            OperationKind::DeleteFile => format!("Remove-Item -LiteralPath {p}"),
            OperationKind::DeleteDirectory => format!(
                "{}Remove-Item -Force -Recurse -LiteralPath {p}",
                guard(
                    &format!("-not (Test-Path -LiteralPath {p} -PathType Container)"),
                    "Cannot find path '{0}' because it does not exist.",
                    &p
                )
            ),
            OperationKind::Move | OperationKind::MoveDirectory => move_item(op, false)?,
            OperationKind::Replace => move_item(op, true)?,
            OperationKind::RenameDirectory => {
                let t = path(op, op.require_target()?)?;
                format!(
                    "{}Rename-Item -LiteralPath {p} -NewName {t}",
                    guard(
                        &format!("Test-Path -LiteralPath {t}"),
                        "An item with the specified name {0} already exists.",
                        &t
                    )
                )
            }
            OperationKind::Read => format!("Get-Content -Raw -LiteralPath {p}"),
            OperationKind::Write => format!(
                "Out-File -LiteralPath {p} -InputObject {} -Encoding ascii -NoNewline",
                content(op)?
            ),
            OperationKind::Append => format!(
                "Out-File -LiteralPath {p} -InputObject {} -Encoding ascii -NoNewline -Append",
                content(op)?
            ),
            OperationKind::HardLink => format!(
                "New-Item -ItemType HardLink -Path {p} -Value {} | Out-Null",
                path(op, op.require_target()?)?
            ),
            OperationKind::Enumerate => format!("Get-ChildItem -Force -LiteralPath {p}"),
            OperationKind::Size => format!("(Get-Item -LiteralPath {p}).Length"),
            OperationKind::ChangeMode | OperationKind::OpenAndWrite => {
                return Err(unsupported(Backend::PowerShell, op));
            }
        };

        Ok(ShellCommand::new(PROGRAM, ARGS, wrap(&body)).in_dir_of(op))
    }
}

impl OutputClassifier for PowerShellDialect {
    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    /// The host appends one line break to the object it prints
    fn normalize_read(&self, stdout: &str) -> String {
        stdout
            .strip_suffix("\r\n")
            .or_else(|| stdout.strip_suffix('\n'))
            .unwrap_or(stdout)
            .to_string()
    }

    fn entry_matches(&self, _kind: OperationKind, line: &str, name: &str) -> bool {
        names_equal(line, name)
    }
}

impl ShellDialect for PowerShellDialect {
    fn backend(&self) -> Backend {
        Backend::PowerShell
    }
}
