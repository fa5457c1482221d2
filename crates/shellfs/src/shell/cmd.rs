//! Windows command prompt backend (`cmd.exe /C`)
//!
//! `cmd.exe` has no escape for `"` inside a quoted word and expands `%`
//! everywhere, so any argument containing them is rejected rather than
//! mangled. Several builtins print a failure and still exit zero (`del`,
//! `move`), and `set /p` always exits non-zero, which is why the rule table
//! matters more here than the exit code.

use std::sync::LazyLock;

use regex::Regex;

use crate::backend::Backend;
use crate::classify::Rule;
use crate::error::{Error, Result};
use crate::operation::{Operation, OperationKind};
use crate::outcome::Category;
use crate::path::NormalizedPath;

use super::{
    CommandFormatter, OutputClassifier, ShellCommand, ShellDialect, names_equal, unsupported,
};

static NOTHING_MOVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b0 (file|dir)\(s\) moved").unwrap());

const EXISTENCE: &[OperationKind] = &[OperationKind::FileExists, OperationKind::DirectoryExists];

static RULES: &[Rule] = &[
    Rule::contains("being used by another process", Category::Busy),
    Rule::contains("Access is denied", Category::PermissionDenied),
    Rule::contains("already exists", Category::AlreadyExists),
    // An empty filtered listing
    Rule::contains("File Not Found", Category::Success).only(EXISTENCE),
    Rule::contains("The system cannot find the file specified", Category::NotFound),
    Rule::contains("The system cannot find the path specified", Category::NotFound),
    Rule::contains("Could Not Find", Category::NotFound),
    Rule::contains("File Not Found", Category::NotFound),
    Rule::contains("The directory name is invalid", Category::NotFound),
    Rule::pattern(&NOTHING_MOVED, Category::Unknown),
    Rule::contains("The request is not supported", Category::Unsupported),
];

const NOT_FOUND: &str = "The system cannot find the file specified.";

/// `cmd.exe` builtins, paths rendered with backslashes
#[derive(Debug, Clone, Copy, Default)]
pub struct CmdDialect;

fn quote(op: &Operation, text: &str) -> Result<String> {
    if text.contains(['"', '%']) {
        return Err(Error::invalid(
            op.kind(),
            format!("'{text}' cannot be quoted for cmd.exe"),
        ));
    }
    Ok(format!("\"{text}\""))
}

fn path(op: &Operation, path: &NormalizedPath) -> Result<String> {
    quote(op, &path.render('\\'))
}

/// `echo|set /p` writes its prompt verbatim, but only for some prompts
fn content(op: &Operation) -> Result<String> {
    let text = op.require_content()?;
    if text.contains(['\r', '\n']) {
        return Err(Error::invalid(op.kind(), "cmd.exe cannot write line breaks"));
    }
    if text.starts_with(|c: char| c.is_whitespace() || c == '=') {
        return Err(Error::invalid(
            op.kind(),
            "cmd.exe drops leading whitespace and '='",
        ));
    }
    quote(op, text)
}

/// `if <test> (echo <message> & exit 1) else (<command>)`
fn guarded(test: &str, message: &str, command: &str) -> String {
    format!("if {test} (echo {message} 1>&2 & exit 1) else ({command})")
}

impl CommandFormatter for CmdDialect {
    fn format(&self, op: &Operation) -> Result<ShellCommand> {
        let p = path(op, op.path())?;
        let script = match op.kind() {
            OperationKind::FileExists | OperationKind::DirectoryExists => {
                let parent = op.parent_dir();
                // `dir` of a file lists the file itself
                let as_dir = quote(op, &format!("{}\\*", parent.render('\\')))?;
                let attributes = if op.kind() == OperationKind::FileExists {
                    "-d"
                } else {
                    "d"
                };
                guarded(
                    &format!("not exist {as_dir}"),
                    NOT_FOUND,
                    &format!("dir /A:{attributes} /B {}", path(op, &parent)?),
                )
            }
            OperationKind::CreateFile => format!("type NUL > {p}"),
            OperationKind::CreateDirectory => format!("mkdir {p}"),
            OperationKind::DeleteFile => {
                let as_dir = quote(op, &format!("{}\\*", op.path().render('\\')))?;
                guarded(
                    &format!("exist {as_dir}"),
                    "Access is denied.",
                    &format!("del /Q {p}"),
                )
            }
            OperationKind::DeleteDirectory => {
                let as_dir = quote(op, &format!("{}\\*", op.path().render('\\')))?;
                guarded(
                    &format!("not exist {as_dir}"),
                    NOT_FOUND,
                    &format!("rmdir /q /s {p}"),
                )
            }
            OperationKind::Move | OperationKind::MoveDirectory => {
                let t = path(op, op.require_target()?)?;
                guarded(
                    &format!("exist {t}"),
                    "The destination already exists.",
                    &format!("move {p} {t}"),
                )
            }
            OperationKind::Replace => {
                format!("move /Y {p} {}", path(op, op.require_target()?)?)
            }
            OperationKind::RenameDirectory => {
                let t = path(op, op.require_target()?)?;
                guarded(
                    &format!("exist {t}"),
                    "The destination already exists.",
                    &format!("ren {p} {t}"),
                )
            }
            OperationKind::Read => format!("type {p}"),
            OperationKind::Write => format!("echo|set /p ={} > {p}", content(op)?),
            OperationKind::Append => format!("echo|set /p ={} >> {p}", content(op)?),
            OperationKind::HardLink => {
                format!("mklink /H {p} {}", path(op, op.require_target()?)?)
            }
            OperationKind::Enumerate => format!("dir {p}"),
            OperationKind::Size => guarded(
                &format!("not exist {p}"),
                NOT_FOUND,
                &format!("for %I in ({p}) do @echo %~zI"),
            ),
            OperationKind::ChangeMode | OperationKind::OpenAndWrite => {
                return Err(unsupported(Backend::Cmd, op));
            }
        };

        // `/S` strips exactly the outer quotes added here
        Ok(ShellCommand::new("cmd.exe", &["/D", "/S", "/C"], format!("\"{script}\""))
            .raw()
            .in_dir_of(op))
    }
}

impl OutputClassifier for CmdDialect {
    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn trusts_exit_code(&self, kind: OperationKind) -> bool {
        !matches!(kind, OperationKind::Write | OperationKind::Append)
    }

    fn entry_matches(&self, _kind: OperationKind, line: &str, name: &str) -> bool {
        names_equal(line.trim_end(), name)
    }
}

impl ShellDialect for CmdDialect {
    fn backend(&self) -> Backend {
        Backend::Cmd
    }
}
