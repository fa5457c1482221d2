//! Rendered commands for every shell backend
//!
//! Bare relative names keep the snapshots identical across platforms.

use shellfs::shell::dialect_for;
use shellfs::{Backend, Operation};

fn render(op: &Operation) -> String {
    [Backend::Bash, Backend::Cmd, Backend::PowerShell]
        .into_iter()
        .map(|backend| {
            let dialect = dialect_for(backend).unwrap();
            let command = dialect.format(op).unwrap();
            format!("{backend}: {}", command.script)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn snapshot_delete_directory() {
    insta::assert_snapshot!(render(&Operation::delete_directory("build")), @r#"
    bash: if [ ! -d 'build' ]; then printf 'rm: cannot remove %s: No such file or directory\n' 'build' >&2; exit 1; fi; rm -rf -- 'build'
    cmd: "if not exist "build\*" (echo The system cannot find the file specified. 1>&2 & exit 1) else (rmdir /q /s "build")"
    powershell: $ErrorActionPreference = 'Stop'; try { if (-not (Test-Path -LiteralPath 'build' -PathType Container)) { throw ('Cannot find path ''{0}'' because it does not exist.' -f 'build') }; Remove-Item -Force -Recurse -LiteralPath 'build' } catch { [Console]::Error.WriteLine($_.Exception.Message + ' (' + $_.FullyQualifiedErrorId + ')'); exit 1 }
    "#);
}

#[test]
fn snapshot_write() {
    insta::assert_snapshot!(render(&Operation::write("notes.txt", "it's done")), @r#"
    bash: printf '%s' 'it'\''s done' > 'notes.txt'
    cmd: "echo|set /p ="it's done" > "notes.txt""
    powershell: $ErrorActionPreference = 'Stop'; try { Out-File -LiteralPath 'notes.txt' -InputObject 'it''s done' -Encoding ascii -NoNewline } catch { [Console]::Error.WriteLine($_.Exception.Message + ' (' + $_.FullyQualifiedErrorId + ')'); exit 1 }
    "#);
}

#[test]
fn snapshot_directory_exists() {
    insta::assert_snapshot!(render(&Operation::directory_exists("src")), @r#"
    bash: if [ ! -d '.' ]; then printf 'ls: cannot access %s: No such file or directory\n' '.' >&2; exit 1; fi; if [ ! -r '.' ] || [ ! -x '.' ]; then printf 'ls: cannot open directory %s: Permission denied\n' '.' >&2; exit 1; fi; ls -A1pL -- '.' 2>/dev/null; exit 0
    cmd: "if not exist ".\*" (echo The system cannot find the file specified. 1>&2 & exit 1) else (dir /A:d /B ".")"
    powershell: $ErrorActionPreference = 'Stop'; try { if (-not (Test-Path -LiteralPath '.' -PathType Container)) { throw ('Cannot find path ''{0}'' because it does not exist.' -f '.') }; Get-ChildItem -Force -LiteralPath '.' | Where-Object { $_.PSIsContainer } | ForEach-Object { $_.Name } } catch { [Console]::Error.WriteLine($_.Exception.Message + ' (' + $_.FullyQualifiedErrorId + ')'); exit 1 }
    "#);
}

#[test]
fn snapshot_rename_directory() {
    insta::assert_snapshot!(render(&Operation::rename_directory("/repo", "old", "new")), @r#"
    bash: if [ -e 'new' ] || [ -L 'new' ]; then printf 'mv: cannot move to %s: File exists\n' 'new' >&2; exit 1; fi; mv -- 'old' 'new'
    cmd: "if exist "new" (echo The destination already exists. 1>&2 & exit 1) else (ren "old" "new")"
    powershell: $ErrorActionPreference = 'Stop'; try { if (Test-Path -LiteralPath 'new') { throw ('An item with the specified name {0} already exists.' -f 'new') }; Rename-Item -LiteralPath 'old' -NewName 'new' } catch { [Console]::Error.WriteLine($_.Exception.Message + ' (' + $_.FullyQualifiedErrorId + ')'); exit 1 }
    "#);
}
