//! Drive an opaque tool, then check what it left behind through each backend

#![cfg(unix)]

use predicates::prelude::*;
use shellfs_process::{ExternalTool, ProcessError};
use shellfs_test_utils::{PathShould, TestDir, logs, session_file_systems};

fn tool(dir: &TestDir) -> ExternalTool {
    ExternalTool::new("sh", dir.root()).env("PAYLOAD", "from the base environment")
}

#[test]
fn test_tool_output_is_visible_to_every_backend() {
    let dir = TestDir::new();
    tool(&dir)
        .run(&["-c", "mkdir -p out && printf %s \"$PAYLOAD\" > out/result.txt"])
        .unwrap()
        .ensure_success()
        .unwrap();

    for fs in session_file_systems() {
        dir.path("out").should_be_a_directory(&fs);
        dir.path("out/result.txt")
            .should_be_a_file(&fs)
            .should_contain_text(&fs, "from the base environment");
    }
}

#[test]
fn test_per_call_environment_wins() {
    let dir = TestDir::new();
    let output = tool(&dir)
        .run_with_env(&["-c", "printf %s \"$PAYLOAD\""], &[("PAYLOAD", "per call")])
        .unwrap();
    assert_eq!(output.stdout(), "per call");
}

#[test]
fn test_failing_tool_keeps_its_logs_inspectable() {
    let dir = TestDir::new();
    let script = "mkdir -p logs; echo 'lock held by 4242' > logs/run.log; echo gave up >&2; exit 2";
    let err = tool(&dir)
        .run(&["-c", script])
        .unwrap()
        .ensure_success()
        .unwrap_err();

    match err {
        ProcessError::CommandFailed { code, stderr } => {
            assert_eq!(code, 2);
            assert!(predicate::str::contains("gave up").eval(&stderr));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let dump = logs::dump_directory(&dir.path("logs"));
    assert!(predicate::str::contains("lock held by 4242").eval(&dump), "{dump}");
    for fs in session_file_systems() {
        dir.path("logs/run.log").should_be_a_file(&fs);
    }
}
