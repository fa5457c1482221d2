//! Process invocation tests against a real POSIX shell

#![cfg(unix)]

use pretty_assertions::assert_eq;
use rstest::rstest;
use shellfs_process::{ExternalTool, Invocation, ProcessInvoker, Stdin};
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn sh(script: &str) -> Invocation {
    Invocation::new("sh").arg("-c").arg(script)
}

#[test]
fn stdout_and_stderr_are_captured_separately() {
    let result = ProcessInvoker::new()
        .invoke(&sh("echo to-out; echo to-err >&2; echo more-out"))
        .unwrap();

    assert_eq!(result.stdout, "to-out\nmore-out\n");
    assert_eq!(result.stderr, "to-err\n");
    assert_eq!(result.exit_code, 0);
    assert!(!result.timed_out);
}

#[test]
fn exit_code_is_reported_not_raised() {
    let result = ProcessInvoker::new().invoke(&sh("exit 3")).unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
}

#[rstest]
#[case::bytes(false)]
#[case::file(true)]
fn stdin_reaches_the_child(#[case] from_file: bool) {
    let dir = tempdir().unwrap();
    let stdin = if from_file {
        let input = dir.path().join("objects.pack");
        std::fs::write(&input, "PACK contents").unwrap();
        Stdin::File(input)
    } else {
        Stdin::Bytes(b"PACK contents".to_vec())
    };

    let result = ProcessInvoker::new()
        .invoke(&Invocation::new("cat").stdin(stdin))
        .unwrap();

    assert_eq!(result.stdout, "PACK contents");
}

#[test]
fn large_input_and_output_do_not_deadlock() {
    let payload = "x".repeat(4 * 1024 * 1024);
    let invocation = Invocation::new("cat").stdin(Stdin::Bytes(payload.clone().into_bytes()));
    let result = ProcessInvoker::new().invoke(&invocation).unwrap();

    assert_eq!(result.stdout.len(), payload.len());
}

#[test]
fn env_override_reaches_child_only() {
    let invocation =
        sh("printf '%s' \"$SHELLFS_OBJECT_DIR\"").env("SHELLFS_OBJECT_DIR", "/tmp/objects");
    let result = ProcessInvoker::new().invoke(&invocation).unwrap();

    assert_eq!(result.stdout, "/tmp/objects");
    assert!(std::env::var("SHELLFS_OBJECT_DIR").is_err());
}

#[test]
fn working_directory_is_applied() {
    let dir = tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();

    let result = ProcessInvoker::new()
        .invoke(&Invocation::new("pwd").arg("-P").current_dir(&canonical))
        .unwrap();

    assert_eq!(result.stdout.trim_end(), canonical.to_string_lossy());
}

#[test]
fn runaway_process_is_killed_on_timeout() {
    let invoker = ProcessInvoker::with_timeout(Duration::from_millis(200));
    let started = Instant::now();

    let result = invoker.invoke(&Invocation::new("sleep").arg("10")).unwrap();

    assert!(result.timed_out);
    assert!(!result.success());
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "invoke blocked for {:?}",
        started.elapsed()
    );
}

#[rstest]
// Exits at once but leaves a descendant holding stdout
#[case::child_exits("sleep 8 & echo started")]
// Times out with a descendant holding stdout
#[case::child_hangs("sleep 8 & echo started; wait")]
fn descendants_holding_pipes_cannot_outlast_the_timeout(#[case] script: &str) {
    let invoker = ProcessInvoker::with_timeout(Duration::from_millis(500));
    let started = Instant::now();

    let result = invoker.invoke(&sh(script)).unwrap();

    assert!(result.timed_out, "{result:?}");
    assert_eq!(result.stdout, "started\n");
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "invoke blocked for {:?}",
        started.elapsed()
    );
}

#[rstest]
#[case::plain(&[("SHELLFS_OBJECT_DIR", "/tmp/objects")], "/tmp/objects")]
#[case::last_one_wins(
    &[("SHELLFS_OBJECT_DIR", "/tmp/a"), ("SHELLFS_OBJECT_DIR", "/tmp/b")],
    "/tmp/b"
)]
fn env_vars_apply_in_order(#[case] vars: &[(&str, &str)], #[case] expected: &str) {
    let invocation = sh("printf '%s' \"$SHELLFS_OBJECT_DIR\"").envs(vars.iter().copied());
    let result = ProcessInvoker::new().invoke(&invocation).unwrap();

    assert_eq!(result.stdout, expected);
}

#[test]
fn per_call_timeout_overrides_invoker_default() {
    let invoker = ProcessInvoker::with_timeout(Duration::from_secs(30));
    let invocation = Invocation::new("sleep")
        .arg("10")
        .timeout(Duration::from_millis(100));

    let result = invoker.invoke(&invocation).unwrap();
    assert!(result.timed_out);
}

#[test]
fn external_tool_merges_base_and_call_environment() {
    let dir = tempdir().unwrap();
    let tool = ExternalTool::new("sh", dir.path()).env("SHELLFS_BASE", "base");

    let output = tool
        .run_with_env(
            &["-c", "printf '%s:%s' \"$SHELLFS_BASE\" \"$SHELLFS_CALL\""],
            &[("SHELLFS_CALL", "call")],
        )
        .unwrap();

    assert_eq!(output.stdout(), "base:call");
}

#[test]
fn external_tool_failure_surfaces_stderr() {
    let dir = tempdir().unwrap();
    let tool = ExternalTool::new("sh", dir.path());

    let err = tool
        .run(&["-c", "echo 'fatal: not a repository' >&2; exit 128"])
        .unwrap()
        .ensure_success()
        .unwrap_err();

    assert!(err.to_string().contains("fatal: not a repository"));
    assert!(err.to_string().contains("128"));
}
