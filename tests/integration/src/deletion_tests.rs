//! Retrying deletion and lock probing against the real file system

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use shellfs::{
    DeletionOutcome, ExclusiveLockProbe, FileSystemOperations, RetryPolicy,
    RetryingDirectoryDeleter, ShareMode,
};
use shellfs_test_utils::{PathShould, TestDir, session_file_systems};

fn quick_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(5)
        .with_delay(Duration::from_millis(20))
}

#[test]
fn test_deleter_removes_a_populated_tree() {
    for fs in session_file_systems() {
        let dir = TestDir::new();
        dir.write_file("cache/objects/ab/cdef", "blob");
        dir.write_file("cache/index", "index");
        let cache = dir.path("cache");

        let outcome = fs.delete_directory_with_retries(&cache, &quick_policy());
        assert!(outcome.succeeded(), "[{}] {outcome:?}", fs.backend());
        assert_eq!(outcome.attempts(), 1);
        cache.should_not_exist_on_disk(&fs);
    }
}

#[test]
fn test_deleter_succeeds_without_attempts_when_absent() {
    for fs in session_file_systems() {
        let dir = TestDir::new();
        let outcome = fs.delete_directory_with_retries(dir.path("never-made"), &quick_policy());
        assert_eq!(outcome, DeletionOutcome::Succeeded { attempts: 0 });
    }
}

#[test]
#[cfg(windows)]
fn test_held_file_exhausts_retries_and_escalates() {
    let dir = TestDir::new();
    let victim = dir.create_dir("victim");
    let native = FileSystemOperations::native();
    let held = native
        .open_file_and_write(victim.join("pinned.txt"), "busy")
        .unwrap()
        .into_result()
        .unwrap();

    let escalations = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&escalations);
    let deleter = RetryingDirectoryDeleter::new(quick_policy().with_escalation_threshold(2))
        .on_escalation(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let outcome = deleter.delete(&native, &victim);
    assert!(!outcome.succeeded(), "{outcome:?}");
    assert_eq!(outcome.attempts(), 5);
    assert_eq!(escalations.load(Ordering::SeqCst), 2);

    held.release();
    assert!(deleter.delete(&native, &victim).succeeded());
}

#[test]
fn test_escalation_hook_stays_silent_on_quick_success() {
    let dir = TestDir::new();
    dir.write_file("tree/file.txt", "x");

    let escalations = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&escalations);
    let deleter = RetryingDirectoryDeleter::new(quick_policy().with_escalation_threshold(1))
        .on_escalation(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let outcome = deleter.delete(&FileSystemOperations::native(), &dir.path("tree"));
    assert!(outcome.succeeded());
    assert_eq!(escalations.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lock_probe_sees_held_file_until_released() {
    let dir = TestDir::new();
    let lock = dir.path("maintenance.lock");
    let probe = ExclusiveLockProbe::new(ShareMode::None);
    assert!(probe.probe(&lock).unwrap().acquired);

    let held = FileSystemOperations::native()
        .open_file_and_write(&lock, "pid 4242")
        .unwrap()
        .into_result()
        .unwrap();
    assert!(!probe.probe(&lock).unwrap().acquired);

    drop(held);
    assert!(probe.probe(&lock).unwrap().acquired);
    assert_eq!(dir.read_file("maintenance.lock"), "pid 4242");
}

#[test]
#[cfg(windows)]
fn test_delete_of_held_file_is_never_success() {
    use shellfs::{Backend, Category};

    for fs in session_file_systems() {
        let dir = TestDir::new();
        let path = dir.path("held.txt");
        let _held = FileSystemOperations::native()
            .open_file_and_write(&path, "held")
            .unwrap()
            .into_result()
            .unwrap();

        let outcome = fs.delete_file(&path).unwrap();
        assert!(!outcome.succeeded(), "[{}] {outcome}", fs.backend());
        if fs.backend() == Backend::Native {
            assert_eq!(outcome.category(), Category::Busy, "{outcome}");
        }
        path.should_be_a_file(&fs);
    }
}
