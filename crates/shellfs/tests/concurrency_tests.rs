//! Parallel use of one façade on disjoint directories

use shellfs::{ExclusiveLockProbe, FileSystemOperations, RetryPolicy};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_public_types_are_send_and_sync() {
    assert_send_sync::<FileSystemOperations>();
    assert_send_sync::<ExclusiveLockProbe>();
    assert_send_sync::<shellfs::RetryingDirectoryDeleter>();
    assert_send_sync::<shellfs::SessionConfig>();
}

#[test]
fn test_shared_facade_on_disjoint_directories() {
    let dir = tempdir().unwrap();
    let fs = Arc::new(FileSystemOperations::native());

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            let root = dir.path().join(format!("worker{thread_id}"));

            thread::spawn(move || {
                barrier.wait();

                assert!(fs.create_directory(&root).unwrap().succeeded());
                let file = root.join("data.txt");
                for i in 0..10 {
                    let outcome = fs.append_all_text(&file, &format!("{i}")).unwrap();
                    assert!(outcome.succeeded(), "{outcome}");
                }
                let text = fs.read_all_text(&file).unwrap().into_result().unwrap();
                assert_eq!(text, "0123456789");

                let deleted = fs.delete_directory_with_retries(&root, &RetryPolicy::default());
                assert!(deleted.succeeded(), "{deleted:?}");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
