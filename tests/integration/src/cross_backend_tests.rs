//! Every available backend against real directories
//!
//! State produced through one backend is checked through another, so a
//! bug in a single backend cannot hide itself.

use pretty_assertions::assert_eq;
use rstest::rstest;
use shellfs::{Category, Error, FileSystemOperations};
use shellfs_test_utils::{OutcomeShould, PathShould, TestDir, session_file_systems};

/// Run `check` once per session backend, each in a fresh directory
fn for_each_backend(check: impl Fn(&FileSystemOperations, &TestDir)) {
    let file_systems = session_file_systems();
    assert!(!file_systems.is_empty(), "no backend available");
    for fs in &file_systems {
        check(fs, &TestDir::new());
    }
}

#[test]
fn test_created_file_exists_and_is_empty() {
    for_each_backend(|fs, dir| {
        let path = dir.path("fresh.txt");
        fs.create_empty_file(&path).unwrap().should_succeed();

        path.should_be_a_file(fs);
        assert!(fs.file_exists(&path).unwrap());
        assert!(!fs.directory_exists(&path).unwrap());
        assert_eq!(fs.file_size(&path).unwrap().value(), Some(&0));
    });
}

#[test]
fn test_created_directory_exists() {
    for_each_backend(|fs, dir| {
        let path = dir.path("fresh");
        fs.create_directory(&path).unwrap().should_succeed();

        path.should_be_a_directory(fs);
        assert!(!fs.file_exists(&path).unwrap());
    });
}

#[test]
fn test_missing_parent_reads_as_absent() {
    for_each_backend(|fs, dir| {
        let path = dir.path("no/such/file.txt");
        assert!(!fs.file_exists(&path).unwrap());
        assert!(!fs.directory_exists(&path).unwrap());
    });
}

#[test]
fn test_path_under_a_file_reads_as_absent() {
    for_each_backend(|fs, dir| {
        let file = dir.write_file("notes", "x");
        let nested = file.join("notes");
        assert!(!fs.file_exists(&nested).unwrap(), "[{}]", fs.backend());
        assert!(!fs.directory_exists(&nested).unwrap(), "[{}]", fs.backend());
    });
}

#[cfg(unix)]
#[test]
fn test_link_to_directory_counts_as_directory() {
    for_each_backend(|fs, dir| {
        let real = dir.create_dir("real");
        let link = dir.path("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(fs.directory_exists(&link).unwrap(), "[{}]", fs.backend());
        assert!(!fs.file_exists(&link).unwrap(), "[{}]", fs.backend());
    });
}

#[test]
fn test_deleted_file_is_gone_and_second_delete_is_not_found() {
    for_each_backend(|fs, dir| {
        let path = dir.write_file("doomed.txt", "x");
        fs.delete_file(&path).unwrap().should_succeed();
        path.should_not_exist_on_disk(fs);

        fs.delete_file(&path).unwrap().should_fail_with(Category::NotFound);
    });
}

#[test]
fn test_deleted_directory_takes_its_contents() {
    for_each_backend(|fs, dir| {
        dir.write_file("tree/a/b/leaf.txt", "leaf");
        let tree = dir.path("tree");
        fs.delete_directory(&tree).unwrap().should_succeed();
        tree.should_not_exist_on_disk(fs);

        fs.delete_directory(&tree).unwrap().should_fail_with(Category::NotFound);
    });
}

#[rstest]
#[case::single_word("hello")]
#[case::spaces("hello shell world")]
#[case::quotes("it's a 'quoted' word")]
#[case::empty("")]
#[case::padded("  x  ")]
#[case::trailing_newline("line one\n")]
#[case::blank_lines("a\n\n")]
fn test_written_text_reads_back(#[case] content: &str) {
    for_each_backend(|fs, dir| {
        let path = dir.path("note.txt");
        match fs.write_all_text(&path, content) {
            Ok(outcome) => {
                outcome.should_succeed();
            }
            // Text this backend's shell cannot express
            Err(Error::InvalidOperation { .. }) => return,
            Err(e) => panic!("[{}] write failed: {e}", fs.backend()),
        }
        assert_eq!(dir.read_file("note.txt"), content, "[{}] on disk", fs.backend());

        let read = fs.read_all_text(&path).unwrap();
        read.outcome().should_succeed();
        assert_eq!(read.value().map(String::as_str), Some(content), "[{}]", fs.backend());
    });
}

#[test]
fn test_append_extends_existing_content() {
    for_each_backend(|fs, dir| {
        let path = dir.write_file("log.txt", "first");
        fs.append_all_text(&path, "second").unwrap().should_succeed();

        assert_eq!(dir.read_file("log.txt"), "firstsecond", "[{}]", fs.backend());
    });
}

#[test]
fn test_move_file_to_fresh_destination() {
    for_each_backend(|fs, dir| {
        let source = dir.write_file("source.txt", "payload");
        let target = dir.path("moved/target.txt");
        dir.create_dir("moved");

        fs.move_file(&source, &target).unwrap().should_succeed();

        assert!(!fs.file_exists(&source).unwrap(), "[{}]", fs.backend());
        assert!(fs.file_exists(&target).unwrap(), "[{}]", fs.backend());
        assert_eq!(dir.read_file("moved/target.txt"), "payload");
    });
}

#[test]
fn test_move_refuses_to_overwrite_but_replace_does() {
    for_each_backend(|fs, dir| {
        let source = dir.write_file("source.txt", "new");
        let target = dir.write_file("target.txt", "old");

        fs.move_file(&source, &target)
            .unwrap()
            .should_fail_with(Category::AlreadyExists);
        source.should_be_a_file(fs);
        assert_eq!(dir.read_file("target.txt"), "old");

        fs.replace_file(&source, &target).unwrap().should_succeed();
        source.should_not_exist_on_disk(fs);
        assert_eq!(dir.read_file("target.txt"), "new");
    });
}

#[test]
fn test_move_and_rename_directory() {
    for_each_backend(|fs, dir| {
        dir.write_file("before/inner.txt", "payload");
        let moved = dir.path("after");
        fs.move_directory(dir.path("before"), &moved)
            .unwrap()
            .should_succeed();
        moved.should_be_a_directory(fs);
        assert_eq!(dir.read_file("after/inner.txt"), "payload");

        fs.rename_directory(dir.root(), "after", "renamed")
            .unwrap()
            .should_succeed();
        dir.path("renamed").should_be_a_directory(fs);
        moved.should_not_exist_on_disk(fs);
    });
}

#[test]
fn test_hard_link_sees_writes_through_original() {
    for_each_backend(|fs, dir| {
        let original = dir.write_file("original.txt", "v1");
        let link = dir.path("link.txt");
        fs.create_hard_link(&link, &original).unwrap().should_succeed();

        dir.write_file("original.txt", "v2");
        assert_eq!(dir.read_file("link.txt"), "v2");
    });
}

#[test]
fn test_enumerate_mentions_every_entry() {
    for_each_backend(|fs, dir| {
        dir.write_file("listing/alpha.txt", "");
        dir.create_dir("listing/beta");

        let listing = fs.enumerate_directory(dir.path("listing")).unwrap();
        let text = listing.value().cloned().unwrap_or_default();
        assert!(text.contains("alpha.txt"), "[{}] {text}", fs.backend());
        assert!(text.contains("beta"), "[{}] {text}", fs.backend());
    });
}

#[test]
fn test_size_matches_written_bytes() {
    for_each_backend(|fs, dir| {
        let path = dir.write_file("sized.bin", "0123456789");
        assert_eq!(fs.file_size(&path).unwrap().value(), Some(&10));

        let missing = fs.file_size(dir.path("missing.bin")).unwrap();
        assert!(!missing.succeeded());
    });
}

#[test]
fn test_verifying_backend_sees_native_changes() {
    let native = FileSystemOperations::native();
    for_each_backend(|fs, dir| {
        let path = dir.path("made-natively.txt");
        native.write_all_text(&path, "native").unwrap().should_succeed();
        path.should_contain_text(fs, "native");

        native.delete_file(&path).unwrap().should_succeed();
        path.should_not_exist_on_disk(fs);
    });
}
