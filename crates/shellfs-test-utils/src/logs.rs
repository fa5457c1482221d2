//! Dump log files left behind by a process under test.
//!
//! When a scenario fails, the logs of the tool it drove are usually the
//! only record of why. These helpers render them into a string suitable
//! for a panic message or a `tracing` event.

use std::fs;
use std::path::{Path, PathBuf};

/// Every file below `dir`, recursively, in sorted order.
///
/// A missing directory yields an empty list.
pub fn all_files_in_directory(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => pending.push(path),
                Ok(_) => files.push(path),
                Err(_) => {}
            }
        }
    }
    files.sort();
    files
}

/// A file's contents framed by a header, or the reason it could not be read.
pub fn output_file_contents(path: &Path) -> String {
    let header = format!("----- {} -----", path.display());
    match fs::read(path) {
        Ok(bytes) => format!("{header}\n{}\n", String::from_utf8_lossy(&bytes)),
        Err(e) => format!("{header}\n<unreadable: {e}>\n"),
    }
}

/// Contents of every file below `dir`, concatenated.
pub fn dump_directory(dir: &Path) -> String {
    let files = all_files_in_directory(dir);
    if files.is_empty() {
        return format!("<no files under {}>\n", dir.display());
    }
    files.iter().map(|file| output_file_contents(file)).collect()
}

/// Emit [`dump_directory`] as a warning event.
pub fn log_directory(dir: &Path) {
    tracing::warn!(dir = %dir.display(), "Log files:\n{}", dump_directory(dir));
}
