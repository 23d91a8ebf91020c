//! Path utilities for test data and temporary output files.

use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Path of a (not yet created) file inside `dir`.
pub fn temp_file_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

/// Writes `contents` to `name` inside `dir` and returns its path.
pub fn write_temp_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = temp_file_path(dir, name);
    write_file(&path, contents);
    path
}

fn write_file(path: &Path, contents: &str) {
    std::fs::write(path, contents)
        .unwrap_or_else(|e| panic!("Failed to write test file {:?}: {}", path, e));
}
