#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Deterministic byte pattern so slices can be checked by position
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Create `rel` under `root` with `len` pattern bytes, creating parent dirs.
pub fn write_file(root: &Path, rel: &str, len: usize) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, pattern(len)).unwrap();
}

/// Media root with `a/song1.mp3` (500 B), `a/b/song2.flac` (1200 B), `notes.txt`.
pub fn sample_library() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    write_file(tmp.path(), "a/song1.mp3", 500);
    write_file(tmp.path(), "a/b/song2.flac", 1200);
    write_file(tmp.path(), "notes.txt", 10);
    tmp
}

pub fn extensions(list: &[&str]) -> Vec<String> {
    list.iter().map(|e| e.to_string()).collect()
}
