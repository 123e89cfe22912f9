//! Validation of untrusted file names before they touch the filesystem.

use super::LibraryError;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Substrings that indicate a traversal attempt, matched against lowercased input.
const DANGEROUS_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "//",
    "\\\\",
    "%2e%2e%2f",
    "%2e%2e%5c",
    "..%2f",
    "..%5c",
];

/// Check that a decoded, caller-supplied relative path is safe to join with the media root.
///
/// Rejects traversal sequences (plain and percent-encoded, any letter case),
/// doubled separators, embedded NUL characters, and absolute paths including
/// Windows drive specifiers. Never panics.
pub fn is_safe(candidate: &str) -> bool {
    if candidate.is_empty() {
        warn!("Empty path rejected");
        return false;
    }

    let lower = candidate.to_lowercase();
    if let Some(pattern) = DANGEROUS_PATTERNS.iter().find(|p| lower.contains(*p)) {
        warn!("Dangerous path detected ({}): {:?}", pattern, candidate);
        return false;
    }

    if candidate.contains('\0') {
        warn!("Null byte detected in path: {:?}", candidate);
        return false;
    }

    if is_absolute(candidate) {
        warn!("Absolute path not allowed: {:?}", candidate);
        return false;
    }

    // A bare `..` segment (e.g. `music/..`) slips past the pattern list.
    if candidate.split(['/', '\\']).any(|segment| segment == "..") {
        warn!("Parent traversal not allowed: {:?}", candidate);
        return false;
    }

    true
}

fn is_absolute(candidate: &str) -> bool {
    if candidate.starts_with('/') || candidate.starts_with('\\') {
        return true;
    }
    let bytes = candidate.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }
    Path::new(candidate).is_absolute()
}

/// Resolve `candidate` under `root`, requiring the real path to stay inside the root.
///
/// Runs [`is_safe`] first, then canonicalizes both sides so that symlinks
/// pointing out of the root are refused. Anything other than a regular file
/// (a directory named `live.mp3`, a socket) counts as not found. Errors never
/// carry the resolved absolute path.
pub fn resolve_under_root(root: &Path, candidate: &str) -> Result<PathBuf, LibraryError> {
    if !is_safe(candidate) {
        return Err(LibraryError::InvalidPath);
    }

    let rel = Path::new(candidate);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        warn!("Non-normal path component rejected: {:?}", candidate);
        return Err(LibraryError::InvalidPath);
    }

    let root_can = std::fs::canonicalize(root).map_err(|e| {
        warn!("Media root {:?} is not accessible: {}", root, e);
        LibraryError::NotFound("music directory".to_string())
    })?;

    let joined = root_can.join(rel);
    let target = match std::fs::canonicalize(&joined) {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LibraryError::NotFound(candidate.to_string()));
        }
        Err(e) => return Err(LibraryError::Io(e)),
    };

    if !target.starts_with(&root_can) {
        warn!("Path escapes media root: {:?} -> {:?}", candidate, target);
        return Err(LibraryError::InvalidPath);
    }

    match std::fs::metadata(&target) {
        Ok(meta) if meta.is_file() => Ok(target),
        Ok(_) => {
            warn!("Not a regular file: {:?}", candidate);
            Err(LibraryError::NotFound(candidate.to_string()))
        }
        Err(e) => Err(LibraryError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_traversal_patterns() {
        for input in [
            "../etc/passwd",
            "music/../../secret.mp3",
            "..\\windows\\system.ini",
            "a//b.mp3",
            "a\\\\b.mp3",
            "%2e%2e%2fsecret.mp3",
            "%2E%2E%2Fsecret.mp3",
            "%2e%2e%5csecret.mp3",
            "..%2fsecret.mp3",
            "..%2Fsecret.mp3",
            "..%5Csecret.mp3",
            "a/..",
            "..",
        ] {
            assert!(!is_safe(input), "expected rejection of {:?}", input);
        }
    }

    #[test]
    fn test_rejects_null_and_absolute() {
        assert!(!is_safe("song\0.mp3"));
        assert!(!is_safe("/etc/passwd"));
        assert!(!is_safe("\\server\\share.mp3"));
        assert!(!is_safe("C:\\music\\a.mp3"));
        assert!(!is_safe("c:/music/a.mp3"));
        assert!(!is_safe(""));
    }

    #[test]
    fn test_accepts_ordinary_names() {
        for input in [
            "song.mp3",
            "Artist/Album/01 - Intro.flac",
            "Björk/Homogenic/Jóga.flac",
            "日本語/曲.m4a",
            "dots...in.name.mp3",
            "..hidden-ish.mp3",
            "a/b/c/d/e.wav",
            "100%.mp3",
        ] {
            assert!(is_safe(input), "expected acceptance of {:?}", input);
        }
    }

    #[test]
    fn test_resolve_under_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::fs::write(tmp.path().join("a/x.mp3"), b"abc").unwrap();

        let resolved = resolve_under_root(tmp.path(), "a/x.mp3").unwrap();
        assert!(resolved.ends_with("a/x.mp3"));

        assert!(matches!(
            resolve_under_root(tmp.path(), "a/missing.mp3"),
            Err(LibraryError::NotFound(_))
        ));
        assert!(matches!(
            resolve_under_root(tmp.path(), "../x.mp3"),
            Err(LibraryError::InvalidPath)
        ));
    }

    #[test]
    fn test_resolve_rejects_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("Live.mp3/disc1")).unwrap();

        assert!(matches!(
            resolve_under_root(tmp.path(), "Live.mp3"),
            Err(LibraryError::NotFound(_))
        ));
        assert!(matches!(
            resolve_under_root(tmp.path(), "Live.mp3/disc1"),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_refuses_symlink_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(tmp.path().join("outside.mp3"), b"secret").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("outside.mp3"), root.join("evil.mp3")).unwrap();

        assert!(matches!(
            resolve_under_root(&root, "evil.mp3"),
            Err(LibraryError::InvalidPath)
        ));
    }
}
