//! Filesystem-backed music library: scanning, path validation, and metadata.
//!
//! Nothing here is persisted. Every value is derived from the media root on
//! demand and discarded once the response has been serialized.

pub mod metadata;
pub mod path_safety;
pub mod scanner;
pub mod tree;

pub use metadata::{format_file_size, get_metadata, AudioMetadata, FileEntry};
pub use path_safety::{is_safe, resolve_under_root};
pub use scanner::{build_playlist, scan, PlaylistEntry, ScanReport, SkippedDir};
pub use tree::{directory_tree, TreeNode};

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid file path")]
    InvalidPath,
    #[error("File type not supported: {0}")]
    UnsupportedType(String),
    #[error("Malformed range: {reason}")]
    MalformedRange { reason: String, file_size: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LibraryError {
    /// True for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LibraryError::Io(_))
    }
}

/// Lowercased extension of `path` including the leading dot, e.g. `.flac`.
///
/// Returns `None` for names without an extension, including dotfiles like
/// `.mp3` whose whole name is the stem.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Check whether `path` has one of the allowlisted extensions.
pub fn has_allowed_extension(path: &Path, allowed_extensions: &[String]) -> bool {
    extension_of(path)
        .map(|ext| allowed_extensions.iter().any(|allowed| *allowed == ext))
        .unwrap_or(false)
}

/// Path of `path` relative to `root`, always with `/` separators.
pub(crate) fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
