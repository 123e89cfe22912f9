//! Recursive scanner that builds the playlist from the media root.
//!
//! The walk uses an explicit worklist instead of recursion, so very deep trees
//! cannot exhaust the call stack. A directory that cannot be read is logged,
//! recorded in [`ScanReport::skipped`], and treated as empty; only a missing or
//! unreadable root is reported as an error.
//!
//! Symlinks and special files are never followed or listed: entries are
//! classified with [`fs::DirEntry::file_type`], which does not traverse links.

use super::{extension_of, has_allowed_extension, relative_display, LibraryError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a directory entry turned out to be, without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Directory,
    File,
    Other,
}

/// A subtree dropped from the scan because it could not be read
#[derive(Debug, Clone)]
pub struct SkippedDir {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a scan: matching files in order, plus the subtrees that failed
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Absolute paths of matching files, sorted by path string
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedDir>,
}

/// One playlist row as served to the player
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub id: usize,
    pub filename: String,
    /// Path relative to the media root, `/`-separated
    pub path: String,
    pub title: String,
    pub extension: String,
    #[serde(rename = "streamUrl")]
    pub stream_url: String,
}

/// Scan `root` recursively for files whose extension is in `allowed_extensions`.
pub fn scan(root: &Path, allowed_extensions: &[String]) -> Result<ScanReport, LibraryError> {
    info!("Scanning music directory: {:?}", root);

    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(LibraryError::Io(io::Error::new(
                io::ErrorKind::Other,
                "music root is not a directory",
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LibraryError::NotFound("music directory".to_string()))
        }
        Err(e) => return Err(LibraryError::Io(e)),
    }

    // The root itself must be listable; failures below it are tolerated.
    let root_entries = read_dir_entries(root)?;
    let report = walk(root, root_entries, allowed_extensions, read_dir_entries);

    info!(
        "Found {} music file(s), skipped {} unreadable dir(s)",
        report.files.len(),
        report.skipped.len()
    );

    Ok(report)
}

fn read_dir_entries(dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {:?}, skipping: {}", dir, e);
                continue;
            }
        };
        let kind = match entry.file_type() {
            Ok(ft) if ft.is_dir() => EntryKind::Directory,
            Ok(ft) if ft.is_file() => EntryKind::File,
            Ok(_) => EntryKind::Other,
            Err(e) => {
                warn!("Failed to stat {:?}, skipping: {}", entry.path(), e);
                EntryKind::Other
            }
        };
        out.push((entry.path(), kind));
    }
    Ok(out)
}

/// Worklist traversal over pre-read root entries.
///
/// `read_dir` lists a directory; any error it returns drops that subtree.
pub(crate) fn walk<F>(
    root: &Path,
    root_entries: Vec<(PathBuf, EntryKind)>,
    allowed_extensions: &[String],
    mut read_dir: F,
) -> ScanReport
where
    F: FnMut(&Path) -> io::Result<Vec<(PathBuf, EntryKind)>>,
{
    let mut report = ScanReport::default();
    let mut pending: Vec<(PathBuf, EntryKind)> = root_entries;

    while let Some((path, kind)) = pending.pop() {
        match kind {
            EntryKind::Directory => match read_dir(&path) {
                Ok(children) => pending.extend(children),
                Err(e) => {
                    warn!("Error scanning directory {:?}: {}", path, e);
                    report.skipped.push(SkippedDir {
                        path,
                        reason: e.to_string(),
                    });
                }
            },
            EntryKind::File => {
                if has_allowed_extension(&path, allowed_extensions) {
                    report.files.push(path);
                }
            }
            EntryKind::Other => debug!("Skipping non-regular entry {:?}", path),
        }
    }

    report
        .files
        .sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    debug!("Walked {:?}: {} file(s)", root, report.files.len());

    report
}

/// Derive playlist rows from a scan, ids assigned by position.
pub fn build_playlist(root: &Path, report: &ScanReport) -> Vec<PlaylistEntry> {
    report
        .files
        .iter()
        .enumerate()
        .map(|(id, file)| {
            let path = relative_display(root, file);
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let title = file
                .file_stem()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| filename.clone());
            let extension = extension_of(file).unwrap_or_default();
            PlaylistEntry {
                id,
                stream_url: stream_url(&path),
                filename,
                path,
                title,
                extension,
            }
        })
        .collect()
}

/// Stream URL for a root-relative path, each segment percent-encoded.
pub fn stream_url(relative_path: &str) -> String {
    let encoded = relative_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/api/music/stream/{}", encoded)
}
