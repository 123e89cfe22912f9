use super::{extension_of, has_allowed_extension, relative_display, resolve_under_root, LibraryError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// A media file as seen through a single stat call
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    /// Never serialized: responses must not reveal the server layout.
    #[serde(skip)]
    pub absolute_path: PathBuf,
    #[serde(rename = "path")]
    pub relative_path: String,
    pub extension: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Not every filesystem records birth time
    #[serde(rename = "created")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "modified")]
    pub modified_at: DateTime<Utc>,
}

impl FileEntry {
    /// Stat `absolute_path` and build an entry relative to `root`.
    pub fn from_path(root: &Path, absolute_path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(absolute_path)?;
        Ok(FileEntry {
            absolute_path: absolute_path.to_path_buf(),
            relative_path: relative_display(root, absolute_path),
            extension: extension_of(absolute_path).unwrap_or_default(),
            size_bytes: meta.len(),
            created_at: meta.created().ok().map(DateTime::<Utc>::from),
            modified_at: DateTime::<Utc>::from(meta.modified()?),
        })
    }
}

/// File metadata plus audio fields that stay empty until tags are decoded
#[derive(Debug, Clone, Serialize)]
pub struct AudioMetadata {
    pub filename: String,
    pub title: String,
    #[serde(flatten)]
    pub entry: FileEntry,
    #[serde(rename = "sizeFormatted")]
    pub size_formatted: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<f64>,
    pub bitrate: Option<u32>,
    #[serde(rename = "sampleRate")]
    pub sample_rate: Option<u32>,
}

/// Look up filesystem metadata for a caller-supplied relative path.
pub fn get_metadata(
    root: &Path,
    allowed_extensions: &[String],
    relative_path: &str,
) -> Result<AudioMetadata, LibraryError> {
    let root = std::fs::canonicalize(root)
        .map_err(|_| LibraryError::NotFound("music directory".to_string()))?;
    let target = resolve_under_root(&root, relative_path)?;

    // The allowlist and reported names follow what the caller asked for, not
    // where an in-root symlink happens to point.
    let requested = root.join(relative_path);
    if !has_allowed_extension(&requested, allowed_extensions) {
        return Err(LibraryError::UnsupportedType(
            extension_of(&requested).unwrap_or_default(),
        ));
    }

    let entry = FileEntry::from_path(&root, &requested).map_err(|e| {
        error!("Error getting metadata for {:?}: {}", target, e);
        LibraryError::NotFound(relative_path.to_string())
    })?;
    debug!("Metadata for {}: {} bytes", relative_path, entry.size_bytes);

    let filename = requested
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = requested
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.clone());

    Ok(AudioMetadata {
        filename,
        title,
        size_formatted: format_file_size(entry.size_bytes),
        entry,
        artist: None,
        album: None,
        duration: None,
        bitrate: None,
        sample_rate: None,
    })
}

/// Human-readable size with 1024-based units, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
