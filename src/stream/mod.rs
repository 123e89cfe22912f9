//! Range-aware audio file streaming.
//!
//! [`open_stream`] validates the requested path, stats the file, works out
//! the byte range to send, and returns an [`AudioStream`] holding an open
//! handle positioned at the first byte. The body is produced lazily in fixed
//! size chunks, so memory use does not depend on file size. The handle lives
//! inside the body stream and is closed whenever the stream is dropped,
//! including when the client disconnects mid-transfer.

mod range;

pub use range::{parse_range, RangeSpec};

use crate::config::Config;
use crate::library::{extension_of, has_allowed_extension, resolve_under_root, LibraryError};
use axum::body::Bytes;
use futures::Stream;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{error, info};

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// MIME type for an audio extension (with leading dot).
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        ".mp3" => "audio/mpeg",
        ".wav" => "audio/wav",
        ".flac" => "audio/flac",
        ".m4a" => "audio/mp4",
        _ => "audio/mpeg",
    }
}

/// An opened audio file ready to be written to a response
#[derive(Debug)]
pub struct AudioStream {
    pub content_type: &'static str,
    pub file_size: u64,
    /// `None` means the whole file is sent
    pub range: Option<RangeSpec>,
    file: File,
}

impl AudioStream {
    /// Number of body bytes this stream yields.
    pub fn content_length(&self) -> u64 {
        match self.range {
            Some(range) => range.len(),
            None => self.file_size,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.range.is_some()
    }

    pub fn content_range(&self) -> Option<String> {
        self.range.map(|r| r.content_range(self.file_size))
    }

    /// Consume the stream into body chunks, reading exactly `content_length` bytes.
    pub fn into_body_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let remaining = self.content_length();
        futures::stream::try_unfold((self.file, remaining), |(file, remaining)| {
            read_chunk(file, remaining)
        })
    }
}

async fn read_chunk(mut file: File, remaining: u64) -> io::Result<Option<(Bytes, (File, u64))>> {
    if remaining == 0 {
        return Ok(None);
    }
    let want = remaining.min(STREAM_CHUNK_SIZE as u64) as usize;
    let mut buf = vec![0u8; want];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "file shrank while streaming",
        ));
    }
    buf.truncate(n);
    Ok(Some((Bytes::from(buf), (file, remaining - n as u64))))
}

/// Open `relative_path` under the configured root, honoring an optional `Range` header.
pub async fn open_stream(
    config: &Config,
    relative_path: &str,
    range_header: Option<&str>,
) -> Result<AudioStream, LibraryError> {
    let path = resolve_blocking(config.music_path.clone(), relative_path.to_string()).await?;

    // Checked on the requested name, so an in-root symlink cannot change the type.
    let requested = Path::new(relative_path);
    let extension = extension_of(requested).unwrap_or_default();
    if !has_allowed_extension(requested, &config.allowed_extensions) {
        return Err(LibraryError::UnsupportedType(extension));
    }

    let mut file = File::open(&path).await.map_err(|e| {
        error!("Error opening {}: {}", relative_path, e);
        LibraryError::Io(e)
    })?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| {
            error!("Error reading metadata for {}: {}", relative_path, e);
            LibraryError::Io(e)
        })?
        .len();

    let range = match range_header {
        Some(header) => Some(parse_range(header, file_size)?),
        None => None,
    };

    if let Some(range) = range {
        file.seek(SeekFrom::Start(range.start)).await.map_err(|e| {
            error!("Error seeking {} to {}: {}", relative_path, range.start, e);
            LibraryError::Io(e)
        })?;
    }

    info!(
        "Streaming: {} ({})",
        relative_path,
        range
            .map(|r| r.content_range(file_size))
            .unwrap_or_else(|| format!("full, {} bytes", file_size))
    );

    Ok(AudioStream {
        content_type: content_type_for(&extension),
        file_size,
        range,
        file,
    })
}

async fn resolve_blocking(root: PathBuf, relative_path: String) -> Result<PathBuf, LibraryError> {
    tokio::task::spawn_blocking(move || resolve_under_root(&root, &relative_path))
        .await
        .map_err(|e| LibraryError::Io(io::Error::new(io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn config_for(root: &std::path::Path) -> Config {
        Config::new(root.to_path_buf())
    }

    async fn collect(stream: AudioStream) -> Vec<u8> {
        stream
            .into_body_stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(".mp3"), "audio/mpeg");
        assert_eq!(content_type_for(".wav"), "audio/wav");
        assert_eq!(content_type_for(".flac"), "audio/flac");
        assert_eq!(content_type_for(".m4a"), "audio/mp4");
        assert_eq!(content_type_for(".ogg"), "audio/mpeg");
    }

    #[tokio::test]
    async fn test_full_and_partial_bodies() {
        let tmp = tempfile::tempdir().unwrap();
        let data = pattern(200_000);
        std::fs::write(tmp.path().join("big.flac"), &data).unwrap();
        let config = config_for(tmp.path());

        let full = open_stream(&config, "big.flac", None).await.unwrap();
        assert!(!full.is_partial());
        assert_eq!(full.content_length(), 200_000);
        assert_eq!(full.content_type, "audio/flac");
        assert_eq!(collect(full).await, data);

        let part = open_stream(&config, "big.flac", Some("bytes=70000-140001"))
            .await
            .unwrap();
        assert_eq!(part.content_range().as_deref(), Some("bytes 70000-140001/200000"));
        assert_eq!(part.content_length(), 70_002);
        assert_eq!(collect(part).await, data[70_000..=140_001].to_vec());
    }

    #[tokio::test]
    async fn test_open_stream_errors() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.mp3"), pattern(1000)).unwrap();
        std::fs::write(tmp.path().join("readme.txt"), b"hi").unwrap();
        let config = config_for(tmp.path());

        assert!(matches!(
            open_stream(&config, "../a.mp3", None).await,
            Err(LibraryError::InvalidPath)
        ));
        assert!(matches!(
            open_stream(&config, "missing.mp3", None).await,
            Err(LibraryError::NotFound(_))
        ));
        assert!(matches!(
            open_stream(&config, "readme.txt", None).await,
            Err(LibraryError::UnsupportedType(_))
        ));
        assert!(matches!(
            open_stream(&config, "a.mp3", Some("bytes=2000-3000")).await,
            Err(LibraryError::MalformedRange { file_size: 1000, .. })
        ));
    }

    #[tokio::test]
    async fn test_directory_with_audio_name_is_not_streamed() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("Live.mp3/disc1")).unwrap();
        let config = config_for(tmp.path());

        assert!(matches!(
            open_stream(&config, "Live.mp3", None).await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_type_follows_requested_name() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("real.flac"), pattern(10)).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"hi").unwrap();
        symlink(tmp.path().join("real.flac"), tmp.path().join("alias.txt")).unwrap();
        symlink(tmp.path().join("notes.txt"), tmp.path().join("alias.mp3")).unwrap();
        let config = config_for(tmp.path());

        assert!(matches!(
            open_stream(&config, "alias.txt", None).await,
            Err(LibraryError::UnsupportedType(_))
        ));
        let stream = open_stream(&config, "alias.mp3", None).await.unwrap();
        assert_eq!(stream.content_type, "audio/mpeg");
        assert_eq!(collect(stream).await, b"hi".to_vec());
    }
}
