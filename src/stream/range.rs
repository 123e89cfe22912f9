use crate::library::LibraryError;

/// Inclusive byte range into a file of known size.
///
/// Always satisfies `start <= end < file_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl RangeSpec {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Parse a `Range` header of the form `bytes=<start>-<end>` against `file_size`.
///
/// `end` may be omitted, meaning the last byte. An `end` past the last byte is
/// clamped to it. Suffix ranges (`bytes=-N`), multiple ranges, non-numeric
/// offsets, `start > end`, and `start >= file_size` are rejected.
pub fn parse_range(header: &str, file_size: u64) -> Result<RangeSpec, LibraryError> {
    let malformed = |reason: &str| LibraryError::MalformedRange {
        reason: reason.to_string(),
        file_size,
    };

    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| malformed("unsupported range unit"))?;

    if spec.contains(',') {
        return Err(malformed("multiple ranges are not supported"));
    }

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| malformed("missing '-' separator"))?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return Err(malformed("range start is required"));
    }
    let start = parse_offset(start).ok_or_else(|| malformed("range start is not a number"))?;

    if start >= file_size {
        return Err(malformed("range start is beyond end of file"));
    }

    let last = file_size - 1;
    let end = if end.is_empty() {
        last
    } else {
        parse_offset(end)
            .ok_or_else(|| malformed("range end is not a number"))?
            .min(last)
    };

    if start > end {
        return Err(malformed("range start is after range end"));
    }

    Ok(RangeSpec { start, end })
}

/// Decimal digits only; `u64::from_str` alone would accept a leading `+`.
fn parse_offset(s: &str) -> Option<u64> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
