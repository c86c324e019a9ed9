//! Single byte-range resolution for file serving.
//!
//! Only the first range of a `Range: bytes=...` header is honoured.
//! Multipart byte ranges are not supported.

/// How a request should be answered given its Range header and the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole file with 200.
    Full,
    /// Serve the inclusive byte span `start..=end` with 206.
    Partial { start: u64, end: u64 },
    /// Answer 416 with `Content-Range: bytes */<size>`.
    Unsatisfiable,
}

impl RangeOutcome {
    /// `Content-Range` header value for this outcome, if one is sent.
    pub fn content_range(&self, file_size: u64) -> Option<String> {
        match self {
            RangeOutcome::Full => None,
            RangeOutcome::Partial { start, end } => {
                Some(format!("bytes {start}-{end}/{file_size}"))
            }
            RangeOutcome::Unsatisfiable => Some(format!("bytes */{file_size}")),
        }
    }
}

/// Parsed `bytes=START-END` spec. Either side may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeSpec {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

/// Parse a `Range: bytes=START-END` header value.
///
/// Returns `None` for anything malformed, which callers treat as if no
/// Range header had been sent.
pub fn parse_range_header(value: &str) -> Option<ByteRangeSpec> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let first = spec.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;

    let parse = |s: &str| -> Option<Option<u64>> {
        let s = s.trim();
        if s.is_empty() {
            Some(None)
        } else {
            s.parse::<u64>().ok().map(Some)
        }
    };

    let spec = ByteRangeSpec {
        start: parse(start)?,
        end: parse(end)?,
    };
    if spec.start.is_none() && spec.end.is_none() {
        return None;
    }
    Some(spec)
}

/// Decide how to answer a request for a file of `file_size` bytes.
///
/// - no (or malformed) header: [`RangeOutcome::Full`]
/// - `START-` / `START-END`: end clamped to the last byte; start at or past
///   the end of file, or after END, is unsatisfiable
/// - `-N`: the last N bytes
/// - a range covering the whole file is answered as [`RangeOutcome::Full`]
pub fn resolve_range(header: Option<&str>, file_size: u64) -> RangeOutcome {
    let Some(spec) = header.and_then(parse_range_header) else {
        return RangeOutcome::Full;
    };

    let (start, end) = match (spec.start, spec.end) {
        (Some(start), end) => {
            let last = file_size.saturating_sub(1);
            (start, end.map_or(last, |e| e.min(last)))
        }
        (None, Some(suffix)) => {
            if suffix == 0 {
                return RangeOutcome::Unsatisfiable;
            }
            (file_size.saturating_sub(suffix), file_size.saturating_sub(1))
        }
        (None, None) => return RangeOutcome::Full,
    };

    if start >= file_size || start > end {
        return RangeOutcome::Unsatisfiable;
    }
    if start == 0 && end == file_size - 1 {
        return RangeOutcome::Full;
    }
    RangeOutcome::Partial { start, end }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
