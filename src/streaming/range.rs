//! HTTP Range header parsing.
//!
//! Only the single-range byte-unit form `bytes=<start>-<end>?` is accepted.
//! Multi-range and suffix (`bytes=-N`) requests are rejected as malformed;
//! clients always receive `Accept-Ranges: bytes` and can retry with an
//! explicit start.

/// An inclusive byte interval into a file of known total size.
///
/// Invariant: `0 <= start <= end < total_size` for any range produced by
/// [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Why a Range header could not be turned into a [`ByteRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// The header does not match `bytes=<start>-<end>?`.
    Malformed,
    /// Start lies at or past the end of the file, or start > end.
    Unsatisfiable,
}

/// Parse a Range header value against a known total size.
///
/// `start` is required; a missing `end` means "to the end of the file".
/// A requested `end` past the last byte is clamped to `total_size - 1`.
pub fn parse(header: &str, total_size: u64) -> Result<ByteRange, RangeError> {
    let spec = header.strip_prefix("bytes=").ok_or(RangeError::Malformed)?;

    // Multi-range requests are not supported.
    if spec.contains(',') {
        return Err(RangeError::Malformed);
    }

    let (start, end) = spec.split_once('-').ok_or(RangeError::Malformed)?;

    let start: u64 = start.trim().parse().map_err(|_| RangeError::Malformed)?;

    let end = match end.trim() {
        "" => total_size.saturating_sub(1),
        s => s.parse().map_err(|_| RangeError::Malformed)?,
    };

    if start >= total_size || start > end {
        return Err(RangeError::Unsatisfiable);
    }

    Ok(ByteRange {
        start,
        end: end.min(total_size - 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ended_range_runs_to_last_byte() {
        for start in [0u64, 1, 500, 999] {
            let range = parse(&format!("bytes={}-", start), 1000).unwrap();
            assert_eq!(range, ByteRange { start, end: 999 });
        }
    }

    #[test]
    fn explicit_range() {
        assert_eq!(
            parse("bytes=100-199", 1000),
            Ok(ByteRange {
                start: 100,
                end: 199
            })
        );
        assert_eq!(parse("bytes=100-199", 1000).unwrap().length(), 100);
    }

    #[test]
    fn end_is_clamped_to_file_size() {
        assert_eq!(
            parse("bytes=0-2000", 1000),
            Ok(ByteRange { start: 0, end: 999 })
        );
    }

    #[test]
    fn start_past_eof_is_unsatisfiable() {
        assert_eq!(parse("bytes=1000-", 1000), Err(RangeError::Unsatisfiable));
        assert_eq!(
            parse("bytes=1500-1600", 1000),
            Err(RangeError::Unsatisfiable)
        );
    }

    #[test]
    fn inverted_range_is_unsatisfiable() {
        assert_eq!(parse("bytes=200-100", 1000), Err(RangeError::Unsatisfiable));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for header in [
            "bytes=-",
            "bytes=abc-def",
            "bytes=-500",
            "bytes=0-99,200-299",
            "items=0-99",
            "0-99",
            "bytes=99",
        ] {
            assert_eq!(parse(header, 1000), Err(RangeError::Malformed), "{header}");
        }
    }

    #[test]
    fn single_byte_file() {
        assert_eq!(parse("bytes=0-", 1), Ok(ByteRange { start: 0, end: 0 }));
        assert_eq!(parse("bytes=1-", 1), Err(RangeError::Unsatisfiable));
    }
}
