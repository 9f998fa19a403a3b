//! Error types for the streaming core.
//!
//! Every failure a request can hit maps onto one of these kinds; the HTTP
//! layer (`server::error`) turns them into status codes. Once a response
//! body has started streaming the headers are committed, so later failures
//! are logged instead of surfaced.

/// Errors produced by the catalog, streaming and thumbnail paths.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown catalog id, or the item's file is gone from disk.
    #[error("not found: {0}")]
    NotFound(String),

    /// The Range header did not match the supported `bytes=<start>-<end>?` form.
    #[error("invalid range header: {header}")]
    InvalidRange { header: String, total_size: u64 },

    /// The Range header was well-formed but lies outside the file.
    #[error("range not satisfiable: {header}")]
    RangeNotSatisfiable { header: String, total_size: u64 },

    /// A catalog path was absolute or escaped the media root.
    #[error("invalid media path: {0}")]
    InvalidPath(String),

    /// An I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transcoder exited or failed before producing output.
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    /// Thumbnail extraction failed.
    #[error("thumbnail generation failed: {0}")]
    ThumbnailFailed(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidPath error.
    pub fn invalid_path<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a new TranscodeFailed error.
    pub fn transcode<S: Into<String>>(msg: S) -> Self {
        Self::TranscodeFailed(msg.into())
    }

    /// Create a new ThumbnailFailed error.
    pub fn thumbnail<S: Into<String>>(msg: S) -> Self {
        Self::ThumbnailFailed(msg.into())
    }
}

/// Result type alias using the core Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("movie 7");
        assert_eq!(err.to_string(), "not found: movie 7");

        let err = Error::InvalidRange {
            header: "bytes=a-b".into(),
            total_size: 100,
        };
        assert_eq!(err.to_string(), "invalid range header: bytes=a-b");

        let err = Error::transcode("ffmpeg exited with code 1");
        assert_eq!(
            err.to_string(),
            "transcode failed: ffmpeg exited with code 1"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }
}
