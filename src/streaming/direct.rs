//! Direct file serving with chunk-capped range responses.
//!
//! Large files are never served in one unbounded response: a ranged request
//! longer than the chunk cap is truncated and the `Content-Range` header
//! tells the client where to resume, so transfers become a sequence of
//! client-driven follow-up requests.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{Error, Result};

use super::range::ByteRange;

/// Upper bound on a single ranged response (10 MiB).
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 10 * 1024 * 1024;

/// Truncate a requested range to at most `max_chunk_bytes`.
///
/// The served end moves; the client sees the truncated interval in
/// `Content-Range` and re-requests the remainder.
pub fn cap_range(range: ByteRange, max_chunk_bytes: u64) -> ByteRange {
    ByteRange {
        start: range.start,
        end: range.end.min(range.start + max_chunk_bytes - 1),
    }
}

/// Serve a byte interval of a file as a 206 Partial Content response.
///
/// `total_size` is the full file size and stays the `Content-Range`
/// denominator even when the range is truncated by the chunk cap.
pub async fn serve_range(
    path: &Path,
    range: ByteRange,
    total_size: u64,
    max_chunk_bytes: u64,
    content_type: &'static str,
) -> Result<Response> {
    let served = cap_range(range, max_chunk_bytes);
    let length = served.length();

    let mut file = open_media_file(path).await?;
    file.seek(SeekFrom::Start(served.start)).await?;

    let stream = ReaderStream::new(file.take(length));
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", served.start, served.end, total_size),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "max-age=3600")
        .body(body)
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

/// Serve an entire file as a 200 response.
///
/// Byte content matches a `[0, total_size - 1]` range request; only the
/// status code and absence of `Content-Range` differ.
pub async fn serve_full(
    path: &Path,
    total_size: u64,
    content_type: &'static str,
) -> Result<Response> {
    let file = open_media_file(path).await?;

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, total_size.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "max-age=3600")
        .body(body)
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

async fn open_media_file(path: &Path) -> Result<File> {
    File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(format!("media file missing: {}", path.display()))
        } else {
            Error::Io(e)
        }
    })
}

/// Determine the response content type from a catalog item's format.
pub fn content_type_for(format: &str) -> &'static str {
    match format.to_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "ts" | "m2ts" => "video/mp2t",
        "mpg" | "mpeg" => "video/mpeg",
        _ => "application/octet-stream",
    }
}
