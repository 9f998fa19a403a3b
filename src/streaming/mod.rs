//! Media delivery pipeline.
//!
//! # Routes
//!
//! - `GET /stream/{id}` - direct file streaming with range support, or
//!   on-the-fly transcoding with `?transcode=true`
//! - `GET /thumbnail/{id}` - cached/generated thumbnail image
//!
//! Every request resolves its catalog item first, then branches: the
//! transcode flag selects the encoder pipe, otherwise the Range header
//! drives chunk-capped direct serving.

pub mod direct;
pub mod range;
pub mod transcode;

pub use range::{ByteRange, RangeError};
pub use transcode::StreamProfile;

use axum::{
    body::Body,
    extract::{Path as UrlPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::catalog::MediaItem;
use crate::error::Error;
use crate::server::{error::AppError, AppContext};

/// Create the streaming router.
pub fn stream_router() -> Router<AppContext> {
    Router::new().route("/:id", get(stream_movie))
}

/// Create the thumbnail router.
pub fn thumbnail_router() -> Router<AppContext> {
    Router::new().route("/:id", get(movie_thumbnail))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Re-encode to fragmented MP4 instead of serving the file as-is.
    #[serde(default)]
    pub transcode: bool,
}

/// Resolve a catalog id to an item, its absolute path and its on-disk size.
///
/// A catalog miss and a missing file are both terminal "not found"
/// conditions for the request.
async fn resolve(ctx: &AppContext, id: u64) -> Result<(MediaItem, PathBuf, u64), Error> {
    let item = ctx
        .catalog
        .find_by_id(id)
        .ok_or_else(|| Error::not_found(format!("movie {id}")))?;

    let path = ctx.catalog.resolve_path(&item);
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| Error::not_found(format!("file for movie {id}: {}", path.display())))?;

    Ok((item, path, metadata.len()))
}

/// Serve a movie: direct (ranged or full) or transcoded.
pub async fn stream_movie(
    State(ctx): State<AppContext>,
    UrlPath(id): UrlPath<u64>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (item, path, total_size) = resolve(&ctx, id).await?;

    if query.transcode {
        debug!(id, path = %path.display(), "transcoding stream");
        let response =
            transcode::serve_transcoded(&ctx.config.ffmpeg_path(), &path, &ctx.config.stream_profile())
                .await?;
        return Ok(response);
    }

    let content_type = direct::content_type_for(&item.format);
    let range_header = headers.get(header::RANGE).map(|h| h.to_str());

    let response = match range_header {
        None => direct::serve_full(&path, total_size, content_type).await?,
        Some(raw) => {
            let raw = raw.map_err(|_| Error::InvalidRange {
                header: "<non-ascii>".to_string(),
                total_size,
            })?;
            let requested = range::parse(raw, total_size).map_err(|e| match e {
                RangeError::Malformed => Error::InvalidRange {
                    header: raw.to_string(),
                    total_size,
                },
                RangeError::Unsatisfiable => Error::RangeNotSatisfiable {
                    header: raw.to_string(),
                    total_size,
                },
            })?;
            debug!(id, start = requested.start, end = requested.end, total_size, "range request");
            direct::serve_range(
                &path,
                requested,
                total_size,
                ctx.config.streaming.max_chunk_bytes,
                content_type,
            )
            .await?
        }
    };

    Ok(response)
}

/// Serve a movie's thumbnail, generating it on first access.
pub async fn movie_thumbnail(
    State(ctx): State<AppContext>,
    UrlPath(id): UrlPath<u64>,
) -> Result<Response, AppError> {
    let (_item, path, _total_size) = resolve(&ctx, id).await?;

    let thumb_path = ctx.thumbnails.get_or_create(id, &path).await?;

    let file = tokio::fs::File::open(&thumb_path).await.map_err(Error::Io)?;
    let size = file.metadata().await.map_err(Error::Io)?.len();

    let body = Body::from_stream(ReaderStream::new(file));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CACHE_CONTROL, "max-age=86400")
        .body(body)
        .map_err(|e| AppError::from(Error::Io(std::io::Error::other(e))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_creation() {
        let _stream: Router<AppContext> = stream_router();
        let _thumbs: Router<AppContext> = thumbnail_router();
    }
}
