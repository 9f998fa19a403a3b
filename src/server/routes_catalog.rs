//! Catalog CRUD and scan endpoints.
//!
//! Thin JSON glue over [`Catalog`]; the interesting machinery lives in the
//! streaming module.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use crate::catalog::{scan_directory, MediaItemPatch, NewMediaItem};

use super::{error::AppError, AppContext};

pub fn catalog_routes() -> Router<AppContext> {
    Router::new()
        .route("/movies", get(list_movies).post(add_movie))
        .route(
            "/movies/:id",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
        .route("/movies/scan", post(scan_movies))
}

async fn list_movies(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.catalog.list())
}

async fn get_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let item = ctx
        .catalog
        .find_by_id(id)
        .ok_or_else(|| crate::error::Error::not_found(format!("movie {id}")))?;
    Ok(Json(item))
}

async fn add_movie(
    State(ctx): State<AppContext>,
    Json(new): Json<NewMediaItem>,
) -> Result<impl IntoResponse, AppError> {
    if new.title.is_empty() || new.path.as_os_str().is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "title and path are required"})),
        )
            .into_response());
    }

    let item = ctx.catalog.add(new)?;
    info!(id = item.id, title = %item.title, "added movie");
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

async fn update_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
    Json(patch): Json<MediaItemPatch>,
) -> Result<impl IntoResponse, AppError> {
    let item = ctx.catalog.update(id, patch)?;
    Ok(Json(item))
}

async fn delete_movie(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let item = ctx.catalog.remove(id)?;
    info!(id, title = %item.title, "removed movie");
    Ok(Json(item))
}

/// Rescan the media root and absorb anything new.
async fn scan_movies(State(ctx): State<AppContext>) -> Result<impl IntoResponse, AppError> {
    let media_root = ctx.catalog.media_root().to_path_buf();
    let extensions = ctx.config.library.extensions.clone();

    // The walk hits the disk; keep it off the request executor.
    let scanned = tokio::task::spawn_blocking(move || scan_directory(&media_root, &extensions))
        .await
        .map_err(|e| crate::error::Error::Io(std::io::Error::other(e)))?;

    let found = scanned.len();
    let added = ctx.catalog.absorb_scan(scanned);
    info!(found, added, "scan complete");

    Ok(Json(json!({
        "found": found,
        "added": added,
        "movies": ctx.catalog.list(),
    })))
}
