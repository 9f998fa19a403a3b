//! Movie catalog: the registry mapping numeric ids to media items.
//!
//! The catalog is owned by whoever builds the [`crate::server::AppContext`]
//! and injected everywhere it is needed; there is no global state. The
//! streaming core only reads items, the CRUD routes mutate them.

pub mod scanner;

pub use scanner::{scan_directory, ScannedFile};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// A single known media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable positive identifier, unique for the catalog's lifetime.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Path relative to the media root. Never absolute, never contains `..`.
    pub path: PathBuf,
    /// Lowercase extension without the dot, e.g. "mkv".
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

/// Fields accepted when creating an item through the API.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMediaItem {
    pub title: String,
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<String>,
}

/// Partial update for an existing item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaItemPatch {
    pub title: Option<String>,
    pub path: Option<PathBuf>,
    pub format: Option<String>,
    pub poster: Option<String>,
}

struct CatalogInner {
    items: Vec<MediaItem>,
    next_id: u64,
}

/// In-memory movie registry with a configured media root.
///
/// Read-mostly: every streaming request does a lookup, mutation only
/// happens through the CRUD/scan routes. The lock is never held across an
/// await point.
pub struct Catalog {
    media_root: PathBuf,
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new(media_root: PathBuf) -> Self {
        Self {
            media_root,
            inner: RwLock::new(CatalogInner {
                items: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Base directory all item paths are relative to.
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Look up an item by id.
    pub fn find_by_id(&self, id: u64) -> Option<MediaItem> {
        self.inner.read().items.iter().find(|m| m.id == id).cloned()
    }

    /// Snapshot of all items.
    pub fn list(&self) -> Vec<MediaItem> {
        self.inner.read().items.clone()
    }

    /// Number of items in the catalog.
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Absolute filesystem path for an item.
    pub fn resolve_path(&self, item: &MediaItem) -> PathBuf {
        self.media_root.join(&item.path)
    }

    /// Add a new item, assigning the next id.
    pub fn add(&self, new: NewMediaItem) -> Result<MediaItem> {
        validate_relative_path(&new.path)?;

        let format = new.format.unwrap_or_else(|| format_from_path(&new.path));

        let mut inner = self.inner.write();
        let item = MediaItem {
            id: inner.next_id,
            title: new.title,
            path: new.path,
            format,
            size: None,
            added_at: Utc::now(),
            last_modified: None,
            parent_dir: None,
            poster: None,
        };
        inner.next_id += 1;
        inner.items.push(item.clone());
        Ok(item)
    }

    /// Apply a partial update to an existing item.
    pub fn update(&self, id: u64, patch: MediaItemPatch) -> Result<MediaItem> {
        if let Some(ref path) = patch.path {
            validate_relative_path(path)?;
        }

        let mut inner = self.inner.write();
        let item = inner
            .items
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::not_found(format!("movie {id}")))?;

        if let Some(title) = patch.title {
            item.title = title;
        }
        if let Some(path) = patch.path {
            item.path = path;
        }
        if let Some(format) = patch.format {
            item.format = format.to_lowercase();
        }
        if let Some(poster) = patch.poster {
            item.poster = Some(poster);
        }
        Ok(item.clone())
    }

    /// Remove an item, returning it.
    pub fn remove(&self, id: u64) -> Result<MediaItem> {
        let mut inner = self.inner.write();
        let idx = inner
            .items
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::not_found(format!("movie {id}")))?;
        Ok(inner.items.remove(idx))
    }

    /// Merge scan results into the catalog, skipping already-known paths.
    ///
    /// Returns the number of newly added items.
    pub fn absorb_scan(&self, scanned: Vec<ScannedFile>) -> usize {
        let mut inner = self.inner.write();
        let mut added = 0;

        for file in scanned {
            if inner.items.iter().any(|m| m.path == file.path) {
                continue;
            }
            let item = MediaItem {
                id: inner.next_id,
                title: file.title,
                path: file.path,
                format: file.format,
                size: Some(file.size),
                added_at: Utc::now(),
                last_modified: file.last_modified,
                parent_dir: file.parent_dir,
                poster: file.poster,
            };
            inner.next_id += 1;
            inner.items.push(item);
            added += 1;
        }

        added
    }
}

/// Reject absolute paths and paths that climb out of the media root.
fn validate_relative_path(path: &Path) -> Result<()> {
    if path.is_absolute() {
        return Err(Error::invalid_path(format!(
            "absolute paths are not allowed: {}",
            path.display()
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::invalid_path(format!(
            "path escapes the media root: {}",
            path.display()
        )));
    }
    Ok(())
}

fn format_from_path(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}
