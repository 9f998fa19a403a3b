//! Lazily generated, per-item thumbnail cache.
//!
//! Thumbnails live at a deterministic path (`<dir>/<id>.jpg`) and are
//! extracted from the source video on first access. Generation for a given
//! id is single-flight: concurrent requests wait on a per-id gate and the
//! winner's output is shared, so the final filename is only ever written by
//! one process at a time. Gate entries live as long as the cache (the map
//! is bounded by the number of distinct ids requested), so queued waiters
//! and late arrivals always serialize on the same lock. The image is
//! produced at a temp path and renamed into place, keeping half-written
//! files out of the cache.
//!
//! Entries never expire on their own; invalidation (if any) is external.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Seek offset into the source video for the extracted frame.
const DEFAULT_TIME_OFFSET_SECS: u32 = 10;

/// Output thumbnail width; height follows the aspect ratio.
const DEFAULT_WIDTH: u32 = 480;

/// Filesystem-backed thumbnail store keyed by catalog item id.
pub struct ThumbnailCache {
    cache_dir: PathBuf,
    ffmpeg: PathBuf,
    time_offset_secs: u32,
    width: u32,
    inflight: DashMap<u64, Arc<Mutex<()>>>,
}

impl ThumbnailCache {
    pub fn new(cache_dir: PathBuf, ffmpeg: PathBuf) -> Self {
        Self {
            cache_dir,
            ffmpeg,
            time_offset_secs: DEFAULT_TIME_OFFSET_SECS,
            width: DEFAULT_WIDTH,
            inflight: DashMap::new(),
        }
    }

    pub fn with_settings(mut self, time_offset_secs: u32, width: u32) -> Self {
        self.time_offset_secs = time_offset_secs;
        self.width = width;
        self
    }

    /// Deterministic cache path for an item id.
    pub fn path_for(&self, id: u64) -> PathBuf {
        self.cache_dir.join(format!("{id}.jpg"))
    }

    /// Return the cached thumbnail path, generating it on first access.
    ///
    /// A failed generation leaves no cache entry behind, so the next call
    /// retries instead of serving a negative result.
    pub async fn get_or_create(&self, id: u64, source: &Path) -> Result<PathBuf> {
        let target = self.path_for(id);
        if tokio::fs::try_exists(&target).await? {
            return Ok(target);
        }

        // Per-id gate: one generation at a time; losers re-check the cache.
        let gate = self
            .inflight
            .entry(id)
            .or_default()
            .value()
            .clone();
        let _guard = gate.lock().await;

        if tokio::fs::try_exists(&target).await? {
            debug!(id, "thumbnail generated while waiting on gate");
            return Ok(target);
        }

        self.generate(id, source, &target).await?;

        Ok(target)
    }

    async fn generate(&self, id: u64, source: &Path, target: &Path) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let partial = self.cache_dir.join(format!("{id}.jpg.partial"));

        let output = Command::new(&self.ffmpeg)
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(self.time_offset_secs.to_string())
            .arg("-i")
            .arg(source)
            .arg("-frames:v")
            .arg("1")
            .arg("-vf")
            .arg(format!("scale={}:-2", self.width))
            .arg("-f")
            .arg("image2")
            .arg("-y")
            .arg(&partial)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                Error::thumbnail(format!("failed to run {}: {e}", self.ffmpeg.display()))
            })?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&partial).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::thumbnail(format!(
                "extractor exited ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        tokio::fs::rename(&partial, target).await?;
        info!(id, path = %target.display(), "generated thumbnail");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_for_is_deterministic() {
        let cache = ThumbnailCache::new(PathBuf::from("/thumbs"), PathBuf::from("ffmpeg"));
        assert_eq!(cache.path_for(7), PathBuf::from("/thumbs/7.jpg"));
        assert_eq!(cache.path_for(7), cache.path_for(7));
    }

    #[tokio::test]
    async fn cache_hit_returns_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("3.jpg"), b"jpeg").unwrap();

        // Nonexistent binary: a hit must never reach the spawn path.
        let cache = ThumbnailCache::new(
            dir.path().to_path_buf(),
            PathBuf::from("/nonexistent/ffmpeg"),
        );
        let path = cache
            .get_or_create(3, Path::new("/media/movie.mp4"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("3.jpg"));
    }

    #[tokio::test]
    async fn failed_generation_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ThumbnailCache::new(
            dir.path().to_path_buf(),
            PathBuf::from("/nonexistent/ffmpeg"),
        );

        let err = cache
            .get_or_create(5, Path::new("/media/movie.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ThumbnailFailed(_)));
        assert!(!dir.path().join("5.jpg").exists());
    }
}
