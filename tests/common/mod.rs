//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a temp media root, a catalog and
//! a full [`AppContext`], and starts Axum on a random port for HTTP-level
//! testing. Subprocess-dependent paths (transcode, thumbnails) are driven
//! by stub `sh` encoder scripts injected through `tools.ffmpeg_path`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use reelserve::catalog::{Catalog, NewMediaItem};
use reelserve::config::Config;
use reelserve::server::{create_router, AppContext};

pub struct TestHarness {
    pub media_dir: TempDir,
    pub catalog: Arc<Catalog>,
    pub config: Config,
}

#[allow(dead_code)]
impl TestHarness {
    /// Create a harness with a fresh temp media root and default config.
    pub fn new() -> Self {
        let media_dir = TempDir::new().expect("failed to create temp media root");
        let mut config = Config::default();
        config.library.media_root = media_dir.path().to_path_buf();
        Self::with_config(media_dir, config)
    }

    pub fn with_config(media_dir: TempDir, config: Config) -> Self {
        let catalog = Arc::new(Catalog::new(config.library.media_root.clone()));
        Self {
            media_dir,
            catalog,
            config,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let addr = harness.spawn_server().await;
        (harness, addr)
    }

    /// Start a server whose config was tweaked by `configure` first.
    pub async fn with_server_config<F>(configure: F) -> (Self, SocketAddr)
    where
        F: FnOnce(&mut Config),
    {
        let media_dir = TempDir::new().expect("failed to create temp media root");
        let mut config = Config::default();
        config.library.media_root = media_dir.path().to_path_buf();
        configure(&mut config);
        let harness = Self::with_config(media_dir, config);
        let addr = harness.spawn_server().await;
        (harness, addr)
    }

    async fn spawn_server(&self) -> SocketAddr {
        let ctx = AppContext::new(self.config.clone(), self.catalog.clone());
        let app = create_router(ctx, None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Write a file under the media root and register it in the catalog.
    /// Returns the assigned item id.
    pub fn add_movie(&self, relative: &str, data: &[u8]) -> u64 {
        let path = self.media_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, data).unwrap();

        let item = self
            .catalog
            .add(NewMediaItem {
                title: relative.to_string(),
                path: PathBuf::from(relative),
                format: None,
            })
            .unwrap();
        item.id
    }

    /// Register a catalog entry whose file does not exist on disk.
    pub fn add_phantom_movie(&self, relative: &str) -> u64 {
        self.catalog
            .add(NewMediaItem {
                title: relative.to_string(),
                path: PathBuf::from(relative),
                format: None,
            })
            .unwrap()
            .id
    }
}

/// Write an executable stub standing in for ffmpeg.
///
/// The script body decides what the "encoder" does (write stdout, create
/// its last argument, fail, etc.).
#[cfg(unix)]
#[allow(dead_code)]
pub fn write_stub_encoder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg-stub");
    let script = format!("#!/bin/sh\n{body}\n");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
