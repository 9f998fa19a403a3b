use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::streaming::transcode::StreamProfile;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional directory served as a static fallback (admin page).
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8084
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Base directory all catalog paths are relative to.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Lowercase extensions (no dot) picked up by the scanner.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Scan the media root when the server starts.
    #[serde(default = "default_true")]
    pub scan_on_start: bool,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./movies")
}

fn default_extensions() -> Vec<String> {
    ["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            extensions: default_extensions(),
            scan_on_start: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Upper bound on a single ranged response.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: u64,
}

fn default_max_chunk_bytes() -> u64 {
    crate::streaming::direct::DEFAULT_MAX_CHUNK_BYTES
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: default_max_chunk_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_transcode_width")]
    pub max_width: u32,

    #[serde(default = "default_transcode_height")]
    pub max_height: u32,

    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_transcode_width() -> u32 {
    1280
}
fn default_transcode_height() -> u32 {
    720
}
fn default_video_bitrate() -> String {
    "2500k".to_string()
}
fn default_preset() -> String {
    "veryfast".to_string()
}
fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            max_width: default_transcode_width(),
            max_height: default_transcode_height(),
            video_bitrate: default_video_bitrate(),
            preset: default_preset(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    /// Cache directory; defaults to `.thumbnails` under the media root.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Seek offset of the extracted frame.
    #[serde(default = "default_time_offset")]
    pub time_offset_secs: u32,

    /// Output width; height follows the aspect ratio.
    #[serde(default = "default_thumb_width")]
    pub width: u32,
}

fn default_time_offset() -> u32 {
    10
}
fn default_thumb_width() -> u32 {
    480
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            dir: None,
            time_offset_secs: default_time_offset(),
            width: default_thumb_width(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg binary; resolved from PATH when unset.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

impl Config {
    /// The ffmpeg binary used for transcoding and frame extraction.
    pub fn ffmpeg_path(&self) -> PathBuf {
        self.tools
            .ffmpeg_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    /// Thumbnail cache directory, defaulting to `.thumbnails` under the
    /// media root.
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.thumbnails
            .dir
            .clone()
            .unwrap_or_else(|| self.library.media_root.join(".thumbnails"))
    }

    /// The (fixed) transcode profile built from config.
    pub fn stream_profile(&self) -> StreamProfile {
        StreamProfile {
            max_width: self.transcode.max_width,
            max_height: self.transcode.max_height,
            video_bitrate: self.transcode.video_bitrate.clone(),
            preset: self.transcode.preset.clone(),
            audio_bitrate: self.transcode.audio_bitrate.clone(),
        }
    }
}
