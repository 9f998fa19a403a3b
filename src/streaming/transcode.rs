//! On-the-fly transcoding to a broadly compatible fragmented MP4 stream.
//!
//! The encoder runs as a supervised ffmpeg child whose stdout is piped
//! straight into the response body. Output size is unknown ahead of time,
//! so this path drops range semantics entirely: no `Content-Length`, and
//! `Accept-Ranges: none`.
//!
//! The response body owns the child. Dropping the body (client disconnect,
//! normal completion) drops the child, and `kill_on_drop` guarantees the
//! encoder is terminated and its pipes closed.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Target encoding parameters for the transcode path.
///
/// A fixed default profile is used for every request; there is no
/// negotiation. Bitrates and bounds can be overridden in `[transcode]`
/// config.
#[derive(Debug, Clone)]
pub struct StreamProfile {
    /// Maximum output width, aspect ratio preserved.
    pub max_width: u32,
    /// Maximum output height, aspect ratio preserved.
    pub max_height: u32,
    /// Video bitrate, e.g. "2500k".
    pub video_bitrate: String,
    /// x264 preset tuned for fast encode-start.
    pub preset: String,
    /// Audio bitrate, e.g. "128k".
    pub audio_bitrate: String,
}

impl Default for StreamProfile {
    fn default() -> Self {
        Self {
            max_width: 1280,
            max_height: 720,
            video_bitrate: "2500k".to_string(),
            preset: "veryfast".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

/// Build the ffmpeg argument list for streaming fragmented MP4 to stdout.
///
/// `frag_keyframe+empty_moov` moves the metadata to the front and fragments
/// the output so playback can begin before encoding finishes.
pub(crate) fn build_encode_args(input: &Path, profile: &StreamProfile) -> Vec<String> {
    let mut args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        profile.preset.clone(),
        "-profile:v".to_string(),
        "baseline".to_string(),
        "-level".to_string(),
        "3.0".to_string(),
        "-b:v".to_string(),
        profile.video_bitrate.clone(),
    ];

    // Scale down only, preserving aspect ratio.
    args.extend([
        "-vf".to_string(),
        format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease",
            profile.max_width, profile.max_height
        ),
    ]);

    args.extend([
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        profile.audio_bitrate.clone(),
        "-ac".to_string(),
        "2".to_string(),
    ]);

    args.extend([
        "-movflags".to_string(),
        "frag_keyframe+empty_moov+faststart".to_string(),
        "-f".to_string(),
        "mp4".to_string(),
        "pipe:1".to_string(),
    ]);

    args
}

/// Spawn the encoder and stream its output as an HTTP 200 response.
///
/// The first stdout chunk is awaited before the response is built, so an
/// encoder that dies without producing anything becomes a
/// [`Error::TranscodeFailed`] instead of an empty success. Failures after
/// that point can only be logged; the client sees a truncated stream.
pub async fn serve_transcoded(
    ffmpeg: &Path,
    input: &Path,
    profile: &StreamProfile,
) -> Result<Response> {
    let args = build_encode_args(input, profile);
    debug!(ffmpeg = %ffmpeg.display(), ?args, "spawning transcoder");

    let mut child = Command::new(ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::transcode(format!("failed to spawn {}: {e}", ffmpeg.display())))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::transcode("transcoder stdout was not captured"))?;
    let mut output = ReaderStream::with_capacity(stdout, 64 * 1024);

    match output.next().await {
        Some(Ok(first)) => {
            // Headers are committed from here on; drain stderr in the
            // background so a chatty encoder cannot block on a full pipe.
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(line, "transcoder stderr");
                    }
                });
            }

            let encoder = EncoderStream {
                child: Some(child),
                output,
            };
            let body = Body::from_stream(
                stream::once(async move { Ok::<_, std::io::Error>(first) }).chain(encoder),
            );

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "video/mp4")
                .header(header::ACCEPT_RANGES, "none")
                .header(header::CACHE_CONTROL, "no-store")
                .body(body)
                .map_err(|e| Error::Io(std::io::Error::other(e)))
        }
        first => {
            // Nothing was produced (or the pipe failed immediately); collect
            // the encoder's diagnostics for the error response.
            let mut diag = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                stderr.read_to_string(&mut diag).await.ok();
            }
            let status = child.wait().await;

            if let Some(Err(e)) = first {
                return Err(Error::transcode(format!(
                    "transcoder pipe failed: {e}; {}",
                    diag.trim()
                )));
            }
            let status = match status {
                Ok(s) => s.to_string(),
                Err(e) => format!("unknown ({e})"),
            };
            Err(Error::transcode(format!(
                "encoder exited ({status}) before producing output: {}",
                diag.trim()
            )))
        }
    }
}

/// Response body stream that keeps the encoder child alive.
///
/// `kill_on_drop` on the child means dropping this stream, at any point
/// before EOF, terminates the encoder. At EOF the child is handed to a
/// reaper task; stdout closing does not mean the process has been waited
/// on yet, so the exit status is observed through `wait()` rather than a
/// one-shot `try_wait()`.
struct EncoderStream {
    child: Option<Child>,
    output: ReaderStream<ChildStdout>,
}

impl Stream for EncoderStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.output).poll_next(cx);

        if let Poll::Ready(None) = polled {
            if let Some(mut child) = this.child.take() {
                // Headers are long gone; an abnormal exit can only be logged.
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if !status.success() => {
                            warn!(%status, "transcoder exited abnormally mid-stream");
                        }
                        Err(e) => warn!("failed to reap transcoder: {e}"),
                        Ok(_) => {}
                    }
                });
            }
        }

        polled
    }
}
