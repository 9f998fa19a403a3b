//! Integration tests for the transcode streaming path, driven by stub
//! encoder scripts so the suite does not depend on ffmpeg.

#![cfg(unix)]

mod common;

use common::{write_stub_encoder, TestHarness};

#[tokio::test]
async fn transcoded_stream_pipes_encoder_output() {
    // Stub "encoder": ignores its arguments, writes a payload to stdout.
    let stub_dir = tempfile::tempdir().unwrap();
    let stub = write_stub_encoder(stub_dir.path(), "printf 'ENCODED-MP4-PAYLOAD'");

    let (h, addr) =
        TestHarness::with_server_config(move |c| c.tools.ffmpeg_path = Some(stub)).await;
    let id = h.add_movie("source.mkv", b"raw mkv bytes");

    let resp = reqwest::get(format!("http://{addr}/stream/{id}?transcode=true"))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "video/mp4"
    );
    assert_eq!(
        resp.headers()
            .get("accept-ranges")
            .unwrap()
            .to_str()
            .unwrap(),
        "none"
    );
    assert!(resp.headers().get("content-length").is_none());

    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), b"ENCODED-MP4-PAYLOAD");
}

#[tokio::test]
async fn transcode_ignores_range_header() {
    let stub_dir = tempfile::tempdir().unwrap();
    let stub = write_stub_encoder(stub_dir.path(), "printf 'FULL-OUTPUT'");

    let (h, addr) =
        TestHarness::with_server_config(move |c| c.tools.ffmpeg_path = Some(stub)).await;
    let id = h.add_movie("source.avi", b"raw");

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/stream/{id}?transcode=true"))
        .header("Range", "bytes=0-4")
        .send()
        .await
        .unwrap();

    // Range semantics are bypassed entirely on this path.
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-range").is_none());
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"FULL-OUTPUT");
}

// Dropping the response body mid-stream must terminate the encoder child;
// a stub that ticks a marker file while streaming stops ticking once the
// client disconnects.
#[tokio::test]
async fn client_disconnect_terminates_encoder() {
    let stub_dir = tempfile::tempdir().unwrap();
    let marker = stub_dir.path().join("ticks");
    let stub = write_stub_encoder(
        stub_dir.path(),
        &format!(
            "while :; do\nprintf 'MP4DATA'\necho tick >> \"{}\"\nsleep 1\ndone",
            marker.display()
        ),
    );

    let (h, addr) =
        TestHarness::with_server_config(move |c| c.tools.ffmpeg_path = Some(stub)).await;
    let id = h.add_movie("endless.mkv", b"raw");

    let mut resp = reqwest::get(format!("http://{addr}/stream/{id}?transcode=true"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.chunk().await.unwrap().is_some());
    drop(resp);

    // Give the server time to notice the disconnect and kill the child,
    // then verify the tick count has stopped moving.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    let settled = tick_count(&marker);
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    assert_eq!(
        tick_count(&marker),
        settled,
        "encoder kept running after the client disconnected"
    );
}

fn tick_count(marker: &std::path::Path) -> usize {
    std::fs::read_to_string(marker)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn encoder_failure_before_output_returns_500() {
    let stub_dir = tempfile::tempdir().unwrap();
    let stub = write_stub_encoder(
        stub_dir.path(),
        "echo 'codec not supported' >&2\nexit 1",
    );

    let (h, addr) =
        TestHarness::with_server_config(move |c| c.tools.ffmpeg_path = Some(stub)).await;
    let id = h.add_movie("broken.mkv", b"raw");

    let resp = reqwest::get(format!("http://{addr}/stream/{id}?transcode=true"))
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "transcode_error");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("codec not supported"));
}

#[tokio::test]
async fn transcode_unknown_id_returns_404() {
    let (_h, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/stream/42?transcode=true"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
