//! Serving a local media directory over HTTP.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use streamgate_core::StreamgateConfig;
use streamgate_sim::DirectoryObjectClient;
use streamgate_web::{AppState, build_router};
use tower::ServiceExt;

#[tokio::test]
async fn test_directory_files_stream_by_handle() {
    let dir = tempfile::tempdir().unwrap();
    let movie: Vec<u8> = (0..50_000u32).map(|i| (i % 199) as u8).collect();
    std::fs::write(dir.path().join("b_movie.mkv"), &movie).unwrap();
    std::fs::write(dir.path().join("a_song.mp3"), b"ID3 tag and audio").unwrap();
    std::fs::write(dir.path().join(".hidden"), b"skip me").unwrap();

    let store = DirectoryObjectClient::scan(dir.path()).await.unwrap();
    assert_eq!(store.entries().len(), 2);

    let mut config = StreamgateConfig::default();
    config.streaming.chunk_size = 8192;
    let router = build_router(AppState::new(Arc::new(store), &config));

    let request = Request::builder()
        .uri("/watch/2")
        .header(header::RANGE, "bytes=10000-29999")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/x-matroska");
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        "bytes 10000-29999/50000"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, movie[10_000..30_000]);

    let request = Request::builder()
        .uri("/download/1/ignored.bin")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a_song.mp3\"; filename*=UTF-8''a_song.mp3"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ID3 tag and audio");

    let request = Request::builder()
        .uri("/watch/3")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
