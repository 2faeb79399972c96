//! A player seeking into a large video.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use streamgate_core::{DEFAULT_CHUNK_SIZE, ObjectHandle, StreamgateConfig};
use streamgate_sim::{InMemoryObjectClient, SimObject};
use streamgate_web::{AppState, build_router};
use tower::ServiceExt;

const VIDEO_SIZE: usize = 10_000_000;
const VIDEO_HANDLE: u64 = 4242;

fn video() -> Vec<u8> {
    (0..VIDEO_SIZE)
        .map(|i| (i.wrapping_mul(31) ^ (i >> 11)) as u8)
        .collect()
}

fn server(client: &InMemoryObjectClient) -> Router {
    let mut config = StreamgateConfig::default();
    config.streaming.chunk_size = DEFAULT_CHUNK_SIZE;
    build_router(AppState::new(Arc::new(client.clone()), &config))
}

#[tokio::test]
async fn test_seek_into_middle_of_video() {
    let data = video();
    let client = InMemoryObjectClient::new();
    client.insert(
        ObjectHandle::new(VIDEO_HANDLE).unwrap(),
        SimObject::new(data.clone())
            .named("holiday.mp4")
            .with_mime("video/mp4"),
    );
    let router = server(&client);

    // Browsers probe with HEAD before seeking.
    let probe = Request::builder()
        .method(Method::HEAD)
        .uri(format!("/watch/{VIDEO_HANDLE}"))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(probe).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "10000000");
    assert_eq!(client.read_count(), 0);

    let seek = Request::builder()
        .uri(format!("/watch/{VIDEO_HANDLE}"))
        .header(header::RANGE, "bytes=5000000-5999999")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(seek).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 5000000-5999999/10000000");
    assert_eq!(headers[header::CONTENT_LENGTH], "1000000");
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), 1_000_000);
    assert_eq!(&body[..], &data[5_000_000..6_000_000]);

    // The window fits in one chunk read starting at the seek offset.
    assert_eq!(client.read_offsets(), vec![5_000_000]);
    assert_eq!(client.resolve_count(), 1);
}

#[tokio::test]
async fn test_full_download_spans_many_chunks() {
    let data = video();
    let client = InMemoryObjectClient::new();
    client.insert(
        ObjectHandle::new(VIDEO_HANDLE).unwrap(),
        SimObject::new(data.clone()).named("holiday.mp4"),
    );

    let request = Request::builder()
        .uri(format!("/download/{VIDEO_HANDLE}/holiday.mp4"))
        .body(Body::empty())
        .unwrap();
    let response = server(&client).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"holiday.mp4\"; filename*=UTF-8''holiday.mp4"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), VIDEO_SIZE);
    assert!(body[..] == data[..]);

    let expected: Vec<u64> = (0..10).map(|i| i * DEFAULT_CHUNK_SIZE as u64).collect();
    assert_eq!(client.read_offsets(), expected);
}

#[tokio::test]
async fn test_unknown_handle_never_reads() {
    let client = InMemoryObjectClient::new();

    let request = Request::builder()
        .uri("/watch/999999")
        .header(header::RANGE, "bytes=0-")
        .body(Body::empty())
        .unwrap();
    let response = server(&client).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(client.read_count(), 0);
}
