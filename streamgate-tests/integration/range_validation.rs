//! Range header handling through the HTTP router.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use proptest::prelude::*;
use streamgate_core::{ObjectHandle, StreamgateConfig, resolve_range};
use streamgate_sim::{InMemoryObjectClient, SimObject};
use streamgate_web::{AppState, build_router};
use tower::ServiceExt;

const OBJECT_SIZE: usize = 10_000;

fn fixture() -> (InMemoryObjectClient, Vec<u8>) {
    let data: Vec<u8> = (0..OBJECT_SIZE).map(|i| (i * 7 % 256) as u8).collect();
    let client = InMemoryObjectClient::new();
    client.insert(
        ObjectHandle::new(42).unwrap(),
        SimObject::new(data.clone()).named("episode.mp4"),
    );
    (client, data)
}

async fn fetch(
    client: &InMemoryObjectClient,
    range: &str,
) -> (StatusCode, Option<String>, Vec<u8>) {
    let mut config = StreamgateConfig::default();
    config.streaming.chunk_size = 3000;
    let router = build_router(AppState::new(Arc::new(client.clone()), &config));

    let request = Request::builder()
        .uri("/watch/42")
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let content_range = response
        .headers()
        .get(header::CONTENT_RANGE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_range, body.to_vec())
}

#[tokio::test]
async fn test_range_forms() {
    let (client, data) = fixture();

    let cases = [
        ("bytes=0-499", "bytes 0-499/10000", 0..500),
        ("bytes=9500-", "bytes 9500-9999/10000", 9500..10000),
        ("bytes=-250", "bytes 9750-9999/10000", 9750..10000),
        ("bytes=-20000", "bytes 0-9999/10000", 0..10000),
        ("bytes=9990-20000", "bytes 9990-9999/10000", 9990..10000),
        ("bytes=2999-3001", "bytes 2999-3001/10000", 2999..3002),
        (" bytes=100-199 ", "bytes 100-199/10000", 100..200),
        ("bytes=700-300", "bytes 700-700/10000", 700..701),
    ];

    for (range, expected_range, slice) in cases {
        let (status, content_range, body) = fetch(&client, range).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT, "{range}");
        assert_eq!(content_range.as_deref(), Some(expected_range), "{range}");
        assert_eq!(body, data[slice], "{range}");
    }
}

#[tokio::test]
async fn test_unparseable_ranges_serve_whole_object() {
    let (client, data) = fixture();

    for range in ["items=0-10", "bytes=0-10,20-30", "bytes=x-y", "bytes=-", ""] {
        let (status, content_range, body) = fetch(&client, range).await;
        assert_eq!(status, StatusCode::OK, "{range:?}");
        assert_eq!(content_range, None, "{range:?}");
        assert_eq!(body, data, "{range:?}");
    }
}

#[tokio::test]
async fn test_unsatisfiable_ranges() {
    let (client, _) = fixture();

    for range in ["bytes=10000-", "bytes=20000-30000", "bytes=-0"] {
        let (status, content_range, _) = fetch(&client, range).await;
        assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(content_range.as_deref(), Some("bytes */10000"), "{range}");
    }
    assert_eq!(client.read_count(), 0);
}

proptest! {
    #[test]
    fn prop_resolved_windows_stay_inside_object(
        total in 1u64..1_000_000,
        start in 0u64..2_000_000,
        end in 0u64..2_000_000,
    ) {
        let header = format!("bytes={start}-{end}");
        match resolve_range(Some(&header), total) {
            Ok(window) => {
                prop_assert!(start < total);
                prop_assert_eq!(window.start, start);
                prop_assert!(window.end < total);
                prop_assert!(window.end >= window.start);
                prop_assert_eq!(window.len(), window.end - window.start + 1);
            }
            Err(_) => prop_assert!(start >= total),
        }
    }
}
