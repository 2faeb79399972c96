//! Range-aware streaming handlers for `/watch` and `/download`.
//!
//! Each request resolves metadata through the shared cache, resolves the
//! `Range` header into a byte window, sends headers immediately, and relays
//! chunks from a [`ChunkSequencer`] as they arrive. Once headers are out a
//! mid-stream failure can only abort the connection.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Response, StatusCode, header};
use futures::StreamExt;
use streamgate_core::mime::effective_mime_type;
use streamgate_core::remote::DEFAULT_DISPLAY_NAME;
use streamgate_core::{
    ByteWindow, ChunkSequencer, ObjectHandle, ObjectMetadata, StreamgateError, parse_range_header,
};
use tracing::info;

use super::cors::with_cors;
use crate::errors::StreamError;
use crate::server::AppState;

/// How the client should present the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Play in place.
    Inline,
    /// Save to disk.
    Attachment,
}

impl Disposition {
    /// Builds the header with an ASCII `filename` for old clients and the
    /// exact name as UTF-8 in `filename*`.
    fn header_value(self, file_name: &str) -> String {
        let kind = match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        };
        let fallback: String = file_name
            .chars()
            .map(|c| match c {
                '"' | '\\' => '_',
                ' ' => ' ',
                c if c.is_ascii_graphic() => c,
                _ => '_',
            })
            .collect();
        format!(
            "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(file_name)
        )
    }
}

/// `GET|HEAD /watch/{handle}`
pub async fn watch(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response<Body>, StreamError> {
    serve_object(&state, &handle, None, Disposition::Inline, &method, &headers).await
}

/// `GET|HEAD /download/{handle}/{name}`
pub async fn download(
    State(state): State<AppState>,
    Path((handle, name)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response<Body>, StreamError> {
    serve_object(
        &state,
        &handle,
        Some(&name),
        Disposition::Attachment,
        &method,
        &headers,
    )
    .await
}

/// `GET|HEAD /download/{handle}`
pub async fn download_unnamed(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response<Body>, StreamError> {
    serve_object(&state, &handle, None, Disposition::Attachment, &method, &headers).await
}

/// Picks the file name advertised in `Content-Disposition`.
///
/// Downloads prefer the stored name and fall back to the name in the link
/// when the store only has the placeholder.
fn advertised_name<'a>(
    metadata: &'a ObjectMetadata,
    disposition: Disposition,
    path_name: Option<&'a str>,
) -> &'a str {
    match (disposition, path_name) {
        (Disposition::Attachment, Some(name))
            if metadata.display_name == DEFAULT_DISPLAY_NAME && !name.is_empty() =>
        {
            name
        }
        _ => &metadata.display_name,
    }
}

async fn serve_object(
    state: &AppState,
    raw_handle: &str,
    path_name: Option<&str>,
    disposition: Disposition,
    method: &Method,
    headers: &HeaderMap,
) -> Result<Response<Body>, StreamError> {
    let handle: ObjectHandle = raw_handle.parse().map_err(StreamgateError::from)?;
    let metadata = state.cache.get_or_fetch(handle).await?;

    let range_spec = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_range_header);

    let window = match range_spec {
        Some(spec) => Some(spec.resolve(metadata.total_size)?),
        None => ByteWindow::full(metadata.total_size),
    };
    let partial = range_spec.is_some();

    let file_name = advertised_name(&metadata, disposition, path_name);
    let content_type = effective_mime_type(&metadata.mime_type, file_name);
    let content_length = window.map_or(0, |w| w.len());

    let mut builder = Response::builder()
        .status(if partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        })
        .header(header::CONTENT_TYPE, &content_type)
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            disposition.header_value(file_name),
        );
    builder = with_cors(builder);

    if let (true, Some(window)) = (partial, window) {
        builder = builder.header(header::CONTENT_RANGE, window.content_range(metadata.total_size));
    }

    let body = match window {
        Some(window) if *method != Method::HEAD => stream_body(state, &metadata, window)?,
        _ => Body::empty(),
    };

    builder.body(body).map_err(|e| StreamError::Internal {
        reason: e.to_string(),
    })
}

fn stream_body(
    state: &AppState,
    metadata: &ObjectMetadata,
    window: ByteWindow,
) -> Result<Body, StreamError> {
    let slot = state
        .stream_slots
        .clone()
        .try_acquire_owned()
        .map_err(|_| StreamError::Overloaded {
            limit: state.streaming.max_concurrent_streams,
        })?;

    info!(
        handle = %metadata.handle,
        start = window.start,
        end = window.end,
        total = metadata.total_size,
        "Streaming {} bytes",
        window.len()
    );

    let mut sequencer = ChunkSequencer::new(state.cache.client().clone(), metadata, window)
        .with_chunk_size(state.streaming.chunk_size);
    if let Some(timeout) = state.streaming.request_timeout {
        sequencer = sequencer.with_timeout(timeout);
    }

    // The slot is released when the body finishes or the client goes away.
    let chunks = sequencer.into_stream().map(move |chunk| {
        let _slot = &slot;
        chunk
    });

    Ok(Body::from_stream(chunks))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use axum::body::to_bytes;
    use axum::http::Request;
    use streamgate_core::StreamgateConfig;
    use streamgate_sim::{InMemoryObjectClient, SimObject};
    use tower::ServiceExt;

    use super::*;
    use crate::server::build_router;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8).collect()
    }

    fn handle(raw: u64) -> ObjectHandle {
        ObjectHandle::new(raw).unwrap()
    }

    fn app_with(client: &InMemoryObjectClient, config: StreamgateConfig) -> (Router, AppState) {
        let state = AppState::new(Arc::new(client.clone()), &config);
        (build_router(state.clone()), state)
    }

    fn app(client: &InMemoryObjectClient) -> Router {
        let mut config = StreamgateConfig::default();
        config.streaming.chunk_size = 1000;
        app_with(client, config).0
    }

    fn request(method: Method, uri: &str, range: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn full_request_returns_whole_object() {
        let client = InMemoryObjectClient::new();
        let data = sample(4321);
        client.insert(
            handle(10),
            SimObject::new(data.clone()).named("movie.mp4").with_mime("video/mp4"),
        );

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/10", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(headers[header::CONTENT_LENGTH], "4321");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "inline; filename=\"movie.mp4\"; filename*=UTF-8''movie.mp4"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(header::CONTENT_RANGE).is_none());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, data);
    }

    #[tokio::test]
    async fn range_request_returns_partial_content() {
        let client = InMemoryObjectClient::new();
        let data = sample(5000);
        client.insert(handle(11), SimObject::new(data.clone()).named("clip.mkv"));

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/11", Some("bytes=1500-3499")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 1500-3499/5000");
        assert_eq!(headers[header::CONTENT_LENGTH], "2000");
        assert_eq!(headers[header::CONTENT_TYPE], "video/x-matroska");
        assert_eq!(
            headers[header::ACCESS_CONTROL_EXPOSE_HEADERS],
            "Content-Range, Content-Length, Accept-Ranges"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, data[1500..3500]);
    }

    #[tokio::test]
    async fn malformed_range_serves_whole_object_with_ok() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(12), SimObject::new(sample(300)));

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/12", Some("bytes=abc-def")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "300");
    }

    #[tokio::test]
    async fn range_past_end_is_not_satisfiable() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(13), SimObject::new(sample(1000)));

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/13", Some("bytes=1000-1200")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
        assert_eq!(client.read_count(), 0);
    }

    #[tokio::test]
    async fn unknown_handle_is_not_found_without_reads() {
        let client = InMemoryObjectClient::new();

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/404", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(client.read_count(), 0);
    }

    #[tokio::test]
    async fn object_without_media_is_not_found() {
        let client = InMemoryObjectClient::new();
        client.insert_without_media(handle(14));

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/14", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_handle_is_bad_request() {
        let client = InMemoryObjectClient::new();

        for uri in ["/watch/abc", "/watch/0", "/download/x1/file.mp4"] {
            let response = app(&client)
                .oneshot(request(Method::GET, uri, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
        assert_eq!(client.resolve_count(), 0);
    }

    #[tokio::test]
    async fn head_returns_headers_without_fetching() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(15), SimObject::new(sample(2048)).named("a.webm"));

        let response = app(&client)
            .oneshot(request(Method::HEAD, "/watch/15", Some("bytes=0-")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "2048");
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-2047/2048");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
        assert_eq!(client.read_count(), 0);
    }

    #[tokio::test]
    async fn download_forces_attachment() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(16), SimObject::new(sample(10)).named("My Song.mp3"));
        client.insert(handle(17), SimObject::new(sample(10)));

        let named = app(&client)
            .oneshot(request(Method::GET, "/download/16/whatever.bin", None))
            .await
            .unwrap();
        assert_eq!(
            named.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My Song.mp3\"; filename*=UTF-8''My%20Song.mp3"
        );
        assert_eq!(named.headers()[header::CONTENT_TYPE], "audio/mpeg");

        let placeholder = app(&client)
            .oneshot(request(Method::GET, "/download/17/report.pdf", None))
            .await
            .unwrap();
        assert_eq!(
            placeholder.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
        assert_eq!(placeholder.headers()[header::CONTENT_TYPE], "application/pdf");

        let unnamed = app(&client)
            .oneshot(request(Method::GET, "/download/17", None))
            .await
            .unwrap();
        assert_eq!(unnamed.status(), StatusCode::OK);
        assert_eq!(
            unnamed.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"file\"; filename*=UTF-8''file"
        );
    }

    #[test]
    fn disposition_keeps_unicode_names_intact() {
        let value = Disposition::Attachment.header_value("Café \"live\".mkv");
        assert_eq!(
            value,
            "attachment; filename=\"Caf_ _live_.mkv\"; filename*=UTF-8''Caf%C3%A9%20%22live%22.mkv"
        );
        assert!(axum::http::HeaderValue::from_str(&value).is_ok());
    }

    #[tokio::test]
    async fn options_answers_preflight() {
        let client = InMemoryObjectClient::new();

        for uri in ["/watch/1", "/download/1/a.mp4", "/download/1"] {
            let response = app(&client)
                .oneshot(request(Method::OPTIONS, uri, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT, "{uri}");
            assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
                "GET, HEAD, OPTIONS"
            );
            assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");
        }
        assert_eq!(client.resolve_count(), 0);
    }

    #[tokio::test]
    async fn empty_object_is_served_as_empty_body() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(18), SimObject::new(Vec::new()).named("empty.mp4"));

        let full = app(&client)
            .oneshot(request(Method::GET, "/watch/18", None))
            .await
            .unwrap();
        assert_eq!(full.status(), StatusCode::OK);
        assert_eq!(full.headers()[header::CONTENT_LENGTH], "0");

        let ranged = app(&client)
            .oneshot(request(Method::GET, "/watch/18", Some("bytes=0-")))
            .await
            .unwrap();
        assert_eq!(ranged.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(client.read_count(), 0);
    }

    #[tokio::test]
    async fn stream_limit_rejects_excess_bodies() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(19), SimObject::new(sample(100)));

        let mut config = StreamgateConfig::default();
        config.streaming.max_concurrent_streams = 1;
        let (router, state) = app_with(&client, config);

        let first = router
            .clone()
            .oneshot(request(Method::GET, "/watch/19", None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(state.active_streams(), 1);

        let second = router
            .clone()
            .oneshot(request(Method::GET, "/watch/19", None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(second.headers().get(header::RETRY_AFTER).is_some());

        drop(first);
        assert_eq!(state.active_streams(), 0);

        let third = router
            .oneshot(request(Method::GET, "/watch/19", None))
            .await
            .unwrap();
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metadata_is_fetched_once_per_handle() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(20), SimObject::new(sample(50)));
        let (router, _state) = app_with(&client, StreamgateConfig::default());

        for _ in 0..3 {
            let response = router
                .clone()
                .oneshot(request(Method::HEAD, "/watch/20", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(client.resolve_count(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_aborts_body() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(21), SimObject::new(sample(5000)));

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/21", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        client.fail_next_read();
        assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_reads_are_retried() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(22), SimObject::new(sample(10)));
        client.rate_limit_next(1, Duration::from_secs(4));

        let response = app(&client)
            .oneshot(request(Method::GET, "/watch/22", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 10);
        assert_eq!(client.read_offsets(), vec![0, 0]);
    }
}
