//! CORS headers for browser-hosted players.
//!
//! Links are the only gate, so any origin may read streams. Players running
//! in a page need `Content-Range` and `Content-Length` exposed to seek.

use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use axum::http::response::Builder;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";
pub const ALLOW_HEADERS: &str = "Range";
pub const PREFLIGHT_ALLOW_HEADERS: &str = "Range, Content-Type";
pub const EXPOSE_HEADERS: &str = "Content-Range, Content-Length, Accept-Ranges";
pub const PREFLIGHT_MAX_AGE: &str = "86400";

/// Adds the CORS headers carried by every streaming response.
pub fn with_cors(builder: Builder) -> Builder {
    builder
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS)
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS)
        .header(header::ACCESS_CONTROL_EXPOSE_HEADERS, EXPOSE_HEADERS)
}

/// Answers a CORS preflight on any streaming path.
pub async fn preflight() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(PREFLIGHT_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );

    response
}
