//! HTTP mapping of streaming errors.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use axum::response::IntoResponse;
use streamgate_core::{MetadataError, RangeError, StreamgateError};
use tracing::error;

use crate::handlers::cors::ALLOW_ORIGIN;

/// Error returned by the streaming handlers.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Core(#[from] StreamgateError),

    #[error("too many concurrent streams ({limit} allowed)")]
    Overloaded { limit: usize },

    #[error("failed to build response: {reason}")]
    Internal { reason: String },
}

impl From<MetadataError> for StreamError {
    fn from(error: MetadataError) -> Self {
        StreamError::Core(error.into())
    }
}

impl From<RangeError> for StreamError {
    fn from(error: RangeError) -> Self {
        StreamError::Core(error.into())
    }
}

impl StreamError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            StreamError::Core(core) => match core {
                StreamgateError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
                StreamgateError::Metadata(MetadataError::ObjectNotFound { .. })
                | StreamgateError::Metadata(MetadataError::UnsupportedMedia { .. }) => {
                    StatusCode::NOT_FOUND
                }
                StreamgateError::Metadata(MetadataError::RemoteUnavailable { .. }) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                StreamgateError::Range(RangeError::NotSatisfiable { .. }) => {
                    StatusCode::RANGE_NOT_SATISFIABLE
                }
                StreamgateError::Metadata(MetadataError::LookupFailed { .. })
                | StreamgateError::Streaming(_)
                | StreamgateError::Configuration(_)
                | StreamgateError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            StreamError::Overloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StreamError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            StreamError::Core(core) => core.user_message(),
            StreamError::Overloaded { .. } => "Server busy, please retry shortly.".to_string(),
            StreamError::Internal { .. } => "Internal server error.".to_string(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            StreamError::Core(StreamgateError::Metadata(MetadataError::RemoteUnavailable {
                retry_after,
                ..
            })) => Some(retry_after.unwrap_or(Duration::from_secs(5))),
            StreamError::Overloaded { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        let mut response = (status, self.message()).into_response();
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));

        if let StreamError::Core(StreamgateError::Range(RangeError::NotSatisfiable { total_size })) =
            &self
        {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{total_size}")) {
                headers.insert(header::CONTENT_RANGE, value);
            }
        }

        if let Some(wait) = self.retry_after() {
            let seconds = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            headers.insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use streamgate_core::ObjectHandle;

    use super::*;

    fn handle() -> ObjectHandle {
        ObjectHandle::new(1).unwrap()
    }

    #[test]
    fn statuses_follow_error_taxonomy() {
        let cases: Vec<(StreamError, StatusCode)> = vec![
            (
                StreamgateError::from("x".parse::<ObjectHandle>().unwrap_err()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                MetadataError::ObjectNotFound { handle: handle() }.into(),
                StatusCode::NOT_FOUND,
            ),
            (
                MetadataError::UnsupportedMedia { handle: handle() }.into(),
                StatusCode::NOT_FOUND,
            ),
            (
                RangeError::NotSatisfiable { total_size: 10 }.into(),
                StatusCode::RANGE_NOT_SATISFIABLE,
            ),
            (
                MetadataError::LookupFailed {
                    handle: handle(),
                    reason: "boom".to_string(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (StreamError::Overloaded { limit: 2 }, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }

    #[test]
    fn unsatisfiable_range_reports_total_size() {
        let response = StreamError::from(RangeError::NotSatisfiable { total_size: 1000 })
            .into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
    }

    #[test]
    fn remote_backoff_sets_retry_after() {
        let response = StreamError::from(MetadataError::RemoteUnavailable {
            handle: handle(),
            reason: "rate limited".to_string(),
            retry_after: Some(Duration::from_millis(2500)),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }
}
