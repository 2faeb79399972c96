//! Interface to the remote store that holds the media bytes.
//!
//! The streaming core never talks to a concrete backend. Everything it needs
//! is expressed by [`RemoteObjectClient`]: resolve a handle to metadata, and
//! read bounded chunks at an offset. Implementations live outside this crate.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::types::{FileId, ObjectHandle};

/// Display name used when the remote object carries none.
pub const DEFAULT_DISPLAY_NAME: &str = "file";

/// Mime type used when the remote object carries none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Result of resolving a handle on the remote side.
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    pub handle: ObjectHandle,
    /// `None` when the object exists but carries no streamable payload.
    pub media: Option<RemoteMedia>,
}

/// Streamable payload attached to a remote object.
#[derive(Debug, Clone)]
pub struct RemoteMedia {
    pub file_id: FileId,
    pub total_size: u64,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Errors surfaced by a remote client.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The handle does not resolve to any object.
    #[error("object not found")]
    NotFound,

    /// The remote asks the caller to pause before retrying the same call.
    #[error("rate limited, retry after {wait:?}")]
    RateLimited {
        /// How long the caller must wait.
        wait: Duration,
    },

    /// The remote is unreachable or refusing service.
    #[error("remote unavailable: {reason}")]
    Unavailable {
        /// Description of the outage.
        reason: String,
    },

    /// Any other remote failure.
    #[error("remote request failed: {reason}")]
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

/// Client for the remote chunked-retrieval API.
///
/// A single instance is shared by every concurrent stream, so implementations
/// must accept overlapping calls.
#[async_trait]
pub trait RemoteObjectClient: Send + Sync {
    /// Resolves a handle to its object description.
    ///
    /// # Errors
    ///
    /// - `RemoteError::NotFound` - Handle is unknown or the object was deleted
    /// - `RemoteError::RateLimited` - Remote demands a pause
    /// - `RemoteError::Unavailable` - Remote cannot be reached
    /// - `RemoteError::Failed` - Any other failure
    async fn resolve(&self, handle: ObjectHandle) -> Result<ResolvedObject, RemoteError>;

    /// Reads up to `max_length` bytes starting at `offset`.
    ///
    /// Returning fewer bytes than requested, including none, signals the end
    /// of the object's data.
    ///
    /// # Errors
    ///
    /// - `RemoteError::RateLimited` - Caller must wait and repeat the identical call
    /// - `RemoteError::Unavailable` - Remote cannot be reached
    /// - `RemoteError::Failed` - Any other failure
    async fn read_chunk(
        &self,
        file_id: &FileId,
        offset: u64,
        max_length: usize,
    ) -> Result<Bytes, RemoteError>;

    /// Short name of the backend for logs and diagnostics.
    fn client_name(&self) -> &'static str;
}
