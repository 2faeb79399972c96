//! Per-object metadata cache.
//!
//! Resolving a handle costs a remote round trip, while the answer never
//! changes once an object is published. The cache keeps one
//! [`ObjectMetadata`] per handle for the life of the process, optionally
//! bounded with LRU eviction.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::remote::{DEFAULT_DISPLAY_NAME, OCTET_STREAM, RemoteError, RemoteObjectClient};
use crate::types::{ObjectHandle, ObjectMetadata};

/// Errors that can occur while obtaining metadata.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// The handle does not resolve to an object.
    #[error("object {handle} not found")]
    ObjectNotFound { handle: ObjectHandle },

    /// The object exists but carries no streamable payload.
    #[error("object {handle} has no streamable media")]
    UnsupportedMedia { handle: ObjectHandle },

    /// The remote refused the lookup for now.
    #[error("remote unavailable while resolving {handle}: {reason}")]
    RemoteUnavailable {
        handle: ObjectHandle,
        reason: String,
        /// Suggested wait before retrying, when the remote gave one.
        retry_after: Option<Duration>,
    },

    /// Any other remote failure during lookup.
    #[error("lookup of {handle} failed: {reason}")]
    LookupFailed { handle: ObjectHandle, reason: String },
}

impl MetadataError {
    fn from_remote(handle: ObjectHandle, error: RemoteError) -> Self {
        match error {
            RemoteError::NotFound => Self::ObjectNotFound { handle },
            RemoteError::RateLimited { wait } => Self::RemoteUnavailable {
                handle,
                reason: "rate limited".to_string(),
                retry_after: Some(wait),
            },
            RemoteError::Unavailable { reason } => Self::RemoteUnavailable {
                handle,
                reason,
                retry_after: None,
            },
            RemoteError::Failed { reason } => Self::LookupFailed { handle, reason },
        }
    }
}

/// Snapshot of cache activity, reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Lazily populated handle to metadata map.
///
/// Lookups for unseen handles go to the remote client; successful answers
/// are stored, failures are not, so the next request retries. The internal
/// lock is never held across a remote call. Two concurrent first lookups of
/// the same handle may both reach the remote; the later insert overwrites an
/// equal value.
pub struct MetadataCache {
    client: Arc<dyn RemoteObjectClient>,
    entries: Mutex<LruCache<ObjectHandle, ObjectMetadata>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetadataCache {
    /// Creates a cache that never evicts.
    pub fn new(client: Arc<dyn RemoteObjectClient>) -> Self {
        Self::with_capacity(client, None)
    }

    /// Creates a cache, bounded to `capacity` entries when given.
    pub fn with_capacity(
        client: Arc<dyn RemoteObjectClient>,
        capacity: Option<NonZeroUsize>,
    ) -> Self {
        let entries = match capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            client,
            entries: Mutex::new(entries),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Remote client the cache resolves through.
    pub fn client(&self) -> &Arc<dyn RemoteObjectClient> {
        &self.client
    }

    /// Returns cached metadata, fetching it from the remote on a miss.
    ///
    /// # Errors
    ///
    /// - `MetadataError::ObjectNotFound` - Handle unknown to the remote
    /// - `MetadataError::UnsupportedMedia` - Object has no media payload
    /// - `MetadataError::RemoteUnavailable` - Remote rate limited or unreachable
    /// - `MetadataError::LookupFailed` - Any other remote failure
    pub async fn get_or_fetch(&self, handle: ObjectHandle) -> Result<ObjectMetadata, MetadataError> {
        if let Some(metadata) = self.entries.lock().get(&handle).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(metadata);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        debug!(%handle, client = self.client.client_name(), "Metadata cache miss");

        let resolved = self.client.resolve(handle).await.map_err(|e| {
            warn!(%handle, error = %e, "Metadata lookup failed");
            MetadataError::from_remote(handle, e)
        })?;

        let media = resolved
            .media
            .ok_or(MetadataError::UnsupportedMedia { handle })?;

        let metadata = ObjectMetadata {
            handle,
            file_id: media.file_id,
            total_size: media.total_size,
            display_name: media
                .display_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            mime_type: media
                .mime_type
                .filter(|mime| !mime.is_empty())
                .unwrap_or_else(|| OCTET_STREAM.to_string()),
        };

        self.entries.lock().put(handle, metadata.clone());
        Ok(metadata)
    }

    /// Returns cached metadata without contacting the remote.
    pub fn peek(&self, handle: ObjectHandle) -> Option<ObjectMetadata> {
        self.entries.lock().peek(&handle).cloned()
    }

    /// Drops the entry for `handle`, returning whether one existed.
    pub fn invalidate(&self, handle: ObjectHandle) -> bool {
        self.entries.lock().pop(&handle).is_some()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit, miss and size counters.
    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
