//! In-memory remote object store for deterministic testing.
//!
//! Serves object bytes from memory with injectable faults (rate limiting,
//! one-shot read failures, capped read lengths) so the streaming pipeline can
//! be exercised end to end without a real remote.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use streamgate_core::remote::{RemoteError, RemoteMedia, RemoteObjectClient, ResolvedObject};
use streamgate_core::types::{FileId, ObjectHandle};

const FILE_ID_PREFIX: &str = "mem-";

/// Object registered with the in-memory store.
#[derive(Debug, Clone)]
pub struct SimObject {
    data: Bytes,
    display_name: Option<String>,
    mime_type: Option<String>,
    reported_size: Option<u64>,
}

impl SimObject {
    /// Creates an object serving `data`, with no name or mime type.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            display_name: None,
            mime_type: None,
            reported_size: None,
        }
    }

    /// Sets the display name reported on resolve.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the mime type reported on resolve.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Reports `size` on resolve instead of the real data length.
    ///
    /// Simulates remotes whose advertised size is only an approximation.
    pub fn with_reported_size(mut self, size: u64) -> Self {
        self.reported_size = Some(size);
        self
    }
}

#[derive(Debug, Clone)]
enum StoredObject {
    Media(SimObject),
    NoMedia,
}

#[derive(Default)]
struct Inner {
    objects: RwLock<HashMap<ObjectHandle, StoredObject>>,
    pending_rate_limits: Mutex<VecDeque<Duration>>,
    fail_next_read: AtomicBool,
    max_read_len: AtomicUsize,
    read_delay: Mutex<Duration>,
    resolve_count: AtomicU64,
    read_count: AtomicU64,
    read_offsets: Mutex<Vec<u64>>,
}

/// Shared in-memory remote store.
///
/// Clones share state, so a test can keep one clone for fault injection and
/// hand another to the server.
#[derive(Clone, Default)]
pub struct InMemoryObjectClient {
    inner: Arc<Inner>,
}

impl InMemoryObjectClient {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `object` under `handle`, replacing any previous object.
    pub fn insert(&self, handle: ObjectHandle, object: SimObject) {
        self.inner
            .objects
            .write()
            .insert(handle, StoredObject::Media(object));
    }

    /// Registers an object that resolves but carries no media.
    pub fn insert_without_media(&self, handle: ObjectHandle) {
        self.inner
            .objects
            .write()
            .insert(handle, StoredObject::NoMedia);
    }

    /// Removes an object, as if its message had been deleted.
    pub fn remove(&self, handle: ObjectHandle) -> bool {
        self.inner.objects.write().remove(&handle).is_some()
    }

    /// Makes the next `count` reads fail with a rate-limit demand of `wait`.
    pub fn rate_limit_next(&self, count: usize, wait: Duration) {
        let mut pending = self.inner.pending_rate_limits.lock();
        pending.extend(std::iter::repeat_n(wait, count));
    }

    /// Makes the next read fail with a non-retryable error.
    pub fn fail_next_read(&self) {
        self.inner.fail_next_read.store(true, Ordering::Release);
    }

    /// Caps every read at `max` bytes regardless of the requested length.
    pub fn set_max_read_len(&self, max: Option<usize>) {
        self.inner
            .max_read_len
            .store(max.unwrap_or(0), Ordering::Release);
    }

    /// Delays every read by `delay` to simulate network latency.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.inner.read_delay.lock() = delay;
    }

    /// Number of resolve calls served.
    pub fn resolve_count(&self) -> u64 {
        self.inner.resolve_count.load(Ordering::Acquire)
    }

    /// Number of chunk reads attempted, including failed ones.
    pub fn read_count(&self) -> u64 {
        self.inner.read_count.load(Ordering::Acquire)
    }

    /// Offsets of every attempted read, in call order.
    pub fn read_offsets(&self) -> Vec<u64> {
        self.inner.read_offsets.lock().clone()
    }

    /// Resets fault injection and counters; registered objects are kept.
    pub fn reset(&self) {
        self.inner.pending_rate_limits.lock().clear();
        self.inner.fail_next_read.store(false, Ordering::Release);
        self.inner.max_read_len.store(0, Ordering::Release);
        *self.inner.read_delay.lock() = Duration::ZERO;
        self.inner.resolve_count.store(0, Ordering::Release);
        self.inner.read_count.store(0, Ordering::Release);
        self.inner.read_offsets.lock().clear();
    }

    fn data_for(&self, file_id: &FileId) -> Option<Bytes> {
        let handle = file_id
            .as_str()
            .strip_prefix(FILE_ID_PREFIX)?
            .parse::<ObjectHandle>()
            .ok()?;
        match self.inner.objects.read().get(&handle)? {
            StoredObject::Media(object) => Some(object.data.clone()),
            StoredObject::NoMedia => None,
        }
    }
}

#[async_trait]
impl RemoteObjectClient for InMemoryObjectClient {
    async fn resolve(&self, handle: ObjectHandle) -> Result<ResolvedObject, RemoteError> {
        self.inner.resolve_count.fetch_add(1, Ordering::AcqRel);

        let stored = self
            .inner
            .objects
            .read()
            .get(&handle)
            .cloned()
            .ok_or(RemoteError::NotFound)?;

        let media = match stored {
            StoredObject::Media(object) => Some(RemoteMedia {
                file_id: FileId::new(format!("{FILE_ID_PREFIX}{handle}")),
                total_size: object
                    .reported_size
                    .unwrap_or(object.data.len() as u64),
                display_name: object.display_name,
                mime_type: object.mime_type,
            }),
            StoredObject::NoMedia => None,
        };

        Ok(ResolvedObject { handle, media })
    }

    async fn read_chunk(
        &self,
        file_id: &FileId,
        offset: u64,
        max_length: usize,
    ) -> Result<Bytes, RemoteError> {
        self.inner.read_count.fetch_add(1, Ordering::AcqRel);
        self.inner.read_offsets.lock().push(offset);

        let delay = *self.inner.read_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(wait) = self.inner.pending_rate_limits.lock().pop_front() {
            return Err(RemoteError::RateLimited { wait });
        }

        if self.inner.fail_next_read.swap(false, Ordering::AcqRel) {
            return Err(RemoteError::Failed {
                reason: "simulated read failure".to_string(),
            });
        }

        let data = self.data_for(file_id).ok_or_else(|| RemoteError::Failed {
            reason: format!("unknown file id {file_id}"),
        })?;

        let cap = self.inner.max_read_len.load(Ordering::Acquire);
        let length = if cap == 0 { max_length } else { max_length.min(cap) };

        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(length).min(data.len());
        Ok(data.slice(start..end))
    }

    fn client_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: u64) -> ObjectHandle {
        ObjectHandle::new(raw).unwrap()
    }

    #[tokio::test]
    async fn resolves_registered_objects() {
        let client = InMemoryObjectClient::new();
        client.insert(
            handle(1),
            SimObject::new(vec![1u8; 100]).named("a.mp4").with_mime("video/mp4"),
        );

        let resolved = client.resolve(handle(1)).await.unwrap();
        let media = resolved.media.unwrap();
        assert_eq!(media.total_size, 100);
        assert_eq!(media.display_name.as_deref(), Some("a.mp4"));
        assert_eq!(client.resolve_count(), 1);

        assert!(matches!(
            client.resolve(handle(2)).await,
            Err(RemoteError::NotFound)
        ));
    }

    #[tokio::test]
    async fn reads_are_bounded_by_data_and_cap() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(3), SimObject::new((0..50u8).collect::<Vec<_>>()));
        let file_id = client.resolve(handle(3)).await.unwrap().media.unwrap().file_id;

        assert_eq!(client.read_chunk(&file_id, 10, 5).await.unwrap(), vec![10, 11, 12, 13, 14]);
        assert_eq!(client.read_chunk(&file_id, 45, 10).await.unwrap().len(), 5);
        assert!(client.read_chunk(&file_id, 500, 10).await.unwrap().is_empty());

        client.set_max_read_len(Some(3));
        assert_eq!(client.read_chunk(&file_id, 0, 10).await.unwrap().len(), 3);
        assert_eq!(client.read_offsets(), vec![10, 45, 500, 0]);
    }

    #[tokio::test]
    async fn injected_faults_fire_once() {
        let client = InMemoryObjectClient::new();
        client.insert(handle(4), SimObject::new(vec![0u8; 10]));
        let file_id = FileId::new("mem-4");

        client.rate_limit_next(1, Duration::from_secs(2));
        client.fail_next_read();

        assert!(matches!(
            client.read_chunk(&file_id, 0, 4).await,
            Err(RemoteError::RateLimited { wait }) if wait == Duration::from_secs(2)
        ));
        assert!(matches!(
            client.read_chunk(&file_id, 0, 4).await,
            Err(RemoteError::Failed { .. })
        ));
        assert_eq!(client.read_chunk(&file_id, 0, 4).await.unwrap().len(), 4);
        assert_eq!(client.read_count(), 3);

        client.reset();
        assert_eq!(client.read_count(), 0);
    }

    #[tokio::test]
    async fn object_without_media_resolves_empty() {
        let client = InMemoryObjectClient::new();
        client.insert_without_media(handle(5));

        assert!(client.resolve(handle(5)).await.unwrap().media.is_none());
        assert!(client.read_chunk(&FileId::new("mem-5"), 0, 1).await.is_err());
        assert!(client.remove(handle(5)));
    }
}
