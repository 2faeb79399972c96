//! Chunked retrieval of a byte window from the remote store.
//!
//! [`ChunkSequencer`] walks a [`ByteWindow`] with sequential fixed-size reads,
//! trims the last chunk to the window, honors rate-limit backoff without
//! losing its position, and treats a short read as the authoritative end of
//! the object. It is consumed one chunk at a time through
//! [`ChunkSequencer::next_chunk`], or adapted into a `futures::Stream` for an
//! HTTP body. Dropping the stream stops all further remote reads.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, stream};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::remote::{RemoteError, RemoteObjectClient};
use crate::types::{ByteWindow, FileId, ObjectHandle, ObjectMetadata};

/// Default number of bytes requested per remote read (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Terminal failure of a chunk stream.
#[derive(Debug, Clone, Error)]
#[error("streaming {handle} failed at offset {offset}: {reason}")]
pub struct StreamingFailure {
    /// Object being streamed.
    pub handle: ObjectHandle,
    /// Absolute offset of the read that failed.
    pub offset: u64,
    /// Description of the failure.
    pub reason: String,
}

/// Cursor over one byte window of a remote object.
///
/// Not restartable: once it returns `None` or an error it stays finished.
pub struct ChunkSequencer {
    client: Arc<dyn RemoteObjectClient>,
    handle: ObjectHandle,
    file_id: FileId,
    cursor: u64,
    end: u64,
    chunk_size: usize,
    deadline: Option<Instant>,
    finished: bool,
    backoff_count: u32,
    bytes_yielded: u64,
}

impl ChunkSequencer {
    /// Creates a sequencer for `window` of the object described by `metadata`.
    pub fn new(
        client: Arc<dyn RemoteObjectClient>,
        metadata: &ObjectMetadata,
        window: ByteWindow,
    ) -> Self {
        Self {
            client,
            handle: metadata.handle,
            file_id: metadata.file_id.clone(),
            cursor: window.start,
            end: window.end,
            chunk_size: DEFAULT_CHUNK_SIZE,
            deadline: None,
            finished: false,
            backoff_count: 0,
            bytes_yielded: 0,
        }
    }

    /// Sets the number of bytes requested per remote read (at least one).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fails the stream once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Whether the sequence has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of rate-limit pauses taken so far.
    pub fn backoff_count(&self) -> u32 {
        self.backoff_count
    }

    /// Total bytes handed to the caller so far.
    pub fn bytes_yielded(&self) -> u64 {
        self.bytes_yielded
    }

    /// Fetches, trims and returns the next chunk.
    ///
    /// Returns `None` once the window is exhausted or the remote signalled the
    /// end of data. Rate limiting is retried in place; any other remote error
    /// is returned once and ends the sequence.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, StreamingFailure>> {
        if self.finished {
            return None;
        }
        if self.cursor > self.end {
            self.finished = true;
            return None;
        }

        loop {
            let fetch = self
                .client
                .read_chunk(&self.file_id, self.cursor, self.chunk_size);
            let result = match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fetch).await {
                    Ok(result) => result,
                    Err(_) => return Some(Err(self.fail("request deadline exceeded".to_string()))),
                },
                None => fetch.await,
            };

            match result {
                Ok(chunk) => return self.accept(chunk),
                Err(RemoteError::RateLimited { wait }) => {
                    self.backoff_count += 1;
                    warn!(
                        handle = %self.handle,
                        offset = self.cursor,
                        wait_secs = wait.as_secs_f64(),
                        "Remote rate limit, pausing stream"
                    );
                    if let Some(deadline) = self.deadline {
                        if Instant::now() + wait > deadline {
                            return Some(Err(
                                self.fail("backoff would exceed request deadline".to_string())
                            ));
                        }
                    }
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Some(Err(self.fail(e.to_string()))),
            }
        }
    }

    /// Adapts the sequencer into a stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, StreamingFailure>> + Send {
        stream::unfold(self, |mut sequencer| async move {
            sequencer
                .next_chunk()
                .await
                .map(|chunk| (chunk, sequencer))
        })
    }

    fn accept(&mut self, mut chunk: Bytes) -> Option<Result<Bytes, StreamingFailure>> {
        let received = chunk.len() as u64;
        let remaining = self.end - self.cursor + 1;
        let short_read = chunk.len() < self.chunk_size;

        if received > remaining {
            chunk.truncate(remaining as usize);
        }
        self.cursor += received;

        if short_read || self.cursor > self.end {
            self.finished = true;
            debug!(
                handle = %self.handle,
                bytes = self.bytes_yielded + chunk.len() as u64,
                short_read,
                "Chunk stream complete"
            );
        }

        if chunk.is_empty() {
            return None;
        }
        self.bytes_yielded += chunk.len() as u64;
        Some(Ok(chunk))
    }

    fn fail(&mut self, reason: String) -> StreamingFailure {
        self.finished = true;
        error!(handle = %self.handle, offset = self.cursor, %reason, "Chunk fetch failed");
        StreamingFailure {
            handle: self.handle,
            offset: self.cursor,
            reason,
        }
    }
}

/// Streams `window` of an object in chunks of `chunk_size` bytes.
pub fn stream_window(
    client: Arc<dyn RemoteObjectClient>,
    metadata: &ObjectMetadata,
    window: ByteWindow,
    chunk_size: usize,
) -> impl Stream<Item = Result<Bytes, StreamingFailure>> + Send + use<> {
    ChunkSequencer::new(client, metadata, window)
        .with_chunk_size(chunk_size)
        .into_stream()
}
