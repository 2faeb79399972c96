//! Chunk sequencing against a misbehaving remote.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use streamgate_core::{
    ByteWindow, ChunkSequencer, MetadataCache, ObjectHandle, RemoteObjectClient, stream_window,
};
use streamgate_sim::{InMemoryObjectClient, SimObject};
use tokio::time::Instant;
use tokio_test::assert_ok;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 241) as u8).collect()
}

async fn setup(object: SimObject) -> (InMemoryObjectClient, MetadataCache) {
    let client = InMemoryObjectClient::new();
    client.insert(ObjectHandle::new(7).unwrap(), object);
    let cache = MetadataCache::new(Arc::new(client.clone()));
    (client, cache)
}

async fn collect(
    client: Arc<dyn RemoteObjectClient>,
    cache: &MetadataCache,
    window: ByteWindow,
    chunk_size: usize,
) -> Vec<u8> {
    let metadata = assert_ok!(cache.get_or_fetch(ObjectHandle::new(7).unwrap()).await);
    let mut stream = Box::pin(stream_window(client, &metadata, window, chunk_size));
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&assert_ok!(chunk));
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_rate_limits_are_waited_out() {
    let data = payload(5000);
    let (client, cache) = setup(SimObject::new(data.clone())).await;
    client.rate_limit_next(3, Duration::from_secs(2));

    let started = Instant::now();
    let body = collect(
        Arc::new(client.clone()),
        &cache,
        ByteWindow { start: 0, end: 4999 },
        2000,
    )
    .await;

    assert_eq!(body, data);
    assert!(started.elapsed() >= Duration::from_secs(6));
    assert_eq!(client.read_offsets(), vec![0, 0, 0, 0, 2000, 4000]);
}

#[tokio::test]
async fn test_short_read_ends_stream_early() {
    let data = payload(1500);
    let (client, cache) = setup(SimObject::new(data.clone()).with_reported_size(4000)).await;

    let body = collect(
        Arc::new(client.clone()),
        &cache,
        ByteWindow { start: 0, end: 3999 },
        1000,
    )
    .await;

    assert_eq!(body, data);
    assert_eq!(client.read_offsets(), vec![0, 1000]);
}

#[tokio::test]
async fn test_capped_reads_keep_offsets_contiguous() {
    let data = payload(3000);
    let (client, cache) = setup(SimObject::new(data.clone())).await;
    client.set_max_read_len(Some(1000));

    // A capped read looks like a short read, so the stream stops after it.
    let body = collect(
        Arc::new(client.clone()),
        &cache,
        ByteWindow { start: 500, end: 2999 },
        2000,
    )
    .await;

    assert_eq!(body, data[500..1500]);
    assert_eq!(client.read_offsets(), vec![500]);
}

#[tokio::test]
async fn test_failure_reports_offset() {
    let (client, cache) = setup(SimObject::new(payload(4000))).await;
    let metadata = assert_ok!(cache.get_or_fetch(ObjectHandle::new(7).unwrap()).await);

    let mut sequencer = ChunkSequencer::new(
        Arc::new(client.clone()),
        &metadata,
        ByteWindow { start: 0, end: 3999 },
    )
    .with_chunk_size(1000);

    assert_ok!(sequencer.next_chunk().await.unwrap());
    client.fail_next_read();

    let failure = sequencer.next_chunk().await.unwrap().unwrap_err();
    assert_eq!(failure.offset, 1000);
    assert!(sequencer.is_finished());
    assert!(sequencer.next_chunk().await.is_none());
    assert_eq!(sequencer.bytes_yielded(), 1000);
}

#[tokio::test]
async fn test_metadata_is_cached_across_streams() {
    let (client, cache) = setup(SimObject::new(payload(100)).named("a.mp3")).await;
    let shared: Arc<dyn RemoteObjectClient> = Arc::new(client.clone());

    for _ in 0..3 {
        let body = collect(shared.clone(), &cache, ByteWindow { start: 0, end: 99 }, 64).await;
        assert_eq!(body.len(), 100);
    }

    assert_eq!(client.resolve_count(), 1);
    let stats = cache.statistics();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_remote_hits_request_deadline() {
    let (client, cache) = setup(SimObject::new(payload(3000))).await;
    let metadata = assert_ok!(cache.get_or_fetch(ObjectHandle::new(7).unwrap()).await);
    client.set_read_delay(Duration::from_secs(3));

    let mut sequencer = ChunkSequencer::new(
        Arc::new(client.clone()),
        &metadata,
        ByteWindow { start: 0, end: 2999 },
    )
    .with_chunk_size(1000)
    .with_timeout(Duration::from_secs(5));

    // First read lands at 3s, the second would land at 6s.
    assert_eq!(assert_ok!(sequencer.next_chunk().await.unwrap()).len(), 1000);
    let failure = sequencer.next_chunk().await.unwrap().unwrap_err();
    assert_eq!(failure.offset, 1000);
    assert!(failure.reason.contains("deadline"));
    assert!(sequencer.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_slow_remote_without_deadline_completes() {
    let data = payload(2500);
    let (client, cache) = setup(SimObject::new(data.clone())).await;
    client.set_read_delay(Duration::from_millis(400));

    let started = Instant::now();
    let body = collect(
        Arc::new(client.clone()),
        &cache,
        ByteWindow { start: 0, end: 2499 },
        1000,
    )
    .await;

    assert_eq!(body, data);
    assert!(started.elapsed() >= Duration::from_millis(1200));
    assert_eq!(client.read_count(), 3);
}
