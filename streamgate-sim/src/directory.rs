//! Directory-backed remote store for offline development.
//!
//! Every regular, non-hidden file in a directory becomes an object. Handles
//! are assigned `1..=N` in file name order at scan time, and chunk reads are
//! served straight from disk.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use streamgate_core::mime::guess_from_name;
use streamgate_core::remote::{RemoteError, RemoteMedia, RemoteObjectClient, ResolvedObject};
use streamgate_core::types::{FileId, ObjectHandle};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::info;

/// One file exposed by the directory store.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub handle: ObjectHandle,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Remote store view over a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryObjectClient {
    root: PathBuf,
    entries: Vec<DirectoryEntry>,
}

impl DirectoryObjectClient {
    /// Scans `root` and assigns handles to its files.
    ///
    /// # Errors
    ///
    /// - `io::Error` - Directory cannot be listed or a file cannot be inspected
    pub async fn scan(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();

        let mut dir = fs::read_dir(&root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !metadata.is_file() || name.starts_with('.') {
                continue;
            }
            files.push((name, entry.path(), metadata.len()));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let entries: Vec<DirectoryEntry> = files
            .into_iter()
            .zip(1u64..)
            .filter_map(|((name, path, size), raw)| {
                ObjectHandle::new(raw).map(|handle| DirectoryEntry {
                    handle,
                    name,
                    path,
                    size,
                })
            })
            .collect();

        info!(
            "Found {} files in {} for directory store",
            entries.len(),
            root.display()
        );

        Ok(Self { root, entries })
    }

    /// Directory this store serves from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files exposed by the store, in handle order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    fn entry(&self, handle: ObjectHandle) -> Option<&DirectoryEntry> {
        let index = usize::try_from(handle.get() - 1).ok()?;
        self.entries.get(index)
    }

    fn entry_for_file(&self, file_id: &FileId) -> Option<&DirectoryEntry> {
        let handle = file_id.as_str().parse::<ObjectHandle>().ok()?;
        self.entry(handle)
    }
}

#[async_trait]
impl RemoteObjectClient for DirectoryObjectClient {
    async fn resolve(&self, handle: ObjectHandle) -> Result<ResolvedObject, RemoteError> {
        let entry = self.entry(handle).ok_or(RemoteError::NotFound)?;

        Ok(ResolvedObject {
            handle,
            media: Some(RemoteMedia {
                file_id: FileId::new(handle.to_string()),
                total_size: entry.size,
                display_name: Some(entry.name.clone()),
                mime_type: guess_from_name(&entry.name),
            }),
        })
    }

    async fn read_chunk(
        &self,
        file_id: &FileId,
        offset: u64,
        max_length: usize,
    ) -> Result<Bytes, RemoteError> {
        let entry = self
            .entry_for_file(file_id)
            .ok_or_else(|| RemoteError::Failed {
                reason: format!("unknown file id {file_id}"),
            })?;

        let io_failure = |e: io::Error| RemoteError::Unavailable {
            reason: format!("{}: {e}", entry.path.display()),
        };

        let mut file = fs::File::open(&entry.path).await.map_err(io_failure)?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(io_failure)?;

        let mut buffer = BytesMut::zeroed(max_length);
        let mut filled = 0;
        while filled < max_length {
            let read = file
                .read(&mut buffer[filled..])
                .await
                .map_err(io_failure)?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buffer.truncate(filled);

        Ok(buffer.freeze())
    }

    fn client_name(&self) -> &'static str {
        "directory"
    }
}
