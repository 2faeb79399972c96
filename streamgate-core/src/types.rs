//! Domain types shared by every stage of the streaming pipeline.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Opaque identifier of a previously published remote object.
///
/// Handles are positive integers assigned by the publishing side. The same
/// handle never refers to a different object during the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(NonZeroU64);

impl ObjectHandle {
    /// Creates a handle from a raw value, returning `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw numeric value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a path segment is not a valid handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object handle: {input:?}")]
pub struct InvalidHandle {
    /// The rejected input.
    pub input: String,
}

impl FromStr for ObjectHandle {
    type Err = InvalidHandle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidHandle {
                input: s.to_string(),
            })
    }
}

/// Remote-side locator used for chunked reads.
///
/// Produced by the remote client when resolving a handle; the streaming core
/// never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    /// Wraps a remote locator string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the locator as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable description of a streamable object.
///
/// Created once per handle by the metadata cache; request handlers only ever
/// see clones of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub handle: ObjectHandle,
    pub file_id: FileId,
    pub total_size: u64,
    pub display_name: String,
    pub mime_type: String,
}

/// Inclusive byte range `[start, end]` selected for one response.
///
/// Always satisfies `start <= end < total_size` for the object it was
/// resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
}

impl ByteWindow {
    /// Window covering an entire object of `total_size` bytes.
    ///
    /// Returns `None` for an empty object, which has no addressable bytes.
    pub fn full(total_size: u64) -> Option<Self> {
        total_size.checked_sub(1).map(|end| Self { start: 0, end })
    }

    /// Number of bytes covered by the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A window always covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Formats the `Content-Range` value for a partial response.
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_size)
    }
}
