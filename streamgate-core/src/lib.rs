//! Streamgate Core - byte-range streaming of remotely stored media
//!
//! Media objects live in a remote chunked-retrieval store and are never
//! written to local disk. This crate resolves HTTP ranges against object
//! sizes, caches per-object metadata, and turns a byte window into a lazy
//! sequence of bounded remote reads.

pub mod config;
pub mod links;
pub mod metadata;
pub mod mime;
pub mod range;
pub mod remote;
pub mod sequencer;
pub mod tracing_setup;
pub mod types;

// Re-export main types for convenient access
pub use config::{ConfigError, StreamgateConfig};
pub use links::LinkBuilder;
pub use metadata::{CacheStatistics, MetadataCache, MetadataError};
pub use range::{RangeError, RangeSpec, parse_range_header, resolve_range};
pub use remote::{RemoteError, RemoteMedia, RemoteObjectClient, ResolvedObject};
pub use sequencer::{ChunkSequencer, DEFAULT_CHUNK_SIZE, StreamingFailure, stream_window};
pub use types::{ByteWindow, FileId, InvalidHandle, ObjectHandle, ObjectMetadata};

/// Errors that can bubble up from any Streamgate subsystem.
#[derive(Debug, thiserror::Error)]
pub enum StreamgateError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Streaming error: {0}")]
    Streaming(#[from] StreamingFailure),

    #[error("Invalid request: {0}")]
    MalformedRequest(#[from] InvalidHandle),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamgateError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            StreamgateError::Metadata(MetadataError::ObjectNotFound { .. }) => {
                "File not found. The link may have expired or the file was deleted.".to_string()
            }
            StreamgateError::Metadata(MetadataError::UnsupportedMedia { .. }) => {
                "This item has no streamable media.".to_string()
            }
            StreamgateError::Metadata(MetadataError::RemoteUnavailable { .. }) => {
                "The media store is busy, please retry shortly.".to_string()
            }
            StreamgateError::Metadata(MetadataError::LookupFailed { .. }) => {
                "Could not look up the file.".to_string()
            }
            StreamgateError::Range(_) => "Requested range not satisfiable.".to_string(),
            StreamgateError::Streaming(_) => {
                "An error occurred while streaming the file.".to_string()
            }
            StreamgateError::MalformedRequest(_) => "Invalid file link.".to_string(),
            StreamgateError::Configuration(e) => format!("Configuration error: {e}"),
            StreamgateError::Io(_) => "I/O error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamgateError>;
