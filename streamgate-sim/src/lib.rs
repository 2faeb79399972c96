//! Streamgate Sim - simulated remote object stores
//!
//! Drop-in `RemoteObjectClient` implementations for tests and offline
//! development: an in-memory store with fault injection and a store that
//! serves the files of a local directory.

pub mod directory;
pub mod memory;

pub use directory::{DirectoryEntry, DirectoryObjectClient};
pub use memory::{InMemoryObjectClient, SimObject};
