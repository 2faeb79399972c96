//! Integration tests for Streamgate
//!
//! These tests drive the router, the metadata cache, and the chunk sequencer
//! together against the simulated remote stores.

#[path = "integration/directory_streaming.rs"]
mod directory_streaming;
#[path = "integration/range_validation.rs"]
mod range_validation;
#[path = "integration/sequencer_recovery.rs"]
mod sequencer_recovery;
