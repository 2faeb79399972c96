//! End-to-end tests for Streamgate
//!
//! These tests run the complete request path, from HTTP request to remote
//! reads and back, at realistic object and chunk sizes.

mod streaming_workflow;
