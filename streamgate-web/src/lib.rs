//! Streamgate Web - HTTP range streaming server
//!
//! Exposes remote media objects at `/watch/{handle}` and
//! `/download/{handle}/{name}` with byte-range support so ordinary players
//! can seek and buffer progressively.

pub mod errors;
pub mod handlers;
pub mod server;

// Re-export main types
pub use errors::StreamError;
pub use server::{AppState, build_router, run_server};
