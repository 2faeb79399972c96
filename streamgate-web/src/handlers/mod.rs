//! HTTP request handlers organized by functionality

pub mod cors;
pub mod pages;
pub mod stream;

pub use cors::preflight;
pub use pages::{health_check, home_page};
pub use stream::{Disposition, download, download_unnamed, watch};
