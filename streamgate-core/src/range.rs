//! HTTP `Range` header resolution.
//!
//! Translates a single-range `bytes=` header into an inclusive [`ByteWindow`]
//! against a known object size. Malformed headers degrade to the full object
//! because players routinely send speculative probes; only a start offset
//! past the end of the object is an error.

use thiserror::Error;

use crate::types::ByteWindow;

/// Errors produced while resolving a range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The requested start lies at or beyond the end of the object.
    #[error("range not satisfiable for object of {total_size} bytes")]
    NotSatisfiable {
        /// Size of the object the range was resolved against.
        total_size: u64,
    },
}

/// Syntactically valid single byte-range request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=-N`: the last `N` bytes.
    Suffix(u64),
    /// `bytes=N-`: from `N` to the end.
    From(u64),
    /// `bytes=N-M`: from `N` to `M` inclusive.
    Bounded(u64, u64),
}

/// Parses a `Range` header value.
///
/// Returns `None` for anything that is not a single numeric `bytes=` range,
/// including multi-range lists.
///
/// # Examples
/// ```
/// use streamgate_core::range::{RangeSpec, parse_range_header};
/// assert_eq!(parse_range_header("bytes=100-199"), Some(RangeSpec::Bounded(100, 199)));
/// assert_eq!(parse_range_header("items=1-2"), None);
/// ```
pub fn parse_range_header(header: &str) -> Option<RangeSpec> {
    let spec = header.trim().strip_prefix("bytes=")?.trim();
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (true, false) => end.parse().ok().map(RangeSpec::Suffix),
        (false, true) => start.parse().ok().map(RangeSpec::From),
        (false, false) => {
            let start = start.parse().ok()?;
            let end = end.parse().ok()?;
            Some(RangeSpec::Bounded(start, end))
        }
    }
}

impl RangeSpec {
    /// Resolves the range against an object of `total_size` bytes.
    ///
    /// The end is clamped into the object and never below the start.
    ///
    /// # Errors
    ///
    /// - `RangeError::NotSatisfiable` - The unclamped start is `>= total_size`
    pub fn resolve(self, total_size: u64) -> Result<ByteWindow, RangeError> {
        let last = total_size
            .checked_sub(1)
            .ok_or(RangeError::NotSatisfiable { total_size })?;

        let (start, end) = match self {
            RangeSpec::Suffix(length) => (total_size.saturating_sub(length), last),
            RangeSpec::From(start) => (start, last),
            RangeSpec::Bounded(start, end) => (start, end),
        };

        if start >= total_size {
            return Err(RangeError::NotSatisfiable { total_size });
        }

        let end = end.min(last).max(start);
        Ok(ByteWindow { start, end })
    }
}

/// Resolves an optional `Range` header into a byte window.
///
/// A missing or unparseable header selects the whole object.
///
/// # Errors
///
/// - `RangeError::NotSatisfiable` - Start beyond the object, or the object is empty
pub fn resolve_range(header: Option<&str>, total_size: u64) -> Result<ByteWindow, RangeError> {
    match header.and_then(parse_range_header) {
        Some(spec) => spec.resolve(total_size),
        None => ByteWindow::full(total_size).ok_or(RangeError::NotSatisfiable { total_size }),
    }
}
