//! Mime type selection for streamed objects.
//!
//! Remote stores frequently label media as `application/octet-stream`, which
//! makes browsers download instead of play. In that case the type is guessed
//! from the file extension: first from a fixed table of media types players
//! care about, then from the `mime_guess` database.

use crate::remote::OCTET_STREAM;

/// Extension to mime type mappings consulted before the generic database.
///
/// Order matters only for readability; extensions are unique.
pub const MEDIA_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("ts", "video/mp2t"),
    ("3gp", "video/3gpp"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("wav", "audio/wav"),
];

/// Looks up a mime type for `file_name` by extension.
///
/// Returns `None` when neither the media table nor the generic database
/// knows the extension.
pub fn guess_from_name(file_name: &str) -> Option<String> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();

    if let Some((_, mime)) = MEDIA_TYPES.iter().find(|(ext, _)| *ext == extension) {
        return Some((*mime).to_string());
    }

    mime_guess::from_ext(&extension)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Picks the `Content-Type` to serve for an object.
///
/// The stored type wins unless it is the octet-stream placeholder, in which
/// case a guess from the name is substituted when one exists.
pub fn effective_mime_type(stored: &str, file_name: &str) -> String {
    if stored.is_empty() || stored.eq_ignore_ascii_case(OCTET_STREAM) {
        guess_from_name(file_name).unwrap_or_else(|| OCTET_STREAM.to_string())
    } else {
        stored.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_type_is_kept() {
        assert_eq!(effective_mime_type("video/webm", "clip.mp4"), "video/webm");
    }

    #[test]
    fn octet_stream_is_replaced_from_table() {
        assert_eq!(
            effective_mime_type("application/octet-stream", "Movie.MKV"),
            "video/x-matroska"
        );
        assert_eq!(effective_mime_type("", "song.flac"), "audio/flac");
    }

    #[test]
    fn generic_database_covers_other_extensions() {
        assert_eq!(
            effective_mime_type(OCTET_STREAM, "notes.pdf"),
            "application/pdf"
        );
    }

    #[test]
    fn unknown_extension_keeps_placeholder() {
        assert_eq!(effective_mime_type(OCTET_STREAM, "blob"), OCTET_STREAM);
        assert_eq!(
            effective_mime_type(OCTET_STREAM, "data.zzunknown"),
            OCTET_STREAM
        );
    }
}
