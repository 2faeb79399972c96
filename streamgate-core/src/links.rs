//! Shareable watch and download URLs.

use crate::types::ObjectHandle;

/// Builds links against a fixed base URL.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
}

impl LinkBuilder {
    /// Creates a builder; a trailing slash on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Inline playback link.
    pub fn watch_url(&self, handle: ObjectHandle) -> String {
        format!("{}/watch/{handle}", self.base_url)
    }

    /// Forced download link carrying the file name.
    pub fn download_url(&self, handle: ObjectHandle, file_name: &str) -> String {
        let safe_name = file_name.replace(' ', "_");
        format!(
            "{}/download/{handle}/{}",
            self.base_url,
            urlencoding::encode(&safe_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_use_base_url() {
        let links = LinkBuilder::new("http://media.example.org/");
        let handle = ObjectHandle::new(314).unwrap();

        assert_eq!(links.watch_url(handle), "http://media.example.org/watch/314");
        assert_eq!(
            links.download_url(handle, "My Movie (2020).mkv"),
            "http://media.example.org/download/314/My_Movie_%282020%29.mkv"
        );
    }
}
