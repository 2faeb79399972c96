//! Centralized configuration for Streamgate.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered throughout the codebase.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::sequencer::DEFAULT_CHUNK_SIZE;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("maximum concurrent streams must be greater than zero")]
    ZeroStreamLimit,

    #[error("public host is not set; generated links would point at {host}")]
    PublicHostUnset { host: String },
}

/// Central configuration for all Streamgate components.
#[derive(Debug, Clone, Default)]
pub struct StreamgateConfig {
    pub server: ServerConfig,
    pub streaming: StreamingConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener and public address settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Host name clients use to reach the server, used in generated links
    pub public_host: String,
    /// Whether generated links use https
    pub use_https: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_host: "localhost".to_string(),
            use_https: false,
        }
    }
}

impl ServerConfig {
    /// Base URL for generated watch and download links.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{scheme}://{}", self.public_host)
    }

    /// Address string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Chunk streaming settings.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Bytes requested per remote read
    pub chunk_size: usize,
    /// Maximum response bodies streaming at once
    pub max_concurrent_streams: usize,
    /// Overall deadline for one response body (None = no deadline)
    pub request_timeout: Option<Duration>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_streams: 50,
            request_timeout: None,
        }
    }
}

/// Metadata cache settings.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Maximum cached objects (None = unbounded)
    pub capacity: Option<NonZeroUsize>,
}

/// Log output settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory receiving the per-run trace file
    pub logs_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl StreamgateConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("STREAMGATE_HOST") {
            config.server.host = host;
        }

        if let Some(port) = lookup("STREAMGATE_PORT").and_then(|v| v.parse().ok()) {
            config.server.port = port;
        }

        if let Some(public_host) = lookup("STREAMGATE_PUBLIC_HOST") {
            config.server.public_host = public_host;
        }

        if let Some(use_https) = lookup("STREAMGATE_USE_HTTPS") {
            config.server.use_https = use_https.eq_ignore_ascii_case("true");
        }

        if let Some(size) = lookup("STREAMGATE_CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            config.streaming.chunk_size = size;
        }

        if let Some(limit) = lookup("STREAMGATE_MAX_STREAMS").and_then(|v| v.parse().ok()) {
            config.streaming.max_concurrent_streams = limit;
        }

        if let Some(seconds) = lookup("STREAMGATE_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.streaming.request_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        if let Some(capacity) = lookup("STREAMGATE_CACHE_CAPACITY").and_then(|v| v.parse().ok()) {
            config.cache.capacity = NonZeroUsize::new(capacity);
        }

        if let Some(dir) = lookup("STREAMGATE_LOGS_DIR").filter(|v| !v.trim().is_empty()) {
            config.logging.logs_dir = PathBuf::from(dir);
        }

        config
    }

    /// Checks settings required to serve streams.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroChunkSize` - Chunk size is zero
    /// - `ConfigError::ZeroStreamLimit` - Stream limit is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streaming.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.streaming.max_concurrent_streams == 0 {
            return Err(ConfigError::ZeroStreamLimit);
        }
        Ok(())
    }

    /// Checks that generated links will be reachable by other machines.
    ///
    /// # Errors
    ///
    /// - `ConfigError::PublicHostUnset` - Public host is empty or localhost
    pub fn validate_public_links(&self) -> Result<(), ConfigError> {
        let host = self.server.public_host.trim();
        if host.is_empty() || host == "localhost" || host.starts_with("127.") {
            return Err(ConfigError::PublicHostUnset {
                host: host.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = StreamgateConfig::default();
        assert_eq!(config.streaming.chunk_size, 1024 * 1024);
        assert_eq!(config.streaming.max_concurrent_streams, 50);
        assert!(config.cache.capacity.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn overrides_are_applied() {
        let config = StreamgateConfig::from_lookup(lookup(&[
            ("STREAMGATE_PORT", "9000"),
            ("STREAMGATE_PUBLIC_HOST", "media.example.org"),
            ("STREAMGATE_USE_HTTPS", "TRUE"),
            ("STREAMGATE_CHUNK_SIZE", "4096"),
            ("STREAMGATE_REQUEST_TIMEOUT_SECS", "120"),
            ("STREAMGATE_CACHE_CAPACITY", "500"),
            ("STREAMGATE_LOGS_DIR", "/var/log/streamgate"),
        ]));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.base_url(), "https://media.example.org");
        assert_eq!(config.streaming.chunk_size, 4096);
        assert_eq!(config.streaming.request_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.cache.capacity, NonZeroUsize::new(500));
        assert_eq!(config.logging.logs_dir, PathBuf::from("/var/log/streamgate"));
        assert!(config.validate_public_links().is_ok());
    }

    #[test]
    fn unparseable_overrides_keep_defaults() {
        let config = StreamgateConfig::from_lookup(lookup(&[
            ("STREAMGATE_PORT", "eighty"),
            ("STREAMGATE_CACHE_CAPACITY", "0"),
        ]));
        assert_eq!(config.server.port, 8080);
        assert!(config.cache.capacity.is_none());
    }

    #[test]
    fn validation_rejects_zero_limits() {
        let mut config = StreamgateConfig::default();
        config.streaming.chunk_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));

        config.streaming.chunk_size = 1;
        config.streaming.max_concurrent_streams = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroStreamLimit));
    }

    #[test]
    fn localhost_links_are_flagged() {
        let config = StreamgateConfig::default();
        assert!(matches!(
            config.validate_public_links(),
            Err(ConfigError::PublicHostUnset { .. })
        ));
    }
}
