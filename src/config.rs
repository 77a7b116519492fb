//! Configuration file parser for ~/.config/podcast-site/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level server configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,

    /// Upstream RSS feed.
    pub feed_url: String,

    /// User-Agent sent with feed and audio requests.
    pub user_agent: String,

    /// How long a fetched feed is served from cache, in minutes.
    pub cache_ttl_minutes: u64,

    /// Maximum number of cache entries kept in memory.
    pub cache_capacity: usize,

    /// Timeout for the whole feed download, in seconds.
    pub fetch_timeout_secs: u64,

    /// Largest accepted feed body, in bytes.
    pub max_feed_bytes: usize,

    /// Scheme used to rebuild proxied audio URLs. Only `http` for local testing.
    pub audio_upstream_scheme: String,

    /// Timeout until the audio host answers with headers, in seconds.
    /// The body stream itself is not time-limited.
    pub audio_timeout_secs: u64,

    /// Allow the audio proxy to reach localhost and private addresses.
    pub audio_allow_private_hosts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            feed_url: "https://hanselminutes.com/subscribe".to_string(),
            user_agent: "Mozilla/5.0 (compatible; PodcastSite/1.0)".to_string(),
            cache_ttl_minutes: 60,
            cache_capacity: 16,
            fetch_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            audio_upstream_scheme: "https".to_string(),
            audio_timeout_secs: 30,
            audio_allow_private_hosts: false,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 10] = [
        "bind_addr",
        "feed_url",
        "user_agent",
        "cache_ttl_minutes",
        "cache_capacity",
        "fetch_timeout_secs",
        "max_feed_bytes",
        "audio_upstream_scheme",
        "audio_timeout_secs",
        "audio_allow_private_hosts",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            feed_url = %config.feed_url,
            bind_addr = %config.bind_addr,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Longest accepted cache TTL (one year).
    const MAX_CACHE_TTL_MINUTES: u64 = 365 * 24 * 60;

    /// Cache TTL for the parsed feed, clamped to one minute .. one year.
    pub fn cache_ttl(&self) -> Duration {
        let minutes = self.cache_ttl_minutes.clamp(1, Self::MAX_CACHE_TTL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_secs(self.audio_timeout_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================
