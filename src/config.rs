//! Configuration file parser for ~/.config/feedmerge/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use crate::feed::{ChannelInfo, FetchLimits};
use serde::Deserialize;
use std::path::{Path, PathBuf};
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

/// Sources merged when neither the command line nor the config file name any.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://arxiv.org/list/cs.AI/recent",
    "https://ai.googleblog.com",
    "https://aws.amazon.com/blogs/machine-learning",
    "https://blogs.microsoft.com/ai",
    "https://deepmind.com/blog",
    "https://openai.com/blog",
    "https://www.technologyreview.com/topic/artificial-intelligence/",
    "https://venturebeat.com/category/ai/",
];

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URLs to aggregate, in registration order.
    pub sources: Vec<String>,

    /// Where the combined feed is written.
    pub output: PathBuf,

    /// Channel title of the combined feed.
    pub title: String,

    /// Channel link of the combined feed.
    pub link: String,

    /// Channel description of the combined feed.
    pub description: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum size of a fetched page or feed.
    pub max_response_bytes: usize,

    /// Number of sources resolved at once. 1 = strictly sequential.
    pub max_concurrent_requests: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let channel = ChannelInfo::default();
        let limits = FetchLimits::default();
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            output: PathBuf::from("combined_feed.xml"),
            title: channel.title,
            link: channel.link,
            description: channel.description,
            request_timeout_secs: limits.timeout.as_secs(),
            max_response_bytes: limits.max_body_bytes,
            max_concurrent_requests: 4,
            user_agent: concat!("feedmerge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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
            Ok(_) => {} // Size is within limits, proceed
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

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "sources",
                "output",
                "title",
                "link",
                "description",
                "request_timeout_secs",
                "max_response_bytes",
                "max_concurrent_requests",
                "user_agent",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Channel metadata for the combined feed.
    pub fn channel(&self) -> ChannelInfo {
        ChannelInfo {
            title: self.title.clone(),
            link: self.link.clone(),
            description: self.description.clone(),
        }
    }

    /// Per-request bounds for source resolution.
    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_response_bytes,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
