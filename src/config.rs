//! Crawl configuration
//!
//! The configuration is an explicit context object built once per run (from
//! the CLI in the binary, directly in tests) and handed to the engine; there
//! is no module-level mutable state.

use crate::{ConfigError, UrlError};
use std::path::{Path, PathBuf};
use url::Url;

fn invalid_url(e: UrlError) -> ConfigError {
    match e {
        UrlError::Parse(msg) | UrlError::InvalidScheme(msg) => ConfigError::InvalidUrl(msg),
    }
}

/// Directory for mirrored pages inside the crawl's base location
pub const INTERNAL_DIR: &str = "internal_content";

/// Directory for saved external (off-site) resources
pub const EXTERNAL_DIR: &str = "external_content";

/// Configuration for a single mirror run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Base URL delimiting the mirrored subtree; everything whose location
    /// falls under this prefix is internal content
    pub base_url: Url,

    /// Entry page the crawl starts from
    pub entry_url: Url,

    /// Number of concurrent workers draining the frontier
    pub workers: usize,

    /// Maximum link depth followed from the entry page
    pub max_depth: u32,

    /// Root directory the mirror is written under
    pub content_root: PathBuf,
}

impl CrawlConfig {
    /// Creates a configuration with the default worker count (10), depth (2)
    /// and content root (the current directory)
    pub fn new(base_url: &str, entry_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{base_url}: {e}")))?;

        // Canonicalize both URLs so the base-location prefix and the entry
        // task agree on trailing-slash and fragment handling.
        let base = crate::url::normalize(&parsed, base_url).map_err(invalid_url)?;
        let entry = crate::url::normalize(&base, entry_url).map_err(invalid_url)?;

        let config = Self {
            base_url: base,
            entry_url: entry,
            workers: 10,
            max_depth: 2,
            content_root: PathBuf::from("."),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Validation(
                "worker count must be at least 1".to_string(),
            ));
        }

        for (name, url) in [("base_url", &self.base_url), ("entry_url", &self.entry_url)] {
            if !crate::url::is_followable(url) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be an http(s) URL, got: {url}"
                )));
            }
        }

        Ok(())
    }

    /// Root directory for mirrored internal content
    pub fn internal_root(&self) -> PathBuf {
        self.content_root.join(INTERNAL_DIR)
    }

    /// Root directory for saved external resources
    pub fn external_root(&self) -> PathBuf {
        self.content_root.join(EXTERNAL_DIR)
    }

    /// Sets the content root, returning the updated configuration
    pub fn with_content_root(mut self, root: &Path) -> Self {
        self.content_root = root.to_path_buf();
        self
    }
}
