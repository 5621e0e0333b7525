//! Kagami: an offline website mirrorer
//!
//! This crate mirrors a website subtree to local storage, following links up
//! to a bounded depth and rewriting references so the saved copy browses
//! without network access.

pub mod config;
pub mod crawler;
pub mod resolve;
pub mod url;

use thiserror::Error;

/// Main error type for Kagami operations
#[derive(Debug, Error)]
pub enum KagamiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for Kagami operations
pub type Result<T> = std::result::Result<T, KagamiError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawler::{CrawlEngine, CrawlSummary};
pub use resolve::{PathResolver, SaveDirective};
pub use url::{is_followable, location_of, normalize};
