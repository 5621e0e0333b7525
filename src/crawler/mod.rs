//! Crawler module for Kagami
//!
//! This module contains the crawl machinery:
//! - HTTP fetching (shared client, GET/HEAD, failure classification)
//! - Reference extraction and offline link rewriting
//! - Page processing (mirror HTML, stream assets)
//! - The frontier and worker pool that drain the crawl

pub mod fetcher;
pub mod html;
pub mod pool;
pub mod processor;

// Re-export main types and functions
pub use fetcher::{build_http_client, fetch_content_type, fetch_page, FetchError};
pub use html::{extract_references, rewrite_references};
pub use pool::{CrawlEngine, CrawlSummary, CrawlTask};
pub use processor::{DiscoveredChild, PageOutcome, PageProcessor};
