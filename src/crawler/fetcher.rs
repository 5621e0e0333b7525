//! HTTP fetcher
//!
//! This module owns all network access for the crawler:
//! - Building the shared HTTP client
//! - GET requests for full bodies
//! - HEAD requests to obtain a content-type without the body
//! - Classifying transport failures into an explicit error type
//!
//! Every failure here is soft from the pool's point of view: callers log it
//! and treat the task as producing no save and no children.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A classified transport failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("connection failed: {url}")]
    Connect { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },
}

impl FetchError {
    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Builds the HTTP client shared by all workers
///
/// The client is safe for concurrent use and is the only piece of network
/// state in the crawl. Redirects follow reqwest's default policy.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("kagami/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs a full GET of `url`, returning the response with its body
/// still unread so callers can stream it
pub async fn fetch_page(client: &Client, url: &Url) -> Result<Response, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Performs a metadata-only HEAD request and returns the content-type, if
/// the server sent one
pub async fn fetch_content_type(client: &Client, url: &Url) -> Result<Option<String>, FetchError> {
    let response = client
        .head(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(content_type_of(response.headers()))
}

/// Extracts the content-type header value, if present and readable
pub fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client().is_ok());
    }

    #[test]
    fn test_content_type_present() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        assert_eq!(
            content_type_of(&headers),
            Some("text/html; charset=utf-8".to_string())
        );
    }

    #[test]
    fn test_content_type_absent() {
        assert_eq!(content_type_of(&HeaderMap::new()), None);
    }
}
