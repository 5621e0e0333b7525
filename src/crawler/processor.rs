//! Page processing
//!
//! A worker hands the processor one task: fetch the URL, decide what the
//! body is, and either
//! - mirror an HTML page: extract its references, resolve where each one
//!   would be saved, rewrite them to local relative paths, write the page,
//!   and report the discovered children, or
//! - stream a non-HTML body to disk chunk by chunk (no link discovery).
//!
//! All failures here are soft: logged, then treated as "no save, no
//! children". Nothing the processor does can abort the pool.

use crate::crawler::fetcher::{self, FetchError};
use crate::crawler::html;
use crate::resolve::{is_html_content_type, paths, PathResolver};
use crate::url::{is_followable, normalize};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

/// A reference discovered on a page that resolved to a save location
#[derive(Debug, Clone)]
pub struct DiscoveredChild {
    /// Canonical URL of the referenced resource
    pub url: Url,

    /// Where the resource will be saved when its task is processed
    pub save_path: PathBuf,

    /// Whether the resource is an HTML page (drives depth accounting)
    pub is_html: bool,
}

/// What processing one task did
#[derive(Debug)]
pub enum PageOutcome {
    /// An HTML page was rewritten and saved; its references are reported
    SavedHtml { children: Vec<DiscoveredChild> },

    /// A non-HTML body was streamed to disk
    SavedAsset,

    /// Nothing to do: no content-type, or the resource resolves to
    /// "do not save"
    Skipped,

    /// A transport, rewrite, or filesystem failure; logged and absorbed
    Failed,
}

/// Fetches and mirrors individual resources
pub struct PageProcessor {
    client: Client,
    resolver: PathResolver,
}

impl PageProcessor {
    pub fn new(client: Client, resolver: PathResolver) -> Self {
        Self { client, resolver }
    }

    /// Processes one URL
    ///
    /// `save_path` is the location the task's creator resolved for it; the
    /// entry task has none and is resolved here from the fetched
    /// content-type.
    pub async fn process(&self, url: &Url, save_path: Option<&Path>) -> PageOutcome {
        let response = match fetcher::fetch_page(&self.client, url).await {
            Ok(response) => response,
            Err(error) => {
                warn_fetch(url, &error);
                return PageOutcome::Failed;
            }
        };

        let Some(content_type) = fetcher::content_type_of(response.headers()) else {
            tracing::debug!(url = %url, "response carried no content-type, skipping");
            return PageOutcome::Skipped;
        };

        let save_path = match save_path {
            Some(path) => path.to_path_buf(),
            None => match self.resolver.resolve(url, Some(&content_type)) {
                Some(directive) => directive.path,
                None => {
                    tracing::debug!(url = %url, "resource resolves to no save location");
                    return PageOutcome::Skipped;
                }
            },
        };

        if is_html_content_type(&content_type) {
            self.mirror_page(url, &save_path, response).await
        } else {
            self.stream_asset(url, &save_path, response).await
        }
    }

    /// Mirrors one HTML page: discover children, rewrite references to
    /// local relative paths, write the result
    async fn mirror_page(&self, url: &Url, save_path: &Path, response: Response) -> PageOutcome {
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "failed to read page body");
                return PageOutcome::Failed;
            }
        };

        let page_dir = save_path.parent().unwrap_or(Path::new("")).to_path_buf();

        let mut children = Vec::new();
        // Per-page dedup: canonical URL -> local relative path (None when
        // the reference resolved to "do not save" or its metadata fetch
        // failed).
        let mut resolved: HashMap<String, Option<String>> = HashMap::new();
        // Raw attribute value -> local relative path, for the rewriter.
        let mut substitutions: HashMap<String, String> = HashMap::new();

        for raw in html::extract_references(&body) {
            let Ok(child_url) = normalize(url, &raw) else {
                continue;
            };
            if !is_followable(&child_url) {
                continue;
            }

            let key = child_url.to_string();
            let local = match resolved.get(&key).cloned() {
                Some(cached) => cached,
                None => {
                    let local = self.resolve_child(&child_url, &page_dir, &mut children).await;
                    resolved.insert(key, local.clone());
                    local
                }
            };

            if let Some(local) = local {
                substitutions.insert(raw, local);
            }
        }

        let rewritten = match html::rewrite_references(&body, &substitutions) {
            Ok(rewritten) => rewritten,
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "reference rewrite failed");
                return PageOutcome::Failed;
            }
        };

        if let Err(error) = write_file(save_path, rewritten.as_bytes()).await {
            tracing::warn!(url = %url, path = %save_path.display(), error = %error, "failed to write page");
            return PageOutcome::Failed;
        }

        tracing::debug!(
            url = %url,
            path = %save_path.display(),
            children = children.len(),
            "page mirrored"
        );
        PageOutcome::SavedHtml { children }
    }

    /// Resolves one referenced URL: metadata fetch, save directive, local
    /// relative path; records the child when a directive is returned
    async fn resolve_child(
        &self,
        child_url: &Url,
        page_dir: &Path,
        children: &mut Vec<DiscoveredChild>,
    ) -> Option<String> {
        let content_type = match fetcher::fetch_content_type(&self.client, child_url).await {
            Ok(content_type) => content_type,
            Err(error) => {
                tracing::debug!(url = %child_url, error = %error, "metadata fetch failed, dropping reference");
                return None;
            }
        };

        let directive = self.resolver.resolve(child_url, content_type.as_deref())?;
        let local = paths::relative_from(page_dir, &directive.path)
            .to_string_lossy()
            .into_owned();

        children.push(DiscoveredChild {
            url: child_url.clone(),
            save_path: directive.path,
            is_html: directive.is_html,
        });

        Some(local)
    }

    /// Streams a non-HTML body to disk in chunks
    async fn stream_asset(&self, url: &Url, save_path: &Path, mut response: Response) -> PageOutcome {
        let mut file = match create_file(save_path).await {
            Ok(file) => file,
            Err(error) => {
                tracing::warn!(url = %url, path = %save_path.display(), error = %error, "failed to create file");
                return PageOutcome::Failed;
            }
        };

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(error) = file.write_all(&chunk).await {
                        tracing::warn!(url = %url, error = %error, "failed to write chunk");
                        return PageOutcome::Failed;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!(url = %url, error = %error, "body stream failed");
                    return PageOutcome::Failed;
                }
            }
        }

        if let Err(error) = file.flush().await {
            tracing::warn!(url = %url, error = %error, "failed to flush file");
            return PageOutcome::Failed;
        }

        tracing::debug!(url = %url, path = %save_path.display(), "asset saved");
        PageOutcome::SavedAsset
    }
}

fn warn_fetch(url: &Url, error: &FetchError) {
    tracing::warn!(url = %url, error = %error, "fetch failed");
}

async fn create_file(path: &Path) -> std::io::Result<tokio::fs::File> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::File::create(path).await
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
