//! Content classification and save-path resolution
//!
//! Given a canonical URL and its content-type, this module decides whether
//! the resource is saved at all and where it lands on disk:
//!
//! - Internal content (location under the crawl's base location) mirrors the
//!   site's structure under the internal root, with `.html` appended to
//!   HTML pages.
//! - External non-HTML content is flattened into the external root under a
//!   sanitized filename.
//! - External HTML is discovered but never mirrored.
//!
//! Candidate paths are derived from URLs, so they are confined to their
//! roots before use; a location that would escape (e.g. smuggled `..`
//! segments) resolves to "do not save".

pub mod paths;

use crate::url::location_of;
use std::path::{Path, PathBuf};
use url::Url;

/// The resolved decision of whether and where to persist a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDirective {
    /// Filesystem path the resource is saved to
    pub path: PathBuf,

    /// Whether the resource is an HTML page (link extraction + rewrite)
    pub is_html: bool,
}

/// Suffix appended to internal HTML save paths
const HTML_SUFFIX: &str = ".html";

/// Filename used when the entry page is the base location itself
const ROOT_PAGE_NAME: &str = "index";

/// Returns true if the content-type's essence is `text/html`
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .eq_ignore_ascii_case("text/html")
}

/// Classifies canonical URLs against the crawl's base location and resolves
/// their save paths
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_location: String,
    internal_root: PathBuf,
    external_root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for the subtree rooted at `base_url`
    pub fn new(base_url: &Url, internal_root: &Path, external_root: &Path) -> Self {
        Self {
            base_location: location_of(base_url),
            internal_root: internal_root.to_path_buf(),
            external_root: external_root.to_path_buf(),
        }
    }

    /// Resolves a canonical URL and content-type into a SaveDirective
    ///
    /// Returns `None` ("do not save") when the content-type is absent, the
    /// resource is external HTML, or the candidate path would escape its
    /// root.
    pub fn resolve(&self, url: &Url, content_type: Option<&str>) -> Option<SaveDirective> {
        let content_type = content_type?;
        self.resolve_location(&location_of(url), content_type)
    }

    fn resolve_location(&self, location: &str, content_type: &str) -> Option<SaveDirective> {
        let is_html = is_html_content_type(content_type);

        if let Some(rest) = location.strip_prefix(&self.base_location) {
            let mut relative = rest.trim_start_matches('/').to_string();
            if relative.is_empty() {
                relative = ROOT_PAGE_NAME.to_string();
            }
            if is_html {
                relative.push_str(HTML_SUFFIX);
            }

            let path = paths::confine(&self.internal_root, &relative)?;
            Some(SaveDirective { path, is_html })
        } else if !is_html {
            let name = paths::sanitize_filename(location);
            if name.is_empty() {
                return None;
            }
            let extension = paths::extension_from_location(location)
                .or_else(|| paths::extension_from_content_type(content_type))
                .unwrap_or_default();

            let path = self.external_root.join(format!("{name}{extension}"));
            Some(SaveDirective {
                path,
                is_html: false,
            })
        } else {
            // External HTML pages are discovered but never mirrored.
            None
        }
    }
}
