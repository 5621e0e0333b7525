//! Reference extraction and offline link rewriting
//!
//! Extraction collects the URLs a page references through a fixed set of
//! source-bearing elements. Rewriting replaces exactly those attributes with
//! local relative paths; it is structural (per element, per attribute), so a
//! URL string that happens to occur in script code, comments, or text is
//! never touched.

use lol_html::errors::RewritingError;
use lol_html::{element, HtmlRewriter, Settings};
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;

/// Elements that reference a resource through their `src` attribute
const SOURCE_ATTR_TAGS: &[&str] = &["img", "script", "video", "audio", "source", "embed", "iframe"];

/// Elements that reference a target through their `href` attribute
const TARGET_ATTR_TAGS: &[&str] = &["a", "link"];

/// Rewriting failure; callers degrade to "no save, no children"
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewrite failed: {0}")]
    Rewrite(#[from] RewritingError),

    #[error("rewritten document was not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Extracts the raw reference values from a page's source-bearing elements
///
/// Values are trimmed and empty references dropped; no resolution or
/// filtering beyond that happens here. Duplicates are preserved (the caller
/// deduplicates at the canonical-URL level).
pub fn extract_references(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut references = Vec::new();

    collect_attr_values(&document, SOURCE_ATTR_TAGS, "src", &mut references);
    collect_attr_values(&document, TARGET_ATTR_TAGS, "href", &mut references);

    references
}

fn collect_attr_values(document: &Html, tags: &[&str], attr: &str, out: &mut Vec<String>) {
    for tag in tags {
        let Ok(selector) = Selector::parse(&format!("{tag}[{attr}]")) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    out.push(value.to_string());
                }
            }
        }
    }
}

/// Rewrites the source-bearing attributes whose value appears in
/// `substitutions`, leaving everything else in the document as-is
///
/// Keys are raw attribute values as returned by [`extract_references`];
/// values are the local relative paths they map to.
pub fn rewrite_references(
    html: &str,
    substitutions: &HashMap<String, String>,
) -> Result<String, RewriteError> {
    let mut handlers = Vec::new();

    for (tags, attr) in [(SOURCE_ATTR_TAGS, "src"), (TARGET_ATTR_TAGS, "href")] {
        for tag in tags {
            let selector = format!("{tag}[{attr}]");
            handlers.push(element!(selector, move |el| {
                if let Some(value) = el.get_attribute(attr) {
                    if let Some(local) = lookup(substitutions, value.trim()) {
                        el.set_attribute(attr, local)?;
                    }
                }
                Ok(())
            }));
        }
    }

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter.write(html.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8(output)?)
}

/// Looks up a raw attribute value, tolerating the entity-encoded form the
/// streaming rewriter hands back (extraction sees decoded values)
fn lookup<'a>(substitutions: &'a HashMap<String, String>, value: &str) -> Option<&'a str> {
    if let Some(local) = substitutions.get(value) {
        return Some(local.as_str());
    }
    match decode_basic_entities(value) {
        Cow::Owned(decoded) => substitutions.get(&decoded).map(String::as_str),
        Cow::Borrowed(_) => None,
    }
}

/// Decodes the handful of named entities that legitimately occur in URL
/// attribute values (most commonly `&amp;` between query parameters)
fn decode_basic_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let decoded = value
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    if decoded == value {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(decoded)
    }
}
