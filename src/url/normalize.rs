use crate::UrlError;
use url::Url;

/// Normalizes a raw reference into Kagami's canonical URL form
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` per standard URL-resolution rules
///    (relative paths, protocol-relative `//host/..`, absolute URLs)
/// 2. Strip trailing `/` from the path (the root path `/` is kept)
/// 3. Remove the fragment (everything after `#`)
/// 4. Leave the query string intact
///
/// The result is idempotent: normalizing a canonical URL again returns the
/// same URL.
///
/// # Arguments
///
/// * `base` - The URL the reference was found on
/// * `raw` - The reference as written (href/src attribute value)
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - The reference cannot be resolved; callers must treat
///   it as non-followable
///
/// # Examples
///
/// ```
/// use kagami::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("http://example.com/docs/intro").unwrap();
/// let url = normalize(&base, "../guide/#setup").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/guide");
/// ```
pub fn normalize(base: &Url, raw: &str) -> Result<Url, UrlError> {
    let mut url = base
        .join(raw.trim())
        .map_err(|e| UrlError::Parse(format!("{raw}: {e}")))?;

    // Opaque-path URLs (mailto:, data:, ...) cannot be followed and do not
    // take path edits; hand them back for the caller's scheme check.
    if url.cannot_be_a_base() {
        return Ok(url);
    }

    // Strip trailing slashes; repeated so that re-normalizing the
    // serialized form cannot produce a different result.
    while url.path().len() > 1 && url.path().ends_with('/') {
        let trimmed = url.path()[..url.path().len() - 1].to_string();
        url.set_path(&trimmed);
    }

    url.set_fragment(None);

    Ok(url)
}
