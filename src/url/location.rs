use url::{Position, Url};

/// Derives the location key used for visit deduplication
///
/// The location is the canonical URL with the scheme removed:
/// `host[:port]/path[?query]`. Two canonical URLs that differ only by
/// scheme collapse to the same location, so `http://h/p` and `https://h/p`
/// are visited at most once between them.
///
/// # Examples
///
/// ```
/// use kagami::url::location_of;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/docs?page=2").unwrap();
/// assert_eq!(location_of(&url), "example.com/docs?page=2");
/// ```
pub fn location_of(url: &Url) -> String {
    url[Position::BeforeHost..Position::AfterQuery].to_string()
}

/// Returns true if the URL is one the crawler may follow
///
/// Only plain HTTP(S) URLs are followable; everything else (mailto:, data:,
/// javascript:, ftp:, and unresolvable references) is dropped by callers.
pub fn is_followable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
