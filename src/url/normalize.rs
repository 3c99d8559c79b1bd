use crate::UrlError;
use url::Url;

/// Scheme assumed for URLs written without one (e.g. `example.com/page`)
const DEFAULT_SCHEME: &str = "http://";

/// Normalizes a URL into the form used as a fetch and dedup key
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Prepend `http://` when no scheme is present
/// 3. Parse the URL; reject if malformed, not HTTP(S), or hostless
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment and query string
///
/// # Examples
///
/// ```
/// use sumi_search::url::normalize_url;
///
/// let url = normalize_url("  EXAMPLE.COM/news/?page=2#top ").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/news");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, trimmed)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);
    url.set_query(None);

    Ok(url)
}

/// Normalizes a site root URL into its canonical stored form
///
/// The canonical form carries no trailing slash, so `https://example.com/`
/// and `https://example.com` identify the same site.
pub fn canonical_site_url(url_str: &str) -> Result<String, UrlError> {
    let url = normalize_url(url_str)?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    format!("/{}", normalized_segments.join("/"))
}
