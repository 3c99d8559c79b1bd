//! URL handling module for Sumi-Search
//!
//! This module provides URL normalization, host extraction, and the mapping
//! from an absolute page URL to its path relative to a site root.

mod domain;
mod normalize;

use crate::UrlError;

// Re-export main functions
pub use domain::{extract_domain, site_host};
pub use normalize::{canonical_site_url, normalize_url};

/// Path of `url` relative to the site rooted at `site_url`
///
/// Both URLs are normalized first, so the result never carries a fragment or
/// query string and always starts with `/`. The scheme and a leading `www.`
/// are ignored when matching; the port is not.
///
/// # Errors
///
/// * `UrlError::OutsideSite` - `url` does not live under `site_url`
/// * Any normalization error of either URL
///
/// # Examples
///
/// ```
/// use sumi_search::url::site_relative_path;
///
/// let path = site_relative_path("https://example.com/docs/intro?x=1", "https://example.com/docs").unwrap();
/// assert_eq!(path, "/intro");
/// ```
pub fn site_relative_path(url: &str, site_url: &str) -> Result<String, UrlError> {
    let page = normalize_url(url)?;
    let site = normalize_url(site_url)?;

    let outside = || UrlError::OutsideSite {
        url: url.to_string(),
        site: site_url.to_string(),
    };

    if site_host(&page) != site_host(&site) || page.port() != site.port() {
        return Err(outside());
    }

    let prefix = site.path().trim_end_matches('/');
    let rest = page.path().strip_prefix(prefix).ok_or_else(outside)?;

    if rest.is_empty() {
        return Ok("/".to_string());
    }
    if !rest.starts_with('/') {
        // "/docs-old" is not under "/docs"
        return Err(outside());
    }

    Ok(rest.to_string())
}

/// Like [`site_relative_path`] but falls back to the root path
///
/// Out-of-site and malformed URLs map to `/`, matching the permissive
/// failure policy of the indexer.
pub fn site_relative_path_or_root(url: &str, site_url: &str) -> String {
    match site_relative_path(url, site_url) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("Falling back to root path: {}", e);
            "/".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_of_root() {
        assert_eq!(
            site_relative_path("https://example.com", "https://example.com").unwrap(),
            "/"
        );
        assert_eq!(
            site_relative_path("https://example.com/", "https://example.com").unwrap(),
            "/"
        );
    }

    #[test]
    fn test_relative_path_strips_query_and_fragment() {
        assert_eq!(
            site_relative_path("https://example.com/news/1?ref=x#top", "https://example.com")
                .unwrap(),
            "/news/1"
        );
    }

    #[test]
    fn test_relative_path_ignores_scheme_and_www() {
        assert_eq!(
            site_relative_path("http://www.example.com/about", "https://example.com").unwrap(),
            "/about"
        );
    }

    #[test]
    fn test_relative_path_under_site_prefix() {
        assert_eq!(
            site_relative_path("https://example.com/docs/a/b", "https://example.com/docs/")
                .unwrap(),
            "/a/b"
        );
    }

    #[test]
    fn test_outside_site() {
        let result = site_relative_path("https://other.com/page", "https://example.com");
        assert!(matches!(result, Err(UrlError::OutsideSite { .. })));

        let result = site_relative_path("https://example.com/docs-old", "https://example.com/docs");
        assert!(matches!(result, Err(UrlError::OutsideSite { .. })));

        let result = site_relative_path("https://example.com:8080/", "https://example.com");
        assert!(matches!(result, Err(UrlError::OutsideSite { .. })));
    }

    #[test]
    fn test_root_fallback() {
        assert_eq!(
            site_relative_path_or_root("https://other.com/page", "https://example.com"),
            "/"
        );
        assert_eq!(
            site_relative_path_or_root("https://example.com/page", "https://example.com"),
            "/page"
        );
    }
}
