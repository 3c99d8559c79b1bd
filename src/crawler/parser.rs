//! HTML parser for extracting links and text
//!
//! This module handles parsing HTML content to extract:
//! - Same-host links to follow (from <a> tags)
//! - Page title
//! - Visible page text for lemmatization and snippets

use crate::url::normalize_url;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

/// Path extensions that never point at an HTML page
const NON_HTML_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "rtf", "txt", "csv", "xml",
    "json", "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "tif", "tiff", "mp3",
    "mp4", "avi", "mov", "wmv", "webm", "ogg", "wav", "zip", "rar", "7z", "gz", "tar", "bz2",
    "exe", "msi", "dmg", "apk", "iso", "css", "js", "woff", "woff2", "ttf", "eot",
];

/// Elements whose text is never shown to a reader
const INVISIBLE_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Extracts the same-host links of a page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` whose resolved host equals the host of `base_url`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - URLs carrying a fragment
/// - Paths ending in a non-HTML extension (documents, archives, images)
/// - Anything that fails to parse
///
/// Links are returned normalized (no query string, no trailing slash).
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the page was fetched from
///
/// # Example
///
/// ```
/// use sumi_search::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url);
/// assert!(links.contains("https://example.com/page"));
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> HashSet<String> {
    let document = Html::parse_document(html);
    let mut links = HashSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.insert(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;

    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    if absolute_url.fragment().is_some() {
        return None;
    }
    if absolute_url.host_str() != base_url.host_str()
        || absolute_url.port_or_known_default() != base_url.port_or_known_default()
    {
        return None;
    }
    if has_non_html_extension(absolute_url.path()) {
        return None;
    }

    normalize_url(absolute_url.as_str())
        .ok()
        .map(|url| url.to_string())
}

fn has_non_html_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            NON_HTML_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}

/// Extracts the trimmed `<title>` text, or an empty string
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);

    Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        })
        .unwrap_or_default()
}

/// Extracts the visible text of a document
///
/// Text inside `<head>`, `<script>`, `<style>`, `<noscript>` and
/// `<template>` is dropped. Whitespace runs collapse to a single space.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut pieces: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |element| INVISIBLE_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            pieces.push(text);
        }
    }

    collapse_whitespace(&pieces.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
