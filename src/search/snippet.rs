//! Result snippet generation
//!
//! A snippet is a window of the page text around the first query word
//! occurrence, widened to whole words, with every query word occurrence
//! wrapped in `<b>` tags.

use regex::{Regex, RegexBuilder};

const ELLIPSIS: &str = "...";

/// Builds a case-insensitive matcher for any of `words`
///
/// Longer words come first so that the longest alternative wins at a
/// given position.
fn words_matcher(words: &[String]) -> Option<Regex> {
    let mut words: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }

    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    words.dedup();

    let pattern = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");

    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("Cannot build snippet matcher: {}", e);
            None
        }
    }
}

/// Generates a snippet of about `length` characters
///
/// # Arguments
///
/// * `text` - Visible page text with whitespace already collapsed
/// * `words` - Query words and lemmas to look for
/// * `length` - Target window length in characters
///
/// # Example
///
/// ```
/// use sumi_search::search::build_snippet;
///
/// let snippet = build_snippet("the quick brown fox", &["quick".to_string()], 200);
/// assert_eq!(snippet, "the <b>quick</b> brown fox");
/// ```
pub fn build_snippet(text: &str, words: &[String], length: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let matcher = words_matcher(words);

    // Byte offset of each char, plus the end of the text
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = offsets.len();
    offsets.push(text.len());
    let chars: Vec<char> = text.chars().collect();

    let anchor = matcher
        .as_ref()
        .and_then(|m| m.find(text))
        .map(|m| text[..m.start()].chars().count())
        .unwrap_or(0);

    let mut start = anchor.saturating_sub(length / 2);
    let mut end = (start + length).min(char_count);

    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    while end < char_count && !chars[end].is_whitespace() {
        end += 1;
    }

    let window = &text[offsets[start]..offsets[end]];
    let highlighted = match &matcher {
        Some(matcher) => matcher.replace_all(window, "<b>$0</b>").into_owned(),
        None => window.to_string(),
    };

    let mut snippet = String::with_capacity(highlighted.len() + 2 * ELLIPSIS.len());
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.push_str(&highlighted);
    if end < char_count {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}
