//! Text helpers for turning upstream markup into display text

use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;
use url::Url;

const ELLIPSIS: char = '…';

/// Upper bound on the raw markup considered for a description
const RAW_DESCRIPTION_LIMIT: usize = 1000;

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\s+").unwrap_or_else(|err| panic!("invalid whitespace regex: {err}"))
    })
}

/// Truncates a string to at most `max` characters
///
/// # Returns
///
/// The truncated string and whether anything was cut off
pub fn limit_chars(s: &str, max: usize) -> (String, bool) {
    match s.char_indices().nth(max) {
        Some((cut, _)) => (s[..cut].to_string(), true),
        None => (s.to_string(), false),
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(s: &str) -> String {
    whitespace_pattern().replace_all(s, " ").trim().to_string()
}

/// Flattens an HTML fragment to plain text
///
/// Tags are dropped and entities decoded; whitespace is left as found.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect()
}

/// Sanitizes a feed description to a single line of plain text
pub fn sanitize_description(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }

    collapse_whitespace(&html_to_text(description))
}

/// Sanitizes a description and shortens it to `max` characters, appending "…" when cut
pub fn shorten_description(description: &str, max: usize) -> String {
    let (raw, _) = limit_chars(description, RAW_DESCRIPTION_LIMIT);
    let (mut shortened, limited) = limit_chars(&sanitize_description(&raw), max);

    if limited {
        shortened.push(ELLIPSIS);
    }

    shortened
}

/// Builds a single-line title of at most `max` characters, ending in "…" when cut
pub fn one_line_title(text: &str, max: usize) -> String {
    let line = collapse_whitespace(text);

    if line.chars().count() <= max {
        return line;
    }

    let (mut title, _) = limit_chars(&line, max.saturating_sub(1));
    title.push(ELLIPSIS);
    title
}

/// Extracts the lowercase host of a URL without a leading `www.`
///
/// # Examples
///
/// ```
/// use pulse_feeds::sources::text::extract_domain;
///
/// assert_eq!(extract_domain("https://www.Example.com/post"), "example.com");
/// assert_eq!(extract_domain(""), "");
/// ```
pub fn extract_domain(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
        .map(|host| host.trim_start_matches("www.").to_string())
        .unwrap_or_default()
}

/// Normalizes a release version to a lowercase `v`-prefixed form
pub fn normalize_version(version: &str) -> String {
    let version = version.trim().to_lowercase();

    if !version.is_empty() && !version.starts_with('v') {
        format!("v{}", version)
    } else {
        version
    }
}
