//! Extract fields from a repository's public web page
//!
//! The REST API has no og:image, and search items carry no watcher count, so
//! these are scraped from the page HTML as a best-effort fallback.

use std::sync::LazyLock;

use regex::Regex;

static OG_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta property="og:image" content="([^"]+)""#).expect("static regex")
});

static WATCHERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<strong>(\d+)</strong>\s+watching").expect("static regex"));

static LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="color-fg-default text-bold mr-1">([A-Za-z]+)</span>"#)
        .expect("static regex")
});

/// Social preview image URL
pub fn extract_og_image(html: &str) -> Option<String> {
    OG_IMAGE
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
}

/// Watcher count from the "N watching" link
pub fn extract_watchers(html: &str) -> Option<u64> {
    WATCHERS.captures(html).and_then(|c| c[1].parse().ok())
}

/// Primary language from the languages sidebar
pub fn extract_primary_language(html: &str) -> Option<String> {
    LANGUAGE.captures(html).map(|c| c[1].to_string())
}

/// og:image, or `avatar_url` when the page has none
pub fn og_image_or_avatar(html: Option<&str>, avatar_url: &str) -> Option<String> {
    html.and_then(extract_og_image).or_else(|| {
        if avatar_url.is_empty() {
            None
        } else {
            Some(avatar_url.to_string())
        }
    })
}
