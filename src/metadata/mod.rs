//! Plugin and theme header parsing
//!
//! WordPress packages declare their requirements as `Label: value` lines,
//! in `readme.txt` for plugins and in the `style.css` comment block for
//! themes. Extraction scans the whole text; a missing field is an empty
//! string, never an error.

mod readme;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::package::PackageKind;

pub use readme::{HEADER_REGION_LINES, strip_header_lines};

/// Header map keys, lowercased as they are written in readme files
pub const REQUIRES_AT_LEAST: &str = "requires at least";
pub const TESTED_UP_TO: &str = "tested up to";
pub const REQUIRES_PHP: &str = "requires php";
pub const STABLE_TAG: &str = "stable tag";
pub const VERSION: &str = "version";

/// Where the header lines come from; decides what may precede a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSource {
    /// `readme.txt`: label at line start, optional indentation
    Readme,
    /// `style.css` or a PHP file header: label may follow comment markers
    FileHeader,
}

impl HeaderSource {
    fn line_prefix(&self) -> &'static str {
        match self {
            HeaderSource::Readme => r"[ \t]*",
            HeaderSource::FileHeader => r"[ \t/*#@]*",
        }
    }
}

/// Extracted package headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageHeaders {
    #[serde(default)]
    pub requires_at_least: String,
    #[serde(default)]
    pub tested_up_to: String,
    #[serde(default)]
    pub requires_php: String,
    #[serde(default)]
    pub stable_tag: String,
    #[serde(default)]
    pub version: String,
}

static README_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| compile_patterns(HeaderSource::Readme));

static FILE_HEADER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| compile_patterns(HeaderSource::FileHeader));

static COMMENT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:\*/|\?>).*").expect("static regex"));

fn label_pattern(label: &str, source: HeaderSource) -> String {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    format!(
        r"(?mi)^{}{}[ \t]*:[ \t]*(.*)$",
        source.line_prefix(),
        words.join(r"[ \t]+")
    )
}

fn compile_patterns(source: HeaderSource) -> Vec<(&'static str, Regex)> {
    [REQUIRES_AT_LEAST, TESTED_UP_TO, REQUIRES_PHP, STABLE_TAG, VERSION]
        .into_iter()
        .map(|label| {
            let re = Regex::new(&label_pattern(label, source)).expect("static regex");
            (label, re)
        })
        .collect()
}

fn first_value(re: &Regex, text: &str, source: HeaderSource) -> String {
    for caps in re.captures_iter(text) {
        let mut value = caps[1].trim().to_string();
        if source == HeaderSource::FileHeader {
            value = COMMENT_CLOSE.replace(&value, "").trim().to_string();
        }
        if !value.is_empty() {
            return value;
        }
    }
    String::new()
}

impl PackageHeaders {
    /// Parse headers from text.
    pub fn parse(text: &str, source: HeaderSource) -> Self {
        let patterns = match source {
            HeaderSource::Readme => &*README_PATTERNS,
            HeaderSource::FileHeader => &*FILE_HEADER_PATTERNS,
        };

        let mut headers = PackageHeaders::default();
        for (label, re) in patterns {
            let value = first_value(re, text, source);
            match *label {
                REQUIRES_AT_LEAST => headers.requires_at_least = value,
                TESTED_UP_TO => headers.tested_up_to = value,
                REQUIRES_PHP => headers.requires_php = value,
                STABLE_TAG => headers.stable_tag = value,
                _ => headers.version = value,
            }
        }
        headers
    }

    /// The declared release: `Stable tag`, else `Version`.
    pub fn release_version(&self) -> &str {
        if self.stable_tag.is_empty() {
            &self.version
        } else {
            &self.stable_tag
        }
    }

    /// The version a package of `kind` must declare: `Stable tag` for
    /// plugins, `Version` for themes.
    pub fn declared_version(&self, kind: PackageKind) -> &str {
        match kind {
            PackageKind::Plugin => &self.stable_tag,
            PackageKind::Theme => &self.version,
        }
    }

    /// True when no field was found
    pub fn is_empty(&self) -> bool {
        self.requires_at_least.is_empty()
            && self.tested_up_to.is_empty()
            && self.requires_php.is_empty()
            && self.stable_tag.is_empty()
            && self.version.is_empty()
    }

    /// Header map keyed by lowercased label, as shown to users.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (REQUIRES_AT_LEAST.to_string(), self.requires_at_least.clone()),
            (TESTED_UP_TO.to_string(), self.tested_up_to.clone()),
            (REQUIRES_PHP.to_string(), self.requires_php.clone()),
            (STABLE_TAG.to_string(), self.stable_tag.clone()),
            (VERSION.to_string(), self.version.clone()),
        ])
    }
}

/// Headers from a plugin `readme.txt`
pub fn extract_readme_headers(text: &str) -> PackageHeaders {
    PackageHeaders::parse(text, HeaderSource::Readme)
}

/// Headers from a theme `style.css`
pub fn extract_style_headers(text: &str) -> PackageHeaders {
    PackageHeaders::parse(text, HeaderSource::FileHeader)
}

/// A single file-header field (`Plugin Name`, `Theme Name`, `Author`, ...).
///
/// Only the first 8 KiB are scanned, like WordPress does for plugin files.
pub fn file_header(text: &str, label: &str) -> Option<String> {
    let mut end = text.len().min(8 * 1024);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let re = Regex::new(&label_pattern(label, HeaderSource::FileHeader)).ok()?;
    let value = first_value(&re, &text[..end], HeaderSource::FileHeader);
    (!value.is_empty()).then_some(value)
}
