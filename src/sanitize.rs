//! HTML sanitizing for remote content
//!
//! Readme HTML and release notes come from arbitrary repositories. Before any
//! of it is cached or handed to the host it passes through an allow-list:
//! unknown tags are dropped (their text kept), script-like elements are
//! dropped with their content, and only inert attributes survive.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Sanitizer collaborator; hosts may substitute their own.
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

const DEFAULT_TAGS: &[&str] = &[
    "a",
    "abbr",
    "article",
    "b",
    "blockquote",
    "br",
    "caption",
    "cite",
    "code",
    "col",
    "colgroup",
    "dd",
    "del",
    "details",
    "div",
    "dl",
    "dt",
    "em",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "i",
    "img",
    "ins",
    "kbd",
    "li",
    "mark",
    "ol",
    "p",
    "pre",
    "q",
    "s",
    "section",
    "small",
    "span",
    "strong",
    "sub",
    "summary",
    "sup",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "u",
    "ul",
];

const DEFAULT_ATTRIBUTES: &[&str] = &[
    "align", "alt", "class", "colspan", "datetime", "dir", "height", "href", "id", "lang", "name",
    "open", "rel", "rowspan", "src", "start", "target", "title", "width",
];

/// Elements removed together with everything inside them
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "svg", "math",
];

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));

static DROPPED_ELEMENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DROP_WITH_CONTENT
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("static regex")
        })
        .collect()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(/?)([A-Za-z][A-Za-z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("static regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("static regex")
});

/// Tag and attribute allow-list sanitizer
#[derive(Debug, Clone)]
pub struct AllowListSanitizer {
    tags: HashSet<String>,
    attributes: HashSet<String>,
}

impl Default for AllowListSanitizer {
    fn default() -> Self {
        Self {
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            attributes: DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl AllowListSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow an extra tag.
    pub fn allow_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_ascii_lowercase());
        self
    }

    /// Allow an extra attribute on every allowed tag.
    pub fn allow_attribute(mut self, attr: &str) -> Self {
        self.attributes.insert(attr.to_ascii_lowercase());
        self
    }

    fn rewrite_tag(&self, caps: &Captures<'_>) -> String {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        if !self.tags.contains(&name) {
            return String::new();
        }
        if closing {
            return format!("</{}>", name);
        }

        let raw_attrs = caps.get(3).map_or("", |m| m.as_str());
        let self_closing = raw_attrs.trim_end().ends_with('/');

        let mut out = format!("<{}", name);
        for attr in ATTRIBUTE.captures_iter(raw_attrs) {
            let attr_name = attr[1].to_ascii_lowercase();
            if attr_name.starts_with("on") || !self.attributes.contains(&attr_name) {
                continue;
            }
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());
            if (attr_name == "href" || attr_name == "src") && !is_safe_url(value) {
                continue;
            }
            out.push(' ');
            out.push_str(&attr_name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        if self_closing {
            out.push_str(" /");
        }
        out.push('>');
        out
    }
}

impl HtmlSanitizer for AllowListSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let mut cleaned = COMMENT.replace_all(html, "").into_owned();
        for element in DROPPED_ELEMENTS.iter() {
            cleaned = element.replace_all(&cleaned, "").into_owned();
        }
        TAG.replace_all(&cleaned, |caps: &Captures<'_>| self.rewrite_tag(caps))
            .into_owned()
    }
}

/// Relative URLs and http(s)/mailto links are allowed; any other scheme is not.
fn is_safe_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.find(':') {
        None => true,
        Some(colon) => {
            // A colon after the first path/query/fragment delimiter is not a scheme
            if normalized[..colon].contains(['/', '?', '#']) {
                return true;
            }
            matches!(&normalized[..colon], "http" | "https" | "mailto")
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
