//! Changelog HTML fragment built from releases

use crate::client::models::ChangelogEntry;
use crate::sanitize::{HtmlSanitizer, escape_html};

/// Render releases as a `<ul>` fragment, newest first as given.
///
/// Release notes go through `sanitizer`; versions, titles and links are
/// escaped.
pub fn render_changelog(entries: &[ChangelogEntry], sanitizer: &dyn HtmlSanitizer) -> String {
    let mut html = String::from("<ul class=\"repopress-changelog\">");
    for entry in entries {
        html.push_str("<li>");

        html.push_str("<h4>");
        html.push_str(&escape_html(&entry.version));
        if !entry.title.is_empty() {
            html.push_str(" (");
            html.push_str(&escape_html(&entry.title));
            html.push(')');
        }
        html.push_str("</h4>");

        if let Some(date) = entry.date {
            html.push_str("<p><strong>Released:</strong> ");
            html.push_str(&date.format("%B %-d, %Y %H:%M").to_string());
            html.push_str("</p>");
        }

        let notes = sanitizer.sanitize(entry.description.trim());
        if !notes.is_empty() {
            html.push_str("<p>");
            html.push_str(&nl2br(&notes));
            html.push_str("</p>");
        }

        if !entry.url.is_empty() {
            html.push_str("<p><a href=\"");
            html.push_str(&escape_html(&entry.url));
            html.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">View on GitHub</a></p>");
        }

        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

fn nl2br(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "<br />\n")
}
