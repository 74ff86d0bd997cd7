//! Minimal HTML rendering for newsletter emails.
//!
//! The generated body is Markdown-shaped; email clients want HTML. This
//! renderer covers exactly the constructs the composer instructs the
//! backend to produce (headings, bullets, paragraphs, inline links) and
//! escapes everything else. Anything fancier belongs in a template
//! service, not here.

use serde_json::Value;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

/// Render a full newsletter email: title, body, curated reading list.
///
/// `curated_items` is the draft's stored JSON list; entries missing a
/// title or URL are skipped rather than rendered half-empty.
#[must_use]
pub fn render_email_html(title: &str, body_markdown: &str, curated_items: &Value) -> String {
    let mut html = String::new();
    html.push_str("<html><body style=\"font-family: sans-serif; max-width: 640px; margin: 0 auto;\">\n");
    let _ = writeln!(html, "<h1>{}</h1>", escape_html(title));
    html.push_str(&render_markdown_body(body_markdown));
    html.push_str(&render_curated_list(curated_items));
    html.push_str("</body></html>\n");
    html
}

fn render_markdown_body(body: &str) -> String {
    let mut html = String::new();
    let mut in_list = false;

    for line in body.lines() {
        let line = line.trim_end();
        let trimmed = line.trim_start();

        if let Some(rest) = trimmed.strip_prefix("- ") {
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            let _ = writeln!(html, "<li>{}</li>", render_inline(rest));
            continue;
        }
        if in_list {
            html.push_str("</ul>\n");
            in_list = false;
        }

        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("### ") {
            let _ = writeln!(html, "<h3>{}</h3>", render_inline(rest));
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            let _ = writeln!(html, "<h2>{}</h2>", render_inline(rest));
        } else if let Some(rest) = trimmed.strip_prefix("# ") {
            let _ = writeln!(html, "<h2>{}</h2>", render_inline(rest));
        } else {
            let _ = writeln!(html, "<p>{}</p>", render_inline(trimmed));
        }
    }
    if in_list {
        html.push_str("</ul>\n");
    }

    html
}

/// Inline rendering: escape first, then rebuild `[text](url)` links and
/// `**bold**` spans from the escaped form.
fn render_inline(text: &str) -> String {
    static LINK: OnceLock<Regex> = OnceLock::new();
    static BOLD: OnceLock<Regex> = OnceLock::new();
    let link = LINK.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"));
    let bold = BOLD.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));

    let escaped = escape_html(text);
    let linked = link.replace_all(&escaped, "<a href=\"$2\">$1</a>");
    bold.replace_all(&linked, "<strong>$1</strong>").into_owned()
}

fn render_curated_list(curated_items: &Value) -> String {
    let Some(items) = curated_items.as_array() else {
        return String::new();
    };
    if items.is_empty() {
        return String::new();
    }

    let mut html = String::from("<hr><h2>Curated for you</h2>\n<ul>\n");
    for item in items {
        let (Some(title), Some(url)) = (item["title"].as_str(), item["url"].as_str()) else {
            continue;
        };
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a>",
            escape_html(url),
            escape_html(title)
        );
        if let Some(summary) = item["summary"].as_str() {
            let _ = write!(html, " - {}", escape_html(summary));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headings_bullets_and_paragraphs_render() {
        let html = render_markdown_body("## Section\nA paragraph.\n- one\n- two\nAfter.");
        assert!(html.contains("<h2>Section</h2>"));
        assert!(html.contains("<p>A paragraph.</p>"));
        assert!(html.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>"));
        assert!(html.contains("<p>After.</p>"));
    }

    #[test]
    fn inline_links_and_bold_survive_escaping() {
        let html = render_inline("read [the post](https://example.com/a?b=1&c=2) **now**");
        assert!(html.contains("<a href=\"https://example.com/a?b=1&amp;c=2\">the post</a>"));
        assert!(html.contains("<strong>now</strong>"));
    }

    #[test]
    fn raw_html_in_content_is_escaped() {
        let html = render_inline("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn curated_list_skips_incomplete_entries() {
        let html = render_curated_list(&json!([
            { "title": "Full", "url": "https://example.com/1", "summary": "s" },
            { "title": "No URL" },
        ]));
        assert!(html.contains(">Full</a>"));
        assert!(!html.contains("No URL"));
    }

    #[test]
    fn full_email_contains_title_body_and_list() {
        let html = render_email_html(
            "Subject line",
            "Hello there.",
            &json!([{ "title": "T", "url": "https://example.com" }]),
        );
        assert!(html.contains("<h1>Subject line</h1>"));
        assert!(html.contains("<p>Hello there.</p>"));
        assert!(html.contains("Curated for you"));
    }

    #[test]
    fn empty_curated_value_renders_no_list() {
        let html = render_email_html("T", "Body", &json!([]));
        assert!(!html.contains("Curated for you"));
    }
}
