use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>")
        .expect("valid regex")
});
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|section|article|header|footer|li|ul|ol|tr|table|h[1-6]|br|hr|blockquote|pre)\b[^>]*>")
        .expect("valid regex")
});
static HEADING_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h([1-6])\b[^>]*>").expect("valid regex"));
static CELL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<t[dh]\b[^>]*>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// Convert an HTML page to plain text
///
/// Scripts, styles and comments are removed; block elements become line
/// breaks, headings become markdown headings and table cells are separated
/// by `|` so tabular content stays recognizable after chunking.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = HEADING_OPEN.replace_all(&text, |caps: &regex::Captures| {
        let level = caps[1].parse::<usize>().unwrap_or(1);
        format!("\n\n{} ", "#".repeat(level))
    });
    let text = CELL_TAG.replace_all(&text, " | ");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Decode the handful of named entities that show up in practice plus
/// numeric character references
fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let value = &caps[1];
        let code = match value.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => value.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::normalize_text;

    #[test]
    fn test_strips_tags() {
        let text = normalize_text(&html_to_text("<p>Hello <b>world</b></p>"));
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_removes_script_and_style() {
        let html = "<html><head><style>body { color: red }</style></head>\
                    <body><script>var x = 1;</script><p>Visible</p></body></html>";
        let text = normalize_text(&html_to_text(html));
        assert_eq!(text, "Visible");
    }

    #[test]
    fn test_removes_comments() {
        let text = normalize_text(&html_to_text("<p>a<!-- hidden --> b</p>"));
        assert_eq!(text, "a b");
    }

    #[test]
    fn test_headings_become_markdown() {
        let text = normalize_text(&html_to_text("<h2>Shipping</h2><p>We ship worldwide.</p>"));
        assert!(text.starts_with("## Shipping"));
        assert!(text.contains("We ship worldwide."));
    }

    #[test]
    fn test_table_cells_are_pipe_separated() {
        let html = "<table><tr><th>Plan</th><th>Price</th></tr>\
                    <tr><td>Basic</td><td>$5</td></tr>\
                    <tr><td>Pro</td><td>$10</td></tr></table>";
        let text = normalize_text(&html_to_text(html));
        assert!(text.contains('|'));
        assert!(text.lines().count() > 2);
    }

    #[test]
    fn test_decodes_entities() {
        let text = html_to_text("Fish &amp; chips &lt;3 &#169; &#x4E2D;");
        assert_eq!(text, "Fish & chips <3 © 中");
    }
}
