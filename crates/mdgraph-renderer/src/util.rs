//! Shared utility functions for rendering.

/// Escape text for embedding in HTML content or a quoted attribute value.
///
/// # Examples
///
/// ```
/// use mdgraph_renderer::escape_html;
///
/// assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
/// ```
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Drop leading lines that contain only whitespace.
pub(crate) fn trim_leading_blank_lines(s: &str) -> &str {
    let mut rest = s;
    while let Some(end) = rest.find('\n') {
        if rest[..end].trim().is_empty() {
            rest = &rest[end + 1..];
        } else {
            break;
        }
    }
    rest
}

/// Strip up to three leading spaces, the indentation allowed before block syntax.
pub(crate) fn strip_block_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("it's"), "it&#x27;s");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_trim_leading_blank_lines() {
        assert_eq!(trim_leading_blank_lines("\n  \nfoo\n\nbar\n"), "foo\n\nbar\n");
        assert_eq!(trim_leading_blank_lines("foo\n"), "foo\n");
        assert_eq!(trim_leading_blank_lines("\n\n"), "");
    }

    #[test]
    fn test_strip_block_indent() {
        assert_eq!(strip_block_indent("   |a|"), Some("|a|"));
        assert_eq!(strip_block_indent("|a|"), Some("|a|"));
        assert_eq!(strip_block_indent("    |a|"), None);
    }
}
