//! Base Markdown converter.
//!
//! The extension pipeline only owns fenced blocks, tables, inline spans and
//! numbering. Everything else (paragraphs, emphasis, links, lists,
//! blockquotes, raw HTML) is delegated to a [`BaseConverter`].

use std::borrow::Cow;
use std::ops::Range;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd, html};

/// What a region of inline source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Inline text and code spans, where span syntax applies.
    Text,
    /// A raw inline HTML tag.
    Html,
}

/// A byte range of Markdown source the base grammar treats as inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRegion {
    pub range: Range<usize>,
    pub kind: RegionKind,
}

/// Renders the Markdown grammar the extensions do not handle themselves.
pub trait BaseConverter {
    /// Render a whole document (block and span grammar) to HTML.
    fn render_document(&self, markdown: &str) -> String;

    /// Render a single fragment with span grammar only.
    ///
    /// Used for table cells and captions: the result has no paragraph
    /// wrapper and block syntax (headings, list markers, quotes) is treated
    /// as literal text.
    fn render_inline(&self, markdown: &str) -> String;

    /// Locate inline text and inline HTML in `markdown`, in source order.
    ///
    /// Code blocks, HTML blocks, link destinations, autolinks and image alt
    /// text are never part of a region. The default treats the whole input as
    /// one text region.
    fn inline_regions(&self, markdown: &str) -> Vec<InlineRegion> {
        vec![InlineRegion {
            range: 0..markdown.len(),
            kind: RegionKind::Text,
        }]
    }
}

/// [`BaseConverter`] backed by pulldown-cmark.
///
/// Tables and strikethrough are left disabled because the pipeline handles
/// `|` tables and `~` spans itself.
#[derive(Debug, Clone, Copy)]
pub struct CmarkConverter {
    options: Options,
}

impl CmarkConverter {
    /// Create a converter with task lists and heading attributes enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TASKLISTS | Options::ENABLE_HEADING_ATTRIBUTES,
        }
    }
}

impl Default for CmarkConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseConverter for CmarkConverter {
    fn render_document(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }

    fn render_inline(&self, markdown: &str) -> String {
        let source = neutralize_block_start(markdown.trim());
        let parser = Parser::new_ext(&source, self.options).filter(|event| {
            !matches!(
                event,
                Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph)
            )
        });
        let mut out = String::with_capacity(source.len());
        html::push_html(&mut out, parser);
        out.truncate(out.trim_end().len());
        out
    }

    fn inline_regions(&self, markdown: &str) -> Vec<InlineRegion> {
        let mut regions = RegionCollector::new(markdown);
        // Nesting depth inside content that must stay untouched
        let mut opaque = 0usize;
        let mut links: Vec<bool> = Vec::new();

        for (event, range) in Parser::new_ext(markdown, self.options).into_offset_iter() {
            match event {
                Event::Start(Tag::Link { link_type, .. }) => {
                    regions.flush();
                    let auto = matches!(link_type, LinkType::Autolink | LinkType::Email);
                    if auto {
                        opaque += 1;
                    }
                    links.push(auto);
                }
                Event::End(TagEnd::Link) => {
                    regions.flush();
                    if links.pop() == Some(true) {
                        opaque = opaque.saturating_sub(1);
                    }
                }
                Event::Start(Tag::CodeBlock(_) | Tag::HtmlBlock | Tag::Image { .. }) => {
                    regions.flush();
                    opaque += 1;
                }
                Event::End(TagEnd::CodeBlock | TagEnd::HtmlBlock | TagEnd::Image) => {
                    regions.flush();
                    opaque = opaque.saturating_sub(1);
                }
                _ if opaque > 0 => {}
                Event::Text(_) | Event::Code(_) | Event::SoftBreak | Event::HardBreak => {
                    regions.text(range);
                }
                Event::InlineHtml(_) => regions.html(range),
                Event::Start(Tag::Emphasis | Tag::Strong)
                | Event::End(TagEnd::Emphasis | TagEnd::Strong) => {}
                _ => regions.flush(),
            }
        }

        regions.finish()
    }
}

/// Merges adjacent text events into regions.
///
/// Two text ranges join when the source between them holds only whitespace,
/// emphasis markers or the backslash of an escape.
struct RegionCollector<'a> {
    source: &'a str,
    regions: Vec<InlineRegion>,
    pending: Option<Range<usize>>,
}

impl<'a> RegionCollector<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            regions: Vec::new(),
            pending: None,
        }
    }

    fn text(&mut self, range: Range<usize>) {
        if let Some(pending) = &mut self.pending {
            let joins = range.start <= pending.end
                || self.source[pending.end..range.start]
                    .chars()
                    .all(|c| c.is_whitespace() || matches!(c, '\\' | '*' | '_'));
            if joins {
                pending.end = pending.end.max(range.end);
                return;
            }
        }
        self.flush();
        self.pending = Some(range);
    }

    fn html(&mut self, range: Range<usize>) {
        self.flush();
        self.regions.push(InlineRegion {
            range,
            kind: RegionKind::Html,
        });
    }

    fn flush(&mut self) {
        if let Some(range) = self.pending.take() {
            self.regions.push(InlineRegion {
                range,
                kind: RegionKind::Text,
            });
        }
    }

    fn finish(mut self) -> Vec<InlineRegion> {
        self.flush();
        self.regions
    }
}

/// Escape syntax at the start of `text` that would open a block construct.
///
/// Only the first character is touched; everything else stays inline
/// Markdown. `*emphasis*` is left alone because a list marker needs a
/// following space.
fn neutralize_block_start(text: &str) -> Cow<'_, str> {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return Cow::Borrowed(text);
    };
    let second = chars.next();
    let spaced = second.is_none_or(char::is_whitespace);

    let escape_first = match first {
        '#' => {
            let hashes = text.chars().take_while(|&c| c == '#').count();
            hashes <= 6 && text[hashes..].chars().next().is_none_or(char::is_whitespace)
        }
        '>' => true,
        '-' | '+' | '*' | '_' | '=' => spaced || is_thematic_break(text, first),
        '`' | '~' => text.starts_with("```") || text.starts_with("~~~"),
        _ => false,
    };
    if escape_first {
        return Cow::Owned(format!("\\{text}"));
    }

    // Ordered list marker: up to nine digits followed by `.` or `)` and a space
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if (1..=9).contains(&digits) {
        let mut rest = text[digits..].chars();
        if matches!(rest.next(), Some('.' | ')')) && rest.next().is_none_or(char::is_whitespace)
        {
            return Cow::Owned(format!("{}\\{}", &text[..digits], &text[digits..]));
        }
    }

    Cow::Borrowed(text)
}

fn is_thematic_break(text: &str, marker: char) -> bool {
    text.chars().all(|c| c == marker || c == ' ' || c == '\t')
        && text.chars().filter(|&c| c == marker).count() >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inline(s: &str) -> String {
        CmarkConverter::new().render_inline(s)
    }

    #[test]
    fn test_render_document() {
        let html = CmarkConverter::new().render_document("# Title\n\nSome *text*.\n");
        assert_eq!(html, "<h1>Title</h1>\n<p>Some <em>text</em>.</p>\n");
    }

    #[test]
    fn test_tables_are_not_rendered_by_base() {
        let html = CmarkConverter::new().render_document("|a|b|\n|-|-|\n|1|2|\n");
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_strikethrough_is_not_rendered_by_base() {
        let html = CmarkConverter::new().render_document("~~x~~\n");
        assert!(!html.contains("<del>"));
    }

    #[test]
    fn test_heading_attributes() {
        let html = CmarkConverter::new().render_document("## Setup {#setup}\n");
        assert_eq!(html, "<h2 id=\"setup\">Setup</h2>\n");
    }

    #[test]
    fn test_inline_has_no_paragraph() {
        assert_eq!(inline("**bold** and `code`"), "<strong>bold</strong> and <code>code</code>");
    }

    #[test]
    fn test_inline_escaped_pipe() {
        assert_eq!(inline(r"a \| b"), "a | b");
    }

    #[test]
    fn test_inline_heading_marker_is_literal() {
        assert_eq!(inline("# not a heading"), "# not a heading");
    }

    #[test]
    fn test_inline_list_markers_are_literal() {
        assert_eq!(inline("- item"), "- item");
        assert_eq!(inline("1. first"), "1. first");
        assert_eq!(inline("> quote"), "&gt; quote");
        assert_eq!(inline("---"), "---");
    }

    #[test]
    fn test_inline_emphasis_at_start() {
        assert_eq!(inline("*em*"), "<em>em</em>");
    }

    #[test]
    fn test_inline_empty() {
        assert_eq!(inline("   "), "");
    }

    fn regions(markdown: &str) -> Vec<(RegionKind, &str)> {
        CmarkConverter::new()
            .inline_regions(markdown)
            .into_iter()
            .map(|r| (r.kind, &markdown[r.range]))
            .collect()
    }

    fn text_regions(markdown: &str) -> Vec<&str> {
        regions(markdown)
            .into_iter()
            .filter(|(kind, _)| *kind == RegionKind::Text)
            .map(|(_, text)| text)
            .collect()
    }

    #[test]
    fn test_regions_paragraph_with_code_span() {
        assert_eq!(text_regions("press `k` now\n"), vec!["press `k` now"]);
    }

    #[test]
    fn test_regions_join_across_soft_break_and_emphasis() {
        assert_eq!(text_regions("a ~~b\nc *d* e~~\n"), vec!["a ~~b\nc *d* e~~"]);
    }

    #[test]
    fn test_regions_keep_escape_backslash() {
        assert_eq!(text_regions("a \\~~b~~\n"), vec!["a \\~~b~~"]);
    }

    #[test]
    fn test_regions_skip_link_destination() {
        assert_eq!(
            text_regions("see [home](http://host/~a/~b) ok\n"),
            vec!["see ", "home", " ok"]
        );
    }

    #[test]
    fn test_regions_skip_autolink() {
        assert_eq!(text_regions("<https://host/~a/~x>\n"), Vec::<&str>::new());
    }

    #[test]
    fn test_regions_skip_code_and_html_blocks() {
        assert_eq!(
            text_regions("    echo `date`\n\n<div title=\"~a~\">\n</div>\n\ntext\n"),
            vec!["text"]
        );
    }

    #[test]
    fn test_regions_skip_image_alt() {
        assert_eq!(text_regions("![~x~](a.png)\n"), Vec::<&str>::new());
    }

    #[test]
    fn test_regions_report_inline_html() {
        assert_eq!(
            regions("a <b title=\"~x~\">c</b>\n"),
            vec![
                (RegionKind::Text, "a "),
                (RegionKind::Html, "<b title=\"~x~\">"),
                (RegionKind::Text, "c"),
                (RegionKind::Html, "</b>"),
            ]
        );
    }

    #[test]
    fn test_regions_do_not_span_blocks() {
        assert_eq!(text_regions("# A ~x\nB~\n"), vec!["A ~x", "B~"]);
    }
}
