//! Pipe tables with optional captions and column alignment.
//!
//! Two line shapes are recognized, chosen by the header row:
//!
//! ```text
//! | A | B | "Caption"        A | B "Caption"
//! |--:|:-:|                  --:|:-:
//! | 1 | 2 |                  1 | 2
//! ```
//!
//! Rows are protected with the inline span pass before they are split, so a
//! `|` inside a key span or an inline HTML tag never separates columns.

use std::fmt::Write;

use crate::handler::{BlockHandler, HandlerContext, TABLE_PRIORITY};
use crate::placeholder::PlaceholderError;
use crate::util::{escape_html, strip_block_indent};

/// Column alignment inferred from the underline row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Infer alignment from one underline cell (`:--`, `:-:`, `--:`, `---`).
    #[must_use]
    pub fn from_underline(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':') && cell.len() > 1) {
            (true, true) => Self::Center,
            (false, true) => Self::Right,
            (true, false) => Self::Left,
            (false, false) => Self::None,
        }
    }

    /// Attribute value for this alignment, `None` when unaligned.
    #[must_use]
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}

/// Handler for pipe tables.
#[derive(Debug, Default)]
pub struct TableHandler {
    align_class_template: Option<String>,
}

impl TableHandler {
    /// Create a handler that emits `align="…"` on header cells.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit alignment as a class instead, with `%%` replaced by the alignment.
    ///
    /// `"align-%%"` produces `class="align-right"`.
    #[must_use]
    pub fn with_align_class(mut self, template: impl Into<String>) -> Self {
        self.align_class_template = Some(template.into());
        self
    }

    fn alignment_attr(&self, alignment: Alignment) -> String {
        let Some(name) = alignment.as_str() else {
            return String::new();
        };
        match &self.align_class_template {
            Some(template) => format!(r#" class="{}""#, escape_html(&template.replace("%%", name))),
            None => format!(r#" align="{name}""#),
        }
    }

    fn render(
        &self,
        table: &TableMatch<'_>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<String, PlaceholderError> {
        let header = split_row(&ctx.protect_inline(table.header)?);
        let columns = header.len();
        let mut alignments: Vec<Alignment> = split_row(table.underline)
            .iter()
            .map(|cell| Alignment::from_underline(cell))
            .collect();
        alignments.resize(columns, Alignment::None);

        let mut out = String::from("<table>\n");
        if let Some(caption) = table.caption {
            writeln!(out, "<caption>{}</caption>", ctx.render_inline(caption)?).unwrap();
        }

        out.push_str("<thead>\n<tr>");
        for (cell, alignment) in header.iter().zip(&alignments) {
            write!(
                out,
                "<th{}>{}</th>",
                self.alignment_attr(*alignment),
                ctx.base.render_inline(cell)
            )
            .unwrap();
        }
        out.push_str("</tr>\n</thead>\n<tbody>\n");

        for row in &table.rows {
            let mut cells = split_row(&ctx.protect_inline(row)?);
            if cells.len() > columns {
                // Dropped cells may still hold span tokens
                for dropped in cells.drain(columns..) {
                    ctx.store.resolve_all(&dropped)?;
                }
            }
            cells.resize(columns, String::new());
            out.push_str("<tr>");
            for cell in &cells {
                write!(out, "<td>{}</td>", ctx.base.render_inline(cell)).unwrap();
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>");

        Ok(out)
    }
}

impl BlockHandler for TableHandler {
    fn name(&self) -> &'static str {
        "table"
    }

    fn priority(&self) -> u32 {
        TABLE_PRIORITY
    }

    fn run(
        &mut self,
        text: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<String, PlaceholderError> {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut output = String::with_capacity(text.len());
        let mut i = 0;

        while i < lines.len() {
            let Some(table) = match_table(&lines, i) else {
                output.push_str(lines[i]);
                i += 1;
                continue;
            };

            let html = self.render(&table, ctx)?;
            output.push_str("\n\n");
            output.push_str(&ctx.store.store_block(&html)?);
            output.push_str("\n\n");
            i += table.line_count;
        }

        Ok(output)
    }
}

/// A table found in the line list.
#[derive(Debug, PartialEq, Eq)]
struct TableMatch<'a> {
    header: &'a str,
    caption: Option<&'a str>,
    underline: &'a str,
    rows: Vec<&'a str>,
    line_count: usize,
}

fn line_content(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line).trim_end_matches('\r')
}

/// Try to match a table whose header row is `lines[start]`.
fn match_table<'a>(lines: &[&'a str], start: usize) -> Option<TableMatch<'a>> {
    let header = strip_block_indent(line_content(lines[start]))?;
    let leading = header.starts_with('|');
    if !header.contains('|') || header.starts_with(char::is_whitespace) {
        return None;
    }

    let underline = strip_block_indent(line_content(lines.get(start + 1)?))?;
    if !is_underline(underline) || (leading && !underline.starts_with('|')) {
        return None;
    }

    let (header, caption) = split_caption(header);

    let rows: Vec<&str> = lines[start + 2..]
        .iter()
        .map(|line| line_content(line))
        .take_while(|line| is_row(line, leading))
        .collect();

    Some(TableMatch {
        header,
        caption,
        underline,
        line_count: rows.len() + 2,
        rows,
    })
}

/// Underline rows hold only `|`, `:`, `-` and blanks, with at least one `-` and one `|`.
fn is_underline(line: &str) -> bool {
    line.contains('-')
        && line.contains('|')
        && line
            .chars()
            .all(|c| matches!(c, '|' | ':' | '-' | ' ' | '\t'))
}

fn is_row(line: &str, leading: bool) -> bool {
    if leading {
        strip_block_indent(line).is_some_and(|l| l.starts_with('|'))
    } else {
        !line.trim().is_empty() && line.contains('|')
    }
}

/// Split a trailing `"caption"` off a header row.
///
/// The caption only counts when the text before it ends with `|`.
fn split_caption(header: &str) -> (&str, Option<&str>) {
    let trimmed = header.trim_end();
    let Some(inner) = trimmed.strip_suffix('"') else {
        return (header, None);
    };
    let Some(open) = inner.rfind('"') else {
        return (header, None);
    };
    let before = inner[..open].trim_end();
    if !before.ends_with('|') {
        return (header, None);
    }
    let caption = inner[open + 1..].trim();
    (before, (!caption.is_empty()).then_some(caption))
}

/// Split a row into trimmed cells on unescaped `|`.
///
/// One leading and one trailing pipe are dropped first.
fn split_row(row: &str) -> Vec<String> {
    let mut row = row.trim();
    row = row.strip_prefix('|').unwrap_or(row);
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = row.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_owned()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_owned());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::CmarkConverter;
    use crate::handler::Report;
    use crate::placeholder::PlaceholderStore;
    use crate::span::SpanRenderer;
    use pretty_assertions::assert_eq;

    fn render_with(handler: &mut TableHandler, text: &str) -> String {
        let mut store = PlaceholderStore::new();
        let mut report = Report::default();
        let base = CmarkConverter::new();
        let spans = SpanRenderer::new();
        let mut ctx = HandlerContext {
            store: &mut store,
            base: &base,
            spans: &spans,
            report: &mut report,
        };
        let out = handler.run(text, &mut ctx).unwrap();
        store.resolve_all(&out).unwrap()
    }

    fn render(text: &str) -> String {
        render_with(&mut TableHandler::new(), text)
    }

    #[test]
    fn test_caption_and_alignment() {
        let html = render("|A|B| \"t1\"\n|-:|:-:|\n|1|2|\n");
        assert_eq!(
            html.trim(),
            "<table>\n<caption>t1</caption>\n<thead>\n\
             <tr><th align=\"right\">A</th><th align=\"center\">B</th></tr>\n\
             </thead>\n<tbody>\n<tr><td>1</td><td>2</td></tr>\n</tbody>\n</table>"
        );
    }

    #[test]
    fn test_short_row_is_padded() {
        let html = render("| a | b | c |\n|---|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<tr><td>1</td><td>2</td><td></td></tr>"));
    }

    #[test]
    fn test_long_row_is_truncated() {
        let html = render("|a|b|\n|-|-|\n|1|2|3|\n");
        assert!(html.contains("<tr><td>1</td><td>2</td></tr>"));
        assert!(!html.contains(">3<"));
    }

    #[test]
    fn test_bare_variant() {
        let html = render("A | B\n:-- | ---\n1 | 2\n3 | 4\n\nafter\n");
        assert!(html.contains("<tr><th align=\"left\">A</th><th>B</th></tr>"));
        assert!(html.contains("<tr><td>1</td><td>2</td></tr>\n<tr><td>3</td><td>4</td></tr>"));
        assert!(html.ends_with("after\n"));
    }

    #[test]
    fn test_bare_variant_caption() {
        let html = render("A | B | \"Sizes\"\n--|--\n1 | 2\n");
        assert!(html.contains("<caption>Sizes</caption>"));
    }

    #[test]
    fn test_quote_without_pipe_is_not_caption() {
        let html = render("|A|say \"hi\"\n|-|-|\n|1|2|\n");
        assert!(!html.contains("<caption>"));
        assert!(html.contains("<th>say &quot;hi&quot;</th>"));
    }

    #[test]
    fn test_cells_render_inline_markdown() {
        let html = render("|*a*|b|\n|-|-|\n|**1**|[x](y)|\n");
        assert!(html.contains("<th><em>a</em></th>"));
        assert!(html.contains("<td><strong>1</strong></td><td><a href=\"y\">x</a></td>"));
    }

    #[test]
    fn test_escaped_pipe_stays_in_cell() {
        let html = render("|a|b|\n|-|-|\n|x \\| y|z|\n");
        assert!(html.contains("<td>x | y</td><td>z</td>"));
    }

    #[test]
    fn test_pipe_inside_key_span_does_not_split() {
        let html = render("|cmd|note|\n|-|-|\n|`a|b`|pipe|\n");
        assert!(html.contains(r#"<td><code class="key">a|b</code></td><td>pipe</td>"#));
    }

    #[test]
    fn test_pipe_inside_html_tag_does_not_split() {
        let html = render("|a|b|\n|-|-|\n|<abbr title=\"x|y\">z</abbr>|w|\n");
        assert!(html.contains(r#"<tr><td><abbr title="x|y">z</abbr></td><td>w</td></tr>"#));
    }

    #[test]
    fn test_caption_spans() {
        let html = render("|A| \"Press `q` to ~~exit~~\"\n|-|\n|1|\n");
        assert!(html.contains(
            r#"<caption>Press <code class="key">q</code> to <del>exit</del></caption>"#
        ));
    }

    #[test]
    fn test_align_class_template() {
        let mut handler = TableHandler::new().with_align_class("align-%%");
        let html = render_with(&mut handler, "|a|b|\n|:-|-|\n");
        assert!(html.contains(r#"<th class="align-left">a</th><th>b</th>"#));
    }

    #[test]
    fn test_header_only_table_has_empty_body() {
        let html = render("|a|\n|-|\n");
        assert!(html.contains("<tbody>\n</tbody>"));
    }

    #[test]
    fn test_not_a_table_without_underline() {
        let text = "a | b\nc | d\n";
        assert_eq!(render(text), text);
    }

    #[test]
    fn test_leading_variant_needs_leading_underline() {
        let text = "|a|b|\n-|-\n";
        assert_eq!(render(text), text);
    }

    #[test]
    fn test_leading_rows_stop_at_non_pipe_line() {
        let html = render("|a|\n|-|\n|1|\ntext\n");
        assert!(html.contains("<tr><td>1</td></tr>\n</tbody>"));
        assert!(html.ends_with("text\n"));
    }

    #[test]
    fn test_alignment_from_underline() {
        assert_eq!(Alignment::from_underline(" :-: "), Alignment::Center);
        assert_eq!(Alignment::from_underline("--:"), Alignment::Right);
        assert_eq!(Alignment::from_underline(":--"), Alignment::Left);
        assert_eq!(Alignment::from_underline("---"), Alignment::None);
        assert_eq!(Alignment::from_underline(":"), Alignment::Left);
    }

    #[test]
    fn test_split_row() {
        assert_eq!(split_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_row("a|b"), vec!["a", "b"]);
        assert_eq!(split_row(r"| a \| b |"), vec![r"a \| b"]);
        assert_eq!(split_row("||"), vec![""]);
    }

    #[test]
    fn test_split_caption() {
        assert_eq!(split_caption(r#"|a|b| "Cap""#), ("|a|b|", Some("Cap")));
        assert_eq!(split_caption("|a|b|"), ("|a|b|", None));
        assert_eq!(split_caption(r#"|a| """#), ("|a|", None));
    }
}
