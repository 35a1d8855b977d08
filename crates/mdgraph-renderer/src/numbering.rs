//! Hierarchical numbering of headings, figures, listings and tables.
//!
//! Runs over the final HTML. The numbering state is an explicit [`Counters`]
//! value threaded through the scan: each numbered element advances it, and
//! the element gets an id and a visible label derived from the new state.
//!
//! | Element                                   | Counter     | Id             | Label          |
//! |-------------------------------------------|-------------|----------------|----------------|
//! | `<h1>`                                    | `chapter`   | `sec_01_00_00` | `1 `           |
//! | `<h2>`                                    | `section`   | `sec_01_02_00` | `1.2 `         |
//! | `<h3>`                                    | `paragraph` | `sec_01_02_03` | `1.2.3 `       |
//! | `<figcaption>` before an image            | `figure`    | `fig_01_04`    | `Fig. 1.4 `    |
//! | `<figcaption>` before `<pre>` or `<code>` | `list`      | `list_01_01`   | `List 1.1 `    |
//! | `<caption>`                               | `table`     | `table_01_02`  | `Table 1.2 `   |

use std::fmt::Write;

use crate::util::escape_html;

/// Elements that start an image-like figure body.
const IMAGE_TAGS: [&str; 5] = ["img", "object", "svg", "embed", "picture"];
/// Elements that start a listing body.
const CODE_TAGS: [&str; 2] = ["pre", "code"];

/// A numbered element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Heading of level 1 to 3.
    Heading(u8),
    Figure,
    Listing,
    Table,
}

/// Numbering state for one document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub chapter: u32,
    pub section: u32,
    pub paragraph: u32,
    pub figure: u32,
    pub list: u32,
    pub table: u32,
}

impl Counters {
    /// Apply the transition for one element.
    ///
    /// A new chapter resets every other counter; a new section resets the
    /// paragraph counter.
    #[must_use]
    pub fn advance(self, kind: ElementKind) -> Self {
        match kind {
            ElementKind::Heading(1) => Self {
                chapter: self.chapter + 1,
                ..Self::default()
            },
            ElementKind::Heading(2) => Self {
                section: self.section + 1,
                paragraph: 0,
                ..self
            },
            ElementKind::Heading(3) => Self {
                paragraph: self.paragraph + 1,
                ..self
            },
            ElementKind::Heading(_) => self,
            ElementKind::Figure => Self {
                figure: self.figure + 1,
                ..self
            },
            ElementKind::Listing => Self {
                list: self.list + 1,
                ..self
            },
            ElementKind::Table => Self {
                table: self.table + 1,
                ..self
            },
        }
    }

    /// Anchor id for `kind` in the current state.
    #[must_use]
    pub fn id(&self, kind: ElementKind) -> String {
        match kind {
            ElementKind::Heading(_) => format!(
                "sec_{:02}_{:02}_{:02}",
                self.chapter, self.section, self.paragraph
            ),
            ElementKind::Figure => format!("fig_{:02}_{:02}", self.chapter, self.figure),
            ElementKind::Listing => format!("list_{:02}_{:02}", self.chapter, self.list),
            ElementKind::Table => format!("table_{:02}_{:02}", self.chapter, self.table),
        }
    }

    /// Visible label for `kind` in the current state, with a trailing space.
    #[must_use]
    pub fn label(&self, kind: ElementKind, labels: &NumberingLabels) -> String {
        let Self {
            chapter,
            section,
            paragraph,
            ..
        } = *self;
        match kind {
            ElementKind::Heading(1) => format!("{chapter} "),
            ElementKind::Heading(2) => format!("{chapter}.{section} "),
            ElementKind::Heading(_) => format!("{chapter}.{section}.{paragraph} "),
            ElementKind::Figure => format!("{} {chapter}.{} ", labels.figure, self.figure),
            ElementKind::Listing => format!("{} {chapter}.{} ", labels.listing, self.list),
            ElementKind::Table => format!("{} {chapter}.{} ", labels.table, self.table),
        }
    }
}

/// Words used in figure, listing and table labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingLabels {
    pub figure: String,
    pub listing: String,
    pub table: String,
}

impl Default for NumberingLabels {
    fn default() -> Self {
        Self {
            figure: "Fig.".to_owned(),
            listing: "List".to_owned(),
            table: "Table".to_owned(),
        }
    }
}

/// Number every heading, figure, listing and table caption in `html`.
///
/// Returns the rewritten HTML and the final counters. Elements that already
/// carry an `id` keep it; only the label is added.
///
/// ```
/// use mdgraph_renderer::{Counters, NumberingLabels, number_elements};
///
/// let (html, counters) = number_elements(
///     "<h1>Intro</h1>\n<h2>Goals</h2>\n",
///     Counters::default(),
///     &NumberingLabels::default(),
/// );
/// assert_eq!(
///     html,
///     "<h1 id=\"sec_01_00_00\">1 Intro</h1>\n<h2 id=\"sec_01_01_00\">1.1 Goals</h2>\n"
/// );
/// assert_eq!(counters.section, 1);
/// ```
#[must_use]
pub fn number_elements(
    html: &str,
    mut counters: Counters,
    labels: &NumberingLabels,
) -> (String, Counters) {
    let mut out = String::with_capacity(html.len() + 256);
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        let rest = &html[start..];
        pos = start + 1;

        let Some((kind, name_len)) = classify(rest) else {
            continue;
        };
        let Some(tag_len) = open_tag_len(rest) else {
            continue;
        };

        counters = counters.advance(kind);
        let attrs = &rest[1 + name_len..tag_len - 1];

        out.push_str(&html[copied..start]);
        out.push_str(&rest[..=name_len]);
        if !has_id_attribute(attrs) {
            write!(out, r#" id="{}""#, counters.id(kind)).unwrap();
        }
        out.push_str(&rest[1 + name_len..tag_len]);
        out.push_str(&escape_html(&counters.label(kind, labels)));

        pos = start + tag_len;
        copied = pos;
    }

    out.push_str(&html[copied..]);
    (out, counters)
}

/// Decide whether the tag at the start of `rest` is numbered.
///
/// Returns the element kind and the length of the tag name.
fn classify(rest: &str) -> Option<(ElementKind, usize)> {
    for (level, name) in (1..=3u8).zip(["h1", "h2", "h3"]) {
        if is_open_tag(rest, name) {
            return Some((ElementKind::Heading(level), 2));
        }
    }
    if is_open_tag(rest, "caption") {
        return Some((ElementKind::Table, "caption".len()));
    }
    if is_open_tag(rest, "figcaption") {
        let close = find_ignore_case(rest, "</figcaption>")?;
        let next = rest[close + "</figcaption>".len()..].trim_start();
        let kind = if IMAGE_TAGS.iter().any(|tag| is_open_tag(next, tag)) {
            ElementKind::Figure
        } else if CODE_TAGS.iter().any(|tag| is_open_tag(next, tag)) {
            ElementKind::Listing
        } else {
            return None;
        };
        return Some((kind, "figcaption".len()));
    }
    None
}

/// Whether `s` starts with an opening `<name` tag (case-insensitive).
fn is_open_tag(s: &str, name: &str) -> bool {
    let bytes = s.as_bytes();
    let end = name.len() + 1;
    bytes.len() > end
        && bytes[0] == b'<'
        && bytes[1..end].eq_ignore_ascii_case(name.as_bytes())
        && matches!(bytes[end], b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r')
}

/// Byte length of the opening tag at the start of `s`, including `>`.
///
/// Quoted attribute values may contain `>`.
fn open_tag_len(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn has_id_attribute(attrs: &str) -> bool {
    let bytes = attrs.as_bytes();
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b) if b.is_ascii_whitespace() => {
                let name = &bytes[i + 1..];
                if name.len() >= 2
                    && name[..2].eq_ignore_ascii_case(b"id")
                    && attrs[i + 3..].trim_start().starts_with('=')
                {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn number(html: &str) -> String {
        number_elements(html, Counters::default(), &NumberingLabels::default()).0
    }

    #[test]
    fn test_chapter_resets_lower_counters() {
        let counters = Counters {
            chapter: 1,
            section: 2,
            paragraph: 3,
            figure: 4,
            list: 5,
            table: 6,
        }
        .advance(ElementKind::Heading(1));

        assert_eq!(
            counters,
            Counters {
                chapter: 2,
                ..Counters::default()
            }
        );
    }

    #[test]
    fn test_section_resets_paragraph_only() {
        let counters = Counters {
            chapter: 1,
            section: 1,
            paragraph: 2,
            figure: 3,
            list: 0,
            table: 1,
        }
        .advance(ElementKind::Heading(2));

        assert_eq!(counters.section, 2);
        assert_eq!(counters.paragraph, 0);
        assert_eq!(counters.figure, 3);
        assert_eq!(counters.table, 1);
    }

    #[test]
    fn test_figure_counter_resets_per_chapter() {
        let html = "<h1>A</h1>\n<h2>A1</h2>\n\
                    <figure><figcaption>X</figcaption><img src=\"x.png\"></figure>\n\
                    <h1>B</h1>\n<h2>B1</h2>\n\
                    <figure><figcaption>Y</figcaption><img src=\"y.png\"></figure>\n";
        let (out, counters) =
            number_elements(html, Counters::default(), &NumberingLabels::default());

        assert!(out.contains(r#"<figcaption id="fig_01_01">Fig. 1.1 X</figcaption>"#));
        assert!(out.contains(r#"<figcaption id="fig_02_01">Fig. 2.1 Y</figcaption>"#));
        assert!(out.contains(r#"<h2 id="sec_01_01_00">1.1 A1</h2>"#));
        assert!(out.contains(r#"<h2 id="sec_02_01_00">2.1 B1</h2>"#));
        assert_eq!(counters.chapter, 2);
        assert_eq!(counters.figure, 1);
    }

    #[test]
    fn test_third_level_heading() {
        let out = number("<h1>A</h1><h2>B</h2><h3>C</h3><h3>D</h3>");
        assert!(out.contains(r#"<h3 id="sec_01_01_02">1.1.2 D</h3>"#));
    }

    #[test]
    fn test_deeper_headings_untouched() {
        assert_eq!(number("<h4>Deep</h4>"), "<h4>Deep</h4>");
    }

    #[test]
    fn test_existing_id_is_kept() {
        let out = number(r#"<h1 id="intro">Intro</h1>"#);
        assert_eq!(out, r#"<h1 id="intro">1 Intro</h1>"#);
    }

    #[test]
    fn test_listing_before_code() {
        let out = number(
            "<figure class=\"listing\"><figcaption>Main</figcaption>\n<pre><code>x</code></pre></figure>",
        );
        assert!(out.contains(r#"<figcaption id="list_00_01">List 0.1 Main</figcaption>"#));
    }

    #[test]
    fn test_diagram_object_is_a_figure() {
        let out = number(
            r#"<figure class="diagram"><figcaption>G</figcaption><object type="image/svg+xml" data="g.svg"></object></figure>"#,
        );
        assert!(out.contains(r#"<figcaption id="fig_00_01">Fig. 0.1 G</figcaption>"#));
    }

    #[test]
    fn test_figcaption_before_other_content_is_untouched() {
        let html = "<figure><figcaption>Quote</figcaption><blockquote>x</blockquote></figure>";
        assert_eq!(number(html), html);
    }

    #[test]
    fn test_table_caption() {
        let out = number("<h1>A</h1><table>\n<caption>Sizes</caption>\n</table>");
        assert!(out.contains(r#"<caption id="table_01_01">Table 1.1 Sizes</caption>"#));
    }

    #[test]
    fn test_custom_labels() {
        let labels = NumberingLabels {
            figure: "Abb.".to_owned(),
            listing: "Code".to_owned(),
            table: "Tab.".to_owned(),
        };
        let (out, _) = number_elements(
            "<table><caption>T</caption></table>",
            Counters::default(),
            &labels,
        );
        assert!(out.contains("Tab. 0.1 T"));
    }

    #[test]
    fn test_uppercase_and_attributes() {
        let out = number(r#"<H2 class="a>b">Title</H2>"#);
        assert_eq!(out, r#"<H2 id="sec_00_01_00" class="a>b">0.1 Title</H2>"#);
    }

    #[test]
    fn test_header_tag_is_not_a_heading() {
        let html = "<header>x</header><hr>";
        assert_eq!(number(html), html);
    }

    #[test]
    fn test_escaped_markup_is_ignored() {
        let html = "<pre><code>&lt;h1&gt;x&lt;/h1&gt;</code></pre>";
        assert_eq!(number(html), html);
    }

    #[test]
    fn test_wide_numbers_print_in_full() {
        let counters = Counters {
            chapter: 123,
            figure: 4,
            ..Counters::default()
        };
        assert_eq!(counters.id(ElementKind::Figure), "fig_123_04");
    }

    #[test]
    fn test_has_id_attribute() {
        assert!(has_id_attribute(r#" class="x" id="y""#));
        assert!(has_id_attribute(" ID = 'y'"));
        assert!(!has_id_attribute(r#" data-id="y""#));
        assert!(!has_id_attribute(r#" title=" id=x""#));
    }
}
