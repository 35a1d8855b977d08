//! Inline span handlers: delete (`~~text~~`) and key (`` `text` ``).
//!
//! A single left-to-right scan looks for either an escaped character or an
//! opening marker run. An opening run of length L is closed by the next
//! maximal run of the same character with exactly length L; the text between
//! becomes the span body. Without a closing run the opener stays literal text
//! and scanning continues after it.

use std::sync::Arc;

use crate::base::{InlineRegion, RegionKind};
use crate::placeholder::{PlaceholderError, PlaceholderStore};
use crate::util::escape_html;

/// Pluggable content transform: `(body, class_name) -> html`.
///
/// Replaces the default HTML escaping of code and key bodies.
pub type ContentTransform = Arc<dyn Fn(&str, Option<&str>) -> String + Send + Sync>;

/// Renders delete and key spans into placeholders.
#[derive(Clone, Default)]
pub struct SpanRenderer {
    key_transform: Option<ContentTransform>,
}

impl std::fmt::Debug for SpanRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanRenderer")
            .field("key_transform", &self.key_transform.is_some())
            .finish()
    }
}

impl SpanRenderer {
    /// Create a span renderer with default HTML escaping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Post-process key span bodies with a custom transform.
    ///
    /// The transform receives the trimmed raw body and `None` as class name.
    #[must_use]
    pub fn with_key_transform(mut self, transform: ContentTransform) -> Self {
        self.key_transform = Some(transform);
        self
    }

    /// Replace every delete and key span in `text` with a span placeholder.
    ///
    /// Escaped characters (`\~`, `` \` ``) are copied through untouched for
    /// the base converter.
    ///
    /// ```
    /// use mdgraph_renderer::{PlaceholderStore, SpanRenderer};
    ///
    /// let mut store = PlaceholderStore::new();
    /// let text = SpanRenderer::new().protect("press `Ctrl` ~~now~~", &mut store).unwrap();
    /// assert_eq!(
    ///     store.resolve_all(&text).unwrap(),
    ///     r#"press <code class="key">Ctrl</code> <del>now</del>"#
    /// );
    /// ```
    pub fn protect(
        &self,
        text: &str,
        store: &mut PlaceholderStore,
    ) -> Result<String, PlaceholderError> {
        let bytes = text.as_bytes();
        let mut output = String::with_capacity(text.len());
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                marker @ (b'~' | b'`') => {
                    let len = run_length(bytes, i, marker);
                    let after_tilde = marker == b'~' && i > 0 && bytes[i - 1] == b'~';

                    let close = if after_tilde {
                        None
                    } else {
                        find_closer(bytes, i + len, marker, len)
                    };

                    match close {
                        Some(close) => {
                            let body = text[i + len..close].trim();
                            let html = match marker {
                                b'~' => format!("<del>{}</del>", escape_html(body)),
                                _ => self.render_key(body),
                            };
                            output.push_str(&text[copied..i]);
                            output.push_str(&store.store_span(&html)?);
                            i = close + len;
                            copied = i;
                        }
                        None => i += len,
                    }
                }
                _ => i += 1,
            }
        }

        output.push_str(&text[copied.min(text.len())..]);
        Ok(output)
    }

    /// Protect spans only inside `regions` of `text`.
    ///
    /// Text regions are scanned for spans. Inline HTML regions are stored
    /// whole as span placeholders so later passes cannot split or escape
    /// them. Everything outside a region is copied unchanged. Regions must be
    /// sorted and must not overlap.
    pub fn protect_regions(
        &self,
        text: &str,
        regions: &[InlineRegion],
        store: &mut PlaceholderStore,
    ) -> Result<String, PlaceholderError> {
        let mut output = String::with_capacity(text.len());
        let mut copied = 0;

        for region in regions {
            let range = region.range.clone();
            if range.start < copied || range.end > text.len() {
                continue;
            }
            output.push_str(&text[copied..range.start]);
            let slice = &text[range.clone()];
            match region.kind {
                RegionKind::Text => output.push_str(&self.protect(slice, store)?),
                RegionKind::Html => output.push_str(&store.store_span(slice)?),
            }
            copied = range.end;
        }

        output.push_str(&text[copied..]);
        Ok(output)
    }

    fn render_key(&self, body: &str) -> String {
        let content = match &self.key_transform {
            Some(transform) => transform(body, None),
            None => escape_html(body),
        };
        format!(r#"<code class="key">{content}</code>"#)
    }
}

/// Length of the run of `marker` bytes starting at `start`.
fn run_length(bytes: &[u8], start: usize, marker: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == marker).count()
}

/// Find a closing run of exactly `len` markers after `from`.
///
/// The span body must not be blank and must not cross a blank line.
fn find_closer(bytes: &[u8], from: usize, marker: u8, len: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' if starts_blank_line(&bytes[j + 1..]) => return None,
            b'\\' if marker == b'~' => j += 2,
            b if b == marker => {
                let run = run_length(bytes, j, marker);
                let body_blank = bytes[from..j].iter().all(u8::is_ascii_whitespace);
                if run == len && !body_blank {
                    return Some(j);
                }
                j += run;
            }
            _ => j += 1,
        }
    }
    None
}

fn starts_blank_line(rest: &[u8]) -> bool {
    let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
    rest[..end].iter().all(|&b| b == b' ' || b == b'\t' || b == b'\r')
}
