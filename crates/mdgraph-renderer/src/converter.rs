//! Conversion pipeline.

use crate::base::{BaseConverter, CmarkConverter, InlineRegion, RegionKind};
use crate::code_block::{CodeBlockHandler, CodeBlockOptions};
use crate::error::ConvertError;
use crate::handler::{BlockHandler, HandlerContext, RenderFailure, Report};
use crate::numbering::{Counters, NumberingLabels, number_elements};
use crate::placeholder::{PlaceholderStore, SENTINEL};
use crate::span::{ContentTransform, SpanRenderer};
use crate::table::TableHandler;

/// Result of converting one document.
#[derive(Clone, Debug)]
pub struct ConversionResult {
    /// Rendered HTML.
    pub html: String,
    /// Warnings generated during conversion (e.g., duplicate diagram keys).
    pub warnings: Vec<String>,
    /// Diagrams the external tool failed to render.
    pub failures: Vec<RenderFailure>,
    /// Final numbering state; all zero when numbering is disabled.
    pub counters: Counters,
}

/// Markdown to HTML converter with the block and span extensions.
///
/// Block handlers run in ascending priority, then the inline span pass, then
/// the base converter, then placeholder resolution and numbering. Fenced code
/// and table handlers are installed by default; more handlers (such as the
/// diagram handler) are added with [`with_handler`](Self::with_handler).
///
/// # Example
///
/// ```
/// use mdgraph_renderer::Converter;
///
/// let result = Converter::new()
///     .convert("# Intro\n\n|a|b|\n|-|-|\n|1|2|\n")
///     .unwrap();
/// assert!(result.html.starts_with("<h1 id=\"sec_01_00_00\">1 Intro</h1>"));
/// assert!(result.html.contains("<td>1</td><td>2</td>"));
/// ```
pub struct Converter {
    base: Box<dyn BaseConverter>,
    spans: SpanRenderer,
    handlers: Vec<Box<dyn BlockHandler>>,
    numbering: Option<NumberingLabels>,
}

impl Converter {
    /// Create a converter with code and table handlers and numbering enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Box::new(CmarkConverter::new()),
            spans: SpanRenderer::new(),
            handlers: Vec::new(),
            numbering: Some(NumberingLabels::default()),
        }
        .with_handler(CodeBlockHandler::default())
        .with_handler(TableHandler::new())
    }

    /// Replace the base converter.
    #[must_use]
    pub fn with_base(mut self, base: impl BaseConverter + 'static) -> Self {
        self.base = Box::new(base);
        self
    }

    /// Add a block handler.
    ///
    /// A handler with the same [`name`](BlockHandler::name) as an installed
    /// one replaces it. Handlers are kept sorted by priority.
    #[must_use]
    pub fn with_handler(mut self, handler: impl BlockHandler + 'static) -> Self {
        self.handlers.retain(|h| h.name() != handler.name());
        self.handlers.push(Box::new(handler));
        self.handlers.sort_by_key(|h| h.priority());
        self
    }

    /// Configure fenced code rendering.
    #[must_use]
    pub fn with_code_options(self, options: CodeBlockOptions) -> Self {
        self.with_handler(CodeBlockHandler::new(options))
    }

    /// Post-process key span bodies with a custom transform.
    #[must_use]
    pub fn with_key_transform(mut self, transform: ContentTransform) -> Self {
        self.spans = self.spans.with_key_transform(transform);
        self
    }

    /// Number headings, figures and tables using the given label words.
    #[must_use]
    pub fn with_numbering(mut self, labels: NumberingLabels) -> Self {
        self.numbering = Some(labels);
        self
    }

    /// Disable the numbering pass.
    #[must_use]
    pub fn without_numbering(mut self) -> Self {
        self.numbering = None;
        self
    }

    /// Names of the installed handlers, in execution order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Convert one document.
    ///
    /// # Errors
    ///
    /// Returns an error only when placeholder bookkeeping is inconsistent,
    /// which indicates a bug in a handler.
    pub fn convert(&mut self, markdown: &str) -> Result<ConversionResult, ConvertError> {
        let mut text = normalize(markdown);
        let mut store = PlaceholderStore::new();
        let mut report = Report::default();

        for handler in &mut self.handlers {
            handler.prepare(&mut report);
        }

        for handler in &mut self.handlers {
            let mut ctx = HandlerContext {
                store: &mut store,
                base: self.base.as_ref(),
                spans: &self.spans,
                report: &mut report,
            };
            text = handler
                .run(&text, &mut ctx)
                .map_err(|source| ConvertError::Handler {
                    handler: handler.name(),
                    source,
                })?;
        }

        // Spans live only in inline text; code, HTML and link targets stay as written
        let regions: Vec<InlineRegion> = self
            .base
            .inline_regions(&text)
            .into_iter()
            .filter(|region| region.kind == RegionKind::Text)
            .collect();
        let text = self
            .spans
            .protect_regions(&text, &regions, &mut store)
            .map_err(|source| ConvertError::Handler {
                handler: "span",
                source,
            })?;

        let html = self.base.render_document(&text);
        let html = store.resolve_all(&html)?;

        let leaked = store.pending();
        if leaked > 0 {
            tracing::warn!(leaked, "Protected fragments were dropped by the base converter");
            report
                .warnings
                .push(format!("{leaked} rendered block(s) were lost by the base converter"));
        }

        let (html, counters) = match &self.numbering {
            Some(labels) => number_elements(&html, Counters::default(), labels),
            None => (html, Counters::default()),
        };

        tracing::debug!(
            fragments = store.len(),
            warnings = report.warnings.len(),
            failures = report.failures.len(),
            "Document converted"
        );

        Ok(ConversionResult {
            html,
            warnings: report.warnings,
            failures: report.failures,
            counters,
        })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize line endings, strip the placeholder sentinel and end with a newline.
fn normalize(text: &str) -> String {
    let mut out = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(SENTINEL, "");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fence::replace_blocks;
    use crate::handler::DIAGRAM_PRIORITY;
    use crate::placeholder::PlaceholderError;
    use pretty_assertions::assert_eq;

    fn convert(markdown: &str) -> ConversionResult {
        Converter::new().convert(markdown).unwrap()
    }

    #[test]
    fn test_plain_markdown() {
        let result = Converter::new()
            .without_numbering()
            .convert("Some *text*.")
            .unwrap();
        assert_eq!(result.html, "<p>Some <em>text</em>.</p>\n");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_table_example() {
        let result = convert("|A|B| \"t1\"\n|-:|:-:|\n|1|2|\n");
        assert_eq!(
            result.html,
            "<table>\n<caption id=\"table_00_01\">Table 0.1 t1</caption>\n<thead>\n\
             <tr><th align=\"right\">A</th><th align=\"center\">B</th></tr>\n\
             </thead>\n<tbody>\n<tr><td>1</td><td>2</td></tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_four_backtick_fence_holds_three() {
        let result = Converter::new()
            .without_numbering()
            .convert("````md\n```\ninner\n```\n````\n")
            .unwrap();
        assert_eq!(
            result.html,
            "<pre><code class=\"md\">```\ninner\n```\n</code></pre>\n"
        );
    }

    #[test]
    fn test_code_fence_protects_table_and_spans() {
        let result = Converter::new()
            .without_numbering()
            .convert("```\n|a|b|\n|-|-|\n~~x~~ `k`\n```\n")
            .unwrap();
        assert_eq!(
            result.html,
            "<pre><code>|a|b|\n|-|-|\n~~x~~ `k`\n</code></pre>\n"
        );
    }

    #[test]
    fn test_spans_in_paragraph() {
        let result = convert("Press `Ctrl` and ~~wait~~ go.\n");
        assert_eq!(
            result.html,
            "<p>Press <code class=\"key\">Ctrl</code> and <del>wait</del> go.</p>\n"
        );
    }

    #[test]
    fn test_numbering_example() {
        let markdown = "# One\n\n## One.A\n\n```rust \"Main\"\nfn main() {}\n```\n\n\
                        # Two\n\n## Two.A\n\n```rust \"Other\"\nfn other() {}\n```\n";
        let result = convert(markdown);

        assert!(result.html.contains("<h2 id=\"sec_01_01_00\">1.1 One.A</h2>"));
        assert!(result.html.contains("<h2 id=\"sec_02_01_00\">2.1 Two.A</h2>"));
        assert!(result.html.contains("<figcaption id=\"list_01_01\">List 1.1 Main</figcaption>"));
        assert!(result.html.contains("<figcaption id=\"list_02_01\">List 2.1 Other</figcaption>"));
        assert_eq!(result.counters.chapter, 2);
        assert_eq!(result.counters.list, 1);
    }

    #[test]
    fn test_numbering_disabled() {
        let result = Converter::new()
            .without_numbering()
            .convert("# Title\n")
            .unwrap();
        assert_eq!(result.html, "<h1>Title</h1>\n");
        assert_eq!(result.counters, Counters::default());
    }

    #[test]
    fn test_sentinel_in_input_is_stripped() {
        let result = Converter::new()
            .without_numbering()
            .convert("a\u{1A}B0\u{1A}b\n")
            .unwrap();
        assert_eq!(result.html, "<p>aB0b</p>\n");
    }

    #[test]
    fn test_crlf_input() {
        let result = Converter::new()
            .without_numbering()
            .convert("```\r\nx\r\n```\r\n")
            .unwrap();
        assert_eq!(result.html, "<pre><code>x\n</code></pre>\n");
    }

    #[test]
    fn test_unterminated_fence_is_text() {
        let result = Converter::new()
            .without_numbering()
            .convert("```\nnot closed\n")
            .unwrap();
        assert!(!result.html.contains("\u{1A}"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let markdown = "# A\n\n|x|y|\n|-|-|\n|`1`|~~2~~|\n\n```sh \"Run\"\nls\n```\n";
        let first = convert(markdown);
        let second = convert(markdown);
        assert_eq!(first.html, second.html);
    }

    #[test]
    fn test_custom_key_transform() {
        let result = Converter::new()
            .without_numbering()
            .with_key_transform(std::sync::Arc::new(|body: &str, _: Option<&str>| {
                format!("<kbd>{body}</kbd>")
            }))
            .convert("`Esc`\n")
            .unwrap();
        assert_eq!(result.html, "<p><code class=\"key\"><kbd>Esc</kbd></code></p>\n");
    }

    struct Bang;

    impl BlockHandler for Bang {
        fn name(&self) -> &'static str {
            "bang"
        }

        fn priority(&self) -> u32 {
            DIAGRAM_PRIORITY
        }

        fn prepare(&mut self, report: &mut Report) {
            report.warnings.push("prepared".to_owned());
        }

        fn run(
            &mut self,
            text: &str,
            ctx: &mut HandlerContext<'_>,
        ) -> Result<String, PlaceholderError> {
            replace_blocks(text, &['!'], |block| {
                ctx.store
                    .store_block(&format!("<aside>{}</aside>", block.body.trim()))
            })
        }
    }

    #[test]
    fn test_custom_handler() {
        let mut converter = Converter::new().without_numbering().with_handler(Bang);
        assert_eq!(converter.handler_names(), vec!["code", "table", "bang"]);

        let result = converter.convert("!!!\nhey\n!!!\n").unwrap();
        assert_eq!(result.html, "<aside>hey</aside>\n");
        assert_eq!(result.warnings, vec!["prepared"]);
    }

    #[test]
    fn test_handler_with_same_name_replaces() {
        let converter = Converter::new().with_code_options(CodeBlockOptions {
            class_prefix: "language-".to_owned(),
            ..CodeBlockOptions::default()
        });
        assert_eq!(converter.handler_names(), vec!["code", "table"]);
    }

    #[test]
    fn test_block_inside_list_item_leaks_nothing() {
        let result = Converter::new()
            .without_numbering()
            .convert("- item\n\n  text\n\n```\ncode\n```\n")
            .unwrap();
        assert!(result.html.contains("<pre><code>code\n</code></pre>"));
        assert!(result.warnings.is_empty());
    }

    fn plain(markdown: &str) -> String {
        Converter::new()
            .without_numbering()
            .convert(markdown)
            .unwrap()
            .html
    }

    #[test]
    fn test_spans_in_inline_text() {
        assert_eq!(
            plain("a ~~b~~ and `k`\n"),
            "<p>a <del>b</del> and <code class=\"key\">k</code></p>\n"
        );
    }

    #[test]
    fn test_link_destination_untouched() {
        assert_eq!(
            plain("[home](http://host/~alice/~bob)\n"),
            "<p><a href=\"http://host/~alice/~bob\">home</a></p>\n"
        );
    }

    #[test]
    fn test_autolink_untouched() {
        assert_eq!(
            plain("<https://host/~alice/~x>\n"),
            "<p><a href=\"https://host/~alice/~x\">https://host/~alice/~x</a></p>\n"
        );
    }

    #[test]
    fn test_indented_code_keeps_backticks() {
        assert_eq!(
            plain("    echo `date`\n"),
            "<pre><code>echo `date`\n</code></pre>\n"
        );
    }

    #[test]
    fn test_fence_nested_in_list_item_stays_code() {
        let html = plain("- item\n\n  ```\n  let x = 1;\n  ```\n");
        assert!(html.contains("<pre><code>let x = 1;\n</code></pre>"));
        assert!(!html.contains("class=\"key\""));
    }

    #[test]
    fn test_html_attribute_untouched() {
        assert_eq!(
            plain("<div title=\"~a~\">\n</div>\n"),
            "<div title=\"~a~\">\n</div>\n"
        );
        assert_eq!(
            plain("x <span title=\"~a~\">y</span>\n"),
            "<p>x <span title=\"~a~\">y</span></p>\n"
        );
    }
}
