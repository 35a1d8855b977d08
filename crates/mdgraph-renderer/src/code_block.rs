//! Fenced code blocks with optional captions.

use std::fmt::Write;

use crate::fence::{BlockMatch, replace_blocks};
use crate::handler::{BlockHandler, CODE_PRIORITY, HandlerContext};
use crate::placeholder::PlaceholderError;
use crate::span::ContentTransform;
use crate::util::{escape_html, trim_leading_blank_lines};

/// Characters a code fence may be built from.
pub const CODE_FENCE_MARKERS: [char; 2] = ['`', '~'];

/// Rendering options for code blocks.
#[derive(Clone, Default)]
pub struct CodeBlockOptions {
    /// Prefix added to the fence's class name (e.g. `"language-"`).
    pub class_prefix: String,
    /// Put the class and extra attributes on `<pre>` instead of `<code>`.
    pub class_on_pre: bool,
    /// Custom body transform; HTML escaping when `None`.
    pub transform: Option<ContentTransform>,
}

impl std::fmt::Debug for CodeBlockOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeBlockOptions")
            .field("class_prefix", &self.class_prefix)
            .field("class_on_pre", &self.class_on_pre)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Render a fenced block as a code block.
///
/// Captioned blocks become `<figure class="listing">` with the caption first,
/// so the numbering pass labels them as listings. Spans in the caption are
/// stored in `ctx.store`.
///
/// ```
/// use mdgraph_renderer::{
///     AttributeList, BlockMatch, CmarkConverter, CodeBlockOptions, HandlerContext,
///     PlaceholderStore, Report, SpanRenderer, render_code_block,
/// };
///
/// let block = BlockMatch {
///     marker: "```".to_owned(),
///     class_name: Some("sh".to_owned()),
///     caption: None,
///     attributes: AttributeList::default(),
///     body: "ls -l\n".to_owned(),
/// };
/// let mut store = PlaceholderStore::new();
/// let mut report = Report::default();
/// let mut ctx = HandlerContext {
///     store: &mut store,
///     base: &CmarkConverter::new(),
///     spans: &SpanRenderer::new(),
///     report: &mut report,
/// };
/// let html = render_code_block(&block, &CodeBlockOptions::default(), &mut ctx).unwrap();
/// assert_eq!(html, "<pre><code class=\"sh\">ls -l\n</code></pre>");
/// ```
pub fn render_code_block(
    block: &BlockMatch,
    options: &CodeBlockOptions,
    ctx: &mut HandlerContext<'_>,
) -> Result<String, PlaceholderError> {
    let body = trim_leading_blank_lines(&block.body);
    let class_name = block.class_name.as_deref();
    let content = match &options.transform {
        Some(transform) => transform(body, class_name),
        None => escape_html(body),
    };

    let classes: Vec<String> = class_name
        .map(|c| format!("{}{c}", options.class_prefix))
        .into_iter()
        .collect();
    let attrs = block.attributes.to_html(&classes);
    let (pre_attrs, code_attrs) = if options.class_on_pre {
        (attrs.as_str(), "")
    } else {
        ("", attrs.as_str())
    };

    let mut out = String::with_capacity(content.len() + 64);
    if let Some(caption) = &block.caption {
        write!(
            out,
            r#"<figure class="listing"><figcaption>{}</figcaption>"#,
            ctx.render_inline(caption)?
        )
        .unwrap();
    }
    write!(out, "<pre{pre_attrs}><code{code_attrs}>{content}</code></pre>").unwrap();
    if block.caption.is_some() {
        out.push_str("</figure>");
    }
    Ok(out)
}

/// Handler for backtick and tilde fenced code blocks.
#[derive(Debug, Default)]
pub struct CodeBlockHandler {
    options: CodeBlockOptions,
}

impl CodeBlockHandler {
    /// Create a handler with the given options.
    #[must_use]
    pub fn new(options: CodeBlockOptions) -> Self {
        Self { options }
    }
}

impl BlockHandler for CodeBlockHandler {
    fn name(&self) -> &'static str {
        "code"
    }

    fn priority(&self) -> u32 {
        CODE_PRIORITY
    }

    fn run(
        &mut self,
        text: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<String, PlaceholderError> {
        replace_blocks(text, &CODE_FENCE_MARKERS, |block| {
            let html = render_code_block(&block, &self.options, ctx)?;
            ctx.store.store_block(&html)
        })
    }
}
