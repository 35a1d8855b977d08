//! Diagram block handler.
//!
//! Recognizes `@@@` fenced blocks, renders their body through a
//! [`DiagramTool`] into the render cache, and replaces them with a figure
//! referencing the rendered image.

use std::collections::HashMap;

use mdgraph_cache::{CacheEntry, RenderCache};
use mdgraph_renderer::{
    BlockHandler, BlockMatch, CodeBlockOptions, DIAGRAM_PRIORITY, HandlerContext,
    PlaceholderError, RenderFailure, Report, escape_html, render_code_block, replace_blocks,
};

use crate::format::ImageFormat;
use crate::key::DiagramKey;
use crate::tool::DiagramTool;

/// Fence character of diagram blocks.
pub const DIAGRAM_MARKER: char = '@';

/// Handler for `@@@` diagram blocks.
///
/// Without a tool the handler runs in renderer-disabled mode: blocks are
/// emitted as code blocks and the cache is never touched.
///
/// # Example
///
/// ```no_run
/// use mdgraph_cache::FileRenderCache;
/// use mdgraph_diagrams::{CommandTool, DiagramHandler, ImageFormat};
/// use mdgraph_renderer::Converter;
///
/// let handler = DiagramHandler::new(FileRenderCache::new("graph/src", "graph/img"))
///     .tool(CommandTool::new("dot"))
///     .formats(vec![ImageFormat::Svg, ImageFormat::Png])
///     .url_prefix("graph/img/");
///
/// let mut converter = Converter::new().with_handler(handler);
/// let result = converter.convert("@@@ \"Flow\"\ndigraph { a -> b }\n@@@\n").unwrap();
/// ```
pub struct DiagramHandler {
    cache: Box<dyn RenderCache>,
    tool: Option<Box<dyn DiagramTool>>,
    formats: Vec<ImageFormat>,
    url_prefix: String,
    class_prefix: String,
    code_options: CodeBlockOptions,
    /// Cache keys used in the current conversion, with their content hash.
    seen: HashMap<String, String>,
}

impl DiagramHandler {
    /// Create a handler storing renders in `cache`, with no tool configured.
    #[must_use]
    pub fn new(cache: impl RenderCache + 'static) -> Self {
        Self {
            cache: Box::new(cache),
            tool: None,
            formats: vec![ImageFormat::Svg],
            url_prefix: String::new(),
            class_prefix: String::new(),
            code_options: CodeBlockOptions::default(),
            seen: HashMap::new(),
        }
    }

    /// Render diagrams with `tool`.
    #[must_use]
    pub fn tool(mut self, tool: impl DiagramTool + 'static) -> Self {
        self.tool = Some(Box::new(tool));
        self
    }

    /// Set the output formats; the first one is referenced from the figure.
    ///
    /// An empty list is ignored.
    #[must_use]
    pub fn formats(mut self, formats: Vec<ImageFormat>) -> Self {
        if !formats.is_empty() {
            self.formats = formats;
        }
        self
    }

    /// Prefix prepended to image file names in emitted URLs.
    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Prefix added to the block's class name on the image element.
    #[must_use]
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Code block options used in renderer-disabled mode.
    #[must_use]
    pub fn code_options(mut self, options: CodeBlockOptions) -> Self {
        self.code_options = options;
        self
    }

    fn render_block(
        &mut self,
        block: &BlockMatch,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<String, PlaceholderError> {
        if self.tool.is_none() {
            return render_code_block(block, &self.code_options, ctx);
        }

        let key = DiagramKey::new(&block.body, block.caption.as_deref());
        let (cache_key, rendered) = self.claim_key(&key, ctx.report);

        let extensions: Vec<&str> = self.formats.iter().map(|f| f.as_str()).collect();
        let entry = self
            .cache
            .entry(&cache_key, &key.content_hash, &extensions);

        if rendered {
            tracing::debug!(cache_key = %cache_key, "Diagram already rendered in this document");
        } else if self.cache.is_fresh(&entry) {
            tracing::debug!(cache_key = %cache_key, "Diagram cache hit");
        } else if let Some(tool) = self.tool.as_deref() {
            tracing::debug!(cache_key = %cache_key, "Diagram cache miss");
            regenerate(
                self.cache.as_ref(),
                tool,
                &self.formats,
                &entry,
                &block.body,
                ctx.report,
            );
        }

        self.figure(block, &cache_key, ctx)
    }

    /// Reserve the cache key for this block.
    ///
    /// Returns the key to use and whether it was already rendered earlier in
    /// the same conversion. A key reused for different content gets the
    /// first eight hash digits appended.
    fn claim_key(&mut self, key: &DiagramKey, report: &mut Report) -> (String, bool) {
        match self.seen.get(&key.cache_key) {
            None => {
                self.seen
                    .insert(key.cache_key.clone(), key.content_hash.clone());
                (key.cache_key.clone(), false)
            }
            Some(hash) if *hash == key.content_hash => (key.cache_key.clone(), true),
            Some(_) => {
                let renamed = format!("{}_{}", key.cache_key, &key.content_hash[..8]);
                tracing::warn!(
                    cache_key = %key.cache_key,
                    renamed = %renamed,
                    "Duplicate diagram cache key"
                );
                report.warnings.push(format!(
                    "duplicate diagram key \"{}\" with different content, using \"{renamed}\"",
                    key.cache_key
                ));
                let rendered = self
                    .seen
                    .insert(renamed.clone(), key.content_hash.clone())
                    .is_some();
                (renamed, rendered)
            }
        }
    }

    fn figure(
        &self,
        block: &BlockMatch,
        cache_key: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<String, PlaceholderError> {
        let format = self.formats.first().copied().unwrap_or_default();
        let url = escape_html(&format!(
            "{}{cache_key}.{}",
            self.url_prefix,
            format.as_str()
        ));
        let classes: Vec<String> = block
            .class_name
            .as_ref()
            .map(|c| format!("{}{c}", self.class_prefix))
            .into_iter()
            .collect();
        let attrs = block.attributes.to_html(&classes);

        let image = match format {
            ImageFormat::Svg => {
                format!(r#"<object{attrs} type="image/svg+xml" data="{url}"></object>"#)
            }
            _ => {
                let alt = escape_html(block.caption.as_deref().unwrap_or_default());
                format!(r#"<img{attrs} src="{url}" alt="{alt}">"#)
            }
        };

        Ok(match &block.caption {
            Some(caption) => format!(
                r#"<figure class="diagram"><figcaption>{}</figcaption>{image}</figure>"#,
                ctx.render_inline(caption)?
            ),
            None => format!(r#"<figure class="diagram">{image}</figure>"#),
        })
    }
}

/// Persist the source and render every format, committing only on full success.
fn regenerate(
    cache: &dyn RenderCache,
    tool: &dyn DiagramTool,
    formats: &[ImageFormat],
    entry: &CacheEntry,
    body: &str,
    report: &mut Report,
) {
    cache.invalidate(&entry.cache_key);

    if let Err(e) = cache.write_source(entry, body) {
        tracing::warn!(cache_key = %entry.cache_key, error = %e, "Failed to write diagram source");
        report.warnings.push(format!(
            "failed to write diagram source {}: {e}",
            entry.source_path.display()
        ));
        return;
    }

    let mut complete = true;
    for (format, output) in formats.iter().zip(&entry.output_paths) {
        if let Err(e) = tool.render(&entry.source_path, *format, output) {
            tracing::warn!(
                cache_key = %entry.cache_key,
                format = format.as_str(),
                error = %e,
                "Diagram render failed"
            );
            report.failures.push(RenderFailure {
                key: entry.cache_key.clone(),
                format: format.as_str().to_owned(),
                status: e.code(),
                output: e.output(),
            });
            complete = false;
        }
    }

    if complete && let Err(e) = cache.commit(entry) {
        tracing::warn!(cache_key = %entry.cache_key, error = %e, "Failed to record diagram hash");
        report
            .warnings
            .push(format!("failed to record hash for diagram {}: {e}", entry.cache_key));
    }
}

impl BlockHandler for DiagramHandler {
    fn name(&self) -> &'static str {
        "diagram"
    }

    fn priority(&self) -> u32 {
        DIAGRAM_PRIORITY
    }

    fn prepare(&mut self, report: &mut Report) {
        self.seen.clear();
        if self.tool.is_some()
            && let Err(e) = self.cache.ensure_dirs()
        {
            tracing::warn!(error = %e, "Failed to create diagram directories");
            report
                .warnings
                .push(format!("failed to create diagram directories: {e}"));
        }
    }

    fn run(
        &mut self,
        text: &str,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<String, PlaceholderError> {
        replace_blocks(text, &[DIAGRAM_MARKER], |block| {
            let html = self.render_block(&block, ctx)?;
            ctx.store.store_block(&html)
        })
    }
}
