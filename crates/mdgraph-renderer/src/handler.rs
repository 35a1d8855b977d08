//! Block handler trait.
//!
//! A block handler recognizes one fenced-region syntax, renders it, and
//! replaces it with a placeholder token. Handlers run over the whole buffer
//! in ascending [`priority`](BlockHandler::priority) order.

use crate::base::BaseConverter;
use crate::placeholder::{PlaceholderError, PlaceholderStore};
use crate::span::SpanRenderer;

/// Priority of the fenced code handler.
pub const CODE_PRIORITY: u32 = 5;
/// Priority of the table handler.
pub const TABLE_PRIORITY: u32 = 15;
/// Priority of the diagram handler.
pub const DIAGRAM_PRIORITY: u32 = 100;

/// A failed external render, reported instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    /// Cache key of the diagram that failed.
    pub key: String,
    /// Output format being produced.
    pub format: String,
    /// Exit code, if the tool ran and exited normally.
    pub status: Option<i32>,
    /// Captured error output or the spawn error message.
    pub output: String,
}

/// Diagnostics collected while converting one document.
#[derive(Debug, Default)]
pub struct Report {
    /// Lenient conditions worth telling the user about.
    pub warnings: Vec<String>,
    /// External render failures.
    pub failures: Vec<RenderFailure>,
}

/// Everything a handler may use while rendering a block.
pub struct HandlerContext<'a> {
    /// Placeholder store for the current conversion.
    pub store: &'a mut PlaceholderStore,
    /// Base converter for captions and cell contents.
    pub base: &'a dyn BaseConverter,
    /// Inline span handlers, for protecting code spans before splitting.
    pub spans: &'a SpanRenderer,
    /// Diagnostics sink.
    pub report: &'a mut Report,
}

impl HandlerContext<'_> {
    /// Replace inline spans and inline HTML tags in `text` with placeholders.
    ///
    /// Used before splitting a line on syntax characters such as `|`, so a
    /// code span or tag attribute holding one is kept whole.
    pub fn protect_inline(&mut self, text: &str) -> Result<String, PlaceholderError> {
        let regions = self.base.inline_regions(text);
        self.spans.protect_regions(text, &regions, self.store)
    }

    /// Render a caption through both the inline spans and the base grammar.
    pub fn render_inline(&mut self, text: &str) -> Result<String, PlaceholderError> {
        let protected = self.protect_inline(text)?;
        Ok(self.base.render_inline(&protected))
    }
}

/// Recognizes and replaces one block syntax.
///
/// # Example
///
/// ```
/// use mdgraph_renderer::{BlockHandler, HandlerContext, PlaceholderError, replace_blocks};
///
/// struct Shout;
///
/// impl BlockHandler for Shout {
///     fn name(&self) -> &'static str {
///         "shout"
///     }
///
///     fn priority(&self) -> u32 {
///         50
///     }
///
///     fn run(
///         &mut self,
///         text: &str,
///         ctx: &mut HandlerContext<'_>,
///     ) -> Result<String, PlaceholderError> {
///         replace_blocks(text, &['!'], |block| {
///             ctx.store
///                 .store_block(&format!("<strong>{}</strong>", block.body.trim()))
///         })
///     }
/// }
/// ```
pub trait BlockHandler {
    /// Short name, unique within a pipeline.
    fn name(&self) -> &'static str;

    /// Position in the handler order (lower runs first).
    fn priority(&self) -> u32;

    /// Called once at the start of every conversion, before any `run`.
    fn prepare(&mut self, _report: &mut Report) {}

    /// Replace every block this handler recognizes in `text`.
    fn run(&mut self, text: &str, ctx: &mut HandlerContext<'_>)
    -> Result<String, PlaceholderError>;
}
