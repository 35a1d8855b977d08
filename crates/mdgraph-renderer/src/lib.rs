//! Markdown extension pipeline.
//!
//! This crate layers block and span extensions on top of a base Markdown
//! converter:
//!
//! - fenced code blocks with optional captions ([`CodeBlockHandler`])
//! - pipe tables with captions and column alignment ([`TableHandler`])
//! - `~~delete~~` and `` `key` `` spans ([`SpanRenderer`])
//! - hierarchical numbering of headings, figures, listings and tables
//!   ([`number_elements`])
//!
//! # Architecture
//!
//! Each extension renders its region to HTML and replaces it with an opaque
//! token from a [`PlaceholderStore`], so later passes never reinterpret
//! rendered markup. The [`Converter`] runs the stages in order:
//!
//! 1. Block handlers, by ascending [`BlockHandler::priority`]
//! 2. Inline span pass over the text regions found by [`BaseConverter::inline_regions`]
//! 3. Base converter ([`CmarkConverter`] by default)
//! 4. Placeholder resolution
//! 5. Numbering
//!
//! Additional fenced syntaxes plug in through the [`BlockHandler`] trait; the
//! `mdgraph-diagrams` crate uses it for rendered diagram blocks.
//!
//! # Example
//!
//! ```
//! use mdgraph_renderer::Converter;
//!
//! let markdown = "# Setup\n\n```sh \"Install\"\nmake install\n```\n";
//! let result = Converter::new().convert(markdown).unwrap();
//!
//! assert!(result.html.contains("<figcaption id=\"list_01_01\">List 1.1 Install</figcaption>"));
//! ```

mod attrs;
mod base;
mod code_block;
mod converter;
mod error;
mod fence;
mod handler;
mod numbering;
mod placeholder;
mod span;
mod table;
mod util;

pub use attrs::AttributeList;
pub use base::{BaseConverter, CmarkConverter, InlineRegion, RegionKind};
pub use code_block::{CODE_FENCE_MARKERS, CodeBlockHandler, CodeBlockOptions, render_code_block};
pub use converter::{ConversionResult, Converter};
pub use error::ConvertError;
pub use fence::{BlockMatch, FenceMeta, MIN_FENCE_LEN, replace_blocks};
pub use handler::{
    BlockHandler, CODE_PRIORITY, DIAGRAM_PRIORITY, HandlerContext, RenderFailure, Report,
    TABLE_PRIORITY,
};
pub use numbering::{Counters, ElementKind, NumberingLabels, number_elements};
pub use placeholder::{PlaceholderError, PlaceholderKind, PlaceholderStore, SENTINEL};
pub use span::{ContentTransform, SpanRenderer};
pub use table::{Alignment, TableHandler};
pub use util::escape_html;
