//! Diagram blocks for mdgraph.
//!
//! Diagram source fenced with `@@@` is rendered by an external layout tool
//! (Graphviz `dot` by default) and replaced with a figure referencing the
//! rendered image:
//!
//! ````markdown
//! @@@ dot "Request flow" {#flow}
//! digraph { client -> server -> db }
//! @@@
//! ````
//!
//! # Caching
//!
//! Rendered files are named by a cache key: the sanitized caption, or the
//! SHA-256 content hash when there is no caption. The content hash of the
//! last successful render is stored next to the source; a diagram is only
//! rendered again when its body changed or an output file went missing.
//!
//! # Modules
//!
//! - [`DiagramHandler`]: block handler plugged into the renderer pipeline
//! - [`DiagramKey`]: content hash and cache key computation
//! - [`DiagramTool`] / [`CommandTool`]: external tool invocation
//! - [`ImageFormat`]: supported output formats

mod format;
mod handler;
mod key;
mod tool;

pub use format::ImageFormat;
pub use handler::{DIAGRAM_MARKER, DiagramHandler};
pub use key::{DiagramKey, content_hash};
pub use tool::{CommandTool, DiagramTool, ToolError};
