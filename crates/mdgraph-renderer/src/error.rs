//! Conversion errors.

use crate::placeholder::PlaceholderError;

/// Error aborting a conversion.
///
/// Only internal invariant violations end up here; malformed input is always
/// rendered best-effort and reported through warnings.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A handler produced inconsistent placeholders.
    #[error("{handler} handler failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: PlaceholderError,
    },
    /// Final placeholder resolution failed.
    #[error("failed to resolve placeholders: {0}")]
    Resolve(#[from] PlaceholderError),
}
