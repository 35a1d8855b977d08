//! Placeholder store for protecting rendered HTML.
//!
//! Handlers replace the regions they render with opaque tokens so that later
//! passes (other handlers, the base converter) never reinterpret the markup.
//! Tokens are swapped back for their fragments in a single pass at the end of
//! the conversion.
//!
//! Token format:
//!
//! ```text
//! \u{1A}B12\u{1A}    block fragment #12
//! \u{1A}X3\u{1A}     span fragment #3
//! ```
//!
//! The sentinel character is stripped from input documents, so user text can
//! never forge a token. Neither it nor the kind letter or digits carry any
//! meaning in Markdown block or span grammar.

use std::fmt::Write;

/// Reserved character delimiting placeholder tokens.
pub const SENTINEL: char = '\u{1A}';

/// Kind of protected fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Block-level markup; a paragraph wrapping only this token is dropped.
    Block,
    /// Span-level markup, resolved in place.
    Span,
}

impl PlaceholderKind {
    fn letter(self) -> char {
        match self {
            Self::Block => 'B',
            Self::Span => 'X',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'B' => Some(Self::Block),
            'X' => Some(Self::Span),
            _ => None,
        }
    }
}

/// Placeholder resolution error.
///
/// Every variant indicates an internal invariant violation: a token that was
/// never issued, issued twice, or mangled on its way through the pipeline.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlaceholderError {
    /// Token index was never issued by this store.
    #[error("unknown placeholder #{0}")]
    Unknown(usize),
    /// Token was already swapped back once.
    #[error("placeholder #{0} resolved twice")]
    AlreadyResolved(usize),
    /// Token is truncated or carries an invalid kind/index.
    #[error("malformed placeholder near {0:?}")]
    Malformed(String),
}

/// Issues placeholder tokens and resolves them back to HTML fragments.
///
/// A store lives for exactly one conversion call.
#[derive(Debug, Default)]
pub struct PlaceholderStore {
    fragments: Vec<Option<String>>,
}

impl PlaceholderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect a block-level fragment and return its token.
    pub fn store_block(&mut self, fragment: &str) -> Result<String, PlaceholderError> {
        self.store(PlaceholderKind::Block, fragment)
    }

    /// Protect a span-level fragment and return its token.
    pub fn store_span(&mut self, fragment: &str) -> Result<String, PlaceholderError> {
        self.store(PlaceholderKind::Span, fragment)
    }

    /// Store a fragment, first resolving any tokens nested inside it.
    ///
    /// Resolving at store time keeps [`resolve_all`](Self::resolve_all)
    /// single-pass: a stored fragment never contains tokens.
    pub fn store(
        &mut self,
        kind: PlaceholderKind,
        fragment: &str,
    ) -> Result<String, PlaceholderError> {
        let resolved = self.resolve_all(fragment)?;
        let index = self.fragments.len();
        self.fragments.push(Some(resolved));
        Ok(token(kind, index))
    }

    /// Number of tokens issued so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether no tokens have been issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Number of issued tokens that have not been resolved yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_some()).count()
    }

    /// Replace every token in `text` with its stored fragment.
    ///
    /// Each token resolves exactly once and fragments are never re-scanned.
    /// A block token that the base converter wrapped in a paragraph of its
    /// own (`<p>TOKEN</p>`) replaces the whole paragraph.
    pub fn resolve_all(&mut self, text: &str) -> Result<String, PlaceholderError> {
        if !text.contains(SENTINEL) {
            return Ok(text.to_owned());
        }

        let mut result = String::with_capacity(text.len());
        let mut remaining = text;

        while let Some(start) = remaining.find(SENTINEL) {
            let (kind, index, len) = parse_token(&remaining[start..])?;
            let fragment = self.take(index)?;

            let before = &remaining[..start];
            let after = &remaining[start + len..];
            let (before, after) = match (
                kind,
                before.strip_suffix("<p>"),
                after.strip_prefix("</p>"),
            ) {
                (PlaceholderKind::Block, Some(unwrapped_before), Some(unwrapped_after)) => {
                    (unwrapped_before, unwrapped_after)
                }
                _ => (before, after),
            };

            result.push_str(before);
            result.push_str(&fragment);
            remaining = after;
        }

        result.push_str(remaining);
        Ok(result)
    }

    fn take(&mut self, index: usize) -> Result<String, PlaceholderError> {
        let slot = self
            .fragments
            .get_mut(index)
            .ok_or(PlaceholderError::Unknown(index))?;
        slot.take().ok_or(PlaceholderError::AlreadyResolved(index))
    }
}

fn token(kind: PlaceholderKind, index: usize) -> String {
    let mut token = String::with_capacity(8);
    token.push(SENTINEL);
    token.push(kind.letter());
    write!(token, "{index}").unwrap();
    token.push(SENTINEL);
    token
}

/// Parse a token at the start of `s`, returning its kind, index and byte length.
fn parse_token(s: &str) -> Result<(PlaceholderKind, usize, usize), PlaceholderError> {
    let malformed = || PlaceholderError::Malformed(s.chars().take(12).collect());

    let body = s.strip_prefix(SENTINEL).ok_or_else(malformed)?;
    let end = body.find(SENTINEL).ok_or_else(malformed)?;
    let inner = &body[..end];

    let mut chars = inner.chars();
    let kind = chars
        .next()
        .and_then(PlaceholderKind::from_letter)
        .ok_or_else(malformed)?;
    let index = chars.as_str().parse::<usize>().map_err(|_| malformed())?;

    Ok((kind, index, SENTINEL.len_utf8() * 2 + inner.len()))
}
