//! Content hashes and cache keys.

use sha2::{Digest, Sha256};

/// Identity of one diagram block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramKey {
    /// SHA-256 of the block body, hex encoded.
    pub content_hash: String,
    /// Filesystem-safe name for the cached files.
    ///
    /// The sanitized caption when there is one, the content hash otherwise.
    pub cache_key: String,
}

impl DiagramKey {
    /// Compute the key for a block body and its optional caption.
    #[must_use]
    pub fn new(body: &str, caption: Option<&str>) -> Self {
        let content_hash = content_hash(body);
        let cache_key = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map_or_else(|| content_hash.clone(), sanitize);
        Self {
            content_hash,
            cache_key,
        }
    }
}

/// Hash a diagram body.
#[must_use]
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
fn sanitize(caption: &str) -> String {
    caption
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_content_hash() {
        let hash = content_hash("digraph { a -> b }\n");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("digraph { a -> b }\n"));
        assert_ne!(hash, content_hash("digraph { b -> a }\n"));
    }

    #[test]
    fn test_known_hash() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_key_from_caption() {
        let key = DiagramKey::new("x", Some("Data flow: v2/final"));
        assert_eq!(key.cache_key, "Data_flow__v2_final");
    }

    #[test]
    fn test_key_without_caption_is_hash() {
        let key = DiagramKey::new("x", None);
        assert_eq!(key.cache_key, key.content_hash);

        let blank = DiagramKey::new("x", Some("   "));
        assert_eq!(blank.cache_key, blank.content_hash);
    }

    #[test]
    fn test_non_ascii_caption() {
        let key = DiagramKey::new("x", Some("Überblick"));
        assert_eq!(key.cache_key, "_berblick");
    }

    #[test]
    fn test_caption_changes_key_not_hash() {
        let plain = DiagramKey::new("a -> b", None);
        let captioned = DiagramKey::new("a -> b", Some("Flow"));

        assert_ne!(plain.cache_key, captioned.cache_key);
        assert_eq!(plain.content_hash, captioned.content_hash);
    }
}
