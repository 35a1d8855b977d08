//! Extra attribute list parsing.
//!
//! Parses the `{#id .class key="value"}` syntax that may close a fence's
//! metadata line, and renders it back as HTML attributes.

use std::fmt::Write;

use crate::util::escape_html;

/// Attributes parsed from an extra attribute list.
///
/// # Example
///
/// ```
/// use mdgraph_renderer::AttributeList;
///
/// let attrs = AttributeList::parse(r#"#main .wide width="80%""#);
/// assert_eq!(attrs.id.as_deref(), Some("main"));
/// assert_eq!(attrs.classes, vec!["wide"]);
/// assert_eq!(attrs.get("width"), Some("80%"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttributeList {
    /// ID from `#id`.
    pub id: Option<String>,
    /// Classes from `.class`, in source order.
    pub classes: Vec<String>,
    /// Key-value pairs, in source order.
    pub attrs: Vec<(String, String)>,
    /// Text that could not be parsed (bare words, unbalanced quotes).
    pub rest: String,
}

impl AttributeList {
    /// Parse an attribute string (without the surrounding braces).
    ///
    /// Parsing never fails: whatever is understood is kept and the rest is
    /// collected into [`rest`](Self::rest).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut list = Self::default();
        let mut remaining = input.trim();

        while !remaining.is_empty() {
            if let Some(after) = remaining.strip_prefix('#') {
                let end = name_end(after);
                if end > 0 {
                    list.id = Some(after[..end].to_owned());
                }
                remaining = after[end..].trim_start();
            } else if let Some(after) = remaining.strip_prefix('.') {
                let end = name_end(after);
                if end > 0 {
                    list.classes.push(after[..end].to_owned());
                }
                remaining = after[end..].trim_start();
            } else {
                match parse_key_value(remaining) {
                    KeyValue::Parsed(key, value, rest) => {
                        list.attrs.push((key.to_owned(), value.to_owned()));
                        remaining = rest.trim_start();
                    }
                    KeyValue::Unterminated => {
                        list.push_rest(remaining);
                        break;
                    }
                    KeyValue::NotKeyValue => {
                        let end = remaining
                            .find(char::is_whitespace)
                            .unwrap_or(remaining.len());
                        list.push_rest(&remaining[..end]);
                        remaining = remaining[end..].trim_start();
                    }
                }
            }
        }

        list
    }

    /// Whether nothing usable was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    /// Get an attribute value by key (first occurrence).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render as an HTML attribute string with a leading space per attribute.
    ///
    /// `extra_classes` come first in the `class` attribute, followed by the
    /// classes from the list itself. Returns an empty string when there is
    /// nothing to render.
    ///
    /// ```
    /// use mdgraph_renderer::AttributeList;
    ///
    /// let attrs = AttributeList::parse("#g1 .big");
    /// assert_eq!(
    ///     attrs.to_html(&["graph".to_owned()]),
    ///     r#" id="g1" class="graph big""#
    /// );
    /// ```
    #[must_use]
    pub fn to_html(&self, extra_classes: &[String]) -> String {
        let mut out = String::new();

        if let Some(id) = &self.id {
            write!(out, r#" id="{}""#, escape_html(id)).unwrap();
        }

        let classes: Vec<&str> = extra_classes
            .iter()
            .chain(&self.classes)
            .map(String::as_str)
            .collect();
        if !classes.is_empty() {
            write!(out, r#" class="{}""#, escape_html(&classes.join(" "))).unwrap();
        }

        for (key, value) in &self.attrs {
            write!(out, r#" {}="{}""#, escape_html(key), escape_html(value)).unwrap();
        }

        out
    }

    fn push_rest(&mut self, text: &str) {
        if !self.rest.is_empty() {
            self.rest.push(' ');
        }
        self.rest.push_str(text);
    }
}

/// Byte length of an id or class name at the start of `s`.
fn name_end(s: &str) -> usize {
    s.find(|c: char| c.is_whitespace() || c == '.' || c == '#')
        .unwrap_or(s.len())
}

enum KeyValue<'a> {
    Parsed(&'a str, &'a str, &'a str),
    Unterminated,
    NotKeyValue,
}

/// Parse `key=value`, `key="value"` or `key='value'` at the start of `s`.
fn parse_key_value(s: &str) -> KeyValue<'_> {
    let word_end = s.find(char::is_whitespace).unwrap_or(s.len());
    let Some(eq_pos) = s[..word_end].find('=') else {
        return KeyValue::NotKeyValue;
    };
    let key = &s[..eq_pos];
    if key.is_empty() {
        return KeyValue::NotKeyValue;
    }

    let after_eq = &s[eq_pos + 1..];
    for quote in ['"', '\''] {
        if let Some(stripped) = after_eq.strip_prefix(quote) {
            return match stripped.find(quote) {
                Some(end) => KeyValue::Parsed(key, &stripped[..end], &stripped[end + 1..]),
                None => KeyValue::Unterminated,
            };
        }
    }

    let end = after_eq
        .find(char::is_whitespace)
        .unwrap_or(after_eq.len());
    KeyValue::Parsed(key, &after_eq[..end], &after_eq[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty() {
        let attrs = AttributeList::parse("");
        assert!(attrs.is_empty());
        assert_eq!(attrs.rest, "");
        assert_eq!(attrs.to_html(&[]), "");
    }

    #[test]
    fn test_id_and_classes() {
        let attrs = AttributeList::parse("#intro .a.b .c");
        assert_eq!(attrs.id, Some("intro".to_owned()));
        assert_eq!(attrs.classes, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_key_values_keep_order() {
        let attrs = AttributeList::parse(r#"width=100 title="A title" lang='en'"#);
        assert_eq!(
            attrs.attrs,
            vec![
                ("width".to_owned(), "100".to_owned()),
                ("title".to_owned(), "A title".to_owned()),
                ("lang".to_owned(), "en".to_owned()),
            ]
        );
        assert_eq!(attrs.get("title"), Some("A title"));
        assert_eq!(attrs.get("missing"), None);
    }

    #[test]
    fn test_unbalanced_quote_goes_to_rest() {
        let attrs = AttributeList::parse(r#"#x title="unterminated value"#);
        assert_eq!(attrs.id, Some("x".to_owned()));
        assert!(attrs.attrs.is_empty());
        assert_eq!(attrs.rest, r#"title="unterminated value"#);
    }

    #[test]
    fn test_bare_words_go_to_rest() {
        let attrs = AttributeList::parse("#x stray .cls");
        assert_eq!(attrs.id, Some("x".to_owned()));
        assert_eq!(attrs.classes, vec!["cls"]);
        assert_eq!(attrs.rest, "stray");
    }

    #[test]
    fn test_to_html_escapes_values() {
        let attrs = AttributeList::parse(r#"title="a<b""#);
        assert_eq!(attrs.to_html(&[]), r#" title="a&lt;b""#);
    }

    #[test]
    fn test_to_html_extra_classes_first() {
        let attrs = AttributeList::parse(".mine data-x=1");
        assert_eq!(
            attrs.to_html(&["lang-dot".to_owned()]),
            r#" class="lang-dot mine" data-x="1""#
        );
    }
}
