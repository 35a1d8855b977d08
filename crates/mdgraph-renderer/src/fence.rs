//! Delimiter-block matching.
//!
//! Finds fenced regions of the form
//!
//! ````text
//! @@@ .class "Caption" {#id key=value}
//! body lines
//! @@@
//! ````
//!
//! and hands each one to a callback that returns the replacement text.
//!
//! Matching is a two-phase line scan: find a candidate opening line, then
//! search forward for a line equal to the captured marker. The closing line
//! must repeat the opening marker exactly (same character, same length) with
//! only trailing whitespace, so a four-backtick fence can hold literal
//! three-backtick lines. A candidate without a closing line is left as
//! ordinary text.

use crate::attrs::AttributeList;

/// Minimum number of marker characters in a fence.
pub const MIN_FENCE_LEN: usize = 3;

/// A fenced block found by [`replace_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// Exact opening marker (e.g. `"````"`); the closing line repeats it.
    pub marker: String,
    /// Class token from the metadata line, without a leading `.`.
    pub class_name: Option<String>,
    /// Quoted caption from the metadata line.
    pub caption: Option<String>,
    /// Extra attribute list from the metadata line.
    pub attributes: AttributeList,
    /// Lines between the opening and closing marker, verbatim.
    pub body: String,
}

/// Metadata parsed from the remainder of an opening line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FenceMeta {
    pub class_name: Option<String>,
    pub caption: Option<String>,
    pub attributes: AttributeList,
}

impl FenceMeta {
    /// Parse `[.]class "caption" {attrs}`, each part optional, in that order.
    ///
    /// Parsing is lenient: anything that does not fit the expected shape
    /// (an unbalanced quote, a missing `}`, trailing words) is kept in
    /// `attributes.rest` and the parts before it still count.
    ///
    /// ```
    /// use mdgraph_renderer::FenceMeta;
    ///
    /// let meta = FenceMeta::parse(r#".dot "Call graph" {#g1}"#);
    /// assert_eq!(meta.class_name.as_deref(), Some("dot"));
    /// assert_eq!(meta.caption.as_deref(), Some("Call graph"));
    /// assert_eq!(meta.attributes.id.as_deref(), Some("g1"));
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut meta = Self::default();
        let mut rest = input.trim();

        // Class name
        let class_src = rest.strip_prefix('.').unwrap_or(rest);
        let class_len = class_src
            .find(|c: char| !is_class_char(c))
            .unwrap_or(class_src.len());
        if class_len > 0 {
            meta.class_name = Some(class_src[..class_len].to_owned());
            rest = class_src[class_len..].trim_start();
        }

        // Caption
        if let Some(quoted) = rest.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => {
                    let caption = quoted[..end].trim();
                    if !caption.is_empty() {
                        meta.caption = Some(caption.to_owned());
                    }
                    rest = quoted[end + 1..].trim_start();
                }
                None => {
                    meta.attributes.rest = rest.to_owned();
                    return meta;
                }
            }
        }

        // Attribute list
        if let Some(braced) = rest.strip_prefix('{') {
            let (inner, trailing) = match braced.find('}') {
                Some(end) => (&braced[..end], braced[end + 1..].trim()),
                None => (braced, ""),
            };
            meta.attributes = AttributeList::parse(inner);
            rest = trailing;
        }

        if !rest.is_empty() {
            if !meta.attributes.rest.is_empty() {
                meta.attributes.rest.push(' ');
            }
            meta.attributes.rest.push_str(rest);
        }

        meta
    }
}

fn is_class_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')
}

/// Recognize an opening line, returning the marker and the metadata text.
///
/// The line must start in column 0 with at least [`MIN_FENCE_LEN`] copies of
/// one of `markers`.
fn parse_open_line<'a>(line: &'a str, markers: &[char]) -> Option<(&'a str, &'a str)> {
    let first = line.chars().next()?;
    if !markers.contains(&first) {
        return None;
    }
    let count = line.chars().take_while(|&c| c == first).count();
    if count < MIN_FENCE_LEN {
        return None;
    }
    // Marker characters are ASCII, one byte each
    Some((&line[..count], &line[count..]))
}

/// Whether `line` closes a block opened with `marker`.
fn is_close_line(line: &str, marker: &str) -> bool {
    line.trim_end_matches([' ', '\t', '\r']) == marker
}

/// Replace every fenced block in `text` with the output of `handler`.
///
/// `markers` lists the characters a fence may be built from; the closing
/// line must use the same character and length as the opening one. The
/// replacement is surrounded by blank lines so it forms a block of its own.
///
/// ```
/// use mdgraph_renderer::replace_blocks;
///
/// let text = "before\n@@@ .dot\na -> b\n@@@\nafter\n";
/// let out = replace_blocks(text, &['@'], |block| {
///     Ok::<_, ()>(format!("[{}]", block.body.trim()))
/// })
/// .unwrap();
/// assert_eq!(out, "before\n\n\n[a -> b]\n\nafter\n");
/// ```
pub fn replace_blocks<F, E>(text: &str, markers: &[char], mut handler: F) -> Result<String, E>
where
    F: FnMut(BlockMatch) -> Result<String, E>,
{
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut output = String::with_capacity(text.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let content = line.strip_suffix('\n').unwrap_or(line);

        let Some((marker, meta)) = parse_open_line(content, markers) else {
            output.push_str(line);
            i += 1;
            continue;
        };

        let Some(close) = (i + 1..lines.len()).find(|&j| {
            let candidate = lines[j].strip_suffix('\n').unwrap_or(lines[j]);
            is_close_line(candidate, marker)
        }) else {
            // Unterminated: not a block, keep the line as text
            output.push_str(line);
            i += 1;
            continue;
        };

        let meta = FenceMeta::parse(meta);
        let block = BlockMatch {
            marker: marker.to_owned(),
            class_name: meta.class_name,
            caption: meta.caption,
            attributes: meta.attributes,
            body: lines[i + 1..close].concat(),
        };

        output.push_str("\n\n");
        output.push_str(&handler(block)?);
        output.push_str("\n\n");
        i = close + 1;
    }

    Ok(output)
}
