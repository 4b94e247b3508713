//! Inline markup extraction and reinsertion.
//!
//! HTML entries are parsed as plain text. [`extract_tags`] strips the tags and
//! records each one at the plain-text byte offset where it occurred, so the
//! formatter can put them back around rewritten fields.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{partial_escape, resolve_html5_entity, unescape_with};
use regex::Regex;
use tracing::trace;

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").expect("tag regex is valid") // Static pattern, safe to panic
});

/// Tag name and whether the tag closes an element.
#[allow(clippy::expect_used)]
static TAG_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<\s*(/)?\s*([A-Za-z][\w-]*)[^>]*?(/)?\s*>$").expect("tag name regex is valid") // Static pattern, safe to panic
});

/// Elements that never have a closing tag.
const VOID_ELEMENTS: [&str; 6] = ["br", "hr", "img", "wbr", "meta", "input"];

/// Tags removed from a piece of markup, keyed by plain-text offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTags {
    /// (plain-text byte offset, tag text), in document order.
    tags: Vec<(usize, String)>,
}

/// Strips tags from `raw`, unescaping character references in the text.
///
/// Returns the plain text and the removed tags with their plain-text offsets.
#[must_use]
pub fn extract_tags(raw: &str) -> (String, ExtractedTags) {
    let mut plain = String::with_capacity(raw.len());
    let mut tags = Vec::new();
    let mut cursor = 0;
    for tag in TAG_PATTERN.find_iter(raw) {
        plain.push_str(&unescape(&raw[cursor..tag.start()]));
        tags.push((plain.len(), tag.as_str().to_string()));
        cursor = tag.end();
    }
    plain.push_str(&unescape(&raw[cursor..]));
    trace!(tags = tags.len(), "extracted inline markup");
    (plain, ExtractedTags { tags })
}

/// Escapes markup-special characters (`<`, `>`, `&`) in plain text.
#[must_use]
pub fn escape_text(text: &str) -> Cow<'_, str> {
    partial_escape(text)
}

fn unescape(text: &str) -> Cow<'_, str> {
    unescape_with(text, resolve_html5_entity).unwrap_or(Cow::Borrowed(text))
}

impl ExtractedTags {
    /// Returns `true` if no tags were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of extracted tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Reinserts the tags that fall within `segment`, which starts at plain
    /// offset `base`; plain runs are escaped.
    ///
    /// Tags at either boundary (`base` and `base + segment.len()`) are included.
    #[must_use]
    pub fn insert_tags(&self, segment: &str, base: usize) -> String {
        let end = base + segment.len();
        let mut marked = String::with_capacity(segment.len());
        let mut cursor = 0;
        for (position, tag) in self.tags.iter().filter(|(position, _)| (base..=end).contains(position)) {
            let local = position - base;
            if let Some(run) = segment.get(cursor..local) {
                marked.push_str(&escape_text(run));
                cursor = local;
            }
            marked.push_str(tag);
        }
        marked.push_str(&escape_text(segment.get(cursor..).unwrap_or_default()));
        marked
    }

    /// Wraps `text` in the elements that are open at plain offset `offset`.
    ///
    /// Used when a field is replaced as a whole but should keep its source
    /// emphasis. `text` is inserted as is.
    #[must_use]
    pub fn surround_tags(&self, text: &str, offset: usize) -> String {
        let mut open: Vec<(&str, &str)> = Vec::new();
        for (position, tag) in &self.tags {
            if *position > offset {
                break;
            }
            let Some(captures) = TAG_NAME_PATTERN.captures(tag) else {
                continue;
            };
            let Some(name) = captures.get(2).map(|name| name.as_str()) else {
                continue;
            };
            if captures.get(1).is_some() {
                if let Some(index) = open
                    .iter()
                    .rposition(|(open_name, _)| open_name.eq_ignore_ascii_case(name))
                {
                    open.remove(index);
                }
            } else if captures.get(3).is_none()
                && !VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
            {
                open.push((name, tag));
            }
        }

        let mut wrapped = String::new();
        for (_, tag) in &open {
            wrapped.push_str(tag);
        }
        wrapped.push_str(text);
        for (name, _) in open.iter().rev() {
            wrapped.push_str("</");
            wrapped.push_str(name);
            wrapped.push('>');
        }
        wrapped
    }
}
