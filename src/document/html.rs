//! HTML reference lists.
//!
//! The document body is expected to hold the references either as items of
//! `<ul>`/`<ol>` lists or as `<p>` paragraphs, whichever element comes first.
//! Everything outside the entries is kept verbatim for reassembly.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::DocumentError;
use crate::style::normalize_space;

macro_rules! tag_pattern {
    ($name:ident, $pattern:literal) => {
        #[allow(clippy::expect_used)]
        static $name: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new($pattern).expect("tag regex is valid") // Static pattern, safe to panic
        });
    };
}

tag_pattern!(BODY_OPEN, r"(?i)<\s*body\b[^>]*>");
tag_pattern!(BODY_CLOSE, r"(?i)<\s*/\s*body\s*>");
tag_pattern!(OPENING_TAG, r"<\s*(\w+)[^>]*>");
tag_pattern!(LEADING_TAG, r"^<\s*(\w+)[^>]*>");
tag_pattern!(LI_OPEN, r"(?i)<\s*li\b[^>]*>");
tag_pattern!(LI_CLOSE, r"(?i)<\s*/\s*li\s*>");
tag_pattern!(UL_CLOSE, r"(?i)<\s*/\s*ul\s*>");
tag_pattern!(OL_CLOSE, r"(?i)<\s*/\s*ol\s*>");
tag_pattern!(P_OPEN, r"(?i)<\s*p\b[^>]*>");
tag_pattern!(P_CLOSE, r"(?i)<\s*/\s*p\s*>");

/// How the entries are laid out in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
    Paragraphs,
}

/// One reference entry of an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlEntry {
    /// Element wrapping the whole entry, e.g. `<p class="ref">`.
    pub decoration: Option<String>,
    /// Closing tag of the decoration, when the source had one.
    pub closing: Option<String>,
    /// Entry markup with whitespace normalized.
    pub content: String,
    raw: Range<usize>,
}

impl HtmlEntry {
    fn construct(source: &str, raw: Range<usize>) -> Self {
        let entry = normalize_space(&source[raw.clone()]);
        if let Some(captures) = LEADING_TAG.captures(&entry)
            && let (Some(tag), Some(name)) = (captures.get(0), captures.get(1))
        {
            let rest = &entry[tag.end()..];
            let close = format!("</{}>", name.as_str().to_ascii_lowercase());
            let lower = rest.to_ascii_lowercase();
            let (inner, closing) = if lower.ends_with(&close) {
                let split = rest.len() - close.len();
                (&rest[..split], Some(rest[split..].to_string()))
            } else {
                (rest, None)
            };
            let close_prefix = &close[..close.len() - 1];
            if !inner.to_ascii_lowercase().contains(close_prefix) {
                return Self {
                    decoration: Some(tag.as_str().to_string()),
                    closing,
                    content: inner.trim().to_string(),
                    raw,
                };
            }
        }
        Self {
            decoration: None,
            closing: None,
            content: entry,
            raw,
        }
    }
}

/// An HTML document split into reference entries.
#[derive(Debug, Clone)]
pub struct HtmlList {
    source: String,
    body_start: usize,
    kind: ListKind,
    entries: Vec<HtmlEntry>,
}

impl HtmlList {
    /// Splits `document` into entries.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the body has no element, or its first
    /// element is not `<ul>`, `<ol>` or `<p>`.
    #[tracing::instrument(skip(document), fields(len = document.len()))]
    pub fn parse(document: &str) -> Result<Self, DocumentError> {
        let body_start = BODY_OPEN.find(document).map_or(0, |tag| tag.end());
        let body_end = BODY_CLOSE
            .find(&document[body_start..])
            .map_or(document.len(), |tag| body_start + tag.start());
        let body = &document[body_start..body_end];

        let first = OPENING_TAG
            .captures(body)
            .and_then(|captures| captures.get(1))
            .ok_or(DocumentError::Unstructured)?;
        let kind = match first.as_str().to_ascii_lowercase().as_str() {
            "ul" => ListKind::Unordered,
            "ol" => ListKind::Ordered,
            "p" => ListKind::Paragraphs,
            other => {
                return Err(DocumentError::UnknownStructure {
                    tag: other.to_string(),
                });
            }
        };

        let ranges = match kind {
            ListKind::Paragraphs => paragraph_ranges(body),
            ListKind::Unordered => item_ranges(body, &UL_CLOSE),
            ListKind::Ordered => item_ranges(body, &OL_CLOSE),
        };
        let entries: Vec<HtmlEntry> = ranges
            .into_iter()
            .map(|range| HtmlEntry::construct(document, body_start + range.start..body_start + range.end))
            .collect();
        debug!(?kind, entries = entries.len(), "split HTML reference list");

        Ok(Self {
            source: document.to_string(),
            body_start,
            kind,
            entries,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ListKind {
        self.kind
    }

    #[must_use]
    pub fn entries(&self) -> &[HtmlEntry] {
        &self.entries
    }

    /// Everything up to and including the `<body>` tag.
    #[must_use]
    pub fn preamble(&self) -> &str {
        &self.source[..self.body_start]
    }

    /// Rebuilds the document with new entry contents, in entry order.
    ///
    /// Entries without a replacement keep their original content.
    #[must_use]
    pub fn assemble<I>(&self, contents: I) -> String
    where
        I: IntoIterator<Item = String>,
    {
        let mut contents = contents.into_iter();
        let mut assembled = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for entry in &self.entries {
            assembled.push_str(&self.source[cursor..entry.raw.start]);
            if let Some(decoration) = &entry.decoration {
                assembled.push_str(decoration);
            }
            match contents.next() {
                Some(content) => assembled.push_str(&content),
                None => assembled.push_str(&entry.content),
            }
            if let Some(closing) = &entry.closing {
                assembled.push_str(closing);
            }
            cursor = entry.raw.end;
        }
        assembled.push_str(&self.source[cursor..]);
        assembled
    }
}

/// Content ranges of `<li>` items. An item ends at its `</li>`, the next
/// `<li>`, or the end of the list, whichever comes first.
fn item_ranges(body: &str, list_close: &Regex) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    while let Some(open) = LI_OPEN.find(&body[cursor..]) {
        let start = cursor + open.end();
        let rest = &body[start..];
        let close = LI_CLOSE.find(rest);
        let next = LI_OPEN.find(rest);
        let (end, resume) = match (close, next) {
            (Some(close), Some(next)) if next.start() < close.start() => (next.start(), next.start()),
            (Some(close), _) => (close.start(), close.end()),
            (None, Some(next)) => (next.start(), next.start()),
            (None, None) => {
                let end = list_close.find(rest).map_or(rest.len(), |tag| tag.start());
                (end, end)
            }
        };
        ranges.push(start..start + end);
        cursor = start + resume;
    }
    ranges
}

/// Ranges of whole `<p>` elements, including their tags.
fn paragraph_ranges(body: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    while let Some(open) = P_OPEN.find(&body[cursor..]) {
        let start = cursor + open.start();
        let after = cursor + open.end();
        let rest = &body[after..];
        let close = P_CLOSE.find(rest);
        let next = P_OPEN.find(rest);
        let end = match (close, next) {
            (Some(close), Some(next)) if next.start() < close.start() => after + next.start(),
            (Some(close), _) => after + close.end(),
            (None, Some(next)) => after + next.start(),
            (None, None) => body.len(),
        };
        ranges.push(start..end);
        cursor = end;
    }
    ranges
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const UNORDERED: &str = "<html><head><title>Refs</title></head><body>\n<ul>\n<li>Smith J 2003. <i>Title</i> of article. Nature 5: 1-10.</li>\n<li>Unparseable entry</li>\n</ul>\n</body></html>\n";

    #[test]
    fn test_parse_unordered_list() {
        let list = HtmlList::parse(UNORDERED).unwrap();
        assert_eq!(list.kind(), ListKind::Unordered);
        assert_eq!(list.entries().len(), 2);
        assert_eq!(
            list.entries()[0].content,
            "Smith J 2003. <i>Title</i> of article. Nature 5: 1-10."
        );
        assert!(list.entries()[0].decoration.is_none());
        assert!(list.preamble().ends_with("<body>"));
    }

    #[test]
    fn test_assemble_replaces_entries_only() {
        let list = HtmlList::parse(UNORDERED).unwrap();
        let assembled = list.assemble(["A".to_string(), "*B".to_string()]);
        assert_eq!(
            assembled,
            "<html><head><title>Refs</title></head><body>\n<ul>\n<li>A</li>\n<li>*B</li>\n</ul>\n</body></html>\n"
        );
        assert_eq!(list.assemble(Vec::new()), UNORDERED);
    }

    #[test]
    fn test_parse_ordered_list_with_unclosed_items() {
        let document = "<body><ol><li>First 2001. x<li>Second 2002. y</ol></body>";
        let list = HtmlList::parse(document).unwrap();
        assert_eq!(list.kind(), ListKind::Ordered);
        let contents: Vec<&str> = list.entries().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["First 2001. x", "Second 2002. y"]);
        assert_eq!(
            list.assemble(["1".to_string(), "2".to_string()]),
            "<body><ol><li>1<li>2</ol></body>"
        );
    }

    #[test]
    fn test_parse_paragraphs_keeps_decoration() {
        let document = "<body>\n<p class=\"ref\">Smith J 2003. Title.</p>\n<p>Doe A 2004. Other.\n</body>";
        let list = HtmlList::parse(document).unwrap();
        assert_eq!(list.kind(), ListKind::Paragraphs);

        let first = &list.entries()[0];
        assert_eq!(first.decoration.as_deref(), Some("<p class=\"ref\">"));
        assert_eq!(first.closing.as_deref(), Some("</p>"));
        assert_eq!(first.content, "Smith J 2003. Title.");

        let second = &list.entries()[1];
        assert_eq!(second.decoration.as_deref(), Some("<p>"));
        assert!(second.closing.is_none());
        assert_eq!(second.content, "Doe A 2004. Other.");

        assert_eq!(
            list.assemble(["X".to_string(), "Y".to_string()]),
            "<body>\n<p class=\"ref\">X</p>\n<p>Y</body>"
        );
    }

    #[test]
    fn test_inline_markup_is_not_decoration() {
        let document = "<ul><li><b>Smith J</b> 2003. Title</li><li><span class=\"x\">Doe A 2004. Other</span></li></ul>";
        let list = HtmlList::parse(document).unwrap();
        assert!(list.entries()[0].decoration.is_none());
        assert_eq!(list.entries()[0].content, "<b>Smith J</b> 2003. Title");
        assert_eq!(list.entries()[1].decoration.as_deref(), Some("<span class=\"x\">"));
        assert_eq!(list.entries()[1].content, "Doe A 2004. Other");
        assert_eq!(list.preamble(), "");
    }

    #[test]
    fn test_link_tag_is_not_list_item() {
        let document = "<ul><link rel=\"x\"><li>A 2001. b</li></ul>";
        let list = HtmlList::parse(document).unwrap();
        assert_eq!(list.entries().len(), 1);
        assert_eq!(list.entries()[0].content, "A 2001. b");
    }

    #[test]
    fn test_parse_rejects_unstructured_body() {
        assert_eq!(
            HtmlList::parse("<body>plain text</body>").unwrap_err(),
            DocumentError::Unstructured
        );
        assert_eq!(
            HtmlList::parse("<body><div>x</div></body>").unwrap_err(),
            DocumentError::UnknownStructure {
                tag: "div".to_string()
            }
        );
    }
}
