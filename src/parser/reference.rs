//! The structured reference record and the line parser that builds it.
//!
//! Every field is stored as a byte span into [`Reference::unparsed`], the
//! original line. Spans of present fields never overlap and appear in the
//! fixed order given by [`field_order`].

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, trace, warn};

use super::author::{Author, parse_authors};
use super::doi::split_doi;
use super::error::{FormatError, ParseError};
use super::positioned::PositionedStr;
use crate::journal::{JournalMatcher, JournalNames};

/// Number of fields recorded in the presence bits of an annotated reference.
pub const FIELD_COUNT: usize = 10;

#[allow(clippy::expect_used)]
static NUMBERING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.?\s*").expect("numbering regex is valid") // Static pattern, safe to panic
});

/// A parenthesized year closing the line, e.g. `(2003).`
#[allow(clippy::expect_used)]
static TERMINAL_YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+[a-z]?)\)\S?$").expect("terminal year regex is valid") // Static pattern, safe to panic
});

/// A loosely parenthesized year anywhere, e.g. `2003.` or `(2003a)`.
#[allow(clippy::expect_used)]
static MEDIAL_YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?(\d+[a-z]?)\)?\S?").expect("medial year regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static YEAR_VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+[a-z]?").expect("year value regex is valid") // Static pattern, safe to panic
});

/// Three consecutive words that each contain a lowercase letter and no period.
#[allow(clippy::expect_used)]
static THREE_WORDS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[^\s.]*\p{Lowercase}[^\s.]*\s+[^\s.]*\p{Lowercase}[^\s.]*\s+[^\s.]*\p{Lowercase}[^\s.]*",
    )
    .expect("three words regex is valid") // Static pattern, safe to panic
});

/// Page range near the end of the text; group 1 is the recorded span.
#[allow(clippy::expect_used)]
static PAGE_RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:pp\.\s*)?([A-Za-z]*\d+)\s?[-‐‑‒–—―]\s?([A-Za-z]*\d+))\S?$")
        .expect("page range regex is valid") // Static pattern, safe to panic
});

/// The same page range grammar, matching a whole span.
#[allow(clippy::expect_used)]
pub(crate) static PAGE_RANGE_EXACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:pp\.\s*)?([A-Za-z]*\d+)\s?[-‐‑‒–—―]\s?([A-Za-z]*\d+)$")
        .expect("exact page range regex is valid") // Static pattern, safe to panic
});

const VOLUME_GRAMMAR: &str = concat!(
    r"(?P<vol1>\d+)[,:]",
    r"|(?P<vol2>\d+)\s*\((?P<issue2>\d[^)]*)\)[,:]?",
    r"|(?i:vol)[^\s\d]*\s*(?P<vol3>\d+)[^\s\d]*\s*(?i:iss)[^\s\d]*\s*(?P<issue3>\d+)[,:]?",
);

/// Volume and issue: `12:`, `12 (3)`, or `vol. 12, iss. 3`.
///
/// Filler after `vol`/`iss` never contains digits, so `vol.12` keeps both.
#[allow(clippy::expect_used)]
static VOLUME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(VOLUME_GRAMMAR).expect("volume regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
pub(crate) static VOLUME_EXACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^(?:{VOLUME_GRAMMAR})$")).expect("exact volume regex is valid") // Static pattern, safe to panic
});

/// Trailing punctuation and whitespace before a journal name.
#[allow(clippy::expect_used)]
static JOURNAL_SEPARATOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\W*$").expect("journal separator regex is valid") // Static pattern, safe to panic
});

/// The fields of a reference, in no particular position order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Numbering,
    Authors,
    Year,
    Article,
    JournalSeparator,
    Journal,
    VolumeSeparator,
    Volume,
    PageRange,
    Doi,
}

impl Field {
    /// Human-readable field name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Numbering => "numbering",
            Self::Authors => "authors",
            Self::Year => "year",
            Self::Article => "article",
            Self::JournalSeparator => "journal separator",
            Self::Journal => "journal",
            Self::VolumeSeparator => "volume separator",
            Self::Volume => "volume",
            Self::PageRange => "page range",
            Self::Doi => "doi",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the year appeared in the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearPosition {
    /// Between the authors and the article title.
    Medial,
    /// In parentheses at the end, after the page range.
    Terminal,
}

impl YearPosition {
    /// Marker character closing an annotated reference.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Medial => 'm',
            Self::Terminal => 't',
        }
    }

    /// Parses an annotation marker.
    #[must_use]
    pub const fn from_marker(marker: char) -> Option<Self> {
        match marker {
            'm' => Some(Self::Medial),
            't' => Some(Self::Terminal),
            _ => None,
        }
    }
}

/// Source order of the fields for the given year position.
#[must_use]
pub const fn field_order(position: YearPosition) -> [Field; FIELD_COUNT] {
    match position {
        YearPosition::Medial => [
            Field::Numbering,
            Field::Authors,
            Field::Year,
            Field::Article,
            Field::JournalSeparator,
            Field::Journal,
            Field::VolumeSeparator,
            Field::Volume,
            Field::PageRange,
            Field::Doi,
        ],
        YearPosition::Terminal => [
            Field::Numbering,
            Field::Authors,
            Field::Article,
            Field::JournalSeparator,
            Field::Journal,
            Field::VolumeSeparator,
            Field::Volume,
            Field::PageRange,
            Field::Year,
            Field::Doi,
        ],
    }
}

/// The author segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authors {
    /// Parsed entries, or `None` when the segment could not be parsed.
    pub list: Option<Vec<Author>>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Year {
    /// Digits with an optional letter suffix, e.g. `2003a`.
    pub value: String,
    pub span: Range<usize>,
    pub position: YearPosition,
}

/// The journal name segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalField {
    /// Resolved name forms; `None` when the span is not a known journal.
    pub names: Option<JournalNames>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub volume: String,
    pub issue: Option<String>,
    pub span: Range<usize>,
}

impl Volume {
    /// Builds a volume from a match of the volume grammar.
    fn from_captures(captures: &Captures<'_>, span: Range<usize>) -> Option<Self> {
        let volume = captures
            .name("vol1")
            .or_else(|| captures.name("vol2"))
            .or_else(|| captures.name("vol3"))?;
        let issue = captures
            .name("issue2")
            .or_else(|| captures.name("issue3"))
            .map(|issue| issue.as_str().trim().to_string());
        Some(Self {
            volume: volume.as_str().to_string(),
            issue,
            span,
        })
    }

    /// Re-derives a volume from text that must consist of the volume grammar alone.
    #[must_use]
    pub fn from_exact(text: &str, span: Range<usize>) -> Option<Self> {
        VOLUME_EXACT_PATTERN
            .captures(text)
            .and_then(|captures| Self::from_captures(&captures, span))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    pub start: String,
    pub end: String,
    pub span: Range<usize>,
}

impl PageRange {
    /// Re-derives a page range from text that must consist of the range alone.
    #[must_use]
    pub fn from_exact(text: &str, span: Range<usize>) -> Option<Self> {
        let captures = PAGE_RANGE_EXACT_PATTERN.captures(text)?;
        Some(Self {
            start: captures.get(1)?.as_str().to_string(),
            end: captures.get(2)?.as_str().to_string(),
            span,
        })
    }
}

/// One parsed bibliographic reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub numbering: Option<Range<usize>>,
    pub authors: Authors,
    pub year: Year,
    pub article: Range<usize>,
    pub journal_separator: Option<Range<usize>>,
    pub journal: Option<JournalField>,
    pub volume_separator: Option<Range<usize>>,
    pub volume: Option<Volume>,
    pub page_range: Option<PageRange>,
    pub doi: Option<Range<usize>>,
    /// The source line every span points into.
    pub unparsed: String,
}

impl Reference {
    /// Parses one normalized reference line.
    ///
    /// Journal, volume and volume separator are only detected when a
    /// `journals` matcher is supplied. An author segment that cannot be
    /// parsed is kept as an opaque span.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Unparseable`] when the line has no year, or when
    /// a terminal-year line has no recognizable article title.
    #[tracing::instrument(skip(line, journals), fields(line_len = line.len()))]
    pub fn parse(line: &str, journals: Option<&dyn JournalMatcher>) -> Result<Self, ParseError> {
        let (rest, doi) = split_doi(PositionedStr::new(line));
        let mut text = rest.strip();

        let numbering = match text.match_start(&NUMBERING_PATTERN) {
            Some(found) => {
                let (_, numbering, after) = text.match_partition(&found);
                text = after.strip();
                Some(numbering.span())
            }
            None => None,
        };

        let (authors, year, article) = if let Some(captures) =
            TERMINAL_YEAR_PATTERN.captures(text.as_str())
        {
            let whole = captures.get_match();
            let before = text.slice_to(whole.start());
            let Some(boundary) = before.search(&THREE_WORDS_PATTERN) else {
                debug!(line, "no article title before terminal year");
                return Err(ParseError::no_article_boundary(line));
            };
            let year = Year {
                value: group_text(&captures, 1),
                span: text.match_position(&whole),
                position: YearPosition::Terminal,
            };
            (
                before.slice_to(boundary.start()),
                year,
                before.slice_from(boundary.start()),
            )
        } else {
            let Some(captures) = MEDIAL_YEAR_PATTERN.captures(text.as_str()) else {
                debug!(line, "no year found");
                return Err(ParseError::no_year(line));
            };
            let (authors, year_text, article) = text.match_partition(&captures.get_match());
            let year = Year {
                value: group_text(&captures, 1),
                span: year_text.span(),
                position: YearPosition::Medial,
            };
            (authors, year, article)
        };
        let authors = authors.strip();
        let mut article = article.strip();

        let mut page_range = None;
        if let Some(captures) = PAGE_RANGE_PATTERN.captures(article.as_str())
            && let (Some(range), Some(start), Some(end)) =
                (captures.get(1), captures.get(2), captures.get(3))
        {
            let (before, range_text, _) = article.match_partition(&range);
            page_range = Some(PageRange {
                start: start.as_str().to_string(),
                end: end.as_str().to_string(),
                span: range_text.span(),
            });
            article = before.strip();
        }

        let mut journal_parts = JournalParts::default();
        if let Some(split) = journals.and_then(|matcher| split_journal(article, matcher)) {
            article = split.title;
            journal_parts = split.fields;
        }

        let list = match parse_authors(authors) {
            Ok(list) => Some(list),
            Err(error) => {
                warn!(authors = %authors, %error, "leaving author list unparsed");
                None
            }
        };

        Ok(Self {
            numbering,
            authors: Authors {
                list,
                span: authors.span(),
            },
            year,
            article: article.span(),
            journal_separator: journal_parts.separator,
            journal: journal_parts.journal,
            volume_separator: journal_parts.volume_separator,
            volume: journal_parts.volume,
            page_range,
            doi,
            unparsed: line.to_string(),
        })
    }

    /// Returns the span of `field`, or `None` when absent.
    #[must_use]
    pub fn field_span(&self, field: Field) -> Option<Range<usize>> {
        match field {
            Field::Numbering => self.numbering.clone(),
            Field::Authors => Some(self.authors.span.clone()),
            Field::Year => Some(self.year.span.clone()),
            Field::Article => Some(self.article.clone()),
            Field::JournalSeparator => self.journal_separator.clone(),
            Field::Journal => self.journal.as_ref().map(|j| j.span.clone()),
            Field::VolumeSeparator => self.volume_separator.clone(),
            Field::Volume => self.volume.as_ref().map(|v| v.span.clone()),
            Field::PageRange => self.page_range.as_ref().map(|p| p.span.clone()),
            Field::Doi => self.doi.clone(),
        }
    }

    /// Spans of the present fields, in source order.
    #[must_use]
    pub fn collect_spans(&self) -> Vec<(Field, Range<usize>)> {
        field_order(self.year.position)
            .into_iter()
            .filter_map(|field| self.field_span(field).map(|span| (field, span)))
            .collect()
    }

    /// Verifies that present spans are in source order and do not overlap.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SpanOrder`] naming the first out-of-order field.
    pub fn check_span_order(&self) -> Result<(), FormatError> {
        let mut previous_end = 0;
        for (field, span) in self.collect_spans() {
            if span.start < previous_end || span.end < span.start || span.end > self.unparsed.len() {
                return Err(FormatError::SpanOrder {
                    field: field.name().to_string(),
                    previous_end,
                    start: span.start,
                });
            }
            previous_end = span.end;
        }
        Ok(())
    }

    /// The gap between the author segment and the article, where a terminal
    /// year is moved to.
    #[must_use]
    pub fn year_gap(&self) -> Range<usize> {
        self.authors.span.end..self.article.start
    }

    /// Returns the source text of a span.
    #[must_use]
    pub fn text(&self, span: Range<usize>) -> &str {
        self.unparsed.get(span).unwrap_or_default()
    }

    /// The article title as written.
    #[must_use]
    pub fn article_text(&self) -> &str {
        self.text(self.article.clone())
    }

    /// Attaches a DOI found on a continuation line.
    ///
    /// The DOI is appended to the source text after a single space. Returns
    /// `false`, leaving the reference untouched, when it already has a DOI.
    pub fn append_doi(&mut self, doi: &str) -> bool {
        if self.doi.is_some() {
            return false;
        }
        self.unparsed.push(' ');
        let start = self.unparsed.len();
        self.unparsed.push_str(doi);
        self.doi = Some(start..self.unparsed.len());
        true
    }
}

/// Extracts the year value from year text such as `(2003a).`
#[must_use]
pub fn year_value(text: &str) -> Option<&str> {
    YEAR_VALUE_PATTERN.find(text).map(|found| found.as_str())
}

fn group_text(captures: &Captures<'_>, index: usize) -> String {
    captures
        .get(index)
        .map_or_else(String::new, |group| group.as_str().to_string())
}

#[derive(Debug, Default)]
struct JournalParts {
    separator: Option<Range<usize>>,
    journal: Option<JournalField>,
    volume_separator: Option<Range<usize>>,
    volume: Option<Volume>,
}

struct JournalSplit<'a> {
    title: PositionedStr<'a>,
    fields: JournalParts,
}

/// Locates the journal name in the article zone and carves the separator
/// before it and the volume after it.
fn split_journal<'a>(
    article: PositionedStr<'a>,
    matcher: &dyn JournalMatcher,
) -> Option<JournalSplit<'a>> {
    let found = matcher.extract_journal(article.as_str())?;
    let name = match article.try_slice(found.span.clone()) {
        Ok(name) => name,
        Err(error) => {
            warn!(%error, "journal matcher returned an invalid span");
            return None;
        }
    };

    let before = article.slice_to(found.span.start);
    let (title, separator) = match before.search(&JOURNAL_SEPARATOR_PATTERN) {
        Some(sep) => {
            let (title, separator, _) = before.match_partition(&sep);
            (title, separator)
        }
        None => (before, before.slice_from(before.len())),
    };

    let mut fields = JournalParts {
        separator: Some(separator.span()),
        journal: Some(JournalField {
            names: Some(found.names),
            span: name.span(),
        }),
        ..JournalParts::default()
    };

    let extra = article.slice_from(found.span.end).strip();
    if let Some(captures) = VOLUME_PATTERN.captures(extra.as_str()) {
        let whole = captures.get_match();
        if let Some(volume) = Volume::from_captures(&captures, extra.match_position(&whole)) {
            fields.volume_separator = Some(extra.slice_to(whole.start()).span());
            fields.volume = Some(volume);
        }
    }
    trace!(journal = %name, "journal matched");

    Some(JournalSplit {
        title: title.strip(),
        fields,
    })
}
