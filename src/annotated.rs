//! Bracket-annotated reference text.
//!
//! A parsed reference is frozen into its source line with a bracket pair
//! around every present field, followed by one presence bit per field and a
//! year position marker:
//!
//! ```text
//! {Smith, J.} {2003.} {Title of article}{. }{Nature} {}{5:} {1-10}.1101011110m
//! ```
//!
//! The text inside brackets may be edited by hand. Deserialization recovers
//! the spans and re-derives every field value from the edited text.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::journal::JournalMatcher;
use crate::parser::{
    Authors, FIELD_COUNT, Field, JournalField, PageRange, PositionedStr, Reference, Volume, Year,
    YearPosition, field_order, parse_authors, year_value,
};

/// Errors that can occur while serializing a reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    /// The source text already contains a bracket character
    #[error("cannot annotate text containing '{bracket}'\n  Suggestion: Choose other brackets with --brackets")]
    BracketInContent {
        /// The colliding bracket
        bracket: char,
    },

    /// The bracket pair is unusable
    #[error("invalid bracket pair '{value}': {reason}")]
    InvalidBrackets {
        /// The rejected pair
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors that can occur while deserializing annotated text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializeError {
    /// No `m`/`t` marker at the end of the line
    #[error("deserialization failed: missing year position marker")]
    MissingMarker,

    /// The presence bits are missing or not `0`/`1`
    #[error("deserialization failed: malformed field presence bits")]
    MalformedPresenceBits,

    /// A present field has no bracket pair
    #[error("deserialization failed: missing brackets for {field}")]
    MissingBrackets {
        /// Field name
        field: String,
    },

    /// A closing bracket precedes its opening bracket, or pairs are nested
    #[error("deserialization failed: unbalanced brackets\n  Suggestion: Edit only the text inside brackets and keep every pair")]
    UnbalancedBrackets,

    /// Brackets remain after every field was recovered
    #[error("deserialization failed: stray bracket left after all fields")]
    StrayBracket,

    /// Authors, year or article marked absent
    #[error("deserialization failed: required field {field} is absent")]
    MissingRequiredField {
        /// Field name
        field: String,
    },

    /// A field's text no longer matches its grammar
    #[error("deserialization failed: {field} text '{text}' does not match its pattern")]
    FieldMismatch {
        /// Field name
        field: String,
        /// The offending text
        text: String,
    },
}

/// The bracket pair delimiting fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Brackets {
    open: char,
    close: char,
}

impl Default for Brackets {
    fn default() -> Self {
        Self {
            open: '{',
            close: '}',
        }
    }
}

impl Brackets {
    /// Creates a bracket pair.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::InvalidBrackets`] when the characters are
    /// equal, alphanumeric or whitespace.
    pub fn new(open: char, close: char) -> Result<Self, SerializeError> {
        let invalid = |reason: &str| SerializeError::InvalidBrackets {
            value: format!("{open}{close}"),
            reason: reason.to_string(),
        };
        if open == close {
            return Err(invalid("opening and closing brackets must differ"));
        }
        if [open, close].iter().any(|c| c.is_alphanumeric() || c.is_whitespace()) {
            return Err(invalid("brackets must be punctuation"));
        }
        Ok(Self { open, close })
    }

    #[must_use]
    pub const fn open(self) -> char {
        self.open
    }

    #[must_use]
    pub const fn close(self) -> char {
        self.close
    }
}

impl FromStr for Brackets {
    type Err = SerializeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(open), Some(close), None) => Self::new(open, close),
            _ => Err(SerializeError::InvalidBrackets {
                value: value.to_string(),
                reason: "expected exactly two characters".to_string(),
            }),
        }
    }
}

impl fmt::Display for Brackets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.open, self.close)
    }
}

/// Annotates `reference` with `brackets` around every present field.
///
/// # Errors
///
/// Returns [`SerializeError::BracketInContent`] when the source line already
/// contains one of the bracket characters.
pub fn serialize(reference: &Reference, brackets: Brackets) -> Result<String, SerializeError> {
    let source = &reference.unparsed;
    if let Some(bracket) = source.chars().find(|c| *c == brackets.open || *c == brackets.close) {
        return Err(SerializeError::BracketInContent { bracket });
    }

    let mut annotated = source.clone();
    for (_, span) in reference.collect_spans().into_iter().rev() {
        annotated.insert(span.end, brackets.close);
        annotated.insert(span.start, brackets.open);
    }
    let position = reference.year.position;
    for field in field_order(position) {
        annotated.push(if reference.field_span(field).is_some() { '1' } else { '0' });
    }
    annotated.push(position.marker());
    Ok(annotated)
}

/// Recovers a reference from annotated text.
///
/// Field values are re-derived from the bracketed text: the year digits, the
/// author list, the journal (through `journals`, if given), volume/issue and
/// page range.
///
/// # Errors
///
/// Returns a [`DeserializeError`] when the marker or presence bits are
/// malformed, the brackets do not match the presence bits, or a volume, page
/// range or year no longer matches its grammar.
#[tracing::instrument(skip(annotated, journals), fields(line_len = annotated.len()))]
pub fn deserialize(
    annotated: &str,
    brackets: Brackets,
    journals: Option<&dyn JournalMatcher>,
) -> Result<Reference, DeserializeError> {
    let mut body = annotated.trim_end().to_string();
    let position = body
        .pop()
        .and_then(YearPosition::from_marker)
        .ok_or(DeserializeError::MissingMarker)?;

    let bits_start = body
        .len()
        .checked_sub(FIELD_COUNT)
        .filter(|start| body.is_char_boundary(*start))
        .ok_or(DeserializeError::MalformedPresenceBits)?;
    let presence: Vec<bool> = body[bits_start..]
        .chars()
        .map(|bit| match bit {
            '1' => Ok(true),
            '0' => Ok(false),
            _ => Err(DeserializeError::MalformedPresenceBits),
        })
        .collect::<Result<_, _>>()?;
    body.truncate(bits_start);

    let mut spans: Vec<(Field, Option<Range<usize>>)> = Vec::with_capacity(FIELD_COUNT);
    for (field, present) in field_order(position).into_iter().zip(presence) {
        if !present {
            if matches!(field, Field::Authors | Field::Year | Field::Article) {
                return Err(DeserializeError::MissingRequiredField {
                    field: field.name().to_string(),
                });
            }
            spans.push((field, None));
            continue;
        }
        let span = take_bracket_pair(&mut body, brackets, field)?;
        spans.push((field, Some(span)));
    }
    if body.contains([brackets.open, brackets.close]) {
        return Err(DeserializeError::StrayBracket);
    }

    let text = body;
    let span_of = |wanted: Field| {
        spans
            .iter()
            .find(|(field, _)| *field == wanted)
            .and_then(|(_, span)| span.clone())
    };
    let required = |wanted: Field| {
        span_of(wanted).ok_or_else(|| DeserializeError::MissingRequiredField {
            field: wanted.name().to_string(),
        })
    };
    let mismatch = |field: Field, span: &Range<usize>| DeserializeError::FieldMismatch {
        field: field.name().to_string(),
        text: text[span.clone()].to_string(),
    };

    let authors_span = required(Field::Authors)?;
    let authors_view = PositionedStr::with_offset(&text[authors_span.clone()], authors_span.start);
    let list = match parse_authors(authors_view) {
        Ok(list) => Some(list),
        Err(error) => {
            warn!(authors = %authors_view, %error, "leaving author list unparsed");
            None
        }
    };

    let year_span = required(Field::Year)?;
    let year = Year {
        value: year_value(&text[year_span.clone()])
            .ok_or_else(|| mismatch(Field::Year, &year_span))?
            .to_string(),
        span: year_span,
        position,
    };

    let journal = span_of(Field::Journal).map(|span| JournalField {
        names: journals
            .and_then(|matcher| matcher.extract_journal(&text[span.clone()]))
            .map(|found| found.names),
        span,
    });

    let volume = match span_of(Field::Volume) {
        Some(span) => Some(
            Volume::from_exact(&text[span.clone()], span.clone())
                .ok_or_else(|| mismatch(Field::Volume, &span))?,
        ),
        None => None,
    };

    let page_range = match span_of(Field::PageRange) {
        Some(span) => Some(
            PageRange::from_exact(&text[span.clone()], span.clone())
                .ok_or_else(|| mismatch(Field::PageRange, &span))?,
        ),
        None => None,
    };

    let reference = Reference {
        numbering: span_of(Field::Numbering),
        authors: Authors {
            list,
            span: authors_span,
        },
        year,
        article: required(Field::Article)?,
        journal_separator: span_of(Field::JournalSeparator),
        journal,
        volume_separator: span_of(Field::VolumeSeparator),
        volume,
        page_range,
        doi: span_of(Field::Doi),
        unparsed: text.clone(),
    };
    debug!(fields = reference.collect_spans().len(), "annotated reference recovered");
    Ok(reference)
}

/// Removes the first bracket pair from `body` and returns the span it enclosed.
fn take_bracket_pair(
    body: &mut String,
    brackets: Brackets,
    field: Field,
) -> Result<Range<usize>, DeserializeError> {
    let missing = || DeserializeError::MissingBrackets {
        field: field.name().to_string(),
    };
    let open = body.find(brackets.open).ok_or_else(missing)?;
    let close = body.find(brackets.close).ok_or_else(missing)?;
    if close < open {
        return Err(DeserializeError::UnbalancedBrackets);
    }
    let inner_start = open + brackets.open.len_utf8();
    if body[inner_start..close].contains(brackets.open) {
        return Err(DeserializeError::UnbalancedBrackets);
    }
    body.replace_range(close..close + brackets.close.len_utf8(), "");
    body.replace_range(open..inner_start, "");
    Ok(open..close - brackets.open.len_utf8())
}
