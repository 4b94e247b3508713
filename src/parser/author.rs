//! Author entries and the author-list grammar.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::error::ParseError;
use super::positioned::PositionedStr;

/// Separators that may precede the final author, most specific first.
///
/// The first separator found (searching from the right) splits the list into
/// "all but last" and "last".
pub const LAST_AUTHOR_SEPARATORS: [&str; 4] = [", and ", " and ", " & ", ", "];

/// Marker of an "and others" entry.
const ET_AL: &str = "et al";

/// A surname: a letter followed by a lowercase letter or apostrophe, ending lowercase.
#[allow(clippy::expect_used)]
static SURNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Alphabetic}[\p{Lowercase}'\u{2019}].*\p{Lowercase}")
        .expect("surname regex is valid") // Static pattern, safe to panic
});

/// One entry of an author list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// A named author.
    Named {
        /// Family name as written.
        surname: String,
        /// Initials with spaces removed.
        initials: String,
        /// Absolute span of the surname in the source text.
        span: Range<usize>,
    },
    /// The "et al." sentinel.
    EtAl,
}

impl Author {
    /// Creates a named author; spaces inside the initials are dropped.
    #[must_use]
    pub fn named(surname: impl Into<String>, initials: &str, span: Range<usize>) -> Self {
        Self::Named {
            surname: surname.into(),
            initials: initials.replace(' ', ""),
            span,
        }
    }

    /// Returns `true` for the "et al." sentinel.
    #[must_use]
    pub const fn is_et_al(&self) -> bool {
        matches!(self, Self::EtAl)
    }

    /// Returns the surname of a named author.
    #[must_use]
    pub fn surname(&self) -> Option<&str> {
        match self {
            Self::Named { surname, .. } => Some(surname),
            Self::EtAl => None,
        }
    }

    /// Returns the normalized initials of a named author.
    #[must_use]
    pub fn initials(&self) -> Option<&str> {
        match self {
            Self::Named { initials, .. } => Some(initials),
            Self::EtAl => None,
        }
    }
}

/// Parses a comma/and-separated author list.
///
/// # Errors
///
/// Returns [`ParseError::MalformedAuthorList`] when a name part is expected
/// (initials or surname written as a separate comma-separated part) but the
/// list has already been consumed.
#[tracing::instrument(skip(authors), fields(authors = %authors))]
pub fn parse_authors(authors: PositionedStr<'_>) -> Result<Vec<Author>, ParseError> {
    let (rest, last) = split_last_author(authors);

    let mut parts: VecDeque<PositionedStr<'_>> = rest
        .split(",")
        .into_iter()
        .chain(last.split(","))
        .flat_map(separate_et_al)
        .map(|part| part.strip())
        .filter(|part| !part.is_empty())
        .collect();

    let mut result = Vec::new();
    while let Some(part) = parts.pop_front() {
        if part.as_str().contains(ET_AL) {
            result.push(Author::EtAl);
            continue;
        }
        let mut next_part = || {
            parts
                .pop_front()
                .ok_or_else(|| ParseError::malformed_authors(authors.as_str()))
        };

        let author = match part.search(&SURNAME_PATTERN) {
            None => {
                let surname = next_part()?;
                Author::named(surname.as_str(), part.as_str(), surname.span())
            }
            Some(found) if found.range() == (0..part.len()) => {
                let initials = next_part()?;
                Author::named(part.as_str(), initials.as_str(), part.span())
            }
            Some(found) if found.start() == 0 => {
                let surname = part.group(&found);
                let skip = char_len_at(part.as_str(), found.end());
                let initials = part.slice_from(found.end() + skip);
                Author::named(surname.as_str(), initials.as_str(), surname.span())
            }
            Some(found) => {
                let surname = part.group(&found);
                let skip = char_len_before(part.as_str(), found.start());
                let initials = part.slice_to(found.start() - skip);
                Author::named(surname.as_str(), initials.as_str(), surname.span())
            }
        };
        trace!(?author, "parsed author");
        result.push(author);
    }
    Ok(result)
}

fn split_last_author(authors: PositionedStr<'_>) -> (PositionedStr<'_>, PositionedStr<'_>) {
    for separator in LAST_AUTHOR_SEPARATORS {
        let (rest, found, last) = authors.rpartition(separator);
        if !found.is_empty() {
            return (rest, last);
        }
    }
    (authors.slice(0..0), authors)
}

/// Splits "Smith J. et al." into "Smith J. " and "et al.".
fn separate_et_al(part: PositionedStr<'_>) -> Vec<PositionedStr<'_>> {
    match part.as_str().find(ET_AL) {
        Some(index) if index > 0 => vec![part.slice_to(index), part.slice_from(index)],
        _ => vec![part],
    }
}

fn char_len_at(text: &str, index: usize) -> usize {
    text[index..].chars().next().map_or(0, char::len_utf8)
}

fn char_len_before(text: &str, index: usize) -> usize {
    text[..index].chars().next_back().map_or(0, char::len_utf8)
}
