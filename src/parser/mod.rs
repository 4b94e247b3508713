//! Reference line parsing.
//!
//! This module turns one line of free-form citation text into a
//! [`Reference`] whose fields are byte spans into the original line.
//!
//! # Supported Fields
//!
//! - Leading numbering (`12.`)
//! - Author lists (`Smith, J., Doe, A. and Lee, K.`, `et al.`)
//! - Year, medial (`Smith J 2003. Title`) or terminal (`Title (2003).`)
//! - Article title, journal name, volume/issue, page range
//! - Trailing DOI (`doi:10.1234/x`, `https://doi.org/10.1234/x`, bare `10.1234/x`)
//!
//! # Example
//!
//! ```
//! use refstyle_core::parser::{LineOutcome, YearPosition, parse_line};
//!
//! let outcome = parse_line("Smith J. Title of paper (2003).", None);
//! let LineOutcome::Reference(reference) = outcome else {
//!     panic!("expected a reference");
//! };
//! assert_eq!(reference.year.position, YearPosition::Terminal);
//! assert_eq!(reference.article_text(), "Title of paper");
//! ```

mod author;
mod doi;
mod error;
mod positioned;
mod reference;

pub use author::{Author, LAST_AUTHOR_SEPARATORS, parse_authors};
pub use doi::{bare_doi, split_doi};
pub use error::{FormatError, MAX_PREVIEW_CHARS, ParseError, ViewError};
pub use positioned::PositionedStr;
pub use reference::{
    Authors, FIELD_COUNT, Field, JournalField, PageRange, Reference, Volume, Year, YearPosition,
    field_order, year_value,
};

#[cfg(test)]
pub(crate) use reference::tests::FixedJournals;

use tracing::debug;

use crate::journal::JournalMatcher;

/// What a single input line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A parsed reference.
    Reference(Reference),
    /// The line is nothing but a DOI, to be attached to the previous reference.
    DoiContinuation(String),
    /// The line could not be parsed and is passed through unchanged.
    Unparsed(String),
}

/// Classifies and parses one normalized input line.
///
/// Never fails: a line that cannot be parsed comes back as
/// [`LineOutcome::Unparsed`] holding the original text.
#[must_use]
#[tracing::instrument(skip(line, journals), fields(line_len = line.len()))]
pub fn parse_line(line: &str, journals: Option<&dyn JournalMatcher>) -> LineOutcome {
    if let Some(doi) = bare_doi(line) {
        return LineOutcome::DoiContinuation(doi.to_string());
    }
    match Reference::parse(line, journals) {
        Ok(reference) => LineOutcome::Reference(reference),
        Err(error) => {
            debug!(%error, "line left unparsed");
            LineOutcome::Unparsed(line.to_string())
        }
    }
}
