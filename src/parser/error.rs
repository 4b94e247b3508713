//! Error types for reference parsing operations.

use thiserror::Error;

/// Maximum number of characters of an offending line echoed back in errors.
pub const MAX_PREVIEW_CHARS: usize = 80;

/// Violations of the [`PositionedStr`](super::PositionedStr) slicing contract.
///
/// These indicate a bug in offset arithmetic, never malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// Range falls outside the view
    #[error("bad range {start}..{end} for view of length {len}")]
    BadRange {
        /// Requested local start
        start: usize,
        /// Requested local end
        end: usize,
        /// Length of the view being sliced
        len: usize,
    },

    /// Range splits a multi-byte character
    #[error("range {start}..{end} does not fall on character boundaries")]
    NotCharBoundary {
        /// Requested local start
        start: usize,
        /// Requested local end
        end: usize,
    },
}

/// Errors that can occur while parsing a single reference line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line has no recognizable reference structure
    #[error("unparseable line '{line}': {reason}\n  Suggestion: {suggestion}")]
    Unparseable {
        /// Preview of the offending line
        line: String,
        /// Which heuristic failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The author segment ran out of name parts mid-author
    #[error("malformed author list '{authors}': expected another name part")]
    MalformedAuthorList {
        /// The author segment text
        authors: String,
    },
}

impl ParseError {
    /// Creates an `Unparseable` error for a line without any year pattern.
    #[must_use]
    pub fn no_year(line: &str) -> Self {
        Self::Unparseable {
            line: preview(line),
            reason: "no publication year found".to_string(),
            suggestion: "Check that the reference contains a year such as 2003 or (2003)"
                .to_string(),
        }
    }

    /// Creates an `Unparseable` error for a terminal-year line whose title cannot be located.
    #[must_use]
    pub fn no_article_boundary(line: &str) -> Self {
        Self::Unparseable {
            line: preview(line),
            reason: "cannot separate authors from the article title".to_string(),
            suggestion: "Place the year after the authors, or edit the line manually".to_string(),
        }
    }

    /// Creates a `MalformedAuthorList` error.
    #[must_use]
    pub fn malformed_authors(authors: &str) -> Self {
        Self::MalformedAuthorList {
            authors: authors.to_string(),
        }
    }
}

/// Errors raised before a reference is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Field spans are out of source order or overlap
    #[error("field '{field}' starts at {start} before the previous field ends at {previous_end}")]
    SpanOrder {
        /// Name of the offending field
        field: String,
        /// End of the preceding present field
        previous_end: usize,
        /// Start of the offending field
        start: usize,
    },
}

fn preview(line: &str) -> String {
    if line.chars().count() <= MAX_PREVIEW_CHARS {
        return line.to_string();
    }
    let mut truncated: String = line.chars().take(MAX_PREVIEW_CHARS).collect();
    truncated.push_str("...");
    truncated
}
