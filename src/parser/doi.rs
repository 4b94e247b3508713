//! Detection of a DOI trailing a reference line.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::positioned::PositionedStr;

/// A DOI at the end of the line, in one of three forms:
/// - a URL mentioning `doi` (`https://doi.org/10.1234/x`, `http://dx.doi.org/...`)
/// - a `doi:` prefixed identifier (`doi: 10.1234/x`, `DOI:10.1234/x`)
/// - a bare identifier (`10.1234/x`)
#[allow(clippy::expect_used)]
static TRAILING_DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?:.*doi.*$|\bdoi:\s?\S*$|\b10\.\d{4,9}(?:\.\d+)*/\S+$")
        .expect("trailing DOI regex is valid") // Static pattern, safe to panic
});

/// Splits `line` into the text before a trailing DOI and the DOI's absolute span.
///
/// Returns the whole line and `None` when the line does not end with a DOI.
#[must_use]
pub fn split_doi(line: PositionedStr<'_>) -> (PositionedStr<'_>, Option<Range<usize>>) {
    match line.search(&TRAILING_DOI_PATTERN) {
        Some(found) => {
            let (rest, doi, _) = line.match_partition(&found);
            trace!(doi = %doi, "found trailing DOI");
            (rest, Some(doi.span()))
        }
        None => (line, None),
    }
}

/// Returns the DOI text when the whole line is nothing but a DOI.
#[must_use]
pub fn bare_doi(line: &str) -> Option<&str> {
    let (rest, doi) = split_doi(PositionedStr::new(line));
    match doi {
        Some(span) if rest.strip().is_empty() => Some(&line[span]),
        _ => None,
    }
}
