//! DOI retrieval for references that carry none.
//!
//! The formatter never talks to the network itself. The pipeline asks a
//! [`DoiLookup`] for each reference that needs a DOI and hands the answer to
//! the formatter. Every failure is reported as "no DOI".

mod crossref;
mod http_client;

use async_trait::async_trait;
use thiserror::Error;

pub use crossref::{CrossrefLookup, DEFAULT_FUZZY_THRESHOLD};
pub use http_client::DEFAULT_LOOKUP_TIMEOUT_SECS;

/// Errors raised while constructing a lookup client.
///
/// Lookups themselves never fail; see [`DoiLookup::lookup_doi`].
#[derive(Debug, Error)]
pub enum LookupError {
    /// The contact address would corrupt the request
    #[error("invalid Crossref contact address '{mailto}'\n  Suggestion: Set crossref_mailto to a plain email address")]
    InvalidMailto {
        /// The rejected address
        mailto: String,
    },

    /// The HTTP client could not be built
    #[error("HTTP client construction failed: {message}")]
    Client {
        /// Underlying failure
        message: String,
    },

    /// The similarity threshold is not a percentage
    #[error("fuzzy threshold {threshold} is out of range\n  Suggestion: Use a value between 0 and 100")]
    InvalidThreshold {
        /// The rejected threshold
        threshold: u8,
    },
}

/// Finds the DOI of an article by its title.
#[async_trait]
pub trait DoiLookup: Send + Sync {
    /// Returns `doi:<DOI>` for the best match of `title`, or `None` when
    /// nothing matches or the lookup fails for any reason.
    ///
    /// With `fuzzy` unset the titles must be equal ignoring case.
    async fn lookup_doi(&self, title: &str, fuzzy: bool) -> Option<String>;
}

/// Compares a found title with the wanted one.
///
/// Exact mode ignores case. Fuzzy mode accepts a normalized Levenshtein
/// similarity of at least `threshold` percent.
#[must_use]
pub fn titles_match(found: &str, wanted: &str, fuzzy: bool, threshold: u8) -> bool {
    let found = found.trim().to_lowercase();
    let wanted = wanted.trim().to_lowercase();
    if !fuzzy {
        return found == wanted;
    }
    strsim::normalized_levenshtein(&found, &wanted) * 100.0 >= f64::from(threshold)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_match_exact_ignores_case() {
        assert!(titles_match("Frogs of Peru", "frogs of peru", false, 97));
        assert!(!titles_match("Frogs of Peru", "Frogs of Peru.", false, 97));
    }

    #[test]
    fn test_titles_match_fuzzy_threshold() {
        let wanted = "A revision of the genus Rana in South America";
        let found = "A revision of the genus Rana in South-America";
        assert!(!titles_match(found, wanted, false, 97));
        assert!(titles_match(found, wanted, true, 97));
        assert!(!titles_match("Something else entirely", wanted, true, 97));
        assert!(titles_match("anything", wanted, true, 0));
    }
}
