//! Batch processing of reference lists.
//!
//! Every entry is handled on its own; a failed entry is flagged with a
//! leading `*` and never aborts the batch. Output preserves input order.
//!
//! Three workflows are offered:
//! - one pass: parse and format ([`process_text`], [`process_html`])
//! - step 1: parse and write bracket-annotated lines for manual review
//!   ([`annotate_text`])
//! - step 2: read reviewed annotated lines back and format them
//!   ([`apply_annotated`])

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{info, warn};

use crate::annotated::{Brackets, deserialize, serialize};
use crate::document::{DocumentError, HtmlList, reference_lines};
use crate::journal::JournalMatcher;
use crate::lookup::DoiLookup;
use crate::parser::{LineOutcome, Reference, parse_line};
use crate::style::{ExtractedTags, StyleOptions, extract_tags, format_reference, needs_doi_lookup};

/// Marker prefixed to entries that could not be processed.
pub const FAILURE_MARKER: char = '*';

/// Default number of DOI lookups in flight.
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;

/// One entry of a reference list after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Reference(Reference),
    /// Original text of an entry that could not be parsed.
    Unparsed(String),
}

/// DOI retrieval service and how many lookups may run at once.
#[derive(Clone, Copy)]
pub struct DoiRetrieval<'a> {
    pub lookup: &'a dyn DoiLookup,
    pub concurrency: usize,
}

impl<'a> DoiRetrieval<'a> {
    #[must_use]
    pub fn new(lookup: &'a dyn DoiLookup, concurrency: usize) -> Self {
        Self {
            lookup,
            concurrency: concurrency.max(1),
        }
    }
}

/// Flags an entry that could not be processed.
#[must_use]
pub fn flag_unparsed(text: &str) -> String {
    format!("{FAILURE_MARKER} {text}")
}

/// Parses normalized lines into entries.
///
/// A line holding nothing but a DOI is attached to the reference on the line
/// right before it, provided that reference has no DOI yet. Otherwise the
/// DOI line becomes an unparsed entry of its own.
#[must_use]
pub fn collect_entries<I>(lines: I, journals: Option<&dyn JournalMatcher>) -> Vec<Entry>
where
    I: IntoIterator<Item = String>,
{
    let mut entries = Vec::new();
    let mut open_reference: Option<usize> = None;
    for line in lines {
        match parse_line(&line, journals) {
            LineOutcome::Reference(reference) => {
                open_reference = Some(entries.len());
                entries.push(Entry::Reference(reference));
            }
            LineOutcome::DoiContinuation(doi) => {
                let attached = open_reference
                    .take()
                    .and_then(|index| entries.get_mut(index))
                    .is_some_and(|entry| match entry {
                        Entry::Reference(reference) => reference.append_doi(&doi),
                        Entry::Unparsed(_) => false,
                    });
                if !attached {
                    entries.push(Entry::Unparsed(line));
                }
            }
            LineOutcome::Unparsed(text) => {
                open_reference = None;
                entries.push(Entry::Unparsed(text));
            }
        }
    }
    entries
}

/// Looks up DOIs for the references that need one, keeping input order.
async fn retrieve_dois(
    references: &[Option<&Reference>],
    options: &StyleOptions,
    retrieval: Option<DoiRetrieval<'_>>,
) -> Vec<Option<String>> {
    let Some(retrieval) = retrieval else {
        return vec![None; references.len()];
    };
    let fuzzy = options.crossref.is_fuzzy();
    stream::iter(references.iter().map(|reference| async move {
        match reference {
            Some(reference) if needs_doi_lookup(reference, options) => {
                retrieval
                    .lookup
                    .lookup_doi(reference.article_text(), fuzzy)
                    .await
            }
            _ => None,
        }
    }))
    .buffered(retrieval.concurrency)
    .collect()
    .await
}

fn format_or_flag(
    reference: &Reference,
    options: &StyleOptions,
    tags: Option<&ExtractedTags>,
    doi: Option<&str>,
) -> Option<String> {
    match format_reference(reference, options, tags, doi) {
        Ok(formatted) => Some(formatted),
        Err(error) => {
            warn!(%error, "reference could not be formatted");
            None
        }
    }
}

/// Formats entries, flagging the unparsed ones.
#[tracing::instrument(skip_all, fields(entries = entries.len()))]
pub async fn format_entries(
    entries: &[Entry],
    options: &StyleOptions,
    retrieval: Option<DoiRetrieval<'_>>,
) -> Vec<String> {
    let references: Vec<Option<&Reference>> = entries
        .iter()
        .map(|entry| match entry {
            Entry::Reference(reference) => Some(reference),
            Entry::Unparsed(_) => None,
        })
        .collect();
    let dois = retrieve_dois(&references, options, retrieval).await;

    let mut unparsed = 0usize;
    let output: Vec<String> = entries
        .iter()
        .zip(dois)
        .map(|(entry, doi)| match entry {
            Entry::Reference(reference) => {
                format_or_flag(reference, options, None, doi.as_deref()).unwrap_or_else(|| {
                    unparsed += 1;
                    flag_unparsed(&reference.unparsed)
                })
            }
            Entry::Unparsed(text) => {
                unparsed += 1;
                flag_unparsed(text)
            }
        })
        .collect();
    info!(total = entries.len(), unparsed, "formatted reference list");
    output
}

/// Parses and formats a plain-text reference list.
pub async fn process_text(
    input: &str,
    options: &StyleOptions,
    journals: Option<&dyn JournalMatcher>,
    retrieval: Option<DoiRetrieval<'_>>,
) -> Vec<String> {
    let entries = collect_entries(reference_lines(input), journals);
    format_entries(&entries, options, retrieval).await
}

/// Step 1: writes each reference as a bracket-annotated line.
///
/// Unparsed entries, and references whose text collides with `brackets`,
/// are flagged.
#[must_use]
#[tracing::instrument(skip_all, fields(brackets = %brackets))]
pub fn annotate_entries(entries: &[Entry], brackets: Brackets) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry {
            Entry::Reference(reference) => serialize(reference, brackets).unwrap_or_else(|error| {
                warn!(%error, "reference left unannotated");
                flag_unparsed(&reference.unparsed)
            }),
            Entry::Unparsed(text) => flag_unparsed(text),
        })
        .collect()
}

/// Step 1 on a plain-text reference list.
#[must_use]
pub fn annotate_text(
    input: &str,
    brackets: Brackets,
    journals: Option<&dyn JournalMatcher>,
) -> Vec<String> {
    let entries = collect_entries(reference_lines(input), journals);
    annotate_entries(&entries, brackets)
}

/// Step 2: formats reviewed annotated lines.
///
/// Flagged lines pass through; lines that fail to deserialize are flagged.
#[tracing::instrument(skip_all, fields(brackets = %brackets))]
pub async fn apply_annotated(
    input: &str,
    brackets: Brackets,
    options: &StyleOptions,
    journals: Option<&dyn JournalMatcher>,
    retrieval: Option<DoiRetrieval<'_>>,
) -> Vec<String> {
    let entries: Vec<Entry> = input
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}').trim_end())
        .filter(|line| !line.is_empty())
        .map(|line| {
            if let Some(flagged) = line.strip_prefix(FAILURE_MARKER) {
                return Entry::Unparsed(flagged.strip_prefix(' ').unwrap_or(flagged).to_string());
            }
            match deserialize(line, brackets, journals) {
                Ok(reference) => Entry::Reference(reference),
                Err(error) => {
                    warn!(%error, line, "annotated line rejected");
                    Entry::Unparsed(line.to_string())
                }
            }
        })
        .collect();
    format_entries(&entries, options, retrieval).await
}

/// Parses and formats every entry of an HTML reference list, keeping the
/// rest of the document intact. Entries that fail get a `*` prefix.
///
/// # Errors
///
/// Returns [`DocumentError`] when the list structure cannot be detected.
#[tracing::instrument(skip_all, fields(len = document.len()))]
pub async fn process_html(
    document: &str,
    options: &StyleOptions,
    journals: Option<&dyn JournalMatcher>,
    retrieval: Option<DoiRetrieval<'_>>,
) -> Result<String, DocumentError> {
    let list = HtmlList::parse(document)?;
    let parsed: Vec<Option<(Reference, ExtractedTags)>> = list
        .entries()
        .iter()
        .map(|entry| {
            let (plain, tags) = extract_tags(&entry.content);
            Reference::parse(&plain, journals).ok().map(|reference| (reference, tags))
        })
        .collect();
    let references: Vec<Option<&Reference>> = parsed
        .iter()
        .map(|entry| entry.as_ref().map(|(reference, _)| reference))
        .collect();
    let dois = retrieve_dois(&references, options, retrieval).await;

    let html_options = StyleOptions {
        html: true,
        ..options.clone()
    };
    let mut unparsed = 0usize;
    let contents: Vec<String> = list
        .entries()
        .iter()
        .zip(&parsed)
        .zip(dois)
        .map(|((entry, parsed), doi)| {
            parsed
                .as_ref()
                .and_then(|(reference, tags)| {
                    format_or_flag(reference, &html_options, Some(tags), doi.as_deref())
                })
                .unwrap_or_else(|| {
                    unparsed += 1;
                    format!("{FAILURE_MARKER}{}", entry.content)
                })
        })
        .collect();
    info!(total = contents.len(), unparsed, "formatted HTML reference list");
    Ok(list.assemble(contents))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::parser::FixedJournals;
    use crate::style::CrossrefMatch;

    struct StaticLookup {
        doi: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl StaticLookup {
        fn new(doi: Option<&'static str>) -> Self {
            Self {
                doi,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DoiLookup for StaticLookup {
        async fn lookup_doi(&self, _title: &str, _fuzzy: bool) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.doi.map(str::to_string)
        }
    }

    fn lines(text: &str) -> Vec<String> {
        reference_lines(text).collect()
    }

    // ==================== collect_entries ====================

    #[test]
    fn test_collect_entries_attaches_doi_continuation() {
        let entries = collect_entries(
            lines("Smith J 2003. Title of article. J 12:34-56.\ndoi:10.1234/abc\n"),
            None,
        );
        assert_eq!(entries.len(), 1);
        let Entry::Reference(reference) = &entries[0] else {
            panic!("expected reference");
        };
        assert_eq!(reference.text(reference.doi.clone().unwrap()), "doi:10.1234/abc");
    }

    #[test]
    fn test_collect_entries_orphan_doi_is_unparsed() {
        let entries = collect_entries(
            lines("10.1234/first\nSmith J 2003. Title of article. J 1: 2-3. doi:10.1/x\n10.1234/second"),
            None,
        );
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], Entry::Unparsed("10.1234/first".to_string()));
        assert!(matches!(entries[1], Entry::Reference(_)));
        assert_eq!(entries[2], Entry::Unparsed("10.1234/second".to_string()));
    }

    #[test]
    fn test_collect_entries_unparsed_line_breaks_continuation() {
        let entries = collect_entries(
            lines("Smith J 2003. Title of article. J 1: 2-3.\nno digits here\ndoi:10.1/x"),
            None,
        );
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], Entry::Unparsed("doi:10.1/x".to_string()));
    }

    // ==================== format_entries ====================

    #[tokio::test]
    async fn test_process_text_flags_unparsed_and_keeps_order() {
        let output = process_text(
            "Smith J 2003. Title of article. J 12:34-56.\nA line without a year\n",
            &StyleOptions::default(),
            None,
            None,
        )
        .await;
        assert_eq!(
            output,
            vec![
                "Smith, J (2003): Title of article. J 12:34-56.".to_string(),
                "* A line without a year".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_format_entries_appends_retrieved_doi() {
        let lookup = StaticLookup::new(Some("doi:10.5555/found"));
        let options = StyleOptions {
            crossref: CrossrefMatch::Exact,
            ..StyleOptions::default()
        };
        let output = process_text(
            "Smith J 2003. Title of article. J 1: 2-3.\nDoe A 2004. Other title here. J 4: 5-6. doi:10.1/x\n",
            &options,
            None,
            Some(DoiRetrieval::new(&lookup, 2)),
        )
        .await;
        assert_eq!(output[0], "Smith, J (2003): Title of article. J 1: 2-3. doi:10.5555/found");
        assert!(output[1].ends_with("doi:10.1/x"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_format_entries_missing_doi_is_not_an_error() {
        let lookup = StaticLookup::new(None);
        let options = StyleOptions {
            crossref: CrossrefMatch::Fuzzy,
            ..StyleOptions::default()
        };
        let output = process_text(
            "Smith J 2003. Title of article. J 1: 2-3.",
            &options,
            None,
            Some(DoiRetrieval::new(&lookup, 0)),
        )
        .await;
        assert_eq!(output, vec!["Smith, J (2003): Title of article. J 1: 2-3.".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_skipped_when_disabled() {
        let lookup = StaticLookup::new(Some("doi:10.1/never"));
        let output = process_text(
            "Smith J 2003. Title of article. J 1: 2-3.",
            &StyleOptions::default(),
            None,
            Some(DoiRetrieval::new(&lookup, 1)),
        )
        .await;
        assert!(!output[0].contains("never"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    // ==================== Two-step workflow ====================

    #[tokio::test]
    async fn test_annotate_then_apply() {
        let journals = FixedJournals(vec!["Nature"]);
        let input = "1. Smith J 2003. Title of article. Nature 12: 34-56.\nNo year at all\n";
        let annotated = annotate_text(input, Brackets::default(), Some(&journals));
        assert_eq!(
            annotated,
            vec![
                "{1. }{Smith J} {2003.} {Title of article}{. }{Nature} {}{12:} {34-56}.1111111110m"
                    .to_string(),
                "* No year at all".to_string(),
            ]
        );

        let reviewed = annotated.join("\n").replace("{Title of article}", "{Title of the article}");
        let output = apply_annotated(
            &reviewed,
            Brackets::default(),
            &StyleOptions::default(),
            Some(&journals),
            None,
        )
        .await;
        assert_eq!(
            output,
            vec![
                "Smith, J (2003): Title of the article. Nature 12: 34-56.".to_string(),
                "* No year at all".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_flags_broken_annotation() {
        let output = apply_annotated(
            "{Smith J} {2003.} Title0111000000m",
            Brackets::default(),
            &StyleOptions::default(),
            None,
            None,
        )
        .await;
        assert_eq!(output, vec!["* {Smith J} {2003.} Title0111000000m".to_string()]);
    }

    #[test]
    fn test_annotate_flags_bracket_collision() {
        let annotated = annotate_text(
            "Smith J 2003. Title {draft} of work. J 1: 2-3.",
            Brackets::default(),
            None,
        );
        assert_eq!(annotated, vec!["* Smith J 2003. Title {draft} of work. J 1: 2-3.".to_string()]);
    }

    // ==================== HTML ====================

    #[tokio::test]
    async fn test_process_html_formats_entries_in_place() {
        let document = "<html><body>\n<ol>\n<li>Smith J 2003. <i>Title</i> of article. J 12:34-56.</li>\n<li>No year &amp; no luck</li>\n</ol>\n</body></html>";
        let output = process_html(document, &StyleOptions::default(), None, None)
            .await
            .unwrap();
        assert_eq!(
            output,
            "<html><body>\n<ol>\n<li>Smith, J (2003): <i>Title</i> of article. J 12:34-56.</li>\n<li>*No year &amp; no luck</li>\n</ol>\n</body></html>"
        );
    }

    #[tokio::test]
    async fn test_process_html_rejects_unknown_structure() {
        let err = process_html("<body><table></table></body>", &StyleOptions::default(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnknownStructure { .. }));
    }
}
