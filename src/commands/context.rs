//! Collaborators shared by the command handlers: input and output, journal
//! table, DOI lookup.

use std::borrow::Cow;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use refstyle_core::lookup::CrossrefLookup;
use refstyle_core::pipeline::DoiRetrieval;
use refstyle_core::{JournalMatcher, JournalTable};

use crate::app_config::RunSettings;

/// Reads the whole input from `path`, or from stdin when no path is given.
pub(crate) fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()));
    }
    if io::stdin().is_terminal() {
        bail!("No input provided\n  Suggestion: Pass an input file or pipe references via stdin");
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    Ok(buffer)
}

/// Writes `content` to `path`, or to stdout when no path is given.
pub(crate) fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, content)
            .with_context(|| format!("Failed to write output file '{}'", path.display()))?;
        info!(path = %path.display(), "Output written");
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(content.as_bytes())
        .and_then(|()| stdout.flush())
        .context("Failed to write stdout")
}

/// Joins output lines, one entry per line.
pub(crate) fn join_lines(lines: &[String]) -> String {
    let mut joined = lines.join("\n");
    if !joined.is_empty() {
        joined.push('\n');
    }
    joined
}

/// Loads the journal table the settings ask for.
pub(crate) fn load_journals(settings: &RunSettings) -> Result<Option<Cow<'static, JournalTable>>> {
    if !settings.journal_matching {
        debug!("journal name matching disabled");
        return Ok(None);
    }
    let table = match &settings.journal_table {
        Some(path) => Cow::Owned(JournalTable::load(path)?),
        None => Cow::Borrowed(JournalTable::bundled()?),
    };
    debug!(journals = table.len(), "journal table ready");
    Ok(Some(table))
}

/// Borrows a loaded table as a matcher.
pub(crate) fn matcher<'a>(journals: Option<&'a Cow<'static, JournalTable>>) -> Option<&'a dyn JournalMatcher> {
    journals.map(|table| &**table as &dyn JournalMatcher)
}

/// Builds the Crossref client when DOI retrieval is enabled.
pub(crate) fn build_lookup(settings: &RunSettings) -> Result<Option<CrossrefLookup>> {
    if !settings.options.crossref.is_enabled() {
        return Ok(None);
    }
    let lookup = CrossrefLookup::new(settings.crossref_mailto.clone(), settings.lookup_timeout)?
        .with_fuzzy_threshold(settings.fuzzy_threshold)?;
    info!(
        mode = %settings.options.crossref,
        concurrency = settings.lookup_concurrency,
        "DOI retrieval enabled"
    );
    Ok(Some(lookup))
}

/// Pairs a lookup with the configured concurrency.
pub(crate) fn retrieval<'a>(
    lookup: Option<&'a CrossrefLookup>,
    settings: &RunSettings,
) -> Option<DoiRetrieval<'a>> {
    lookup.map(|lookup| DoiRetrieval::new(lookup, settings.lookup_concurrency))
}
