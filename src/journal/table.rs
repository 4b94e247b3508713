//! Table-backed journal matcher.
//!
//! The table is a tab-separated file with one journal per row and the header
//! columns `Full name accepted`, `Abbreviation with periods accepted` and
//! `Abbreviation without periods accepted`. The fourth name form (periods
//! without following spaces) is derived.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::{debug, info};

use super::{JournalMatch, JournalMatcher, JournalNames};

const FULL_NAME_HEADER: &str = "Full name accepted";
const WITH_PERIODS_HEADER: &str = "Abbreviation with periods accepted";
const ABBREV_HEADER: &str = "Abbreviation without periods accepted";

/// Compiled alternations over thousands of names exceed the default limit.
const PATTERN_SIZE_LIMIT: usize = 256 * (1 << 20);

const BUNDLED_TABLE: &str = include_str!("../../resources/journal_abbreviations.tsv");

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("whitespace regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static PERIOD_BEFORE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(\S)").expect("period regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static PERIOD_BEFORE_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\s").expect("period space regex is valid") // Static pattern, safe to panic
});

static BUNDLED: LazyLock<Result<JournalTable, JournalTableError>> =
    LazyLock::new(|| JournalTable::parse_tsv(BUNDLED_TABLE));

/// Errors that can occur while loading a journal table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JournalTableError {
    /// The table file could not be read
    #[error("cannot read journal table {path}: {message}\n  Suggestion: Check the journal_table path")]
    Io {
        /// Path of the table file
        path: PathBuf,
        /// Underlying I/O error message
        message: String,
    },

    /// A required header column is missing
    #[error(
        "journal table is missing the '{column}' column\n  Suggestion: The first line must name the tab-separated full name, abbreviation with periods and abbreviation without periods columns"
    )]
    MissingColumn {
        /// Expected header text
        column: String,
    },

    /// The combined name pattern could not be compiled
    #[error("cannot build journal name matcher: {message}")]
    Pattern {
        /// Regex compilation error message
        message: String,
    },
}

/// Canonical journal names and a leftmost-longest matcher over every form.
#[derive(Debug, Clone)]
pub struct JournalTable {
    rows: Vec<JournalNames>,
    pattern: Option<Regex>,
    row_of_name: HashMap<String, usize>,
}

impl JournalTable {
    /// Builds a table from name rows.
    ///
    /// Whitespace is normalized, a space is forced after every period of the
    /// with-periods form, and the no-space form is derived from it.
    ///
    /// # Errors
    ///
    /// Returns [`JournalTableError::Pattern`] if the matcher cannot be compiled.
    pub fn from_rows<I>(rows: I) -> Result<Self, JournalTableError>
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let rows: Vec<JournalNames> = rows
            .into_iter()
            .map(|(full_name, with_periods, abbrev)| {
                let with_periods = PERIOD_BEFORE_TEXT
                    .replace_all(&collapse_whitespace(&with_periods), ". $1")
                    .into_owned();
                let no_space = PERIOD_BEFORE_SPACE.replace_all(&with_periods, ".").into_owned();
                JournalNames::new(
                    collapse_whitespace(&full_name),
                    with_periods,
                    collapse_whitespace(&abbrev),
                    no_space,
                )
            })
            .collect();

        let mut row_of_name = HashMap::new();
        for (index, names) in rows.iter().enumerate() {
            for (_, name) in names.forms() {
                if !name.is_empty() {
                    row_of_name.entry(name.to_string()).or_insert(index);
                }
            }
        }

        let mut alternatives: Vec<&str> = row_of_name.keys().map(String::as_str).collect();
        alternatives.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = if alternatives.is_empty() {
            None
        } else {
            let alternation = alternatives
                .iter()
                .map(|name| regex::escape(name))
                .collect::<Vec<_>>()
                .join("|");
            let compiled = RegexBuilder::new(&alternation)
                .size_limit(PATTERN_SIZE_LIMIT)
                .dfa_size_limit(PATTERN_SIZE_LIMIT)
                .build()
                .map_err(|error| JournalTableError::Pattern {
                    message: error.to_string(),
                })?;
            Some(compiled)
        };

        debug!(journals = rows.len(), names = row_of_name.len(), "journal table built");
        Ok(Self {
            rows,
            pattern,
            row_of_name,
        })
    }

    /// Parses tab-separated table text.
    ///
    /// Fully blank rows are dropped; a missing cell takes the value of the
    /// cell to its left.
    ///
    /// # Errors
    ///
    /// Returns [`JournalTableError::MissingColumn`] when the header lacks one
    /// of the three name columns.
    pub fn parse_tsv(raw: &str) -> Result<Self, JournalTableError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut lines = raw.lines();
        let header: Vec<&str> = lines
            .next()
            .unwrap_or_default()
            .split('\t')
            .map(clean_cell)
            .collect();
        let column = |name: &str| {
            header
                .iter()
                .position(|cell| cell.eq_ignore_ascii_case(name))
                .ok_or_else(|| JournalTableError::MissingColumn {
                    column: name.to_string(),
                })
        };
        let columns = [
            column(FULL_NAME_HEADER)?,
            column(WITH_PERIODS_HEADER)?,
            column(ABBREV_HEADER)?,
        ];

        let rows = lines.filter_map(|line| {
            let cells: Vec<&str> = line.split('\t').map(clean_cell).collect();
            let mut names = columns.map(|index| cells.get(index).copied().unwrap_or_default());
            if names.iter().all(|name| name.is_empty()) {
                return None;
            }
            for index in 1..names.len() {
                if names[index].is_empty() {
                    names[index] = names[index - 1];
                }
            }
            if names[0].is_empty() {
                names[0] = names.iter().copied().find(|name| !name.is_empty()).unwrap_or_default();
            }
            Some((names[0].to_string(), names[1].to_string(), names[2].to_string()))
        });
        Self::from_rows(rows)
    }

    /// Loads a table from a tab-separated file.
    ///
    /// # Errors
    ///
    /// Returns [`JournalTableError::Io`] if the file cannot be read, or any
    /// error of [`Self::parse_tsv`].
    pub fn load(path: &Path) -> Result<Self, JournalTableError> {
        let raw = std::fs::read_to_string(path).map_err(|error| JournalTableError::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        let table = Self::parse_tsv(&raw)?;
        info!(path = %path.display(), journals = table.len(), "loaded journal table");
        Ok(table)
    }

    /// Returns the table bundled with the crate, built on first use.
    ///
    /// # Errors
    ///
    /// Returns the error encountered while building the bundled table.
    pub fn bundled() -> Result<&'static Self, JournalTableError> {
        BUNDLED.as_ref().map_err(Clone::clone)
    }

    /// Number of journals in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no journals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl JournalMatcher for JournalTable {
    fn extract_journal(&self, text: &str) -> Option<JournalMatch> {
        let found = self.pattern.as_ref()?.find_iter(text).last()?;
        let row = *self.row_of_name.get(found.as_str())?;
        Some(JournalMatch {
            names: self.rows[row].clone(),
            span: found.range(),
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

fn clean_cell(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(cell)
        .trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::journal::NameForm;

    const HEADER: &str =
        "Full name accepted\tAbbreviation with periods accepted\tAbbreviation without periods accepted";

    fn table(rows: &[&str]) -> JournalTable {
        let mut raw = String::from(HEADER);
        for row in rows {
            raw.push('\n');
            raw.push_str(row);
        }
        JournalTable::parse_tsv(&raw).unwrap()
    }

    #[test]
    fn test_parse_tsv_derives_name_forms() {
        let table = table(&["Molecular Phylogenetics and Evolution\tMol.Phylogenet. Evol.\tMol Phylogenet Evol"]);
        let found = table.extract_journal("Mol Phylogenet Evol 12: 1-5").unwrap();

        assert_eq!(found.span, 0..19);
        assert_eq!(found.names.get(NameForm::WithPeriods), "Mol. Phylogenet. Evol.");
        assert_eq!(found.names.get(NameForm::WithPeriodsNoSpace), "Mol.Phylogenet.Evol.");
        assert_eq!(
            found.names.get(NameForm::FullName),
            "Molecular Phylogenetics and Evolution"
        );
    }

    #[test]
    fn test_parse_tsv_forward_fills_missing_cells() {
        let table = table(&["Zootaxa\t\t", "\t\t", "Copeia\tCopeia"]);
        assert_eq!(table.len(), 2);

        let found = table.extract_journal("A new frog. Zootaxa 1234").unwrap();
        assert_eq!(found.names.get(NameForm::Abbrev), "Zootaxa");
        assert_eq!(found.names.get(NameForm::WithPeriodsNoSpace), "Zootaxa");
    }

    #[test]
    fn test_parse_tsv_missing_column() {
        let err = JournalTable::parse_tsv("Name\tAbbrev\nZootaxa\tZootaxa").unwrap_err();
        assert!(matches!(err, JournalTableError::MissingColumn { .. }));
    }

    #[test]
    fn test_extract_journal_prefers_longest() {
        let table = table(&[
            "Molecular Ecology\tMol. Ecol.\tMol Ecol",
            "Molecular Ecology Resources\tMol. Ecol. Resour.\tMol Ecol Resour",
        ]);
        let found = table
            .extract_journal("Barcoding. Molecular Ecology Resources 5: 1-9")
            .unwrap();
        assert_eq!(found.names.get(NameForm::Abbrev), "Mol Ecol Resour");
        assert_eq!(found.span, 11..38);
    }

    #[test]
    fn test_extract_journal_last_match_wins() {
        let table = table(&["Evolution\tEvolution\tEvolution", "Zootaxa\tZootaxa\tZootaxa"]);
        let text = "Evolution of frogs. Zootaxa 12";
        let found = table.extract_journal(text).unwrap();
        assert_eq!(&text[found.span], "Zootaxa");
    }

    #[test]
    fn test_extract_journal_no_match() {
        let table = table(&["Zootaxa\tZootaxa\tZootaxa"]);
        assert!(table.extract_journal("Nothing to see here").is_none());
    }

    #[test]
    fn test_bundled_table_loads() {
        let table = JournalTable::bundled().unwrap();
        assert!(!table.is_empty());
        let found = table
            .extract_journal("Title. Mol. Phylogenet. Evol. 12: 3-4")
            .unwrap();
        assert_eq!(
            found.names.get(NameForm::FullName),
            "Molecular Phylogenetics and Evolution"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = JournalTable::load(Path::new("/nonexistent/journals.tsv")).unwrap_err();
        assert!(err.to_string().contains("journal_table"));
    }
}
