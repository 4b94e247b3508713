//! Journal name resolution.
//!
//! The parser only depends on the [`JournalMatcher`] trait: given plain text,
//! return the known journal name found in it together with every name form of
//! that journal. [`JournalTable`] is the table-backed implementation used by
//! the CLI; it is built once and shared read-only across all parse calls.

mod table;

pub use table::{JournalTable, JournalTableError};

use std::ops::Range;

use crate::labels::labeled_enum;

labeled_enum! {
    /// One of the canonical renderings of a journal name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum NameForm {
        /// "Molecular Phylogenetics and Evolution"
        #[default]
        FullName => "full-name",
        /// "Mol. Phylogenet. Evol."
        WithPeriods => "with-periods",
        /// "Mol Phylogenet Evol"
        Abbrev => "abbrev",
        /// "Mol.Phylogenet.Evol."
        WithPeriodsNoSpace => "with-periods-no-space",
    }
}

/// All name forms of one journal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JournalNames {
    full_name: String,
    with_periods: String,
    abbrev: String,
    with_periods_no_space: String,
}

impl JournalNames {
    /// Creates a name set from its four forms.
    #[must_use]
    pub fn new(
        full_name: impl Into<String>,
        with_periods: impl Into<String>,
        abbrev: impl Into<String>,
        with_periods_no_space: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            with_periods: with_periods.into(),
            abbrev: abbrev.into(),
            with_periods_no_space: with_periods_no_space.into(),
        }
    }

    /// Returns the name in the requested form.
    #[must_use]
    pub fn get(&self, form: NameForm) -> &str {
        match form {
            NameForm::FullName => &self.full_name,
            NameForm::WithPeriods => &self.with_periods,
            NameForm::Abbrev => &self.abbrev,
            NameForm::WithPeriodsNoSpace => &self.with_periods_no_space,
        }
    }

    /// Iterates over (form, name) pairs in [`NameForm::ALL`] order.
    pub fn forms(&self) -> impl Iterator<Item = (NameForm, &str)> {
        NameForm::ALL.iter().map(|form| (*form, self.get(*form)))
    }
}

/// A journal name found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalMatch {
    /// Every name form of the matched journal.
    pub names: JournalNames,
    /// Byte span of the match, local to the searched text.
    pub span: Range<usize>,
}

/// Looks up known journal names inside free text.
pub trait JournalMatcher: Send + Sync {
    /// Returns the journal name found in `text`, if any.
    ///
    /// When several names occur, the last of the leftmost-longest
    /// non-overlapping matches wins.
    fn extract_journal(&self, text: &str) -> Option<JournalMatch>;
}
