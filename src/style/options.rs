//! Style options: closed enumerations and the option set passed to the formatter.

use thiserror::Error;

use crate::journal::NameForm;
use crate::labels::labeled_enum;

/// Errors that can occur while reading style options from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// Value is not one of the labels of the option's enumeration
    #[error("unknown {option} value '{value}'\n  Suggestion: Use one of: {expected}")]
    UnknownValue {
        /// Option type name
        option: String,
        /// Rejected value
        value: String,
        /// Comma-separated accepted labels
        expected: String,
    },

    /// Key does not name a style option
    #[error("unknown style option '{key}'")]
    UnknownKey {
        /// Rejected key
        key: String,
    },

    /// Boolean option given something other than true/false
    #[error("invalid boolean '{value}' for {key}\n  Suggestion: Use true or false")]
    InvalidBoolean {
        /// Option key
        key: String,
        /// Rejected value
        value: String,
    },
}

impl OptionsError {
    /// Creates an `UnknownValue` error listing the accepted labels.
    #[must_use]
    pub fn unknown_value<'a>(
        option: &str,
        value: &str,
        expected: impl Iterator<Item = &'a str>,
    ) -> Self {
        Self::UnknownValue {
            option: option.to_string(),
            value: value.to_string(),
            expected: expected.collect::<Vec<_>>().join(", "),
        }
    }
}

labeled_enum! {
    /// Separator placed before the last author.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum LastSeparator {
        #[default]
        Comma => "comma",
        Ampersand => "ampersand",
        And => "and",
        CommaAnd => "comma-and",
    }
}

impl LastSeparator {
    /// The separator text, spaces included.
    #[must_use]
    pub const fn separator(self) -> &'static str {
        match self {
            Self::Comma => ", ",
            Self::Ampersand => " & ",
            Self::And => " and ",
            Self::CommaAnd => ", and ",
        }
    }
}

labeled_enum! {
    /// Rendering of the publication year.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum YearFormat {
        /// (1998):
        #[default]
        ParenColon => "paren-colon",
        /// (1998).
        ParenPeriod => "paren-period",
        /// (1998)
        Paren => "paren",
        /// 1998.
        Period => "period",
        /// 1998:
        Colon => "colon",
        /// 1998,
        Comma => "comma",
    }
}

impl YearFormat {
    /// Returns `true` when the year is parenthesized.
    #[must_use]
    pub const fn has_paren(self) -> bool {
        matches!(self, Self::ParenColon | Self::ParenPeriod | Self::Paren)
    }

    /// Punctuation following the year.
    #[must_use]
    pub const fn terminator(self) -> &'static str {
        match self {
            Self::ParenColon | Self::Colon => ":",
            Self::ParenPeriod | Self::Period => ".",
            Self::Paren => "",
            Self::Comma => ",",
        }
    }

    /// Renders a year value.
    #[must_use]
    pub fn format_year(self, year: &str) -> String {
        if self.has_paren() {
            format!("({year}){}", self.terminator())
        } else {
            format!("{year}{}", self.terminator())
        }
    }
}

labeled_enum! {
    /// Punctuation placed between the article title and the journal name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum JournalSeparator {
        /// Keep the separator found in the source
        #[default]
        Unchanged => "unchanged",
        Period => "period",
        Comma => "comma",
        PeriodMinus => "period-minus",
        PeriodNDash => "period-en-dash",
        CommaMinus => "comma-minus",
        CommaNDash => "comma-en-dash",
    }
}

impl JournalSeparator {
    /// The replacement text, or `None` to keep the source separator.
    #[must_use]
    pub fn render(self) -> Option<String> {
        let symbol = match self {
            Self::Unchanged => return None,
            Self::Period => ".",
            Self::Comma => ",",
            Self::PeriodMinus => ".-",
            Self::PeriodNDash => ".\u{2013}",
            Self::CommaMinus => ",-",
            Self::CommaNDash => ",\u{2013}",
        };
        Some(format!("{symbol} "))
    }
}

labeled_enum! {
    /// Punctuation placed between the journal name and the volume.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum VolumeSeparator {
        #[default]
        Space => "space",
        Period => "period",
        Comma => "comma",
        Semicolon => "semicolon",
    }
}

impl VolumeSeparator {
    /// The replacement text, followed by one space.
    #[must_use]
    pub const fn render(self) -> &'static str {
        match self {
            Self::Space => " ",
            Self::Period => ". ",
            Self::Comma => ", ",
            Self::Semicolon => "; ",
        }
    }
}

labeled_enum! {
    /// Punctuation closing the volume (and issue).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum VolumeFormatting {
        #[default]
        Colon => "colon",
        Comma => "comma",
        Period => "period",
        Semicolon => "semicolon",
    }
}

impl VolumeFormatting {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Period => ".",
            Self::Semicolon => ";",
        }
    }
}

labeled_enum! {
    /// Dash placed between the first and last page.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum PageSeparator {
        #[default]
        Minus => "minus",
        Hyphen => "hyphen",
        FigureDash => "figure-dash",
        EnDash => "en-dash",
        EmDash => "em-dash",
    }
}

impl PageSeparator {
    #[must_use]
    pub const fn dash(self) -> char {
        match self {
            Self::Minus => '-',
            Self::Hyphen => '\u{2010}',
            Self::FigureDash => '\u{2012}',
            Self::EnDash => '\u{2013}',
            Self::EmDash => '\u{2014}',
        }
    }

    /// Renders a page range.
    #[must_use]
    pub fn format_range(self, start: &str, end: &str) -> String {
        format!("{start}{}{end}", self.dash())
    }
}

labeled_enum! {
    /// Text styling applied in HTML output.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum Style {
        /// Keep the markup found in the source
        #[default]
        Preserve => "preserve",
        Normal => "normal",
        Italics => "italics",
        Bold => "bold",
        SmallCaps => "small-caps",
    }
}

impl Style {
    /// Wraps `text` in this style's markup.
    ///
    /// `Preserve` and `Normal` return the text unchanged.
    #[must_use]
    pub fn wrap(self, text: &str) -> String {
        match self {
            Self::Preserve | Self::Normal => text.to_string(),
            Self::Italics => format!("<i>{text}</i>"),
            Self::Bold => format!("<b>{text}</b>"),
            Self::SmallCaps => format!("<span style=\"font-variant: small-caps\">{text}</span>"),
        }
    }
}

labeled_enum! {
    /// Whether and how missing DOIs are retrieved by article title.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum CrossrefMatch {
        #[default]
        NotUsed => "off",
        Exact => "exact",
        Fuzzy => "fuzzy",
    }
}

impl CrossrefMatch {
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::NotUsed)
    }

    #[must_use]
    pub const fn is_fuzzy(self) -> bool {
        matches!(self, Self::Fuzzy)
    }
}

/// Every style option key accepted by [`StyleOptions::set`].
pub const STYLE_OPTION_KEYS: [&str; 20] = [
    "process_authors_and_year",
    "process_page_range_volume",
    "process_journal_name",
    "initials_before",
    "initials_no_period",
    "keep_numbering",
    "remove_doi",
    "last_separator",
    "year_format",
    "journal_separator",
    "journal_name_form",
    "volume_separator",
    "remove_issue",
    "volume_formatting",
    "page_separator",
    "crossref",
    "html",
    "surname_style",
    "journal_style",
    "volume_style",
];

/// The full option set for one formatting run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StyleOptions {
    /// Rewrite authors and year.
    pub process_authors_and_year: bool,
    /// Rewrite page range, volume and volume separator.
    pub process_page_range_volume: bool,
    /// Rewrite journal name and journal separator.
    pub process_journal_name: bool,
    /// Place initials before the surname for every author but the first.
    pub initials_before: bool,
    /// Drop the periods of initials.
    pub initials_no_period: bool,
    pub keep_numbering: bool,
    pub remove_doi: bool,
    pub last_separator: LastSeparator,
    pub year_format: YearFormat,
    pub journal_separator: JournalSeparator,
    pub journal_name_form: NameForm,
    pub volume_separator: VolumeSeparator,
    pub remove_issue: bool,
    pub volume_formatting: VolumeFormatting,
    pub page_separator: PageSeparator,
    pub crossref: CrossrefMatch,
    /// Output is HTML; enables field styling and escaping.
    pub html: bool,
    pub surname_style: Style,
    pub journal_style: Style,
    pub volume_style: Style,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            process_authors_and_year: true,
            process_page_range_volume: true,
            process_journal_name: true,
            initials_before: false,
            initials_no_period: false,
            keep_numbering: false,
            remove_doi: false,
            last_separator: LastSeparator::default(),
            year_format: YearFormat::default(),
            journal_separator: JournalSeparator::default(),
            journal_name_form: NameForm::default(),
            volume_separator: VolumeSeparator::default(),
            remove_issue: false,
            volume_formatting: VolumeFormatting::default(),
            page_separator: PageSeparator::default(),
            crossref: CrossrefMatch::default(),
            html: false,
            surname_style: Style::default(),
            journal_style: Style::default(),
            volume_style: Style::default(),
        }
    }
}

impl StyleOptions {
    /// Sets one option from its textual key and value.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::UnknownKey`] for a key not in
    /// [`STYLE_OPTION_KEYS`], or a value error when the value does not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), OptionsError> {
        let flag = || parse_flag(key, value);
        match key {
            "process_authors_and_year" => self.process_authors_and_year = flag()?,
            "process_page_range_volume" => self.process_page_range_volume = flag()?,
            "process_journal_name" => self.process_journal_name = flag()?,
            "initials_before" => self.initials_before = flag()?,
            "initials_no_period" => self.initials_no_period = flag()?,
            "keep_numbering" => self.keep_numbering = flag()?,
            "remove_doi" => self.remove_doi = flag()?,
            "remove_issue" => self.remove_issue = flag()?,
            "html" => self.html = flag()?,
            "last_separator" => self.last_separator = value.parse()?,
            "year_format" => self.year_format = value.parse()?,
            "journal_separator" => self.journal_separator = value.parse()?,
            "journal_name_form" => self.journal_name_form = value.parse()?,
            "volume_separator" => self.volume_separator = value.parse()?,
            "volume_formatting" => self.volume_formatting = value.parse()?,
            "page_separator" => self.page_separator = value.parse()?,
            "crossref" => self.crossref = value.parse()?,
            "surname_style" => self.surname_style = value.parse()?,
            "journal_style" => self.journal_style = value.parse()?,
            "volume_style" => self.volume_style = value.parse()?,
            _ => {
                return Err(OptionsError::UnknownKey {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Returns the textual value of one option, in the form [`Self::set`]
    /// accepts, or `None` for an unknown key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "process_authors_and_year" => self.process_authors_and_year.to_string(),
            "process_page_range_volume" => self.process_page_range_volume.to_string(),
            "process_journal_name" => self.process_journal_name.to_string(),
            "initials_before" => self.initials_before.to_string(),
            "initials_no_period" => self.initials_no_period.to_string(),
            "keep_numbering" => self.keep_numbering.to_string(),
            "remove_doi" => self.remove_doi.to_string(),
            "remove_issue" => self.remove_issue.to_string(),
            "html" => self.html.to_string(),
            "last_separator" => self.last_separator.to_string(),
            "year_format" => self.year_format.to_string(),
            "journal_separator" => self.journal_separator.to_string(),
            "journal_name_form" => self.journal_name_form.to_string(),
            "volume_separator" => self.volume_separator.to_string(),
            "volume_formatting" => self.volume_formatting.to_string(),
            "page_separator" => self.page_separator.to_string(),
            "crossref" => self.crossref.to_string(),
            "surname_style" => self.surname_style.to_string(),
            "journal_style" => self.journal_style.to_string(),
            "volume_style" => self.volume_style.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, OptionsError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(OptionsError::InvalidBoolean {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_year_format_renderings() {
        let rendered: Vec<String> = YearFormat::ALL.iter().map(|f| f.format_year("1998")).collect();
        assert_eq!(
            rendered,
            vec!["(1998):", "(1998).", "(1998)", "1998.", "1998:", "1998,"]
        );
    }

    #[test]
    fn test_last_separator_text() {
        assert_eq!(LastSeparator::CommaAnd.separator(), ", and ");
        assert_eq!(LastSeparator::Ampersand.separator(), " & ");
    }

    #[test]
    fn test_journal_separator_render() {
        assert_eq!(JournalSeparator::Unchanged.render(), None);
        assert_eq!(JournalSeparator::CommaNDash.render().as_deref(), Some(",\u{2013} "));
        assert_eq!(JournalSeparator::default(), JournalSeparator::Unchanged);
    }

    #[test]
    fn test_page_separator_format_range() {
        assert_eq!(PageSeparator::EnDash.format_range("34", "56"), "34\u{2013}56");
        assert_eq!(PageSeparator::Minus.format_range("e1", "e9"), "e1-e9");
    }

    #[test]
    fn test_style_wrap() {
        assert_eq!(Style::Italics.wrap("Nature"), "<i>Nature</i>");
        assert_eq!(Style::Normal.wrap("Nature"), "Nature");
        assert!(Style::SmallCaps.wrap("X").contains("small-caps"));
    }

    #[test]
    fn test_labels_parse_case_insensitively() {
        assert_eq!("EN-DASH".parse::<PageSeparator>().unwrap(), PageSeparator::EnDash);
        assert_eq!(" fuzzy ".parse::<CrossrefMatch>().unwrap(), CrossrefMatch::Fuzzy);
    }

    #[test]
    fn test_unknown_label_lists_choices() {
        let err = "dashed".parse::<Style>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'dashed'"));
        assert!(msg.contains("preserve, normal, italics, bold, small-caps"));
    }

    #[test]
    fn test_style_options_defaults() {
        let options = StyleOptions::default();
        assert!(options.process_authors_and_year);
        assert!(options.process_page_range_volume);
        assert!(options.process_journal_name);
        assert!(!options.html);
        assert_eq!(options.year_format, YearFormat::ParenColon);
        assert_eq!(options.crossref, CrossrefMatch::NotUsed);
    }

    #[test]
    fn test_style_options_set_every_key() {
        let mut options = StyleOptions::default();
        for key in STYLE_OPTION_KEYS {
            let value = match key {
                "last_separator" => "and",
                "year_format" => "period",
                "journal_separator" => "comma",
                "journal_name_form" => "abbrev",
                "volume_separator" => "semicolon",
                "volume_formatting" => "comma",
                "page_separator" => "en-dash",
                "crossref" => "exact",
                "surname_style" | "journal_style" | "volume_style" => "bold",
                _ => "true",
            };
            options.set(key, value).unwrap();
        }
        assert!(options.html);
        assert_eq!(options.last_separator, LastSeparator::And);
        assert_eq!(options.journal_name_form, NameForm::Abbrev);
        assert_eq!(options.volume_style, Style::Bold);
    }

    #[test]
    fn test_style_options_set_errors() {
        let mut options = StyleOptions::default();
        assert!(matches!(
            options.set("colour", "red"),
            Err(OptionsError::UnknownKey { .. })
        ));
        assert!(matches!(
            options.set("html", "yes"),
            Err(OptionsError::InvalidBoolean { .. })
        ));
        assert!(matches!(
            options.set("year_format", "brackets"),
            Err(OptionsError::UnknownValue { .. })
        ));
    }

    #[test]
    fn test_style_options_get_mirrors_set() {
        let mut options = StyleOptions::default();
        options.set("page_separator", "em-dash").unwrap();
        options.set("keep_numbering", "true").unwrap();
        assert_eq!(options.get("page_separator").as_deref(), Some("em-dash"));
        assert_eq!(options.get("keep_numbering").as_deref(), Some("true"));
        assert_eq!(options.get("colour"), None);

        let mut copy = StyleOptions::default();
        for key in STYLE_OPTION_KEYS {
            copy.set(key, &options.get(key).unwrap()).unwrap();
        }
        assert_eq!(copy, options);
    }
}
