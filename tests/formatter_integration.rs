//! Integration tests for the style formatter.

use refstyle_core::journal::NameForm;
use refstyle_core::style::{
    JournalSeparator, LastSeparator, PageSeparator, Style, VolumeFormatting, VolumeSeparator,
    YearFormat, extract_tags, normalize_space,
};
use refstyle_core::{JournalTable, Reference, StyleOptions, format_reference};

fn bundled() -> &'static JournalTable {
    JournalTable::bundled().unwrap()
}

fn format_with(line: &str, options: &StyleOptions) -> String {
    let reference = Reference::parse(line, Some(bundled())).unwrap();
    format_reference(&reference, options, None, None).unwrap()
}

#[test]
fn test_format_defaults_with_bundled_journal() {
    assert_eq!(
        format_with(
            "Smith J 2003. Title of article. Nature 12: 45-67.",
            &StyleOptions::default()
        ),
        "Smith, J (2003): Title of article. Nature 12: 45-67."
    );
}

#[test]
fn test_format_journal_name_forms() {
    let line = "Smith J 2003. Title of article. Mol. Phylogenet. Evol. 12: 45-67.";
    let full = StyleOptions {
        journal_name_form: NameForm::FullName,
        ..StyleOptions::default()
    };
    assert!(
        format_with(line, &full).contains(". Molecular Phylogenetics and Evolution 12:"),
        "{}",
        format_with(line, &full)
    );

    let abbrev = StyleOptions {
        journal_name_form: NameForm::Abbrev,
        ..StyleOptions::default()
    };
    assert!(format_with(line, &abbrev).contains(". Mol Phylogenet Evol 12:"));
}

#[test]
fn test_format_full_style_rewrite() {
    let options = StyleOptions {
        last_separator: LastSeparator::Ampersand,
        year_format: YearFormat::ParenPeriod,
        journal_separator: JournalSeparator::Comma,
        volume_separator: VolumeSeparator::Comma,
        volume_formatting: VolumeFormatting::Comma,
        page_separator: PageSeparator::EnDash,
        ..StyleOptions::default()
    };
    assert_eq!(
        format_with(
            "Smith, J. and Doe, A. 2003. Title of article. Nature 12 (3): 45-67.",
            &options
        ),
        "Smith, J. & Doe, A. (2003). Title of article, Nature, 12 (3), 45\u{2013}67."
    );
}

#[test]
fn test_format_is_stable_for_already_formatted_line() {
    let once = format_with(
        "Smith J 2003. Title of article. Nature 12: 45-67.",
        &StyleOptions::default(),
    );
    assert_eq!(format_with(&once, &StyleOptions::default()), once);
}

#[test]
fn test_format_html_styles_journal_and_volume() {
    let (plain, tags) = extract_tags("Smith J 2003. <i>Rana</i> in ponds. Nature 12: 45-67.");
    let reference = Reference::parse(&plain, Some(bundled())).unwrap();
    let options = StyleOptions {
        html: true,
        journal_style: Style::Italics,
        volume_style: Style::Bold,
        ..StyleOptions::default()
    };
    let formatted = format_reference(&reference, &options, Some(&tags), None).unwrap();
    assert_eq!(
        formatted,
        "Smith, J (2003): <i>Rana</i> in ponds. <i>Nature</i> <b>12:</b> 45-67."
    );
}

#[test]
fn test_normalize_space_public() {
    assert_eq!(normalize_space("Title .  Nature ,12"), "Title. Nature,12");
}
