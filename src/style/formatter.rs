//! Rendering of a parsed reference under a set of style options.
//!
//! Each field either passes through untouched or has its source span replaced
//! by a re-rendered value. Replacements are collected against the immutable
//! source line and applied in a single forward pass, so no replacement can
//! shift the offsets of another.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, trace};

use super::markup::{ExtractedTags, escape_text};
use super::options::{Style, StyleOptions};
use crate::parser::{Author, Field, FormatError, Reference, YearPosition};

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s{2,}").expect("whitespace run regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\u{00A0}\u{202F} ]([.,;:])").expect("space before punctuation regex is valid") // Static pattern, safe to panic
});

/// Collapses whitespace runs, drops spaces before `.,;:` and trims.
///
/// Idempotent: normalizing twice gives the same result as once.
#[must_use]
pub fn normalize_space(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    SPACE_BEFORE_PUNCTUATION
        .replace_all(&collapsed, "$1")
        .trim()
        .to_string()
}

/// Returns `true` when formatting `reference` would use a retrieved DOI.
#[must_use]
pub fn needs_doi_lookup(reference: &Reference, options: &StyleOptions) -> bool {
    options.crossref.is_enabled() && !options.remove_doi && reference.doi.is_none()
}

/// One source span and the text replacing it.
struct Rewrite {
    field: Field,
    span: Range<usize>,
    text: String,
}

/// Renders `reference` under `options`.
///
/// `tags` carries the markup extracted from an HTML entry; `retrieved_doi` is
/// the result of a DOI lookup for references without one (see
/// [`needs_doi_lookup`]). A missing retrieved DOI leaves the DOI empty.
///
/// # Errors
///
/// Returns [`FormatError::SpanOrder`] if the reference's spans are out of
/// order, which means the record was built inconsistently.
#[tracing::instrument(skip_all, fields(line_len = reference.unparsed.len()))]
pub fn format_reference(
    reference: &Reference,
    options: &StyleOptions,
    tags: Option<&ExtractedTags>,
    retrieved_doi: Option<&str>,
) -> Result<String, FormatError> {
    if let Err(err) = reference.check_span_order() {
        error!(line = %reference.unparsed, error = %err, "reference spans out of order");
        return Err(err);
    }

    let mut rewrites = Vec::new();
    let mut push = |field: Field, span: Range<usize>, text: String| {
        rewrites.push(Rewrite { field, span, text });
    };
    let html = options.html;
    let source_len = reference.unparsed.len();

    if let Some(numbering) = &reference.numbering
        && !options.keep_numbering
    {
        push(Field::Numbering, numbering.clone(), String::new());
    }

    if options.process_authors_and_year {
        if let Some(list) = reference.authors.list.as_deref().filter(|list| !list.is_empty()) {
            push(Field::Authors, reference.authors.span.clone(), render_authors(list, options, tags));
        }
        let year = options.year_format.format_year(&reference.year.value);
        match reference.year.position {
            YearPosition::Medial => push(Field::Year, reference.year.span.clone(), format!("{year} ")),
            YearPosition::Terminal => push(Field::Year, reference.year_gap(), format!(" {year} ")),
        }
    }

    if let Some(tags) = tags {
        push(
            Field::Article,
            reference.article.clone(),
            tags.insert_tags(reference.article_text(), reference.article.start),
        );
    }

    if options.process_journal_name {
        if let (Some(span), Some(separator)) =
            (&reference.journal_separator, options.journal_separator.render())
        {
            push(Field::JournalSeparator, span.clone(), separator);
        }
        if let Some(journal) = &reference.journal
            && let Some(names) = &journal.names
        {
            let name = names.get(options.journal_name_form);
            let rendered = if html {
                apply_style(&escape_text(name), options.journal_style, tags, journal.span.start)
            } else {
                name.to_string()
            };
            push(Field::Journal, journal.span.clone(), rendered);
        }
    }

    if options.process_page_range_volume {
        if let Some(span) = &reference.volume_separator {
            push(
                Field::VolumeSeparator,
                span.clone(),
                options.volume_separator.render().to_string(),
            );
        }
        if let Some(volume) = &reference.volume {
            let mut rendered = volume.volume.clone();
            if let Some(issue) = volume.issue.as_deref().filter(|_| !options.remove_issue) {
                rendered.push_str(" (");
                rendered.push_str(issue);
                rendered.push(')');
            }
            rendered.push_str(options.volume_formatting.symbol());
            if html {
                rendered = escape_text(&rendered).into_owned();
                if options.volume_style != Style::Preserve {
                    rendered = options.volume_style.wrap(&rendered);
                }
            }
            push(Field::Volume, volume.span.clone(), rendered);
        }
        if let Some(page_range) = &reference.page_range {
            push(
                Field::PageRange,
                page_range.span.clone(),
                options
                    .page_separator
                    .format_range(&page_range.start, &page_range.end),
            );
        }
    }

    if options.process_authors_and_year && reference.year.position == YearPosition::Terminal {
        push(Field::Year, reference.year.span.clone(), String::new());
    }

    if options.remove_doi {
        if let Some(doi) = &reference.doi {
            push(Field::Doi, doi.clone(), String::new());
        }
    } else if needs_doi_lookup(reference, options)
        && let Some(doi) = retrieved_doi
    {
        trace!(doi, "appending retrieved DOI");
        let doi = if html { escape_text(doi) } else { doi.into() };
        push(Field::Doi, source_len..source_len, format!(" {doi}"));
    }

    let rewritten = apply_rewrites(&reference.unparsed, rewrites, html).inspect_err(|err| {
        error!(line = %reference.unparsed, error = %err, "overlapping field rewrites");
    })?;
    Ok(normalize_space(&rewritten))
}

/// Applies position-ordered rewrites in one pass; untouched text is escaped
/// in HTML mode.
///
/// # Errors
///
/// Returns [`FormatError::SpanOrder`] when a rewrite starts inside the span
/// of the rewrite before it.
fn apply_rewrites(
    source: &str,
    mut rewrites: Vec<Rewrite>,
    html: bool,
) -> Result<String, FormatError> {
    // Empty insertions sort ahead of a replacement starting at the same offset.
    rewrites.sort_by_key(|rewrite| (rewrite.span.start, rewrite.span.end));
    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;
    let pass_through = |output: &mut String, range: Range<usize>| {
        let text = source.get(range).unwrap_or_default();
        if html {
            output.push_str(&escape_text(text));
        } else {
            output.push_str(text);
        }
    };
    for rewrite in rewrites {
        if rewrite.span.start < cursor {
            return Err(FormatError::SpanOrder {
                field: rewrite.field.name().to_string(),
                previous_end: cursor,
                start: rewrite.span.start,
            });
        }
        pass_through(&mut output, cursor..rewrite.span.start);
        output.push_str(&rewrite.text);
        cursor = rewrite.span.end;
    }
    pass_through(&mut output, cursor..source.len());
    Ok(output)
}

fn apply_style(text: &str, style: Style, tags: Option<&ExtractedTags>, offset: usize) -> String {
    match (style, tags) {
        (Style::Preserve, Some(tags)) => tags.surround_tags(text, offset),
        (Style::Preserve, None) => text.to_string(),
        (style, _) => style.wrap(text),
    }
}

fn render_authors(list: &[Author], options: &StyleOptions, tags: Option<&ExtractedTags>) -> String {
    let rendered: Vec<String> = list
        .iter()
        .enumerate()
        .map(|(index, author)| render_author(author, index == 0, options, tags))
        .collect();
    let mut joined = match rendered.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!(
            "{}{}{last}",
            rest.join(", "),
            options.last_separator.separator()
        ),
        None => String::new(),
    };
    let needs_period = !options.year_format.has_paren()
        && (options.initials_before || options.initials_no_period);
    if needs_period && !joined.ends_with('.') {
        joined.push('.');
    }
    joined
}

fn render_author(
    author: &Author,
    first: bool,
    options: &StyleOptions,
    tags: Option<&ExtractedTags>,
) -> String {
    let Author::Named {
        surname,
        initials,
        span,
    } = author
    else {
        return if options.initials_no_period {
            "et al".to_string()
        } else {
            "et al.".to_string()
        };
    };

    let initials = if options.initials_no_period {
        initials.replace('.', "")
    } else {
        initials.clone()
    };
    let (surname, initials) = if options.html {
        (
            apply_style(&escape_text(surname), options.surname_style, tags, span.start),
            escape_text(&initials).into_owned(),
        )
    } else {
        (surname.clone(), initials)
    };

    if options.initials_before && !first {
        format!("{initials} {surname}")
    } else if options.initials_no_period {
        format!("{surname} {initials}")
    } else {
        format!("{surname}, {initials}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::{FixedJournals, parse_authors, PositionedStr};
    use crate::style::markup::extract_tags;
    use crate::style::options::{
        CrossrefMatch, JournalSeparator, LastSeparator, PageSeparator, VolumeFormatting,
        VolumeSeparator, YearFormat,
    };
    use crate::journal::NameForm;

    fn parse(line: &str) -> Reference {
        Reference::parse(line, None).unwrap()
    }

    fn parse_with_journal(line: &str) -> Reference {
        Reference::parse(line, Some(&FixedJournals(vec!["Nature"]))).unwrap()
    }

    fn format(reference: &Reference, options: &StyleOptions) -> String {
        format_reference(reference, options, None, None).unwrap()
    }

    #[test]
    fn test_normalize_space_rules() {
        assert_eq!(normalize_space("  a   b  "), "a b");
        assert_eq!(normalize_space("a , b ; c\u{a0}."), "a, b; c.");
        assert_eq!(normalize_space("a\t\tb"), "a b");
    }

    #[test]
    fn test_normalize_space_idempotent_examples() {
        for text in ["a  .  .", " x \u{202f}: y ", "p . , ;", "\u{a0} \u{a0}."] {
            let once = normalize_space(text);
            assert_eq!(normalize_space(&once), once, "input {text:?}");
        }
    }

    #[test]
    fn test_format_default_medial_reference() {
        let reference = parse("Smith, J. and Doe, A. 2003. Title of article. J 12:34-56.");
        assert_eq!(
            format(&reference, &StyleOptions::default()),
            "Smith, J., Doe, A. (2003): Title of article. J 12:34-56."
        );
    }

    #[test]
    fn test_format_moves_terminal_year() {
        let reference = parse("Smith J. Title of paper 12: 3-4 (2003).");
        let options = StyleOptions {
            year_format: YearFormat::ParenPeriod,
            ..StyleOptions::default()
        };
        assert_eq!(
            format(&reference, &options),
            "Smith, J. (2003). Title of paper 12: 3-4"
        );
    }

    #[test]
    fn test_format_author_orderings() {
        let reference = parse("Smith, J., Doe, A. and Lee, K. 2003. Title of article. J 1: 2-3.");
        let options = StyleOptions {
            initials_before: true,
            last_separator: LastSeparator::Ampersand,
            year_format: YearFormat::Period,
            ..StyleOptions::default()
        };
        assert_eq!(
            format(&reference, &options),
            "Smith, J., A. Doe & K. Lee. 2003. Title of article. J 1: 2-3."
        );

        let options = StyleOptions {
            initials_no_period: true,
            last_separator: LastSeparator::CommaAnd,
            ..StyleOptions::default()
        };
        assert_eq!(
            format(&reference, &options),
            "Smith J, Doe A, and Lee K (2003): Title of article. J 1: 2-3."
        );
    }

    #[test]
    fn test_format_et_al_follows_initials_period_option() {
        let authors = parse_authors(PositionedStr::new("Smith, J. et al.")).unwrap();
        let with_period = render_authors(&authors, &StyleOptions::default(), None);
        assert!(with_period.ends_with("et al."));

        let options = StyleOptions {
            initials_no_period: true,
            ..StyleOptions::default()
        };
        let without_period = render_authors(&authors, &options, None);
        assert!(without_period.ends_with("et al"), "{without_period}");
    }

    #[test]
    fn test_format_journal_volume_and_pages() {
        let reference = parse_with_journal("Smith J 2003. Title of article. Nature 12 (3): 45-67.");
        let options = StyleOptions {
            journal_separator: JournalSeparator::Comma,
            volume_separator: VolumeSeparator::Comma,
            volume_formatting: VolumeFormatting::Comma,
            page_separator: PageSeparator::EnDash,
            remove_issue: true,
            ..StyleOptions::default()
        };
        assert_eq!(
            format(&reference, &options),
            "Smith, J (2003): Title of article, Nature, 12, 45\u{2013}67."
        );
    }

    #[test]
    fn test_format_process_switches_leave_fields() {
        let reference = parse_with_journal("Smith J 2003. Title of article. Nature 12: 45-67.");
        let options = StyleOptions {
            process_authors_and_year: false,
            process_page_range_volume: false,
            process_journal_name: false,
            page_separator: PageSeparator::EmDash,
            journal_separator: JournalSeparator::Comma,
            ..StyleOptions::default()
        };
        assert_eq!(
            format(&reference, &options),
            "Smith J 2003. Title of article. Nature 12: 45-67."
        );
    }

    #[test]
    fn test_format_numbering_and_doi_removal() {
        let reference = parse("7. Smith J 2003. Title of article. J 1: 2-3. doi:10.1/x");
        assert!(format(&reference, &StyleOptions::default()).starts_with("Smith, J (2003)"));

        let options = StyleOptions {
            keep_numbering: true,
            remove_doi: true,
            ..StyleOptions::default()
        };
        let formatted = format(&reference, &options);
        assert!(formatted.starts_with("7. Smith"));
        assert!(formatted.ends_with("J 1: 2-3."));
    }

    #[test]
    fn test_format_retrieved_doi_appended() {
        let reference = parse("Smith J 2003. Title of article. J 1: 2-3.");
        let options = StyleOptions {
            crossref: CrossrefMatch::Exact,
            ..StyleOptions::default()
        };
        assert!(needs_doi_lookup(&reference, &options));
        let formatted = format_reference(&reference, &options, None, Some("doi:10.1/x")).unwrap();
        assert!(formatted.ends_with("J 1: 2-3. doi:10.1/x"));
    }

    #[test]
    fn test_format_failed_doi_lookup_leaves_doi_empty() {
        let reference = parse("Smith J 2003. Title of article. J 1: 2-3.");
        let options = StyleOptions {
            crossref: CrossrefMatch::Fuzzy,
            ..StyleOptions::default()
        };
        let formatted = format_reference(&reference, &options, None, None).unwrap();
        assert_eq!(formatted, "Smith, J (2003): Title of article. J 1: 2-3.");
    }

    #[test]
    fn test_format_unparsed_authors_pass_through() {
        let reference = parse("Smith, J., Doe 2003. Title of things here. J 1: 2-3.");
        assert!(format(&reference, &StyleOptions::default()).starts_with("Smith, J., Doe (2003):"));
    }

    #[test]
    fn test_format_html_reinserts_article_tags() {
        let (plain, tags) = extract_tags("<b>Smith</b> J 2003. <i>Frogs</i> &amp; toads. Nature 1: 2-3.");
        let reference = parse_with_journal(&plain);
        let options = StyleOptions {
            html: true,
            journal_style: Style::Italics,
            surname_style: Style::Preserve,
            journal_name_form: NameForm::Abbrev,
            ..StyleOptions::default()
        };
        let formatted = format_reference(&reference, &options, Some(&tags), None).unwrap();
        assert_eq!(
            formatted,
            "<b>Smith</b>, J (2003): <i>Frogs</i> &amp; toads. <i>Nature</i> 1: 2-3."
        );
    }

    #[test]
    fn test_format_rejects_out_of_order_spans() {
        let mut reference = parse("Smith J 2003. Title of article. J 1: 2-3.");
        reference.article = 0..2;
        assert!(format_reference(&reference, &StyleOptions::default(), None, None).is_err());
    }

    fn rewrite(field: Field, span: Range<usize>, text: &str) -> Rewrite {
        Rewrite {
            field,
            span,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_apply_rewrites_overlap_is_an_error() {
        let err = apply_rewrites(
            "Nature 12: 45-67.",
            vec![
                rewrite(Field::Journal, 0..9, "Nat."),
                rewrite(Field::Volume, 7..10, "12,"),
            ],
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormatError::SpanOrder {
                field: "volume".to_string(),
                previous_end: 9,
                start: 7,
            }
        );
    }

    #[test]
    fn test_apply_rewrites_insertion_before_replacement_at_same_offset() {
        let rewritten = apply_rewrites(
            "Title.Nature 12:",
            vec![
                rewrite(Field::Journal, 6..12, "Nat."),
                rewrite(Field::JournalSeparator, 6..6, " "),
            ],
            false,
        )
        .unwrap();
        assert_eq!(rewritten, "Title. Nat. 12:");
    }
}
