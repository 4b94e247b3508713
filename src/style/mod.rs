//! Citation style rendering.
//!
//! [`StyleOptions`] is a plain value describing the target style;
//! [`format_reference`] applies it to a parsed [`Reference`](crate::parser::Reference).
//! HTML entries carry their inline markup separately as [`ExtractedTags`].

mod formatter;
mod markup;
mod options;

pub use crate::parser::FormatError;
pub use formatter::{format_reference, needs_doi_lookup, normalize_space};
pub use markup::{ExtractedTags, escape_text, extract_tags};
pub use options::{
    CrossrefMatch, JournalSeparator, LastSeparator, OptionsError, PageSeparator,
    STYLE_OPTION_KEYS, Style, StyleOptions, VolumeFormatting, VolumeSeparator, YearFormat,
};
