//! Reference list documents.
//!
//! A document is either plain text with one reference per line or an HTML
//! page whose body lists the references. This module only segments and
//! reassembles documents; parsing happens in [`crate::pipeline`].

mod html;
mod text;

use std::path::Path;

use thiserror::Error;

pub use html::{HtmlEntry, HtmlList, ListKind};
pub use text::reference_lines;

/// Errors raised while segmenting a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The body contains no element at all
    #[error("the reference list is unstructured\n  Suggestion: Put the references in a <ul>, an <ol> or <p> elements")]
    Unstructured,

    /// The body starts with an element that is not a list or paragraph
    #[error("can't detect the structure of the reference list: the body starts with <{tag}>\n  Suggestion: Put the references in a <ul>, an <ol> or <p> elements")]
    UnknownStructure {
        /// Name of the first element
        tag: String,
    },
}

/// Kind of input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Text,
    Html,
}

impl InputFormat {
    /// Guesses the format from a file extension; anything but `.html`/`.htm`
    /// is text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm") => {
                Self::Html
            }
            _ => Self::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("refs.HTML")), InputFormat::Html);
        assert_eq!(InputFormat::from_path(Path::new("refs.htm")), InputFormat::Html);
        assert_eq!(InputFormat::from_path(Path::new("refs.txt")), InputFormat::Text);
        assert_eq!(InputFormat::from_path(Path::new("refs")), InputFormat::Text);
    }
}
