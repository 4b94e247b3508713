//! Refstyle Core Library
//!
//! This library parses free-form bibliographic references, as typed in
//! manuscript reference lists, into structured records that remember where
//! every field sat in the original line, and re-renders them under a
//! configurable citation style.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Offset-tracking text view, author list and reference parsers
//! - [`style`] - Style options, inline markup handling and the formatter
//! - [`annotated`] - Bracket-annotated text form for manual review
//! - [`journal`] - Journal name table and matcher
//! - [`lookup`] - DOI retrieval through Crossref
//! - [`document`] - Text and HTML reference list segmentation
//! - [`pipeline`] - Batch processing of whole reference lists

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod labels;

pub mod annotated;
pub mod document;
pub mod journal;
pub mod lookup;
pub mod parser;
pub mod pipeline;
pub mod style;

// Re-export commonly used types
pub use annotated::{Brackets, DeserializeError, SerializeError, deserialize, serialize};
pub use document::{DocumentError, InputFormat};
pub use journal::{JournalMatcher, JournalNames, JournalTable, NameForm};
pub use lookup::{CrossrefLookup, DoiLookup, LookupError};
pub use parser::{Author, LineOutcome, ParseError, PositionedStr, Reference, parse_line};
pub use pipeline::{DoiRetrieval, Entry};
pub use style::{FormatError, StyleOptions, format_reference};
