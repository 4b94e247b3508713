//! Offset-tracking string views.
//!
//! A [`PositionedStr`] is a borrowed slice of a root buffer that remembers
//! where it sits in that buffer. Every derived view (sub-slice, strip, regex
//! group, partition, split) carries byte offsets into the root, so spans found
//! deep inside the parser can be reported against the original line.

use std::fmt;
use std::ops::Range;

use regex::{Match, Regex};

use super::error::ViewError;

/// Immutable string view with absolute offsets into a root buffer.
///
/// Invariant: `end() - start() == as_str().len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionedStr<'a> {
    content: &'a str,
    start: usize,
}

impl<'a> PositionedStr<'a> {
    /// Creates a root view starting at offset 0.
    #[must_use]
    pub const fn new(content: &'a str) -> Self {
        Self { content, start: 0 }
    }

    /// Creates a view of `content` that starts at `start` in its root buffer.
    #[must_use]
    pub const fn with_offset(content: &'a str, start: usize) -> Self {
        Self { content, start }
    }

    /// Returns the viewed text.
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        self.content
    }

    /// Absolute start offset.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Absolute end offset (exclusive).
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.content.len()
    }

    /// Absolute span of this view in the root buffer.
    #[must_use]
    pub const fn span(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Length of the view in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns `true` if the view contains no text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the sub-view covering the local byte `range`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError`] when the range is reversed, out of bounds, or
    /// splits a multi-byte character.
    pub fn try_slice(&self, range: Range<usize>) -> Result<Self, ViewError> {
        if range.start > range.end || range.end > self.content.len() {
            return Err(ViewError::BadRange {
                start: range.start,
                end: range.end,
                len: self.content.len(),
            });
        }
        let Some(content) = self.content.get(range.clone()) else {
            return Err(ViewError::NotCharBoundary {
                start: range.start,
                end: range.end,
            });
        };
        Ok(Self {
            content,
            start: self.start + range.start,
        })
    }

    /// Returns the sub-view covering the local byte `range`.
    ///
    /// # Panics
    ///
    /// Panics when the range violates the view contract (see [`Self::try_slice`]).
    /// Such a range can only come from broken offset arithmetic.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        match self.try_slice(range) {
            Ok(view) => view,
            Err(error) => panic!("positioned string contract violated: {error}"),
        }
    }

    /// Returns the sub-view from local offset `start` to the end.
    #[must_use]
    pub fn slice_from(&self, start: usize) -> Self {
        self.slice(start..self.content.len())
    }

    /// Returns the sub-view from the beginning to local offset `end`.
    #[must_use]
    pub fn slice_to(&self, end: usize) -> Self {
        self.slice(0..end)
    }

    /// Trims whitespace from both ends, shrinking the offsets accordingly.
    #[must_use]
    pub fn strip(&self) -> Self {
        let right = self.content.trim_end();
        let both = right.trim_start();
        Self {
            content: both,
            start: self.start + (right.len() - both.len()),
        }
    }

    /// Trims any of `chars` from both ends, shrinking the offsets accordingly.
    #[must_use]
    pub fn strip_matches(&self, chars: &[char]) -> Self {
        let right = self.content.trim_end_matches(chars);
        let both = right.trim_start_matches(chars);
        Self {
            content: both,
            start: self.start + (right.len() - both.len()),
        }
    }

    /// Searches the view for `pattern`; the match is local to the view.
    #[must_use]
    pub fn search(&self, pattern: &Regex) -> Option<Match<'a>> {
        pattern.find(self.content)
    }

    /// Matches `pattern` only at the beginning of the view.
    #[must_use]
    pub fn match_start(&self, pattern: &Regex) -> Option<Match<'a>> {
        pattern.find(self.content).filter(|m| m.start() == 0)
    }

    /// Translates a local match span into an absolute span.
    #[must_use]
    pub fn match_position(&self, found: &Match<'_>) -> Range<usize> {
        self.start + found.start()..self.start + found.end()
    }

    /// Returns the view covered by a local match.
    #[must_use]
    pub fn group(&self, found: &Match<'_>) -> Self {
        self.slice(found.range())
    }

    /// Splits the view into (before, matched, after) around a local match.
    #[must_use]
    pub fn match_partition(&self, found: &Match<'_>) -> (Self, Self, Self) {
        (
            self.slice_to(found.start()),
            self.slice(found.range()),
            self.slice_from(found.end()),
        )
    }

    /// Splits at the first occurrence of `sep` into (before, separator, after).
    ///
    /// When `sep` does not occur, returns the whole view followed by two empty
    /// views positioned at its end.
    #[must_use]
    pub fn partition(&self, sep: &str) -> (Self, Self, Self) {
        match self.content.find(sep) {
            Some(index) => self.split_around(index, sep.len()),
            None => {
                let len = self.content.len();
                (*self, self.slice(len..len), self.slice(len..len))
            }
        }
    }

    /// Splits at the last occurrence of `sep` into (before, separator, after).
    ///
    /// When `sep` does not occur, returns two empty views positioned at the
    /// start followed by the whole view.
    #[must_use]
    pub fn rpartition(&self, sep: &str) -> (Self, Self, Self) {
        match self.content.rfind(sep) {
            Some(index) => self.split_around(index, sep.len()),
            None => (self.slice(0..0), self.slice(0..0), *self),
        }
    }

    fn split_around(&self, index: usize, sep_len: usize) -> (Self, Self, Self) {
        let right = index + sep_len;
        (
            self.slice_to(index),
            self.slice(index..right),
            self.slice_from(right),
        )
    }

    /// Splits on every occurrence of `sep`.
    ///
    /// Offsets accumulate the consumed part and separator lengths, so joining
    /// the parts with `sep` reproduces the view exactly.
    #[must_use]
    pub fn split(&self, sep: &str) -> Vec<Self> {
        let mut consumed = 0;
        self.content
            .split(sep)
            .map(|part| {
                let view = self.slice(consumed..consumed + part.len());
                consumed += part.len() + sep.len();
                view
            })
            .collect()
    }
}

impl fmt::Display for PositionedStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content)
    }
}
