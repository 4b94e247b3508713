//! Plain-text reference lists: one reference per line.

use crate::style::normalize_space;

/// Byte order mark some editors put at the start of a file.
const BOM: char = '\u{feff}';

/// Yields the normalized non-blank lines of `input`.
///
/// A leading byte order mark is removed, trailing whitespace trimmed and
/// inner whitespace normalized.
pub fn reference_lines(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .lines()
        .map(|line| normalize_space(line.trim_start_matches(BOM).trim_end()))
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_lines_normalizes_and_skips_blank() {
        let input = "\u{feff}1. Smith  J 2003.   Title .\r\n\n   \nDoe A 2004. Other.  \n";
        let lines: Vec<String> = reference_lines(input).collect();
        assert_eq!(lines, vec!["1. Smith J 2003. Title.", "Doe A 2004. Other."]);
    }

    #[test]
    fn test_reference_lines_empty_input() {
        assert_eq!(reference_lines("").count(), 0);
        assert_eq!(reference_lines("\u{feff}\n \n").count(), 0);
    }
}
