//! Text search helpers shared by the resolver and the feature layer.
//!
//! Every finder returns [`Range`]s covering the text it matched on, starting at the first
//! non-blank character of the line:
//!
//! - `%global name` / `%define name`: the directive and the name, nothing after it
//! - `Tag: value`: the tag, the colon, the blanks and the first value token
//! - `%name body` / `%name(opts) body` in macro files: the name, the separator and the
//!   first body token
//!
//! Offsets are converted by counting the newlines before the match.

use regex::Regex;
use rpmspec_parser::{Range, SourceLocation};

/// Text of the zero-based `line`, without its terminator.
pub fn line_at(text: &str, line: usize) -> Option<&str> {
    text.lines().nth(line)
}

/// Number of chars of `line` that precede the UTF-16 offset `character`.
///
/// Editors address columns in UTF-16 code units; the scanner walks chars. Offsets past the
/// end of the line clamp to the line's char count.
pub fn char_index_from_utf16(line: &str, character: usize) -> usize {
    let mut units = 0;
    for (index, ch) in line.chars().enumerate() {
        if units >= character {
            return index;
        }
        units += ch.len_utf16();
    }
    line.chars().count()
}

/// Definitions of `macro_name` as a spec file writes them: `%global name` or `%define name`.
pub fn find_macro_define_in_spec(macro_name: &str, spec_contents: &str) -> Vec<Range> {
    let pattern = format!(
        r"(?m)^[\t \x0C]*(%(?:global|define)[\t \x0C]+{})(?:[\t \x0C(]|\r?$)",
        regex::escape(macro_name)
    );
    declaration_ranges(&pattern, spec_contents)
}

/// The preamble line declaring the tag behind a pseudo-macro such as `%version`, matched
/// case-insensitively. Only the first match counts.
pub fn find_preamble_definition_in_spec(macro_name: &str, spec_contents: &str) -> Option<Range> {
    let pattern = format!(r"(?mi)^[\t \x0C]*({}:[\t \x0C]*\S*)", regex::escape(macro_name));
    declaration_ranges(&pattern, spec_contents).into_iter().next()
}

/// Definitions of `macro_name` in an rpm macro file: `%name body` or `%name(opts) body`.
pub fn find_macro_matches_in_macro_file(macro_name: &str, macro_file_contents: &str) -> Vec<Range> {
    let pattern = format!(
        r"(?m)^[\t \x0C]*(%{}(?:[\t \x0C]+|\()\S+)",
        regex::escape(macro_name)
    );
    declaration_ranges(&pattern, macro_file_contents)
}

fn declaration_ranges(pattern: &str, text: &str) -> Vec<Range> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!(%err, pattern, "cannot compile declaration pattern");
            return Vec::new();
        }
    };
    let locator = SourceLocation::new(text);
    regex
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|declaration| locator.byte_range_to_range(&declaration.range()))
        .collect()
}
