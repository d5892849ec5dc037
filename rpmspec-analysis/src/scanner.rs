//! Find the macro under the cursor
//!
//!     Works on a single physical line and a char index into it. The scan has two halves:
//!
//!         1. Walk left from the cursor to the nearest `%` that is not part of a `%%` escape.
//!            When the cursor itself rests on such a `%`, that one is taken, so the trigger
//!            character resolves the macro it introduces.
//!         2. From the start of the name, skip `{` and any `?`/`!` flags, then walk right from
//!            the cursor to the first delimiter.
//!
//!     A `%dnl` anywhere before the macro comments out the rest of the line.

use crate::utils::{char_index_from_utf16, line_at};
use rpmspec_parser::Position;

/// Characters other than whitespace that end a macro name.
const DELIMITERS: &[char] = &['}', '%', ',', ';'];

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || DELIMITERS.contains(&ch)
}

/// Name of the macro at `cursor` (a char index) on `line`, if any.
///
/// The cursor may equal the line length. Escaped percent signs, `%dnl` comments and empty
/// names yield `None`.
pub fn macro_at_position(line: &str, cursor: usize) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() || cursor > chars.len() {
        return None;
    }

    let is_trigger = |index: usize| {
        chars[index] == '%'
            && (index == 0 || chars[index - 1] != '%')
            && chars.get(index + 1) != Some(&'%')
    };

    let window_end = if cursor < chars.len() && is_trigger(cursor) {
        cursor + 1
    } else {
        cursor
    };
    let start = (0..window_end)
        .rev()
        .find(|&index| is_trigger(index))
        .unwrap_or(0);
    if chars[start] != '%' || chars.get(start + 1) == Some(&'%') {
        return None;
    }

    let prefix: String = chars[..start].iter().collect();
    if prefix.contains("%dnl") {
        return None;
    }

    let mut name_start = start + 1;
    if chars.get(name_start) == Some(&'{') {
        name_start += 1;
    }
    while matches!(chars.get(name_start), Some('?') | Some('!')) {
        name_start += 1;
    }

    let name_end = (cursor.max(name_start)..chars.len())
        .find(|&index| is_delimiter(chars[index]))
        .unwrap_or(chars.len());
    if name_start >= name_end {
        return None;
    }

    Some(chars[name_start..name_end].iter().collect())
}

/// Name of the macro at an editor position in `text`.
///
/// The position's column is in UTF-16 code units, as editors send it.
pub fn macro_at(text: &str, position: Position) -> Option<String> {
    let line = line_at(text, position.line)?;
    macro_at_position(line, char_index_from_utf16(line, position.column))
}
