//! Line-based structure parser for spec files
//!
//!     The parser never evaluates anything. It walks the physical lines once and records
//!     three things:
//!         1. Sections: every line starting with a known `%marker` opens a new section; all
//!            lines before the first marker form the headerless main preamble.
//!         2. Preamble tags: `Tag: value` lines of the main preamble.
//!         3. Macro definitions: `%global`/`%define` lines anywhere, continuation lines
//!            (trailing `\`) folded into the body.
//!
//!     Lines are split the way [`str::lines`] does, so a trailing newline does not add an
//!     empty last line and `\r\n` endings are accepted. The sections always tile the line
//!     count exactly.
//!
//! Rejected input
//!
//!     A document is malformed when its conditionals are unbalanced, a `%package` header has
//!     no subpackage name, or the main preamble lacks a `Name` tag. These are the structural
//!     errors rpm itself refuses before any macro is expanded.

use crate::document::{DefineKind, MacroDefinition, PreambleTag, Section, SpecDocument};
use crate::keywords::{self, CONDITIONAL_BRANCHES, CONDITIONAL_CLOSER, CONDITIONAL_OPENERS};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PREAMBLE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9]*)(?:\(([^)]*)\))?[ \t]*:[ \t]*(.*?)[ \t]*$").unwrap()
});

static DEFINE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*%(global|define)[ \t]+([A-Za-z_][A-Za-z0-9_]*)(\([^)]*\))?(?:[ \t]+(.*))?$")
        .unwrap()
});

/// Errors that make a document unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: %{directive} without a matching %if")]
    UnmatchedConditional { line: usize, directive: String },
    #[error("line {line}: %if is never closed by %endif")]
    UnterminatedConditional { line: usize },
    #[error("line {line}: %package requires a subpackage name")]
    MissingPackageName { line: usize },
    #[error("the preamble does not declare a Name tag")]
    MissingName,
}

/// Parse spec text into its sections, preamble tags and macro definitions.
pub fn parse_document(source: &str) -> Result<SpecDocument, ParseError> {
    let lines: Vec<&str> = source.lines().collect();

    check_conditionals(&lines)?;
    let sections = split_sections(&lines)?;
    let preamble = sections
        .first()
        .filter(|section| section.is_main())
        .map(collect_preamble)
        .unwrap_or_default();

    if !preamble
        .iter()
        .any(|entry| entry.tag.eq_ignore_ascii_case("Name"))
    {
        return Err(ParseError::MissingName);
    }

    Ok(SpecDocument {
        sections,
        preamble,
        definitions: collect_definitions(&lines),
        line_count: lines.len(),
    })
}

/// Split a header line into its section marker and options.
fn section_header(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('%')?;
    let end = rest
        .find(|ch: char| ch.is_whitespace())
        .unwrap_or(rest.len());
    let name = &rest[..end];
    keywords::is_section_name(name).then(|| (name, rest[end..].trim()))
}

fn split_sections(lines: &[&str]) -> Result<Vec<Section>, ParseError> {
    let mut sections = vec![Section::main(Vec::new())];

    for (index, line) in lines.iter().enumerate() {
        match section_header(line) {
            Some((name, options)) => {
                if name == "package" && options.is_empty() {
                    return Err(ParseError::MissingPackageName { line: index });
                }
                sections.push(Section::with_header(name, options, Vec::new(), index));
            }
            None => {
                if let Some(current) = sections.last_mut() {
                    current.data.push((*line).to_string());
                }
            }
        }
    }

    Ok(sections)
}

fn check_conditionals(lines: &[&str]) -> Result<(), ParseError> {
    let mut open: Vec<usize> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(directive) = line.split_whitespace().next() else {
            continue;
        };
        if CONDITIONAL_OPENERS.contains(&directive) {
            open.push(index);
        } else if CONDITIONAL_BRANCHES.contains(&directive) {
            if open.is_empty() {
                return Err(ParseError::UnmatchedConditional {
                    line: index,
                    directive: directive.trim_start_matches('%').to_string(),
                });
            }
        } else if directive == CONDITIONAL_CLOSER && open.pop().is_none() {
            return Err(ParseError::UnmatchedConditional {
                line: index,
                directive: "endif".to_string(),
            });
        }
    }

    match open.last() {
        Some(&line) => Err(ParseError::UnterminatedConditional { line }),
        None => Ok(()),
    }
}

fn collect_preamble(main: &Section) -> Vec<PreambleTag> {
    main.data
        .iter()
        .enumerate()
        .filter_map(|(line, text)| {
            let captures = PREAMBLE_LINE.captures(text)?;
            let tag = captures.get(1)?.as_str();
            keywords::canonical_tag(tag)?;
            Some(PreambleTag {
                tag: tag.to_string(),
                qualifier: captures.get(2).map(|m| m.as_str().to_string()),
                value: captures
                    .get(3)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                line,
            })
        })
        .collect()
}

fn collect_definitions(lines: &[&str]) -> Vec<MacroDefinition> {
    let mut definitions = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = index;
        index += 1;

        let Some(captures) = DEFINE_LINE.captures(lines[line]) else {
            continue;
        };
        let kind = match &captures[1] {
            "global" => DefineKind::Global,
            _ => DefineKind::Define,
        };

        let mut body = captures
            .get(4)
            .map(|m| m.as_str().trim_end().to_string())
            .unwrap_or_default();
        while body.ends_with('\\') && index < lines.len() {
            body.pop();
            body.push('\n');
            body.push_str(lines[index].trim_end());
            index += 1;
        }

        definitions.push(MacroDefinition {
            kind,
            name: captures[2].to_string(),
            parameters: captures
                .get(3)
                .map(|m| m.as_str().trim_matches(|ch| ch == '(' || ch == ')').to_string()),
            body,
            line,
        });
    }

    definitions
}
