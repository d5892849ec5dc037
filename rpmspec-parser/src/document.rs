//! Parsed representation of a spec file.
//!
//! A [`SpecDocument`] is a flat, ordered list of [`Section`]s plus the facts other layers
//! need without re-reading the text: the main preamble tags and every `%global`/`%define`
//! found in the file. Nothing here is evaluated; conditionals are kept as plain lines.

/// One section of a spec file.
///
/// The implicit main preamble has no header line; every other section starts with its
/// `%name [options]` header, which is not part of `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section marker without `%` (`package`, `description`, `files`, ...).
    pub name: String,
    /// Everything after the marker on the header line, trimmed.
    pub options: String,
    /// Content lines following the header.
    pub data: Vec<String>,
    /// Zero-based line of the `%name` header, `None` for the main preamble.
    pub header_line: Option<usize>,
}

impl Section {
    /// The implicit section holding the main package preamble.
    pub fn main(data: Vec<String>) -> Self {
        Self {
            name: "package".to_string(),
            options: String::new(),
            data,
            header_line: None,
        }
    }

    pub fn with_header(
        name: impl Into<String>,
        options: impl Into<String>,
        data: Vec<String>,
        header_line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            options: options.into(),
            data,
            header_line: Some(header_line),
        }
    }

    pub fn is_main(&self) -> bool {
        self.header_line.is_none()
    }

    /// Number of lines the section occupies in the file, header included.
    pub fn line_count(&self) -> usize {
        self.data.len() + usize::from(!self.is_main())
    }
}

/// A `Tag: value` line of the main preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreambleTag {
    /// Tag as written in the file (`Name`, `BuildRequires`, `Source0`, ...).
    pub tag: String,
    /// Parenthesized qualifier, as in `Requires(post)`.
    pub qualifier: Option<String>,
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineKind {
    Global,
    Define,
}

/// A `%global` or `%define` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub kind: DefineKind,
    pub name: String,
    /// Option string of a parametric macro, as in `%define foo(a:) ...`.
    pub parameters: Option<String>,
    /// Body with backslash continuations joined by newlines.
    pub body: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDocument {
    pub sections: Vec<Section>,
    /// Tags of the main preamble, in file order.
    pub preamble: Vec<PreambleTag>,
    /// Macro definitions in file order, from every section.
    pub definitions: Vec<MacroDefinition>,
    pub line_count: usize,
}

impl SpecDocument {
    /// First main preamble tag called `tag`, compared case-insensitively.
    pub fn tag(&self, tag: &str) -> Option<&PreambleTag> {
        self.preamble
            .iter()
            .find(|entry| entry.tag.eq_ignore_ascii_case(tag))
    }

    /// Value of the `Name` tag.
    pub fn name(&self) -> Option<&str> {
        self.tag("Name").map(|entry| entry.value.as_str())
    }
}
