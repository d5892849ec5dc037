//! Named, line-ranged sections
//!
//!     The parser hands over sections in file order with their raw header options. This
//!     module turns them into the entries editors navigate by: each gets a display name and a
//!     half-open line range, assigned with a running cursor so the ranges tile the document.
//!
//! Display names
//!
//!     The raw marker is the base name. A first option that is not a flag names a subpackage
//!     relative to the main package (`%files devel` in `foo` becomes `files foo-devel`). An
//!     explicit `-n name` replaces that derived name entirely (`%description -n python3-foo`
//!     becomes `description python3-foo`).

use rpmspec_parser::{Section, SpecDocument};

use crate::expansion::expand_or_keep;
use crate::macros::MacroTable;

/// Half-open line range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A section with its display name and place in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSection {
    pub name: String,
    pub lines: LineRange,
    section: Section,
}

impl SpecSection {
    /// The parsed section this entry was derived from.
    pub fn raw(&self) -> &Section {
        &self.section
    }

    /// The raw section marker (`package`, `files`, ...).
    pub fn tag(&self) -> &str {
        &self.section.name
    }

    pub fn is_main(&self) -> bool {
        self.section.is_main()
    }

    /// `%package` sections and the main preamble hold preamble tags.
    pub fn holds_preamble(&self) -> bool {
        self.section.name == "package"
    }

    /// Range an editor highlights when the section is selected: the header line, or the whole
    /// main preamble which has none.
    pub fn selection_range(&self) -> LineRange {
        if self.is_main() {
            self.lines
        } else {
            LineRange::new(self.lines.start, self.lines.start + 1)
        }
    }
}

/// Ordered sections of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionIndex {
    sections: Vec<SpecSection>,
}

impl SectionIndex {
    /// Index `sections` in parser order for a package called `main_package`.
    pub fn build(sections: &[Section], main_package: &str) -> Self {
        let mut cursor = 0;
        let sections = sections
            .iter()
            .map(|section| {
                let start = cursor;
                cursor += section.line_count();
                SpecSection {
                    name: display_name(section, main_package),
                    lines: LineRange::new(start, cursor),
                    section: section.clone(),
                }
            })
            .collect();
        Self { sections }
    }

    /// Index a parsed document, expanding document-local macros in its `Name` tag.
    pub fn from_document(document: &SpecDocument) -> Self {
        let locals = MacroTable::from_document(document);
        let main_package = expand_or_keep(document.name().unwrap_or_default(), &locals);
        Self::build(&document.sections, &main_package)
    }

    /// The section containing `line`, if any.
    pub fn section_under_cursor(&self, line: usize) -> Option<&SpecSection> {
        self.sections
            .iter()
            .find(|section| section.lines.contains(line))
    }

    pub fn sections(&self) -> &[SpecSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of lines covered by the index.
    pub fn line_count(&self) -> usize {
        self.sections.last().map_or(0, |section| section.lines.end)
    }
}

/// Display name of `section` in a package called `main_package`.
pub fn display_name(section: &Section, main_package: &str) -> String {
    let tokens: Vec<&str> = section.options.split_whitespace().collect();

    let explicit = tokens
        .iter()
        .position(|token| *token == "-n")
        .and_then(|flag| tokens.get(flag + 1));
    if let Some(name) = explicit {
        return format!("{} {}", section.name, name);
    }

    match tokens.first() {
        Some(first) if !first.starts_with('-') => {
            format!("{} {}-{}", section.name, main_package, first)
        }
        _ => section.name.clone(),
    }
}
