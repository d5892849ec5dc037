//! Macro tables and classification
//!
//!     Two tables answer "what kind of macro is this":
//!
//!         1. The session table: every macro rpm knows at startup, parsed from the output of
//!            `rpm --showrc`. Loaded once and shared read-only.
//!         2. The document-local table: `%global`/`%define` directives of one document plus
//!            the pseudo-macros rpm publishes for preamble tags (`%name`, `%version`, ...).
//!            Rebuilt on every parse.
//!
//!     Each entry carries a [`MacroLevel`] telling the resolver where to look for its
//!     definition.
//!
//! Session dump format
//!
//!     After the `====` separator, rpm prints one macro per entry:
//!
//!         -13: _bindir	%{_exec_prefix}/bin
//!         -13= _libdir	%{_prefix}/lib64
//!         -20: basename	<builtin>
//!         -13: py3_build(e)	%{expand:\
//!           %{__python3} ...
//!
//!     The number is rpm's macro level, `=` marks a macro that was used, an optional
//!     parenthesized option string follows the name and the body starts after a tab.
//!     Lines that do not start a new entry continue the previous body.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use rpmspec_parser::keywords::MACRO_PUBLISHING_TAGS;
use rpmspec_parser::SpecDocument;
use thiserror::Error;

static SHOWRC_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+)[:=] ([^\s(]+)(?:\(([^)]*)\))?(?:\t(.*))?$").unwrap()
});

const SHOWRC_SEPARATOR: &str = "========================";

/// Where a macro's definition lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroLevel {
    /// Intrinsic to the macro engine; there is no text to point at.
    Builtin,
    /// Defined in one of rpm's macro files.
    MacroFile,
    /// Defined by `%global`/`%define` in the document.
    InDocument,
    /// Published by a preamble tag of the document.
    Preamble,
}

impl MacroLevel {
    /// Map rpm's numeric macro level to where its definition can be found.
    pub fn from_rpm_level(level: i32) -> Self {
        match level {
            // RMIL_BUILTIN
            i32::MIN..=-16 => MacroLevel::Builtin,
            // RMIL_DEFAULT, RMIL_MACROFILES, RMIL_RPMRC
            -15..=-8 => MacroLevel::MacroFile,
            // RMIL_CMDLINE, RMIL_TARBALL
            -7..=-4 => MacroLevel::Builtin,
            _ => MacroLevel::InDocument,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDescriptor {
    pub name: String,
    pub level: MacroLevel,
    /// Option string of a parametric macro.
    pub options: Option<String>,
    pub body: String,
}

impl MacroDescriptor {
    pub fn new(name: impl Into<String>, level: MacroLevel, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level,
            options: None,
            body: body.into(),
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }
}

/// Outcome of classifying a macro token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroLookup {
    Unresolved(String),
    Resolved(MacroDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroTableError {
    #[error("rpm --showrc output contains no macro definitions")]
    Empty,
    #[error("line {line}: macro level `{level}` is out of range")]
    InvalidLevel { line: usize, level: String },
}

/// Macros by name, in order of first appearance. A later entry with the same name replaces
/// the earlier one, the way a redefinition does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    descriptors: Vec<MacroDescriptor>,
    by_name: HashMap<String, usize>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = MacroDescriptor>) -> Self {
        let mut table = Self::new();
        for descriptor in descriptors {
            table.insert(descriptor);
        }
        table
    }

    /// The document-local table: preamble pseudo-macros, then in-document definitions.
    pub fn from_document(document: &SpecDocument) -> Self {
        let preamble = document.preamble.iter().filter_map(|entry| {
            preamble_macro_name(&entry.tag).map(|name| {
                MacroDescriptor::new(name, MacroLevel::Preamble, entry.value.clone())
            })
        });
        let defines = document.definitions.iter().map(|definition| {
            let descriptor = MacroDescriptor::new(
                definition.name.clone(),
                MacroLevel::InDocument,
                definition.body.clone(),
            );
            match &definition.parameters {
                Some(options) => descriptor.with_options(options.clone()),
                None => descriptor,
            }
        });
        Self::from_descriptors(preamble.chain(defines))
    }

    /// Parse the macro section of `rpm --showrc` output.
    pub fn parse_showrc(output: &str) -> Result<Self, MacroTableError> {
        let body = match output.find(SHOWRC_SEPARATOR) {
            Some(at) => output[at..].split_once('\n').map_or("", |(_, rest)| rest),
            None => output,
        };

        let mut descriptors: Vec<MacroDescriptor> = Vec::new();
        for (line_number, line) in body.lines().enumerate() {
            // "======================== active 412 empty 0"
            if line.starts_with(SHOWRC_SEPARATOR) {
                break;
            }
            let Some(captures) = SHOWRC_ENTRY.captures(line) else {
                if let Some(last) = descriptors.last_mut() {
                    last.body.push('\n');
                    last.body.push_str(line);
                }
                continue;
            };
            let level = captures[1]
                .parse::<i32>()
                .map_err(|_| MacroTableError::InvalidLevel {
                    line: line_number,
                    level: captures[1].to_string(),
                })?;
            let descriptor = MacroDescriptor::new(
                &captures[2],
                MacroLevel::from_rpm_level(level),
                captures.get(4).map_or("", |m| m.as_str()),
            );
            descriptors.push(match captures.get(3) {
                Some(options) => descriptor.with_options(options.as_str()),
                None => descriptor,
            });
        }

        if descriptors.is_empty() {
            return Err(MacroTableError::Empty);
        }
        Ok(Self::from_descriptors(descriptors))
    }

    pub fn insert(&mut self, descriptor: MacroDescriptor) {
        match self.by_name.get(&descriptor.name) {
            Some(&index) => self.descriptors[index] = descriptor,
            None => {
                self.by_name
                    .insert(descriptor.name.clone(), self.descriptors.len());
                self.descriptors.push(descriptor);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&MacroDescriptor> {
        self.by_name.get(name).map(|&index| &self.descriptors[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Name of the macro rpm publishes for a preamble tag, if it publishes one.
///
/// Named tags become their lowercase name (`Version` -> `version`); numbered sources and
/// patches become `SOURCEn`/`PATCHn`. Unnumbered `Source`/`Patch` tags publish nothing here.
pub fn preamble_macro_name(tag: &str) -> Option<String> {
    if MACRO_PUBLISHING_TAGS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(tag))
    {
        return Some(tag.to_ascii_lowercase());
    }
    ["SOURCE", "PATCH"].into_iter().find_map(|prefix| {
        let number = tag
            .get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(prefix))
            .map(|_| &tag[prefix.len()..])?;
        (!number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()))
            .then(|| format!("{prefix}{number}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpmspec_parser::parse_document;
    use rstest::rstest;

    const SHOWRC: &str = "ARCHITECTURE AND OS:
build arch            : x86_64
optflags              : -O2 -g
========================
-20: basename\t<builtin>
-15: _arch\tx86_64
-13: _bindir\t%{_exec_prefix}/bin
-13= _prefix\t/usr
-13: py3_build(e)\t%{expand:\\
  %{__python3} %{py_setup} build
}
-11: _rpmrc_flag\tyes
 -7: _cmdline\tcli
  0: nested\tglobal
-13: empty_body
======================== active 9 empty 0
";

    #[test]
    fn parses_showrc_entries_with_continuations() {
        let table = MacroTable::parse_showrc(SHOWRC).unwrap();
        assert_eq!(table.len(), 9);

        let bindir = table.get("_bindir").unwrap();
        assert_eq!(bindir.level, MacroLevel::MacroFile);
        assert_eq!(bindir.body, "%{_exec_prefix}/bin");

        let py3_build = table.get("py3_build").unwrap();
        assert_eq!(py3_build.options.as_deref(), Some("e"));
        assert_eq!(
            py3_build.body,
            "%{expand:\\\n  %{__python3} %{py_setup} build\n}"
        );

        assert_eq!(table.get("basename").unwrap().level, MacroLevel::Builtin);
        assert_eq!(table.get("_cmdline").unwrap().level, MacroLevel::Builtin);
        assert_eq!(table.get("nested").unwrap().level, MacroLevel::InDocument);
        assert_eq!(table.get("empty_body").unwrap().body, "");
        assert!(!table.contains("optflags"));
    }

    #[test]
    fn showrc_without_macros_is_an_error() {
        assert_eq!(
            MacroTable::parse_showrc("ARCHITECTURE AND OS:\n========================\n"),
            Err(MacroTableError::Empty)
        );
    }

    #[rstest]
    #[case(-20, MacroLevel::Builtin)]
    #[case(-15, MacroLevel::MacroFile)]
    #[case(-13, MacroLevel::MacroFile)]
    #[case(-11, MacroLevel::MacroFile)]
    #[case(-7, MacroLevel::Builtin)]
    #[case(-5, MacroLevel::Builtin)]
    #[case(-3, MacroLevel::InDocument)]
    #[case(-1, MacroLevel::InDocument)]
    #[case(0, MacroLevel::InDocument)]
    #[case(4, MacroLevel::InDocument)]
    fn rpm_levels(#[case] level: i32, #[case] expected: MacroLevel) {
        assert_eq!(MacroLevel::from_rpm_level(level), expected);
    }

    #[rstest]
    #[case("Name", Some("name"))]
    #[case("URL", Some("url"))]
    #[case("Source0", Some("SOURCE0"))]
    #[case("patch12", Some("PATCH12"))]
    #[case("Source", None)]
    #[case("BuildRequires", None)]
    fn preamble_pseudo_macros(#[case] tag: &str, #[case] expected: Option<&str>) {
        assert_eq!(preamble_macro_name(tag).as_deref(), expected);
    }

    #[test]
    fn document_table_holds_defines_and_preamble() {
        let document = parse_document(
            "Name: foo\nVersion: 1\nSource0: foo.tar.gz\nBuildRequires: gcc\n%global version 2\n%define with_args(a) %{-a}\n",
        )
        .unwrap();
        let table = MacroTable::from_document(&document);

        assert_eq!(table.get("name").unwrap().level, MacroLevel::Preamble);
        assert_eq!(table.get("SOURCE0").unwrap().body, "foo.tar.gz");
        // the later %global redefines the tag's macro
        let version = table.get("version").unwrap();
        assert_eq!(version.level, MacroLevel::InDocument);
        assert_eq!(version.body, "2");
        assert_eq!(table.get("with_args").unwrap().options.as_deref(), Some("a"));
        assert!(!table.contains("buildrequires"));
        assert_eq!(table.len(), 4);
    }
}
