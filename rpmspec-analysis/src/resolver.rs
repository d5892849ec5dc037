//! Macro definition resolver
//!
//!     Finds where a macro is defined. Classification picks the tier, the tier decides where
//!     to search:
//!
//!         InDocument   every `%global`/`%define` of the name in the document
//!         Preamble     the first `Tag:` line publishing the name
//!         MacroFile    files of the packages providing `rpm_macro(name)`, then the builtin
//!                      macro file
//!         Builtin      nothing to point at
//!
//!     The package database and the file system are reached through [`PackageDatabase`] and
//!     [`MacroFileReader`], so a tier whose I/O fails just comes back empty.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rpmspec_parser::Range;
use thiserror::Error;

use crate::macros::{MacroLevel, MacroLookup, MacroTable};
use crate::utils::{
    find_macro_define_in_spec, find_macro_matches_in_macro_file, find_preamble_definition_in_spec,
};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("package query `{query}` failed: {reason}")]
    Query { query: String, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The installed package set.
pub trait PackageDatabase: Send + Sync {
    /// File lists of every installed package providing `capability`.
    fn find_providers(&self, capability: &str) -> Result<Vec<Vec<PathBuf>>, LookupError>;
}

/// Read access to macro files.
pub trait MacroFileReader: Send + Sync {
    fn read_macro_file(&self, path: &Path) -> io::Result<String>;
}

/// Reads macro files from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMacroFileReader;

impl MacroFileReader for FsMacroFileReader {
    fn read_macro_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// A package database with nothing installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPackages;

impl PackageDatabase for NoPackages {
    fn find_providers(&self, _capability: &str) -> Result<Vec<Vec<PathBuf>>, LookupError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionTarget {
    /// The document the request was made for.
    Document,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLocation {
    pub target: DefinitionTarget,
    pub range: Range,
}

impl DefinitionLocation {
    pub fn in_document(range: Range) -> Self {
        Self {
            target: DefinitionTarget::Document,
            range,
        }
    }

    pub fn in_file(path: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            target: DefinitionTarget::File(path.into()),
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Vec<DefinitionLocation>),
    /// Defined by the macro engine itself.
    Builtin,
    NotFound,
}

impl Resolution {
    fn from_locations(locations: Vec<DefinitionLocation>) -> Self {
        if locations.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::Found(locations)
        }
    }

    pub fn locations(&self) -> &[DefinitionLocation] {
        match self {
            Resolution::Found(locations) => locations,
            Resolution::Builtin | Resolution::NotFound => &[],
        }
    }
}

/// Where rpm keeps its macro files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Only provider files below this directory are searched.
    pub macro_dir: PathBuf,
    /// Searched when no provider defines the macro.
    pub builtin_macro_file: PathBuf,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            macro_dir: PathBuf::from("/usr/lib/rpm/macros.d"),
            builtin_macro_file: PathBuf::from("/usr/lib/rpm/macros"),
        }
    }
}

/// The capability a package provides for each macro it defines.
pub fn macro_capability(name: &str) -> String {
    format!("rpm_macro({name})")
}

pub struct MacroResolver {
    session: Arc<MacroTable>,
    packages: Box<dyn PackageDatabase>,
    files: Box<dyn MacroFileReader>,
    settings: ResolverSettings,
}

impl MacroResolver {
    pub fn new(
        session: Arc<MacroTable>,
        packages: impl PackageDatabase + 'static,
        files: impl MacroFileReader + 'static,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            session,
            packages: Box::new(packages),
            files: Box::new(files),
            settings,
        }
    }

    pub fn session(&self) -> &Arc<MacroTable> {
        &self.session
    }

    /// Classify `name` against the document-local table, then the session table.
    pub fn classify(&self, name: &str, locals: &MacroTable) -> MacroLookup {
        locals
            .get(name)
            .or_else(|| self.session.get(name))
            .cloned()
            .map_or_else(
                || MacroLookup::Unresolved(name.to_string()),
                MacroLookup::Resolved,
            )
    }

    /// Locate the definitions of a classified macro. `document` is the text of the document
    /// the lookup was made for.
    pub fn resolve(&self, lookup: &MacroLookup, document: &str) -> Resolution {
        let descriptor = match lookup {
            MacroLookup::Unresolved(name) => {
                tracing::debug!(name = %name, "macro is not defined anywhere");
                return Resolution::NotFound;
            }
            MacroLookup::Resolved(descriptor) => descriptor,
        };
        let name = descriptor.name.as_str();

        match descriptor.level {
            MacroLevel::InDocument => Resolution::from_locations(
                find_macro_define_in_spec(name, document)
                    .into_iter()
                    .map(DefinitionLocation::in_document)
                    .collect(),
            ),
            MacroLevel::Preamble => Resolution::from_locations(
                find_preamble_definition_in_spec(name, document)
                    .map(DefinitionLocation::in_document)
                    .into_iter()
                    .collect(),
            ),
            MacroLevel::MacroFile => self.resolve_in_macro_files(name),
            MacroLevel::Builtin => Resolution::Builtin,
        }
    }

    /// Classify and resolve in one step.
    pub fn definition(&self, name: &str, locals: &MacroTable, document: &str) -> Resolution {
        self.resolve(&self.classify(name, locals), document)
    }

    fn resolve_in_macro_files(&self, name: &str) -> Resolution {
        let capability = macro_capability(name);
        match self.packages.find_providers(&capability) {
            Ok(providers) => {
                for files in providers {
                    let found = files
                        .iter()
                        .filter(|path| path.starts_with(&self.settings.macro_dir))
                        .find_map(|path| self.search_macro_file(path, name));
                    if let Some(locations) = found {
                        return Resolution::Found(locations);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%capability, %err, "package database lookup failed");
            }
        }

        let builtin = self.settings.builtin_macro_file.as_path();
        match self.search_macro_file(builtin, name) {
            Some(locations) => Resolution::Found(locations),
            None => Resolution::NotFound,
        }
    }

    fn search_macro_file(&self, path: &Path, name: &str) -> Option<Vec<DefinitionLocation>> {
        let contents = match self.files.read_macro_file(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "cannot read macro file");
                return None;
            }
        };
        let ranges = find_macro_matches_in_macro_file(name, &contents);
        if ranges.is_empty() {
            return None;
        }
        Some(
            ranges
                .into_iter()
                .map(|range| DefinitionLocation::in_file(path, range))
                .collect(),
        )
    }
}
