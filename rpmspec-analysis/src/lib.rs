//! # rpmspec-analysis
//!
//! Everything the language server knows about a spec file beyond its raw structure, kept
//! free of any protocol plumbing so it can be tested on plain strings.
//!
//! Layout
//!
//!     scanner      The macro name under a cursor
//!     sections     Named, line-ranged sections and point lookup
//!     macros       Session and document-local macro tables, classification levels
//!     resolver     Where a macro is defined (document, preamble, macro files, builtin)
//!     expansion    Macro expansion seam and the in-process expander
//!     completion   Completion candidates by cursor context
//!     utils        Declaration finders and position conversion

pub mod completion;
pub mod expansion;
pub mod macros;
pub mod resolver;
pub mod scanner;
pub mod sections;
pub mod utils;

pub use completion::{completion_items, CompletionCandidate, CompletionRequest};
pub use expansion::{ExpandError, LocalExpander, MacroExpander};
pub use macros::{MacroDescriptor, MacroLevel, MacroLookup, MacroTable, MacroTableError};
pub use resolver::{
    DefinitionLocation, DefinitionTarget, FsMacroFileReader, LookupError, MacroFileReader,
    MacroResolver, NoPackages, PackageDatabase, Resolution, ResolverSettings,
};
pub use scanner::{macro_at, macro_at_position};
pub use sections::{LineRange, SectionIndex, SpecSection};
