//! # rpmspec-parser
//!
//! Structure parser for RPM spec files.
//!
//! The language server never needs a full evaluation of a spec: it needs to know where
//! sections start and end, which tags the preamble declares and which macros the file
//! defines. This crate provides exactly that, in one pass over the lines, and rejects the
//! structurally broken documents rpm would refuse as well.
//!
//! Layout
//!
//!     range        Position/Range types and byte offset conversion
//!     document     The parsed document model (sections, preamble tags, definitions)
//!     parsing      The line-based parser
//!     keywords     Section markers, preamble and dependency tags, conditionals

pub mod document;
pub mod keywords;
pub mod parsing;
pub mod range;

pub use document::{DefineKind, MacroDefinition, PreambleTag, Section, SpecDocument};
pub use parsing::{parse_document, ParseError};
pub use range::{Position, Range, SourceLocation};
