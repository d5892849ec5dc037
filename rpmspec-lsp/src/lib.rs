//! Language Server Protocol (LSP) implementation for RPM spec files
//!
//!     This crate serves spec file navigation to any LSP-compatible editor (VSCode, Neovim,
//!     Emacs, Kate, etc.), built on tower-lsp like the rest of the server ecosystem.
//!
//! Feature Set
//!
//!     1. Document Symbols (textDocument/documentSymbol):
//!         - One flat symbol per section: the main preamble, %description, %build, ...
//!         - Subpackage sections are named after the package they describe
//!
//!     2. Go to Definition (textDocument/definition):
//!         - %define/%global lines in the document
//!         - Preamble tags for the macros they publish (%{name}, %{version}, %{SOURCE0})
//!         - Macro files installed by the packages providing rpm_macro(name)
//!         - The builtin macro file as last resort; builtins themselves have no location
//!
//!     3. Hover (textDocument/hover):
//!         - The full expansion of the macro under the cursor, with document defines applied
//!
//!     4. Completion (textDocument/completion):
//!         - Macros after %, preamble tags in the preamble, section names everywhere
//!
//! Architecture
//!
//!     LSP Layer (tower-lsp):
//!         - JSON-RPC, capability negotiation, request routing
//!
//!     Server Layer (server.rs, documents.rs):
//!         - Implements LanguageServer and keeps one parsed entry per open document
//!         - Thin tests asserting the feature layer is called and its results converted
//!
//!     Feature Layer (features/):
//!         - Pure functions over a parsed entry and the macro resolver
//!         - All logic and dense unit tests
//!
//!     rpm (rpm.rs):
//!         - The session macro table, provider lookup and expansion, by running `rpm`
//!
//! Usage
//!
//!     Binary:
//!         $ rpmspec-lsp --stdio
//!         Starts the language server on stdin/stdout for editor integration.
//!
//!         $ rpmspec-lsp --port 2087
//!         Listens on TCP and serves one client per connection.
//!

pub mod documents;
pub mod features;
pub mod logging;
pub mod rpm;
pub mod server;

pub use documents::{DocumentEntry, DocumentStore};
pub use rpm::{RpmCli, RpmError};
pub use server::{DefaultFeatureProvider, FeatureProvider, LspClient, RpmSpecLanguageServer};
