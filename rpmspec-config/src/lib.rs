//! Configuration loader for the rpm spec language server.
//!
//! `defaults/rpmspec.default.toml` is embedded into the binary so that docs and runtime
//! behavior stay in sync. The server layers a user file, the environment and command line
//! overrides on top of those defaults via [`Loader`] before deserializing into
//! [`RpmSpecConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, Map, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/rpmspec.default.toml");

/// Prefix of configuration environment variables, as in `RPMSPEC_LSP__SERVER__PORT`.
pub const ENV_PREFIX: &str = "RPMSPEC_LSP";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration consumed by the server binary.
#[derive(Debug, Clone, Deserialize)]
pub struct RpmSpecConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub macros: MacrosConfig,
    pub completion: CompletionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Where rpm and its macro files live, and how hover expands macros.
#[derive(Debug, Clone, Deserialize)]
pub struct MacrosConfig {
    pub rpm_binary: PathBuf,
    pub macro_dir: PathBuf,
    pub builtin_macro_file: PathBuf,
    pub expander: ExpanderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpanderKind {
    Rpm,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub vscode_clients: Vec<String>,
}

impl CompletionConfig {
    /// Whether `client` keeps the typed `%` when inserting a completion.
    pub fn keeps_trigger(&self, client: &str) -> bool {
        self.vscode_clients.iter().any(|known| known == client)
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            vscode_clients: vec!["Code".to_string(), "Visual Studio Code".to_string()],
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `RPMSPEC_LSP__SECTION__KEY` variables from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_source(None)
    }

    fn with_env_source(mut self, source: Option<Map<String, String>>) -> Self {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(source);
        self.builder = self.builder.add_source(environment);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<RpmSpecConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<RpmSpecConfig, ConfigError> {
    Loader::new().build()
}

/// The per-user config file: `$XDG_CONFIG_HOME/rpmspec-lsp/config.toml`, falling back to
/// `~/.config`.
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("rpmspec-lsp").join("config.toml"))
}
