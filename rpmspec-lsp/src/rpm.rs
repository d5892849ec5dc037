//! The rpm command line as a collaborator
//!
//!     [`RpmCli`] shells out to the configured `rpm` binary for the three things the server
//!     cannot know on its own:
//!
//!         rpm --showrc                               the session macro table
//!         rpm -q --whatprovides 'rpm_macro(name)'    packages defining a macro,
//!         rpm -ql <package>                          and their files
//!         rpm --define 'n body' ... --eval '%{n}'    expansion with document defines
//!
//!     Every call blocks; the server runs them on the blocking pool.

use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use rpmspec_analysis::{
    ExpandError, LookupError, MacroExpander, MacroTable, MacroTableError, PackageDatabase,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpmError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("cannot read the rpm macro table: {0}")]
    MacroTable(#[from] MacroTableError),
}

#[derive(Debug, Clone)]
pub struct RpmCli {
    binary: PathBuf,
}

impl RpmCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Load every macro rpm knows about.
    pub fn load_macro_table(&self) -> Result<MacroTable, RpmError> {
        let output = self.run(&["--showrc"])?;
        let table = MacroTable::parse_showrc(&output)?;
        tracing::info!(macros = table.len(), "loaded rpm macro table");
        Ok(table)
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, RpmError> {
        let command = self.describe(args);
        tracing::debug!(%command, "running rpm");
        let output = Command::new(&self.binary)
            .args(args.iter().map(AsRef::as_ref))
            .output()
            .map_err(|source| RpmError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(RpmError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn describe<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut command = self.binary.display().to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg.as_ref());
        }
        command
    }
}

impl PackageDatabase for RpmCli {
    fn find_providers(&self, capability: &str) -> Result<Vec<Vec<PathBuf>>, LookupError> {
        let packages = match self.run(&["-q", "--whatprovides", capability, "--qf", "%{NEVRA}\\n"]) {
            Ok(output) => output,
            // rpm exits non-zero when nothing provides the capability
            Err(RpmError::Failed { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(query_error(capability, err)),
        };

        let mut providers = Vec::new();
        for package in packages.lines().map(str::trim).filter(|line| !line.is_empty()) {
            match self.run(&["-ql", package]) {
                Ok(files) => providers.push(files.lines().map(PathBuf::from).collect()),
                Err(err) => {
                    tracing::warn!(%package, %err, "cannot list package files, skipping provider");
                }
            }
        }
        Ok(providers)
    }
}

fn query_error(query: &str, err: RpmError) -> LookupError {
    LookupError::Query {
        query: query.to_string(),
        reason: err.to_string(),
    }
}

impl MacroExpander for RpmCli {
    fn expand(&self, expression: &str, locals: &MacroTable) -> Result<String, ExpandError> {
        let mut args: Vec<String> = Vec::new();
        for descriptor in locals.iter() {
            let name = match &descriptor.options {
                Some(options) => format!("{}({})", descriptor.name, options),
                None => descriptor.name.clone(),
            };
            args.push("--define".to_string());
            args.push(format!("{name} {}", descriptor.body));
        }
        args.push("--eval".to_string());
        args.push(expression.to_string());

        let output = self
            .run(&args)
            .map_err(|err| ExpandError::Engine(err.to_string()))?;
        let expansion = output.trim_end_matches('\n');
        if expansion == expression {
            return Err(ExpandError::Undefined(expression.to_string()));
        }
        Ok(expansion.to_string())
    }
}
