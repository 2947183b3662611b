//! Command line argument parsing and validation.

use crate::config::Overrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Windows installer builder for Python applications
#[derive(Parser, Debug)]
#[command(
    name = "pybundle",
    version,
    about = "Build Windows installers for Python applications",
    long_about = "Build Windows installers for Python applications.

Resolves the application's dependencies in an isolated environment,
classifies each one as a prebuilt wheel or a vendored source package,
and drives pynsist/NSIS to produce a standalone installer.

Usage:
  pybundle build
  pybundle build /path/to/project --suffix beta1
  pybundle preview --no-wheels-first
  pybundle cache status"
)]
pub struct Args {
    /// Show verbose output, including recovery suggestions on failure
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by the build and preview commands.
#[derive(clap::Args, Debug, Clone)]
pub struct BuildOpts {
    /// Project root (defaults to the current directory)
    #[arg(value_name = "PROJECT")]
    pub project: Option<PathBuf>,

    /// Configuration file (defaults to pybundle.toml in the project root)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the Python version to bundle
    #[arg(long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Override the installer bitness (32 or 64)
    #[arg(long, value_name = "BITS")]
    pub bitness: Option<u32>,

    /// Override the entry point (package.module:function)
    #[arg(long, value_name = "ENTRYPOINT")]
    pub entrypoint: Option<String>,

    /// Suffix appended to the installer filename
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Override the pynsist version to install
    #[arg(long, value_name = "VERSION")]
    pub pynsist_version: Option<String>,

    /// Override the package index server URL
    #[arg(long, value_name = "URL")]
    pub pypi_server: Option<String>,

    /// Vendor everything as source instead of fetching wheels
    #[arg(long)]
    pub no_wheels_first: bool,
}

impl BuildOpts {
    /// Project root these options point at.
    pub fn project_root(&self) -> PathBuf {
        self.project
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Configuration overrides carried by the command line.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            python_version: self.python_version.clone(),
            bitness: self.bitness,
            entrypoint: self.entrypoint.clone(),
            suffix: self.suffix.clone(),
            pynsist_version: self.pynsist_version.clone(),
            pypi_server: self.pypi_server.clone(),
            no_wheels_first: self.no_wheels_first,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the installer
    Build(BuildOpts),

    /// Run everything up to the pynsist invocation and show the manifest
    Preview(BuildOpts),

    /// Check the configuration without building anything
    Validate {
        /// Project root (defaults to the current directory)
        #[arg(value_name = "PROJECT")]
        project: Option<PathBuf>,

        /// Configuration file (defaults to pybundle.toml in the project root)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Inspect or clear the package index lookup cache
    Cache {
        /// Cache operation
        #[command(subcommand)]
        action: CacheCommand,
    },
}

/// Options shared by the cache subcommands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CacheOpts {
    /// Project root whose [pypi] settings locate the cache (defaults to
    /// the current directory; without a configuration file the platform
    /// default cache is used)
    #[arg(long, value_name = "PROJECT")]
    pub project: Option<PathBuf>,

    /// Configuration file (defaults to pybundle.toml in the project root)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Cache subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache location, entry counts, and size
    Status(CacheOpts),
    /// Delete the cache file
    Clear(CacheOpts),
}

impl Command {
    /// Command name for user-facing messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build(_) => "build",
            Command::Preview(_) => "preview",
            Command::Validate { .. } => "validate",
            Command::Cache { .. } => "cache",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }
        if let Command::Build(opts) | Command::Preview(opts) = &self.command {
            if let Some(bitness) = opts.bitness {
                if bitness != 32 && bitness != 64 {
                    return Err(format!("--bitness must be 32 or 64, got {bitness}"));
                }
            }
            if let Some(suffix) = &opts.suffix {
                if suffix.chars().any(char::is_whitespace) {
                    return Err("--suffix must not contain whitespace".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        self.output.println(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_build_with_overrides() {
        let args = Args::parse_from([
            "pybundle",
            "build",
            "/tmp/project",
            "--bitness",
            "32",
            "--suffix",
            "beta1",
            "--no-wheels-first",
        ]);
        let Command::Build(opts) = &args.command else {
            panic!("expected build command");
        };
        assert_eq!(opts.project_root(), PathBuf::from("/tmp/project"));
        let overrides = opts.overrides();
        assert_eq!(overrides.bitness, Some(32));
        assert_eq!(overrides.suffix.as_deref(), Some("beta1"));
        assert!(overrides.no_wheels_first);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn rejects_bad_bitness() {
        let args = Args::parse_from(["pybundle", "build", "--bitness", "16"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn rejects_whitespace_suffix() {
        let args = Args::parse_from(["pybundle", "build", "--suffix", "a b"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn parses_cache_subcommands() {
        let args = Args::parse_from(["pybundle", "cache", "clear"]);
        assert!(matches!(
            args.command,
            Command::Cache {
                action: CacheCommand::Clear(_)
            }
        ));
        assert_eq!(args.command.name(), "cache");
    }

    #[test]
    fn cache_status_takes_a_project() {
        let args = Args::parse_from(["pybundle", "cache", "status", "--project", "/tmp/app"]);
        let Command::Cache {
            action: CacheCommand::Status(opts),
        } = &args.command
        else {
            panic!("expected cache status");
        };
        assert_eq!(opts.project.as_deref(), Some(Path::new("/tmp/app")));
    }
}
