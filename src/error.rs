//! Error types for pybundle operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pybundle operations
pub type Result<T> = std::result::Result<T, BundleError>;

/// Main error type for all pybundle operations
#[derive(Error, Debug)]
pub enum BundleError {
    /// Build configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Packaging environment errors
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// Package index lookup errors
    #[error("PyPI error: {0}")]
    Pypi(#[from] PypiError),

    /// Lookup cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Build manifest assembly errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Icon conversion errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Build configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Missing configuration file at {path}")]
    NotFound {
        /// Path where pybundle.toml was expected
        path: PathBuf,
    },

    /// Required field missing from configuration
    #[error("Missing required configuration field '{field}'")]
    MissingField {
        /// Field name
        field: &'static str,
    },

    /// Configuration field has an invalid value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// Reason for the error
        reason: String,
    },

    /// Project root has neither setup.py nor pyproject.toml
    #[error("Invalid project root {root}: no 'setup.py' or 'pyproject.toml' found")]
    ProjectMetadataNotFound {
        /// Project root that was checked
        root: PathBuf,
    },

    /// Project metadata file present but a required key is missing
    #[error("Project metadata in {path} is missing '{key}'")]
    MetadataKeyMissing {
        /// Metadata file path
        path: PathBuf,
        /// Key that was expected
        key: &'static str,
    },

    /// Package list file unreadable
    #[error("Cannot read package list {path}: {reason}")]
    PackageListUnreadable {
        /// Path to the package list file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Packaging environment errors
#[derive(Error, Debug)]
pub enum EnvError {
    /// No usable Python interpreter found
    #[error(
        "No Python interpreter found. Install python3, micromamba, or configure a conda path."
    )]
    InterpreterNotFound,

    /// Virtual environment creation failed
    #[error("Failed to create packaging environment: {reason}")]
    VenvCreationFailed {
        /// Reason for the error
        reason: String,
    },

    /// External command exited non-zero
    #[error("Command failed ({command}), exit code {code:?}: {stderr}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Tail of the captured stderr
        stderr: String,
    },

    /// External command could not be spawned
    #[error("Failed to spawn {command}: {error}")]
    SpawnFailed {
        /// Command line that was run
        command: String,
        /// The underlying error
        error: std::io::Error,
    },
}

/// Package index lookup errors
#[derive(Error, Debug)]
pub enum PypiError {
    /// Package does not exist on the index
    #[error("Package '{name}' not found on the package index")]
    PackageNotFound {
        /// Canonical package name
        name: String,
    },

    /// Requested version has no release on the index
    #[error("No release of '{name}' version '{version}' on the package index (bad metadata?)")]
    ReleaseNotFound {
        /// Canonical package name
        name: String,
        /// Requested version
        version: String,
    },

    /// Index returned an unexpected response
    #[error("Unexpected response from package index for '{name}': HTTP {status}")]
    UnexpectedResponse {
        /// Canonical package name
        name: String,
        /// HTTP status code
        status: u16,
    },

    /// Index server URL could not be parsed
    #[error("Invalid package index URL '{url}': {reason}")]
    InvalidServerUrl {
        /// Configured URL
        url: String,
        /// Reason for the error
        reason: String,
    },
}

/// Lookup cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache file could not be written
    #[error("Failed to write cache: {reason}")]
    WriteFailed {
        /// Reason for the error
        reason: String,
    },

    /// No cache directory available on this platform
    #[error("No cache directory available; set [pypi].cache-file explicitly")]
    NoCacheDir,
}

/// Build manifest assembly errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Configured icon file does not exist
    #[error("Icon file not found at {path}")]
    IconNotFound {
        /// Configured icon path
        path: PathBuf,
    },

    /// Configured NSI template does not exist
    #[error("NSI template not found at {path}")]
    TemplateNotFound {
        /// Configured template path
        path: PathBuf,
    },

    /// pynsist finished but the expected installer is missing
    #[error("pynsist completed but installer {path} was not produced")]
    InstallerMissing {
        /// Expected installer path
        path: PathBuf,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl BundleError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BundleError::Config(ConfigError::NotFound { path }) => vec![
                format!(
                    "Create {} with [application] and [packages] sections",
                    path.display()
                ),
                "Pass --config to point at an existing configuration file".to_string(),
            ],
            BundleError::Config(ConfigError::ProjectMetadataNotFound { .. }) => vec![
                "Run pybundle against a directory containing setup.py or pyproject.toml"
                    .to_string(),
            ],
            BundleError::Env(EnvError::InterpreterNotFound) => vec![
                "Install python3 and ensure it is on PATH".to_string(),
                "Install micromamba for automatic interpreter provisioning".to_string(),
                "Set [build].conda in pybundle.toml to an existing conda executable".to_string(),
            ],
            BundleError::Env(EnvError::CommandFailed { .. }) => vec![
                "Re-run with RUST_LOG=debug to see the full command output".to_string(),
            ],
            BundleError::Pypi(PypiError::ReleaseNotFound { name, version }) => vec![
                format!("Check that {name}=={version} exists on the configured index"),
                "Add the package to [packages].skip-pypi to vendor it as source".to_string(),
            ],
            BundleError::Cache(CacheError::WriteFailed { .. }) => vec![
                "Run 'pybundle cache clear' and retry".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            BundleError::Config(ConfigError::ProjectMetadataNotFound { .. })
                | BundleError::Env(EnvError::InterpreterNotFound)
                | BundleError::Cli(CliError::InvalidArguments { .. })
        )
    }
}
