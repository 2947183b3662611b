//! pybundle - Windows installer builder for Python applications.
//!
//! Resolves an application's dependency closure with pip inside an
//! isolated environment, classifies every dependency as a prebuilt wheel
//! or a vendored source package, and drives pynsist/NSIS to produce a
//! standalone Windows installer.
//!
//! # Pipeline
//!
//! 1. Provision an isolated Python environment (venv or conda/micromamba)
//! 2. Install the project, extra requirements, and configured extras
//! 3. Freeze the environment and classify every requirement
//! 4. Confirm wheel availability via the package index and `pip download`
//! 5. Assemble `pynsist.cfg` and run pynsist
//! 6. Relocate the installer into `dist/` with size and SHA-256 recorded

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod installer;
pub mod metadata;
pub mod packages;
pub mod pep503;
pub mod process;
pub mod pypi;
pub mod python;

pub use config::BuildConfig;
pub use error::{BundleError, Result};
pub use installer::build::{BuiltInstaller, InstallerBuilder};
pub use packages::Classification;
pub use pep503::{Requirement, WheelFilename, canonicalize_name};
