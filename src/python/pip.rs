//! pip operations inside the packaging environment.
//!
//! Everything goes through `python -m pip` with the environment's own
//! interpreter, so the host pip never leaks into a build.

use crate::error::Result;
use crate::pep503::Requirement;
use crate::process::run_checked;
use crate::python::PythonEnv;
use std::path::Path;

/// pip driver for one packaging environment.
#[derive(Debug)]
pub struct Pip<'a> {
    env: &'a PythonEnv,
}

impl<'a> Pip<'a> {
    pub(crate) fn new(env: &'a PythonEnv) -> Self {
        Self { env }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut full: Vec<&str> = vec!["-m", "pip"];
        full.extend_from_slice(args);
        run_checked(self.env.python(), &full, None).await
    }

    /// Upgrade the build tooling before anything else is installed.
    pub async fn upgrade_tooling(&self) -> Result<()> {
        self.run(&["install", "--upgrade", "pip", "setuptools", "wheel"])
            .await?;
        Ok(())
    }

    /// Install the application project itself.
    pub async fn install_project(&self, project_root: &Path) -> Result<()> {
        let root = project_root.to_string_lossy();
        self.run(&["install", &root]).await?;
        Ok(())
    }

    /// Install from a requirements file.
    pub async fn install_requirements(&self, requirements: &Path) -> Result<()> {
        let file = requirements.to_string_lossy();
        self.run(&["install", "-r", &file]).await?;
        Ok(())
    }

    /// Install packages by name or pin.
    pub async fn install(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut args = vec!["install"];
        args.extend(packages.iter().map(String::as_str));
        self.run(&args).await?;
        Ok(())
    }

    /// Install a package in editable mode.
    pub async fn install_editable(&self, spec: &str) -> Result<()> {
        self.run(&["install", "-e", spec]).await?;
        Ok(())
    }

    /// Uninstall packages, ignoring ones that are not installed.
    pub async fn uninstall(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        // One package at a time: pip aborts the whole invocation when any
        // listed package is absent, and unwanted lists are best-effort.
        for package in packages {
            let result = self.run(&["uninstall", "--yes", package]).await;
            if let Err(e) = result {
                log::debug!("Skipping uninstall of [{package}]: {e}");
            }
        }
        Ok(())
    }

    /// Freeze the environment into parsed requirements.
    ///
    /// Uses `--all` so pip, setuptools, and wheel show up too; they are
    /// removed later by the unwanted list like any other package.
    pub async fn freeze(&self) -> Result<Vec<Requirement>> {
        let output = self.run(&["freeze", "--all"]).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Requirement::parse)
            .collect())
    }

    /// Download wheels for pinned requirements into a directory.
    ///
    /// `--only-binary=:all:` makes pip fail rather than fall back to an
    /// sdist, so everything that lands in `dest` is a genuine wheel.
    pub async fn download_wheels(&self, pins: &[String], dest: &Path) -> Result<()> {
        if pins.is_empty() {
            return Ok(());
        }
        let dest = dest.to_string_lossy().into_owned();
        let mut args = vec![
            "download",
            "--only-binary=:all:",
            "--no-deps",
            "--dest",
            &dest,
        ];
        args.extend(pins.iter().map(String::as_str));
        self.run(&args).await?;
        Ok(())
    }
}
