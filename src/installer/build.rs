//! The end-to-end installer build pipeline.
//!
//! A build provisions an isolated Python environment, resolves the
//! application's dependency closure with pip, classifies every dependency
//! as a prebuilt wheel or a vendored source package, assembles the pynsist
//! configuration, and runs pynsist. The finished installer is relocated
//! into `dist/` with its size and SHA-256 recorded.

use crate::config::BuildConfig;
use crate::error::{BundleError, ManifestError, Result};
use crate::installer::{PynsistConfig, ensure_ico, installer_file_name, nsi};
use crate::metadata::{ProjectMetadata, read_project_metadata};
use crate::packages::{self, Classification};
use crate::pep503::Requirement;
use crate::process::run_checked;
use crate::pypi::{CachedIndex, PackageCache, PypiClient};
use crate::python::{PythonEnv, create_packaging_env, find_provisioner};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const CFG_FILE_NAME: &str = "pynsist.cfg";
const WHEEL_DOWNLOAD_DIR: &str = "wheels";
const PYNSIST_BUILD_DIR: &str = "build";
const DIST_DIR: &str = "dist";

/// A finished installer in `dist/`.
#[derive(Debug, Clone)]
pub struct BuiltInstaller {
    /// Final installer location
    pub path: PathBuf,
    /// Installer size in bytes
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the installer
    pub sha256: String,
}

/// Everything assembled before pynsist runs.
///
/// `preview` stops here; `build` carries on and invokes pynsist.
#[derive(Debug)]
pub struct PreparedBuild {
    /// Build work directory
    pub work_dir: PathBuf,
    /// The packaging environment
    pub env: PythonEnv,
    /// Project metadata driving name and version
    pub metadata: ProjectMetadata,
    /// Dependency classification outcome
    pub classification: Classification,
    /// Assembled pynsist configuration
    pub pynsist: PynsistConfig,
}

/// Orchestrates one installer build from a resolved configuration.
pub struct InstallerBuilder {
    config: BuildConfig,
}

impl InstallerBuilder {
    /// Create a builder for the given configuration.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// The resolved configuration driving this build.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Provision the environment, classify dependencies, and assemble the
    /// pynsist configuration, without invoking pynsist.
    pub async fn prepare(&self) -> Result<PreparedBuild> {
        let metadata = read_project_metadata(&self.config.project_root)?;
        log::info!(
            "Packaging {} {} for {}-bit Windows",
            metadata.name,
            metadata.version,
            self.config.bitness
        );

        let work_dir = self.create_work_dir()?;
        let env = self.provision_environment(&work_dir).await?;
        self.populate_environment(&env).await?;

        let frozen = env.pip().freeze().await?;
        log::info!("Frozen environment has {} requirements", frozen.len());

        let classification = self.classify(&env, &metadata, &work_dir, &frozen).await?;
        report_classification(&classification);

        // pynsist must be present before a custom NSI template can be
        // rendered into its package directory.
        let pynsist_pin = format!("pynsist=={}", self.config.pynsist_version);
        env.pip().install(&[pynsist_pin]).await?;

        let nsi_template = match &self.config.nsi_template {
            Some(template) => {
                let context = nsi::NsiContext::new(&self.config.name);
                let site_packages = env.site_packages().await?;
                Some(nsi::install_template(&site_packages, template, &context)?)
            }
            None => None,
        };

        let pynsist = self.assemble_pynsist_config(&metadata, &work_dir, &classification, nsi_template)?;

        Ok(PreparedBuild {
            work_dir,
            env,
            metadata,
            classification,
            pynsist,
        })
    }

    /// Run the full pipeline and produce an installer in `dist/`.
    pub async fn build(&self) -> Result<BuiltInstaller> {
        let prepared = self.prepare().await?;

        let cfg_path = prepared.work_dir.join(CFG_FILE_NAME);
        prepared.pynsist.write_to(&cfg_path)?;

        log::info!("Running pynsist");
        let python = prepared.env.python().to_string_lossy().into_owned();
        run_checked(
            &python,
            &["-m", "nsist", CFG_FILE_NAME],
            Some(&prepared.work_dir),
        )
        .await?;

        let produced = prepared
            .work_dir
            .join(PYNSIST_BUILD_DIR)
            .join("nsis")
            .join(&prepared.pynsist.installer_name);
        if !produced.exists() {
            return Err(ManifestError::InstallerMissing { path: produced }.into());
        }

        let built = self.relocate_installer(&produced).await?;
        log::info!(
            "Installer ready: {} ({} bytes, sha256 {})",
            built.path.display(),
            built.size_bytes,
            built.sha256
        );
        Ok(built)
    }

    fn create_work_dir(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d");
        let work_dir = self
            .config
            .project_root
            .join(format!("pybundle-{stamp}"));
        std::fs::create_dir_all(&work_dir)?;
        log::info!("Work directory: {}", work_dir.display());
        Ok(work_dir)
    }

    async fn provision_environment(&self, work_dir: &Path) -> Result<PythonEnv> {
        let provisioner = find_provisioner(self.config.conda.as_deref())?;
        create_packaging_env(work_dir, &self.config.python_version, &provisioner).await
    }

    /// Install the project and all configured extras into the environment.
    async fn populate_environment(&self, env: &PythonEnv) -> Result<()> {
        let pip = env.pip();
        pip.upgrade_tooling().await?;
        pip.install_project(&self.config.project_root).await?;

        if let Some(requirements) = &self.config.extra_requirements {
            pip.install_requirements(requirements).await?;
        }
        pip.install(&self.config.extra_packages).await?;
        for spec in &self.config.editable_packages {
            pip.install_editable(spec).await?;
        }
        pip.uninstall(&self.config.unwanted_packages).await?;
        Ok(())
    }

    /// Decide wheel vs source for every frozen requirement.
    async fn classify(
        &self,
        env: &PythonEnv,
        metadata: &ProjectMetadata,
        work_dir: &Path,
        frozen: &[Requirement],
    ) -> Result<Classification> {
        let mut unwanted: Vec<String> = packages::ALWAYS_UNWANTED
            .iter()
            .map(|p| p.to_string())
            .collect();
        unwanted.extend(self.config.unwanted_packages.iter().cloned());

        // The application itself is installed from the project tree and
        // must never be fetched from the index.
        let mut skip = self.config.skip_pypi_packages.clone();
        skip.push(metadata.name.clone());

        let wheel_files = if self.config.wheels_first {
            let eligible = packages::eligible_pins(frozen, &unwanted, &skip);
            self.download_wheels_for(env, work_dir, &eligible).await?
        } else {
            log::info!("Wheel downloads disabled; vendoring everything as source");
            Vec::new()
        };

        Ok(packages::classify(
            frozen,
            &unwanted,
            &skip,
            &wheel_files,
            &self.config.extra_packages,
            self.config.wheels_first,
        ))
    }

    /// Download each eligible pin as a wheel, returning the files that landed.
    ///
    /// Downloads are attempted one pin at a time; a package without a wheel
    /// simply falls through to the source list instead of failing the
    /// build. The index lookup beforehand skips downloads that the index
    /// already says cannot succeed.
    async fn download_wheels_for(
        &self,
        env: &PythonEnv,
        work_dir: &Path,
        eligible: &[Requirement],
    ) -> Result<Vec<String>> {
        let download_dir = work_dir.join(WHEEL_DOWNLOAD_DIR);
        std::fs::create_dir_all(&download_dir)?;

        let mut index = self.open_index()?;
        let pip = env.pip();

        for requirement in eligible {
            if let Some(index) = index.as_mut() {
                match index
                    .has_wheel(requirement.name(), requirement.version().unwrap_or(""))
                    .await
                {
                    Ok(false) => {
                        log::info!("[{}] has no wheel on the index", requirement.raw());
                        continue;
                    }
                    Ok(true) => {}
                    // The index is advisory; pip download decides for real.
                    Err(e) => log::debug!("Index lookup failed for [{}]: {e}", requirement.raw()),
                }
            }
            let pin = vec![requirement.raw().to_string()];
            if let Err(e) = pip.download_wheels(&pin, &download_dir).await {
                log::warn!("No wheel for [{}]: {e}", requirement.raw());
            }
        }

        if let Some(index) = index.as_mut() {
            if let Err(e) = index.save() {
                log::warn!("Could not persist index cache: {e}");
            }
        }

        packages::wheel_files_in(&download_dir)
    }

    /// Open the cached index client, or fall back to uncached operation.
    fn open_index(&self) -> Result<Option<CachedIndex>> {
        let client = PypiClient::new(&self.config.pypi_server)?;
        let cache = match &self.config.cache_file {
            Some(path) => PackageCache::open(path.clone(), self.config.cache_ttl_days),
            None => match PackageCache::open_default(self.config.cache_ttl_days) {
                Ok(cache) => cache,
                Err(e) => {
                    log::warn!("Index cache unavailable: {e}");
                    return Ok(None);
                }
            },
        };
        Ok(Some(CachedIndex::new(client, cache)))
    }

    fn assemble_pynsist_config(
        &self,
        metadata: &ProjectMetadata,
        work_dir: &Path,
        classification: &Classification,
        nsi_template: Option<String>,
    ) -> Result<PynsistConfig> {
        let icon = ensure_ico(&self.config.icon, work_dir)?;

        let license_file = if self.config.license.exists() {
            Some(self.config.license.clone())
        } else {
            log::warn!(
                "License file {} does not exist; installer will have none",
                self.config.license.display()
            );
            None
        };

        let extra_wheel_sources = match &self.config.local_wheels {
            Some(dir) => {
                let count = local_wheel_count(dir);
                log::info!("Using {count} local wheels from {}", dir.display());
                Some(dir.clone())
            }
            None => None,
        };

        Ok(PynsistConfig {
            app_name: self.config.name.clone(),
            app_version: metadata.version.clone(),
            entrypoint: self.config.entrypoint.clone(),
            icon,
            publisher: self.config.publisher.clone(),
            license_file,
            python_version: self.config.python_version.clone(),
            bitness: self.config.bitness,
            pypi_wheels: classification.pypi_wheels.clone(),
            extra_wheel_sources,
            packages: classification.source_packages.clone(),
            installer_name: installer_file_name(
                &self.config.name,
                self.config.bitness,
                self.config.suffix.as_deref(),
            ),
            nsi_template,
            build_directory: PYNSIST_BUILD_DIR.to_string(),
        })
    }

    /// Move the produced installer into `dist/` and fingerprint it.
    async fn relocate_installer(&self, produced: &Path) -> Result<BuiltInstaller> {
        let dist = self.config.project_root.join(DIST_DIR);
        std::fs::create_dir_all(&dist)?;

        let file_name = produced
            .file_name()
            .ok_or_else(|| ManifestError::InstallerMissing {
                path: produced.to_path_buf(),
            })?;
        let target = dist.join(file_name);

        // rename fails across filesystems; fall back to copy + remove.
        if std::fs::rename(produced, &target).is_err() {
            std::fs::copy(produced, &target)?;
            std::fs::remove_file(produced)?;
        }

        let size_bytes = std::fs::metadata(&target)?.len();
        let sha256 = calculate_sha256(&target).await?;
        Ok(BuiltInstaller {
            path: target,
            size_bytes,
            sha256,
        })
    }
}

/// Count wheel files anywhere under a local wheel directory.
fn local_wheel_count(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("whl"))
                    .unwrap_or(false)
        })
        .count()
}

fn report_classification(classification: &Classification) {
    log::info!(
        "{} wheels from the index, {} vendored source packages",
        classification.pypi_wheels.len(),
        classification.source_packages.len()
    );
    for pin in &classification.missing_wheels {
        log::warn!("No wheel available for [{pin}]; vendoring as source");
    }
    for reference in &classification.direct_references {
        log::info!("Direct reference handled outside the index: [{reference}]");
    }
}

/// Streamed SHA-256 of a file.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(BundleError::Io)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await.map_err(BundleError::Io)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sha256_matches_known_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"abc").expect("write");
        let digest = calculate_sha256(&path).await.expect("digest");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn counts_local_wheels_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("a-1.0-py3-none-any.whl"), b"w").expect("write");
        std::fs::write(nested.join("b-2.0-py3-none-any.whl"), b"w").expect("write");
        std::fs::write(dir.path().join("readme.txt"), b"t").expect("write");
        assert_eq!(local_wheel_count(dir.path()), 2);
    }
}
