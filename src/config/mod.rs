//! Build configuration for installer generation.
//!
//! Configuration lives in a `pybundle.toml` at the project root, with CLI
//! flags overriding individual fields. Package lists may be written inline
//! or in sibling text files (one entry per line, `#` comments) that are
//! merged in during resolution.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file name looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "pybundle.toml";

/// Default pynsist version installed into the packaging environment.
pub const DEFAULT_PYNSIST_VERSION: &str = "2.8";

/// Raw `pybundle.toml` contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    /// `[application]` section
    #[serde(default)]
    pub application: ApplicationSection,
    /// `[packages]` section
    #[serde(default)]
    pub packages: PackagesSection,
    /// `[pypi]` section
    #[serde(default)]
    pub pypi: PypiSection,
    /// `[build]` section
    #[serde(default)]
    pub build: BuildSection,
}

/// Application identity and runtime pinning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplicationSection {
    /// Distribution name of the application package
    pub name: Option<String>,
    /// pynsist entry point (`package.module:function`)
    pub entrypoint: Option<String>,
    /// Full Python version to bundle (`3.11.5`)
    pub python_version: Option<String>,
    /// Installer bitness (default 64)
    pub bitness: Option<u32>,
    /// Icon file, `.ico` or a PNG converted during the build
    pub icon: Option<PathBuf>,
    /// License file shown by the installer
    pub license: Option<PathBuf>,
    /// Publisher string embedded in the installer
    pub publisher: Option<String>,
}

/// Package selection lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackagesSection {
    /// Packages installed and vendored in addition to the dependency closure
    #[serde(default)]
    pub extra: Vec<String>,
    /// Packages installed with `pip install -e`
    #[serde(default)]
    pub editable: Vec<String>,
    /// Packages never looked up on the index (always vendored as source)
    #[serde(default)]
    pub skip_pypi: Vec<String>,
    /// Packages removed from the environment before freezing
    #[serde(default)]
    pub unwanted: Vec<String>,
    /// Text file merged into `extra`
    pub extra_file: Option<PathBuf>,
    /// Text file merged into `editable`
    pub editable_file: Option<PathBuf>,
    /// Text file merged into `skip_pypi`
    pub skip_pypi_file: Option<PathBuf>,
    /// Text file merged into `unwanted`
    pub unwanted_file: Option<PathBuf>,
    /// requirements.txt installed on top of the project
    pub extra_requirements: Option<PathBuf>,
    /// Directory of prebuilt local wheels handed to pynsist verbatim
    pub local_wheels: Option<PathBuf>,
}

/// Package index settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PypiSection {
    /// Index server base URL (default `https://pypi.org`)
    pub server: Option<String>,
    /// Lookup cache lifetime in days (default 7)
    pub cache_ttl_days: Option<i64>,
    /// Explicit cache file location
    pub cache_file: Option<PathBuf>,
}

/// Installer build settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSection {
    /// Suffix appended to the installer filename
    pub suffix: Option<String>,
    /// Custom NSI template rendered for this application
    pub nsi_template: Option<PathBuf>,
    /// conda executable used instead of venv when set
    pub conda: Option<PathBuf>,
    /// Verify wheels via `pip download` (default); off copies site-packages
    pub wheels_first: Option<bool>,
    /// pynsist version installed into the packaging environment
    pub pynsist_version: Option<String>,
}

/// CLI overrides applied on top of the file configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Override `[application].python-version`
    pub python_version: Option<String>,
    /// Override `[application].bitness`
    pub bitness: Option<u32>,
    /// Override `[application].entrypoint`
    pub entrypoint: Option<String>,
    /// Override `[build].suffix`
    pub suffix: Option<String>,
    /// Override `[build].pynsist-version`
    pub pynsist_version: Option<String>,
    /// Override `[pypi].server`
    pub pypi_server: Option<String>,
    /// Disable wheels-first classification
    pub no_wheels_first: bool,
}

/// Fully resolved build configuration.
///
/// All paths are absolute (resolved against the project root) and all
/// package list files are merged in.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root directory
    pub project_root: PathBuf,
    /// Application package name
    pub name: String,
    /// pynsist entry point
    pub entrypoint: String,
    /// Full Python version to bundle
    pub python_version: String,
    /// Installer bitness
    pub bitness: u32,
    /// Icon file path
    pub icon: PathBuf,
    /// License file path
    pub license: PathBuf,
    /// Publisher string
    pub publisher: String,
    /// Extra packages (inline + file)
    pub extra_packages: Vec<String>,
    /// Editable packages (inline + file)
    pub editable_packages: Vec<String>,
    /// Skip-pypi packages (inline + file)
    pub skip_pypi_packages: Vec<String>,
    /// Unwanted packages (inline + file)
    pub unwanted_packages: Vec<String>,
    /// Extra requirements file, when configured and present
    pub extra_requirements: Option<PathBuf>,
    /// Local wheel directory, when configured
    pub local_wheels: Option<PathBuf>,
    /// Index server base URL
    pub pypi_server: String,
    /// Cache lifetime in days
    pub cache_ttl_days: i64,
    /// Explicit cache file, when configured
    pub cache_file: Option<PathBuf>,
    /// Installer filename suffix
    pub suffix: Option<String>,
    /// NSI template path, when configured
    pub nsi_template: Option<PathBuf>,
    /// conda executable, when configured
    pub conda: Option<PathBuf>,
    /// Wheels-first classification mode
    pub wheels_first: bool,
    /// pynsist version pin
    pub pynsist_version: String,
}

/// Load the raw configuration file for a project.
pub fn load_file_config(project_root: &Path, explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => project_root.join(CONFIG_FILE_NAME),
    };
    if !path.exists() {
        return Err(ConfigError::NotFound { path }.into());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: FileConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Read a package list text file: one entry per line, `#` comments.
pub fn read_package_list(path: &Path) -> Result<Vec<String>> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::PackageListUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect())
}

/// Merge an inline package list with an optional text file.
fn merge_packages(
    root: &Path,
    inline: &[String],
    file: Option<&Path>,
) -> Result<Vec<String>> {
    let mut merged: Vec<String> = inline.to_vec();
    if let Some(file) = file {
        let path = absolute(root, file);
        if path.exists() {
            merged.extend(read_package_list(&path)?);
        } else {
            log::warn!("Package list file does not exist: {}", path.display());
        }
    }
    Ok(merged)
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

impl FileConfig {
    /// Resolve the file configuration against a project root and CLI overrides.
    pub fn resolve(self, project_root: &Path, overrides: &Overrides) -> Result<BuildConfig> {
        let root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());

        let name = self
            .application
            .name
            .clone()
            .ok_or(ConfigError::MissingField {
                field: "application.name",
            })?;
        let entrypoint = overrides
            .entrypoint
            .clone()
            .or(self.application.entrypoint.clone())
            .ok_or(ConfigError::MissingField {
                field: "application.entrypoint",
            })?;
        let python_version = overrides
            .python_version
            .clone()
            .or(self.application.python_version.clone())
            .ok_or(ConfigError::MissingField {
                field: "application.python-version",
            })?;
        let icon = self
            .application
            .icon
            .clone()
            .ok_or(ConfigError::MissingField {
                field: "application.icon",
            })?;

        let bitness = overrides.bitness.or(self.application.bitness).unwrap_or(64);
        if bitness != 32 && bitness != 64 {
            return Err(ConfigError::InvalidField {
                field: "application.bitness",
                reason: format!("expected 32 or 64, got {bitness}"),
            }
            .into());
        }

        let license = self
            .application
            .license
            .clone()
            .unwrap_or_else(|| PathBuf::from("license.txt"));

        let extra_packages =
            merge_packages(&root, &self.packages.extra, self.packages.extra_file.as_deref())?;
        let editable_packages = merge_packages(
            &root,
            &self.packages.editable,
            self.packages.editable_file.as_deref(),
        )?;
        let skip_pypi_packages = merge_packages(
            &root,
            &self.packages.skip_pypi,
            self.packages.skip_pypi_file.as_deref(),
        )?;
        let unwanted_packages = merge_packages(
            &root,
            &self.packages.unwanted,
            self.packages.unwanted_file.as_deref(),
        )?;

        let extra_requirements = self
            .packages
            .extra_requirements
            .as_deref()
            .map(|p| absolute(&root, p));

        Ok(BuildConfig {
            icon: absolute(&root, &icon),
            license: absolute(&root, &license),
            name,
            entrypoint,
            python_version,
            bitness,
            publisher: self.application.publisher.clone().unwrap_or_default(),
            extra_packages,
            editable_packages,
            skip_pypi_packages,
            unwanted_packages,
            extra_requirements,
            local_wheels: self
                .packages
                .local_wheels
                .as_deref()
                .map(|p| absolute(&root, p)),
            pypi_server: overrides
                .pypi_server
                .clone()
                .or(self.pypi.server.clone())
                .unwrap_or_else(|| crate::pypi::DEFAULT_PYPI_SERVER.to_string()),
            cache_ttl_days: self
                .pypi
                .cache_ttl_days
                .unwrap_or(crate::pypi::DEFAULT_TTL_DAYS),
            cache_file: self.pypi.cache_file.as_deref().map(|p| absolute(&root, p)),
            suffix: overrides.suffix.clone().or(self.build.suffix.clone()),
            nsi_template: self.build.nsi_template.as_deref().map(|p| absolute(&root, p)),
            conda: self.build.conda.clone(),
            wheels_first: if overrides.no_wheels_first {
                false
            } else {
                self.build.wheels_first.unwrap_or(true)
            },
            pynsist_version: overrides
                .pynsist_version
                .clone()
                .or(self.build.pynsist_version.clone())
                .unwrap_or_else(|| DEFAULT_PYNSIST_VERSION.to_string()),
            project_root: root,
        })
    }

    /// Names of optional fields left unset, for debug reporting.
    pub fn unset_fields(&self) -> Vec<&'static str> {
        let mut unset = Vec::new();
        if self.application.publisher.is_none() {
            unset.push("application.publisher");
        }
        if self.application.license.is_none() {
            unset.push("application.license");
        }
        if self.packages.extra.is_empty() && self.packages.extra_file.is_none() {
            unset.push("packages.extra");
        }
        if self.packages.local_wheels.is_none() {
            unset.push("packages.local-wheels");
        }
        if self.build.nsi_template.is_none() {
            unset.push("build.nsi-template");
        }
        unset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[application]
name = "demo-app"
entrypoint = "demo_app.main:run"
python-version = "3.11.5"
icon = "assets/demo.png"
"#;

    #[test]
    fn resolves_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), MINIMAL).expect("write");

        let file = load_file_config(dir.path(), None).expect("load");
        let config = file.resolve(dir.path(), &Overrides::default()).expect("resolve");

        assert_eq!(config.name, "demo-app");
        assert_eq!(config.bitness, 64);
        assert!(config.wheels_first);
        assert_eq!(config.pynsist_version, DEFAULT_PYNSIST_VERSION);
        assert_eq!(config.pypi_server, "https://pypi.org");
        assert!(config.icon.is_absolute());
        assert!(config.license.ends_with("license.txt"));
    }

    #[test]
    fn overrides_beat_file_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), MINIMAL).expect("write");

        let overrides = Overrides {
            python_version: Some("3.12.1".to_string()),
            bitness: Some(32),
            no_wheels_first: true,
            ..Default::default()
        };
        let config = load_file_config(dir.path(), None)
            .expect("load")
            .resolve(dir.path(), &overrides)
            .expect("resolve");

        assert_eq!(config.python_version, "3.12.1");
        assert_eq!(config.bitness, 32);
        assert!(!config.wheels_first);
    }

    #[test]
    fn merges_package_list_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("unwanted.txt"),
            "tkinter  # stripped comment\n\n# full-line comment\npywin32\n",
        )
        .expect("write");
        let with_file = format!(
            "{MINIMAL}\n[packages]\nunwanted = [\"pip\"]\nunwanted-file = \"unwanted.txt\"\n"
        );
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), with_file).expect("write");

        let config = load_file_config(dir.path(), None)
            .expect("load")
            .resolve(dir.path(), &Overrides::default())
            .expect("resolve");

        assert_eq!(config.unwanted_packages, vec!["pip", "tkinter", "pywin32"]);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[application]\nname = \"demo\"\n",
        )
        .expect("write");

        let err = load_file_config(dir.path(), None)
            .expect("load")
            .resolve(dir.path(), &Overrides::default())
            .expect_err("must fail");
        assert!(err.to_string().contains("application.entrypoint"));
    }

    #[test]
    fn invalid_bitness_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = format!("{MINIMAL}bitness = 16\n");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), config).expect("write");

        let err = load_file_config(dir.path(), None)
            .expect("load")
            .resolve(dir.path(), &Overrides::default())
            .expect_err("must fail");
        assert!(err.to_string().contains("bitness"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_file_config(dir.path(), None).expect_err("must fail");
        assert!(err.to_string().contains("Missing configuration file"));
    }

    #[test]
    fn reports_unset_optional_fields() {
        let file: FileConfig = toml::from_str(MINIMAL).expect("parse");
        let unset = file.unset_fields();
        assert!(unset.contains(&"application.publisher"));
        assert!(unset.contains(&"build.nsi-template"));
    }
}
