//! Installer manifest assembly.
//!
//! Turns a dependency classification plus project metadata into the
//! `pynsist.cfg` handed to pynsist, converts icons into the `.ico` format
//! NSIS requires, and checks python.org for embeddable distributions.

pub mod build;
pub mod nsi;

use crate::error::{ManifestError, Result};
use handlebars::Handlebars;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Template for the pynsist configuration file.
///
/// List values are pre-joined with the 4-space continuation indent that
/// pynsist's ini parser expects for multi-line options.
const PYNSIST_CFG_TEMPLATE: &str = "\
[Application]
name={{app_name}}
version={{app_version}}
entry_point={{entrypoint}}
icon={{icon}}
{{#if publisher}}publisher={{publisher}}
{{/if}}{{#if license_file}}license_file={{license_file}}
{{/if}}
[Python]
version={{python_version}}
bitness={{bitness}}
format=bundled

[Include]
pypi_wheels=
    {{pypi_wheels}}
{{#if extra_wheel_sources}}extra_wheel_sources=
    {{extra_wheel_sources}}
{{/if}}packages=
    {{packages}}

[Build]
installer_name={{installer_name}}
{{#if nsi_template}}nsi_template={{nsi_template}}
{{/if}}directory={{build_directory}}
";

/// Everything pynsist needs to know about one build.
#[derive(Debug, Clone)]
pub struct PynsistConfig {
    /// Application name shown by the installer
    pub app_name: String,
    /// Application version
    pub app_version: String,
    /// `package.module:function` entry point
    pub entrypoint: String,
    /// Icon in `.ico` format
    pub icon: PathBuf,
    /// Publisher string, omitted when empty
    pub publisher: String,
    /// License file, omitted when absent on disk
    pub license_file: Option<PathBuf>,
    /// Full Python version to bundle
    pub python_version: String,
    /// Installer bitness
    pub bitness: u32,
    /// Confirmed `name==version` wheel pins
    pub pypi_wheels: Vec<String>,
    /// Directory of prebuilt local wheels, when configured
    pub extra_wheel_sources: Option<PathBuf>,
    /// Package names vendored from the environment
    pub packages: Vec<String>,
    /// Installer filename pynsist writes under its build directory
    pub installer_name: String,
    /// Custom NSI template filename, relative to pynsist's templates
    pub nsi_template: Option<String>,
    /// pynsist build directory (relative to the cfg file)
    pub build_directory: String,
}

impl PynsistConfig {
    /// Render the configuration file contents.
    pub fn render(&self) -> Result<String> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        let data = json!({
            "app_name": self.app_name,
            "app_version": self.app_version,
            "entrypoint": self.entrypoint,
            "icon": self.icon.display().to_string(),
            "publisher": self.publisher,
            "license_file": self
                .license_file
                .as_ref()
                .map(|p| p.display().to_string()),
            "python_version": self.python_version,
            "bitness": self.bitness,
            "pypi_wheels": self.pypi_wheels.join("\n    "),
            "extra_wheel_sources": self
                .extra_wheel_sources
                .as_ref()
                .map(|p| p.display().to_string()),
            "packages": self.packages.join("\n    "),
            "installer_name": self.installer_name,
            "nsi_template": self.nsi_template,
            "build_directory": self.build_directory,
        });

        Ok(registry.render_template(PYNSIST_CFG_TEMPLATE, &data)?)
    }

    /// Render and write the configuration to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let contents = self.render()?;
        log::debug!("pynsist.cfg:\n{contents}");
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Installer filename: `{name}_{bitness}bit.exe`, with the optional suffix
/// inserted before the extension.
pub fn installer_file_name(app_name: &str, bitness: u32, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{app_name}_{bitness}bit_{suffix}.exe"),
        _ => format!("{app_name}_{bitness}bit.exe"),
    }
}

/// Ensure the icon is in `.ico` format, converting into `work_dir` if not.
///
/// NSIS only accepts `.ico`; PNG sources get decoded, capped at the 256px
/// ICO limit, and re-encoded next to the other build intermediates.
pub fn ensure_ico(icon: &Path, work_dir: &Path) -> Result<PathBuf> {
    if !icon.exists() {
        return Err(ManifestError::IconNotFound {
            path: icon.to_path_buf(),
        }
        .into());
    }

    if icon
        .extension()
        .map(|e| e.eq_ignore_ascii_case("ico"))
        .unwrap_or(false)
    {
        return Ok(icon.to_path_buf());
    }

    let stem = icon
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "icon".to_string());
    let target = work_dir.join(format!("{stem}.ico"));

    log::info!(
        "Converting icon {} -> {}",
        icon.display(),
        target.display()
    );
    let mut decoded = image::open(icon)?;
    if decoded.width() > 256 || decoded.height() > 256 {
        decoded = decoded.thumbnail(256, 256);
    }
    decoded.save_with_format(&target, image::ImageFormat::Ico)?;
    Ok(target)
}

const PYTHON_FTP_BASE: &str = "https://www.python.org/ftp/python";

fn embed_url(base: &str, version: &str, bitness: u32) -> String {
    let arch = if bitness == 64 { "amd64" } else { "win32" };
    format!("{base}/{version}/python-{version}-embed-{arch}.zip")
}

/// HEAD request; network failures count as "not there" so offline checks
/// degrade instead of erroring.
async fn url_exists(http: &reqwest::Client, url: &str) -> bool {
    log::debug!("Checking embeddable Python: {url}");
    match http.head(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            log::debug!("HEAD request failed for {url}: {e}");
            false
        }
    }
}

async fn embeddable_exists_at(
    http: &reqwest::Client,
    base: &str,
    version: &str,
    bitness: u32,
) -> bool {
    url_exists(http, &embed_url(base, version, bitness)).await
}

/// Whether python.org ships an embeddable distribution for an exact version.
pub async fn embeddable_exists(http: &reqwest::Client, version: &str, bitness: u32) -> bool {
    embeddable_exists_at(http, PYTHON_FTP_BASE, version, bitness).await
}

/// Find the newest embeddable distribution of a minor line on python.org.
///
/// pynsist needs a full `major.minor.micro` version with an embeddable zip
/// upload; micro releases without one exist, so walk downward from 20 and
/// return the first hit.
pub async fn find_embeddable_python(
    http: &reqwest::Client,
    major_minor: &str,
    bitness: u32,
) -> Option<String> {
    for micro in (0..=20).rev() {
        let version = format!("{major_minor}.{micro}");
        if embeddable_exists_at(http, PYTHON_FTP_BASE, &version, bitness).await {
            return Some(version);
        }
    }
    None
}
