//! Project metadata extraction from pyproject.toml / setup.py.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::Path;

/// Name, version, and author of the application being packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Distribution name
    pub name: String,
    /// Release version
    pub version: String,
    /// First listed author, empty when unset
    pub author: String,
}

#[derive(Deserialize)]
struct PyprojectDocument {
    project: PyprojectProject,
}

#[derive(Deserialize)]
struct PyprojectProject {
    name: String,
    version: String,
    #[serde(default)]
    authors: Vec<PyprojectAuthor>,
}

#[derive(Deserialize)]
struct PyprojectAuthor {
    #[serde(default)]
    name: Option<String>,
}

/// Read metadata from the project root.
///
/// Prefers `pyproject.toml`; falls back to scraping `setup.py`. Errors if
/// neither file exists, since a project pip cannot install cannot be
/// packaged either.
pub fn read_project_metadata(root: &Path) -> Result<ProjectMetadata> {
    let pyproject = root.join("pyproject.toml");
    if pyproject.exists() {
        return read_pyproject(&pyproject);
    }
    let setup_py = root.join("setup.py");
    if setup_py.exists() {
        return read_setup_py(&setup_py);
    }
    Err(ConfigError::ProjectMetadataNotFound {
        root: root.to_path_buf(),
    }
    .into())
}

fn read_pyproject(path: &Path) -> Result<ProjectMetadata> {
    let contents = std::fs::read_to_string(path)?;
    let document: PyprojectDocument = toml::from_str(&contents)?;
    let author = document
        .project
        .authors
        .first()
        .and_then(|a| a.name.clone())
        .unwrap_or_default();
    Ok(ProjectMetadata {
        name: document.project.name,
        version: document.project.version,
        author,
    })
}

/// Scrape `key='value'` / `key="value"` assignments out of setup.py.
///
/// Not a Python parser; it matches the simple literal style that setup.py
/// metadata is written in, exactly as the keyword scan the tool always did.
fn read_setup_py(path: &Path) -> Result<ProjectMetadata> {
    let contents = std::fs::read_to_string(path)?;
    let pattern = regex::Regex::new(r#"(\w+)\s*=\s*(?:'([^']*)'|"([^"]*)")"#)
        .map_err(|e| anyhow::anyhow!("setup.py scan pattern: {e}"))?;

    let mut name = None;
    let mut version = None;
    let mut author = None;
    for capture in pattern.captures_iter(&contents) {
        let key = &capture[1];
        let value = capture
            .get(2)
            .or_else(|| capture.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        match key {
            "name" if name.is_none() => name = Some(value),
            "version" if version.is_none() => version = Some(value),
            "author" if author.is_none() => author = Some(value),
            _ => {}
        }
    }

    let name = name.ok_or(ConfigError::MetadataKeyMissing {
        path: path.to_path_buf(),
        key: "name",
    })?;
    let version = version.ok_or(ConfigError::MetadataKeyMissing {
        path: path.to_path_buf(),
        key: "version",
    })?;

    Ok(ProjectMetadata {
        name,
        version,
        author: author.unwrap_or_default(),
    })
}
