//! Package index client for wheel availability lookups.
//!
//! Talks to the PyPI JSON API (`GET {server}/pypi/{name}/json`) to learn
//! which artifact kinds each release ships. Lookups are pre-flight only:
//! the authoritative wheel check is still `pip download --only-binary`,
//! but the index query lets us warn about wheel-less pins before the
//! expensive download step, and its results are cached on disk.

mod cache;

pub use cache::{CacheStatus, PackageCache, DEFAULT_TTL_DAYS};

use crate::error::{PypiError, Result};
use crate::pep503::{canonicalize_name, canonicalize_version};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Default package index server.
pub const DEFAULT_PYPI_SERVER: &str = "https://pypi.org";

/// Artifact kinds per release of one distribution, as reported by the index.
///
/// The version map is keyed by canonical version; values are the
/// `packagetype` strings of the uploaded files (`bdist_wheel`, `sdist`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectReleases {
    /// Canonical distribution name
    pub name: String,
    /// Canonical version → uploaded artifact kinds
    pub releases: HashMap<String, Vec<String>>,
}

impl ProjectReleases {
    /// Whether the given version has at least one wheel upload.
    pub fn has_wheel(&self, version: &str) -> bool {
        self.releases
            .get(&canonicalize_version(version))
            .map(|kinds| kinds.iter().any(|k| k == "bdist_wheel"))
            .unwrap_or(false)
    }

    /// Whether the given version exists on the index at all.
    pub fn has_release(&self, version: &str) -> bool {
        self.releases.contains_key(&canonicalize_version(version))
    }
}

#[derive(Deserialize)]
struct IndexDocument {
    info: IndexInfo,
    releases: HashMap<String, Vec<IndexArtifact>>,
}

#[derive(Deserialize)]
struct IndexInfo {
    name: String,
}

#[derive(Deserialize)]
struct IndexArtifact {
    packagetype: String,
}

/// HTTP client for the package index JSON API.
#[derive(Debug, Clone)]
pub struct PypiClient {
    http: reqwest::Client,
    server: Url,
}

impl PypiClient {
    /// Create a client against the given index server (e.g. `https://pypi.org`).
    ///
    /// Mirror servers exposing the same JSON API work unchanged.
    pub fn new(server: &str) -> Result<Self> {
        let server = Url::parse(server).map_err(|e| PypiError::InvalidServerUrl {
            url: server.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            server,
        })
    }

    /// Fetch the release map of one distribution from the index.
    pub async fn fetch_project(&self, name: &str) -> Result<ProjectReleases> {
        let canonical = canonicalize_name(name);
        let url = self
            .server
            .join(&format!("pypi/{canonical}/json"))
            .map_err(|e| PypiError::InvalidServerUrl {
                url: self.server.to_string(),
                reason: e.to_string(),
            })?;

        log::debug!("Querying package index: {url}");
        let response = self.http.get(url).send().await?;

        match response.status() {
            status if status.is_success() => {}
            reqwest::StatusCode::NOT_FOUND => {
                return Err(PypiError::PackageNotFound { name: canonical }.into());
            }
            status => {
                return Err(PypiError::UnexpectedResponse {
                    name: canonical,
                    status: status.as_u16(),
                }
                .into());
            }
        }

        let document: IndexDocument = response.json().await?;
        let releases = document
            .releases
            .into_iter()
            .map(|(version, artifacts)| {
                (
                    canonicalize_version(&version),
                    artifacts.into_iter().map(|a| a.packagetype).collect(),
                )
            })
            .collect();

        Ok(ProjectReleases {
            name: canonicalize_name(&document.info.name),
            releases,
        })
    }
}

/// Index client with a read-through on-disk cache.
///
/// Fresh cache entries answer lookups without any network traffic; misses
/// and expired entries fall through to the [`PypiClient`] and refresh the
/// cache in memory (persisted by [`PackageCache::save`] at the end of a
/// run).
#[derive(Debug)]
pub struct CachedIndex {
    client: PypiClient,
    cache: PackageCache,
}

impl CachedIndex {
    /// Wrap a client with the given cache.
    pub fn new(client: PypiClient, cache: PackageCache) -> Self {
        Self { client, cache }
    }

    /// Release information for one distribution, cached.
    pub async fn project(&mut self, name: &str) -> Result<ProjectReleases> {
        let canonical = canonicalize_name(name);
        if let Some(cached) = self.cache.get(&canonical) {
            log::debug!("Cache hit for [{canonical}]");
            return Ok(cached);
        }
        let fetched = self.client.fetch_project(&canonical).await?;
        self.cache.insert(&canonical, &fetched);
        Ok(fetched)
    }

    /// Whether `name==version` ships a wheel, per the index.
    ///
    /// A missing release is an error (the pin came from `pip freeze`, so
    /// the index metadata is inconsistent); a wheel-less release is `false`.
    pub async fn has_wheel(&mut self, name: &str, version: &str) -> Result<bool> {
        let project = self.project(name).await?;
        if !project.has_release(version) {
            return Err(PypiError::ReleaseNotFound {
                name: project.name,
                version: canonicalize_version(version),
            }
            .into());
        }
        Ok(project.has_wheel(version))
    }

    /// Persist the cache to disk.
    pub fn save(&mut self) -> Result<()> {
        self.cache.save()
    }
}
