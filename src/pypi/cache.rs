//! On-disk cache for package index lookups.
//!
//! A flat JSON file keyed by canonical package name. Entries carry a fetch
//! timestamp and expire after a configurable TTL. Writes are atomic
//! (temp file + rename) so an interrupted run never leaves a truncated
//! cache behind.

use crate::error::{CacheError, Result};
use crate::pypi::ProjectReleases;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default entry lifetime in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

const CACHE_FILE_NAME: &str = "pypi-cache.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    releases: ProjectReleases,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, CacheEntry>,
}

/// Read-through cache for index lookups, persisted as JSON.
#[derive(Debug)]
pub struct PackageCache {
    path: PathBuf,
    ttl: Duration,
    data: CacheFile,
    dirty: bool,
}

/// Summary of the cache on disk, for `pybundle cache status`.
#[derive(Debug, Clone)]
pub struct CacheStatus {
    /// Cache file location
    pub path: PathBuf,
    /// Number of cached packages (including expired entries)
    pub entries: usize,
    /// Number of entries past their TTL
    pub expired: usize,
    /// Cache file size in bytes, if the file exists
    pub size_bytes: Option<u64>,
}

impl PackageCache {
    /// Open (or initialize) the cache at the given path.
    ///
    /// A corrupt cache file is logged and treated as empty; lookups must
    /// never fail because a previous run was interrupted mid-write.
    pub fn open(path: PathBuf, ttl_days: i64) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<CacheFile>(&contents) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!(
                        "Discarding corrupt cache file {}: {e}",
                        path.display()
                    );
                    CacheFile::default()
                }
            },
            Err(_) => CacheFile::default(),
        };

        Self {
            path,
            ttl: Duration::days(ttl_days),
            data,
            dirty: false,
        }
    }

    /// Open the cache at the platform default location.
    pub fn open_default(ttl_days: i64) -> Result<Self> {
        Ok(Self::open(Self::default_path()?, ttl_days))
    }

    /// Platform default cache file path.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::cache_dir().ok_or(CacheError::NoCacheDir)?;
        Ok(base.join("pybundle").join(CACHE_FILE_NAME))
    }

    /// Look up a package by canonical name, honoring the TTL.
    pub fn get(&self, name: &str) -> Option<ProjectReleases> {
        let entry = self.data.entries.get(name)?;
        if Utc::now() - entry.fetched_at > self.ttl {
            log::debug!("Cache entry for [{name}] expired");
            return None;
        }
        Some(entry.releases.clone())
    }

    /// Insert or refresh an entry.
    pub fn insert(&mut self, name: &str, releases: &ProjectReleases) {
        self.data.entries.insert(
            name.to_string(),
            CacheEntry {
                fetched_at: Utc::now(),
                releases: releases.clone(),
            },
        );
        self.dirty = true;
    }

    /// Persist the cache when it has pending changes.
    ///
    /// Writes to a sibling temp file and renames into place.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::WriteFailed {
                reason: format!("creating {}: {e}", parent.display()),
            })?;
        }

        let serialized =
            serde_json::to_string_pretty(&self.data).map_err(|e| CacheError::WriteFailed {
                reason: format!("serializing cache: {e}"),
            })?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serialized).map_err(|e| CacheError::WriteFailed {
            reason: format!("writing {}: {e}", temp_path.display()),
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| CacheError::WriteFailed {
            reason: format!("renaming into {}: {e}", self.path.display()),
        })?;

        self.dirty = false;
        Ok(())
    }

    /// Remove the cache file and all in-memory entries.
    pub fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| CacheError::WriteFailed {
                reason: format!("removing {}: {e}", self.path.display()),
            })?;
        }
        self.data.entries.clear();
        self.dirty = false;
        Ok(())
    }

    /// Summarize the cache for status display.
    pub fn status(&self) -> CacheStatus {
        let now = Utc::now();
        let expired = self
            .data
            .entries
            .values()
            .filter(|e| now - e.fetched_at > self.ttl)
            .count();
        CacheStatus {
            path: self.path.clone(),
            entries: self.data.entries.len(),
            expired,
            size_bytes: fs::metadata(&self.path).ok().map(|m| m.len()),
        }
    }

    /// Cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_releases(name: &str) -> ProjectReleases {
        let mut releases = HashMap::new();
        releases.insert("1.0.0".to_string(), vec!["bdist_wheel".to_string()]);
        ProjectReleases {
            name: name.to_string(),
            releases,
        }
    }

    #[test]
    fn roundtrips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");

        let mut cache = PackageCache::open(path.clone(), DEFAULT_TTL_DAYS);
        assert!(cache.get("requests").is_none());
        cache.insert("requests", &sample_releases("requests"));
        cache.save().expect("save");

        let reopened = PackageCache::open(path, DEFAULT_TTL_DAYS);
        let hit = reopened.get("requests").expect("cached entry");
        assert!(hit.has_wheel("1.0.0"));
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = PackageCache::open(dir.path().join("cache.json"), 0);
        cache.insert("requests", &sample_releases("requests"));
        // TTL of zero days: anything already written counts as expired.
        assert!(cache.get("requests").is_none());
        assert_eq!(cache.status().expired, 1);
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").expect("write");

        let cache = PackageCache::open(path, DEFAULT_TTL_DAYS);
        assert_eq!(cache.status().entries, 0);
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");

        let mut cache = PackageCache::open(path.clone(), DEFAULT_TTL_DAYS);
        cache.insert("requests", &sample_releases("requests"));
        cache.save().expect("save");
        assert!(path.exists());

        cache.clear().expect("clear");
        assert!(!path.exists());
        assert!(cache.get("requests").is_none());
    }
}
