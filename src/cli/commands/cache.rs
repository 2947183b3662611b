//! The `cache` command: inspect or clear the index lookup cache.

use crate::cli::{CacheCommand, CacheOpts, RuntimeConfig};
use crate::config::load_file_config;
use crate::error::Result;
use crate::pypi::{DEFAULT_TTL_DAYS, PackageCache};
use std::path::PathBuf;

/// Open the cache the way a build in this project would.
///
/// A `[pypi].cache-file` in the project configuration wins; without a
/// configuration file the platform default cache is used. An explicitly
/// passed `--config` that cannot be loaded is an error.
fn open_configured_cache(opts: &CacheOpts) -> Result<PackageCache> {
    let root = opts.project.clone().unwrap_or_else(|| PathBuf::from("."));
    let file_config = match load_file_config(&root, opts.config.as_deref()) {
        Ok(fc) => Some(fc),
        Err(e) if opts.config.is_some() => return Err(e),
        Err(e) => {
            log::debug!("No project configuration, using default cache: {e}");
            None
        }
    };

    let (cache_file, ttl_days) = match &file_config {
        Some(fc) => (fc.pypi.cache_file.clone(), fc.pypi.cache_ttl_days),
        None => (None, None),
    };
    let ttl_days = ttl_days.unwrap_or(DEFAULT_TTL_DAYS);

    match cache_file {
        Some(path) => {
            let path = if path.is_absolute() { path } else { root.join(path) };
            Ok(PackageCache::open(path, ttl_days))
        }
        None => PackageCache::open_default(ttl_days),
    }
}

pub fn execute_cache(action: &CacheCommand, config: &RuntimeConfig) -> Result<()> {
    let opts = match action {
        CacheCommand::Status(opts) | CacheCommand::Clear(opts) => opts,
    };
    let mut cache = open_configured_cache(opts)?;

    match action {
        CacheCommand::Status(_) => {
            let status = cache.status();
            config.println(&format!("Cache file: {}", status.path.display()));
            config.println(&format!(
                "Entries:    {} ({} expired)",
                status.entries, status.expired
            ));
            match status.size_bytes {
                Some(size) => config.println(&format!("Size:       {size} bytes")),
                None => config.println("Size:       (no cache file on disk)"),
            }
        }
        CacheCommand::Clear(_) => {
            cache.clear()?;
            config.success_println(&format!(
                "Removed cache at {}",
                cache.path().display()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_cache_file_is_honored() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("pybundle.toml"),
            "[pypi]\ncache-file = \"lookup/pypi.json\"\ncache-ttl-days = 3\n",
        )
        .expect("write");

        let opts = CacheOpts {
            project: Some(dir.path().to_path_buf()),
            config: None,
        };
        let cache = open_configured_cache(&opts).expect("open");
        assert_eq!(cache.path(), dir.path().join("lookup/pypi.json"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = CacheOpts {
            project: Some(dir.path().to_path_buf()),
            config: Some(dir.path().join("nope.toml")),
        };
        let err = open_configured_cache(&opts).expect_err("must fail");
        assert!(err.to_string().contains("Missing configuration file"));
    }
}
