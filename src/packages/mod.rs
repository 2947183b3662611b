//! Dependency classification for installer assembly.
//!
//! Given the frozen requirement list of the packaging environment, this
//! module decides which requirements are fetched as prebuilt wheels from
//! the package index, which are vendored as source packages, and which are
//! excluded. All operations are pure set algebra over canonical names so
//! they can be tested without touching pip or the network.

use crate::pep503::{Requirement, WheelFilename, canonicalize_name};
use std::collections::HashSet;
use std::path::Path;

/// Packages that never belong in an installer, regardless of configuration.
///
/// `pip freeze --all` reports the build tooling itself; these are filtered
/// at classification time rather than uninstalled, since removing pip
/// would break the packaging environment.
pub const ALWAYS_UNWANTED: &[&str] = &["pip", "setuptools", "wheel"];

/// Outcome of classifying one frozen environment.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Requirements confirmed available as prebuilt wheels (`name==version`)
    pub pypi_wheels: Vec<String>,
    /// Package names vendored from the environment as source
    pub source_packages: Vec<String>,
    /// Requirements that were requested from the index but yielded no wheel
    pub missing_wheels: Vec<String>,
    /// Direct-reference requirements (editable / VCS installs)
    pub direct_references: Vec<String>,
}

/// Partition frozen requirements into pinned entries and direct references.
///
/// Direct references (`name @ path-or-url`) cannot be fetched from an
/// index and are handled separately.
pub fn separate_pinned_and_direct(frozen: &[Requirement]) -> (Vec<Requirement>, Vec<Requirement>) {
    let (direct, pinned): (Vec<_>, Vec<_>) = frozen
        .iter()
        .cloned()
        .partition(Requirement::is_direct_reference);
    (pinned, direct)
}

/// Drop requirements whose canonical name appears in `unwanted`.
pub fn filter_unwanted(frozen: &[Requirement], unwanted: &[String]) -> Vec<Requirement> {
    let unwanted_names: HashSet<String> =
        unwanted.iter().map(|p| canonicalize_name(p)).collect();
    frozen
        .iter()
        .filter(|r| !unwanted_names.contains(r.name()))
        .cloned()
        .collect()
}

/// Split pinned requirements into index-eligible and skip-pypi sets.
///
/// The application's own package always belongs in the skip set: it is
/// installed from the project tree, never fetched from the index.
pub fn split_skip_pypi(
    pinned: &[Requirement],
    skip_pypi: &[String],
) -> (Vec<Requirement>, Vec<Requirement>) {
    let skip_names: HashSet<String> = skip_pypi.iter().map(|p| canonicalize_name(p)).collect();
    let (skipped, eligible): (Vec<_>, Vec<_>) = pinned
        .iter()
        .cloned()
        .partition(|r| skip_names.contains(r.name()));
    (eligible, skipped)
}

/// Keep only the requirements whose `(name, version)` has a downloaded wheel.
///
/// `wheel_files` are the filenames that `pip download --only-binary :all:`
/// produced; anything eligible without a matching wheel is reported back in
/// the second list so the caller can log it.
pub fn confirm_downloaded_wheels(
    eligible: &[Requirement],
    wheel_files: &[String],
) -> (Vec<Requirement>, Vec<Requirement>) {
    let downloaded: HashSet<(String, String)> = wheel_files
        .iter()
        .filter_map(|f| WheelFilename::parse(f))
        .map(|w| w.key())
        .collect();

    let (confirmed, missing): (Vec<_>, Vec<_>) = eligible.iter().cloned().partition(|r| {
        r.key()
            .map(|key| downloaded.contains(&key))
            .unwrap_or(false)
    });
    (confirmed, missing)
}

/// Compute the source package names: wanted requirements minus wheels.
///
/// Returns bare canonical names (pynsist's `packages` section takes names,
/// not pins), with configured extras appended and duplicates removed while
/// preserving first-seen order. The wheel subtraction applies to the extras
/// too, so a package never shows up as both a wheel and a source package.
pub fn source_packages(
    wanted: &[Requirement],
    wheels: &[Requirement],
    extra_packages: &[String],
) -> Vec<String> {
    let wheel_names: HashSet<String> = wheels.iter().map(|r| r.name().to_string()).collect();

    let mut seen = HashSet::new();
    let mut packages = Vec::new();
    for name in wanted
        .iter()
        .map(|r| r.name().to_string())
        .chain(extra_packages.iter().map(|p| canonicalize_name(p)))
    {
        if wheel_names.contains(&name) {
            continue;
        }
        if seen.insert(name.clone()) {
            packages.push(name);
        }
    }
    packages
}

/// The pinned requirements worth attempting wheel downloads for.
///
/// Unwanted and skip-pypi entries are removed; direct references cannot be
/// fetched from an index and are excluded here as well.
pub fn eligible_pins(
    frozen: &[Requirement],
    unwanted: &[String],
    skip_pypi: &[String],
) -> Vec<Requirement> {
    let wanted = filter_unwanted(frozen, unwanted);
    let (pinned, _) = separate_pinned_and_direct(&wanted);
    let (eligible, _) = split_skip_pypi(&pinned, skip_pypi);
    eligible
}

/// Classify a frozen environment given the wheels that downloads produced.
///
/// The wanted set keeps its freeze order and includes direct references
/// (editable and VCS installs), which are always vendored as source. With
/// `wheels_first` off there are no wheel files to confirm against and every
/// wanted requirement becomes a source package.
pub fn classify(
    frozen: &[Requirement],
    unwanted: &[String],
    skip_pypi: &[String],
    wheel_files: &[String],
    extra_packages: &[String],
    wheels_first: bool,
) -> Classification {
    let wanted = filter_unwanted(frozen, unwanted);
    let (pinned, direct) = separate_pinned_and_direct(&wanted);
    let (eligible, _) = split_skip_pypi(&pinned, skip_pypi);

    let (confirmed, missing) = if wheels_first {
        confirm_downloaded_wheels(&eligible, wheel_files)
    } else {
        (Vec::new(), Vec::new())
    };

    Classification {
        pypi_wheels: confirmed.iter().map(|r| r.raw().to_string()).collect(),
        source_packages: source_packages(&wanted, &confirmed, extra_packages),
        missing_wheels: missing.iter().map(|r| r.raw().to_string()).collect(),
        direct_references: direct.iter().map(|r| r.raw().to_string()).collect(),
    }
}

/// List `*.whl` filenames in a download directory.
pub fn wheel_files_in(dir: &Path) -> crate::error::Result<Vec<String>> {
    let pattern = dir.join("*.whl");
    let mut files = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())
        .map_err(|e| anyhow::anyhow!("invalid wheel glob pattern: {e}"))?
    {
        let path = entry.map_err(|e| anyhow::anyhow!("unreadable wheel file: {e}"))?;
        if let Some(name) = path.file_name() {
            files.push(name.to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reqs(lines: &[&str]) -> Vec<Requirement> {
        lines.iter().map(|l| Requirement::parse(l)).collect()
    }

    #[test]
    fn separates_direct_references() {
        let frozen = reqs(&[
            "requests==2.31.0",
            "numpy @ file:///D:/bld/numpy/work",
            "idna==3.6",
        ]);
        let (pinned, direct) = separate_pinned_and_direct(&frozen);
        assert_eq!(pinned.len(), 2);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].name(), "numpy");
    }

    #[test]
    fn unwanted_filter_is_canonical() {
        let frozen = reqs(&["typing_extensions==4.9.0", "requests==2.31.0"]);
        let wanted = filter_unwanted(&frozen, &["Typing.Extensions".to_string()]);
        assert_eq!(wanted.len(), 1);
        assert_eq!(wanted[0].name(), "requests");
    }

    #[test]
    fn skip_pypi_split_keeps_both_sides() {
        let pinned = reqs(&["myapp==1.0.0", "requests==2.31.0", "pywin32==306"]);
        let (eligible, skipped) =
            split_skip_pypi(&pinned, &["MyApp".to_string(), "pywin32".to_string()]);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].name(), "requests");
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn confirms_only_matching_wheels() {
        let eligible = reqs(&["requests==2.31.0", "lxml==5.1.0"]);
        let wheels = vec!["requests-2.31.0-py3-none-any.whl".to_string()];
        let (confirmed, missing) = confirm_downloaded_wheels(&eligible, &wheels);
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].raw(), "requests==2.31.0");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name(), "lxml");
    }

    #[test]
    fn wheel_match_is_exact_on_version() {
        let eligible = reqs(&["requests==2.31.0"]);
        let wheels = vec!["requests-2.30.0-py3-none-any.whl".to_string()];
        let (confirmed, missing) = confirm_downloaded_wheels(&eligible, &wheels);
        assert!(confirmed.is_empty());
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn extra_with_confirmed_wheel_is_not_double_listed() {
        let wanted = reqs(&["myapp==1.0.0", "extra-dep==2.0.0"]);
        let wheels = reqs(&["extra-dep==2.0.0"]);
        let packages = source_packages(&wanted, &wheels, &["Extra.Dep".to_string()]);
        assert_eq!(packages, vec!["myapp"]);
    }

    #[test]
    fn classify_vendors_direct_references() {
        let frozen = reqs(&[
            "myapp @ file:///C:/dev/myapp",
            "requests==2.31.0",
            "pip==24.0",
        ]);
        let wheel_files = vec!["requests-2.31.0-py3-none-any.whl".to_string()];
        let result = classify(
            &frozen,
            &["pip".to_string()],
            &[],
            &wheel_files,
            &[],
            true,
        );
        assert_eq!(result.pypi_wheels, vec!["requests==2.31.0"]);
        assert_eq!(result.source_packages, vec!["myapp"]);
        assert_eq!(
            result.direct_references,
            vec!["myapp @ file:///C:/dev/myapp"]
        );
    }

    #[test]
    fn classify_unwanted_filter_covers_direct_references() {
        let frozen = reqs(&[
            "dev-tool @ file:///C:/dev/dev-tool",
            "requests==2.31.0",
        ]);
        let result = classify(&frozen, &["dev_tool".to_string()], &[], &[], &[], true);
        assert_eq!(result.source_packages, vec!["requests"]);
        assert!(result.direct_references.is_empty());
    }

    #[test]
    fn classify_source_mode_vendors_everything() {
        let frozen = reqs(&[
            "myapp==1.0.0",
            "requests==2.31.0",
            "local-helper @ file:///C:/dev/local-helper",
        ]);
        let result = classify(&frozen, &[], &[], &[], &[], false);
        assert!(result.pypi_wheels.is_empty());
        assert!(result.missing_wheels.is_empty());
        assert_eq!(
            result.source_packages,
            vec!["myapp", "requests", "local-helper"]
        );
    }

    #[test]
    fn eligible_pins_exclude_skip_and_direct() {
        let frozen = reqs(&[
            "myapp==1.0.0",
            "requests==2.31.0",
            "local-helper @ file:///C:/dev/local-helper",
        ]);
        let eligible = eligible_pins(&frozen, &[], &["myapp".to_string()]);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].name(), "requests");
    }

    #[test]
    fn source_packages_subtracts_wheels_and_dedups() {
        let wanted = reqs(&["myapp==1.0.0", "requests==2.31.0", "pywin32==306"]);
        let wheels = reqs(&["requests==2.31.0"]);
        let packages = source_packages(
            &wanted,
            &wheels,
            &["extra-tool".to_string(), "PyWin32".to_string()],
        );
        assert_eq!(packages, vec!["myapp", "pywin32", "extra-tool"]);
    }
}
