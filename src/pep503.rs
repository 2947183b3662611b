//! Canonical package names, requirement strings, and wheel filenames.
//!
//! Everything in the classification pipeline compares packages by their
//! PEP 503 canonical name, so the parsing here is the foundation for the
//! set algebra in [`crate::packages`].

/// Normalize a distribution name per PEP 503.
///
/// Lowercases the name and collapses every run of `-`, `_` and `.` into a
/// single `-`, matching `packaging.utils.canonicalize_name`.
pub fn canonicalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if c == '-' || c == '_' || c == '.' {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Normalize a version string.
///
/// Strips surrounding whitespace, a leading `v`/`V` prefix, and lowercases
/// pre-release tags. Trailing zeros are kept, matching the original
/// behavior of `canonicalize_version(strip_trailing_zero=False)`.
pub fn canonicalize_version(version: &str) -> String {
    let trimmed = version.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    stripped.to_ascii_lowercase()
}

/// A single entry of `pip freeze` output.
///
/// Two shapes occur in frozen output: pinned requirements
/// (`name==version`) and direct references (`name @ url-or-path`), the
/// latter produced for editable and VCS installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    raw: String,
    name: String,
    version: Option<String>,
}

impl Requirement {
    /// Parse a requirement line from `pip freeze` output.
    pub fn parse(line: &str) -> Self {
        let raw = line.trim().to_string();
        let (name_part, _, version_part) = partition(&raw, "==");
        // `<package> @ <path>` marks a direct reference; only the name
        // before the `@` identifies the package.
        let name_raw = name_part.split('@').next().unwrap_or("").trim();
        let name = canonicalize_name(name_raw);
        let version = if raw.contains('@') || version_part.is_empty() {
            None
        } else {
            Some(canonicalize_version(version_part))
        };
        Self { raw, name, version }
    }

    /// The requirement line exactly as pip printed it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// PEP 503 canonical distribution name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical pinned version, if this is a `name==version` requirement.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether this is a direct reference (`name @ url`) entry.
    pub fn is_direct_reference(&self) -> bool {
        self.raw.contains('@')
    }

    /// Canonical `(name, version)` key for matching against wheel files.
    pub fn key(&self) -> Option<(String, String)> {
        self.version
            .as_ref()
            .map(|v| (self.name.clone(), v.clone()))
    }
}

/// Parsed components of a wheel filename.
///
/// Wheel filenames follow
/// `{distribution}-{version}[-{build}]-{python}-{abi}-{platform}.whl`,
/// with `-` inside the distribution name escaped as `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFilename {
    /// Canonical distribution name
    pub name: String,
    /// Canonical version
    pub version: String,
}

impl WheelFilename {
    /// Parse a wheel filename into its canonical `(name, version)`.
    ///
    /// Returns `None` when the filename is not a structurally valid wheel
    /// name (wrong extension or too few `-`-separated components).
    pub fn parse(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(".whl")?;
        let parts: Vec<&str> = stem.split('-').collect();
        // name-version-pytag-abitag-plattag, optionally with a build tag
        if parts.len() != 5 && parts.len() != 6 {
            return None;
        }
        Some(Self {
            name: canonicalize_name(parts[0]),
            version: canonicalize_version(parts[1]),
        })
    }

    /// Canonical `(name, version)` key.
    pub fn key(&self) -> (String, String) {
        (self.name.clone(), self.version.clone())
    }
}

/// str.partition equivalent: splits at the first occurrence of `sep`.
fn partition<'a>(s: &'a str, sep: &'a str) -> (&'a str, &'a str, &'a str) {
    match s.find(sep) {
        Some(idx) => (&s[..idx], sep, &s[idx + sep.len()..]),
        None => (s, "", ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_collapses_separators() {
        assert_eq!(canonicalize_name("Sphinx"), "sphinx");
        assert_eq!(canonicalize_name("zope.interface"), "zope-interface");
        assert_eq!(canonicalize_name("ruamel.yaml.clib"), "ruamel-yaml-clib");
        assert_eq!(canonicalize_name("typing_extensions"), "typing-extensions");
        assert_eq!(canonicalize_name("a--b__c..d"), "a-b-c-d");
    }

    #[test]
    fn canonical_version_keeps_trailing_zeros() {
        assert_eq!(canonicalize_version("1.0.0"), "1.0.0");
        assert_eq!(canonicalize_version("v2.1"), "2.1");
        assert_eq!(canonicalize_version("1.0rc1"), "1.0rc1");
    }

    #[test]
    fn parse_pinned_requirement() {
        let req = Requirement::parse("PyQt6-Qt6==6.6.1");
        assert_eq!(req.name(), "pyqt6-qt6");
        assert_eq!(req.version(), Some("6.6.1"));
        assert!(!req.is_direct_reference());
        assert_eq!(
            req.key(),
            Some(("pyqt6-qt6".to_string(), "6.6.1".to_string()))
        );
    }

    #[test]
    fn parse_direct_reference() {
        let req = Requirement::parse("numpy @ file:///D:/bld/numpy_1610324703282/work");
        assert_eq!(req.name(), "numpy");
        assert!(req.is_direct_reference());
        assert_eq!(req.version(), None);
        assert_eq!(req.key(), None);
    }

    #[test]
    fn parse_vcs_reference() {
        let req = Requirement::parse("package-two @ git+https://github.com/owner/repo@41b95ec");
        assert_eq!(req.name(), "package-two");
        assert!(req.is_direct_reference());
    }

    #[test]
    fn parse_bare_name() {
        let req = Requirement::parse("requests");
        assert_eq!(req.name(), "requests");
        assert_eq!(req.version(), None);
        assert!(!req.is_direct_reference());
    }

    #[test]
    fn wheel_filename_without_build_tag() {
        let whl = WheelFilename::parse("charset_normalizer-3.3.2-cp311-cp311-win_amd64.whl")
            .expect("valid wheel name");
        assert_eq!(whl.name, "charset-normalizer");
        assert_eq!(whl.version, "3.3.2");
    }

    #[test]
    fn wheel_filename_with_build_tag() {
        let whl = WheelFilename::parse("dist-1.0-1-py3-none-any.whl").expect("valid wheel name");
        assert_eq!(whl.name, "dist");
        assert_eq!(whl.version, "1.0");
    }

    #[test]
    fn partition_splits_at_first_separator() {
        assert_eq!(partition("a==b==c", "=="), ("a", "==", "b==c"));
        assert_eq!(partition("plain", "=="), ("plain", "", ""));
    }

    #[test]
    fn wheel_filename_rejects_garbage() {
        assert!(WheelFilename::parse("notawheel.zip").is_none());
        assert!(WheelFilename::parse("too-few-parts.whl").is_none());
    }
}
