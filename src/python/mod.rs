//! Packaging environment provisioning.
//!
//! Builds create a throwaway Python environment so the dependency closure
//! is resolved in isolation from whatever the host has installed. The
//! environment comes from conda/micromamba when configured or discovered
//! (which can also provision the exact interpreter version), falling back
//! to `python -m venv` with the system interpreter.

pub mod pip;

use crate::error::{EnvError, Result};
use crate::process::run_checked;
use std::path::{Path, PathBuf};

/// Environment directory created inside the work directory.
const ENV_DIR_NAME: &str = "packaging-env";

/// How the packaging environment gets provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioner {
    /// conda-compatible tool (conda, mamba, micromamba) at the given path
    Conda(PathBuf),
    /// `python -m venv` with the given base interpreter
    Venv(PathBuf),
}

/// An isolated Python environment used for one build.
#[derive(Debug, Clone)]
pub struct PythonEnv {
    pub(crate) root: PathBuf,
    pub(crate) python: PathBuf,
}

impl PythonEnv {
    /// Path of the environment's Python interpreter.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Environment root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The environment's `site-packages` directory.
    ///
    /// Asked of the environment's own interpreter, since a plain venv runs
    /// whatever minor version the system python has, not necessarily the
    /// configured one.
    pub async fn site_packages(&self) -> Result<PathBuf> {
        let output = run_checked(
            &self.python,
            &["-c", "import sysconfig; print(sysconfig.get_path('purelib'))"],
            None,
        )
        .await?;
        Ok(PathBuf::from(output.trim()))
    }

    /// pip driver bound to this environment.
    pub fn pip(&self) -> pip::Pip<'_> {
        pip::Pip::new(self)
    }
}

/// Arguments for a conda-style `create` invocation.
///
/// micromamba ships without default channels, so it gets conda-forge
/// explicitly; conda and mamba resolve `python` from their own defaults.
fn conda_create_args(conda: &Path, env_root: &Path, python_version: &str) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--yes".to_string(),
        "--prefix".to_string(),
        env_root.to_string_lossy().into_owned(),
    ];
    let is_micromamba = conda
        .file_stem()
        .map(|stem| stem.to_string_lossy().starts_with("micromamba"))
        .unwrap_or(false);
    if is_micromamba {
        args.push("--channel".to_string());
        args.push("conda-forge".to_string());
    }
    args.push(format!("python={python_version}"));
    args
}

fn interpreter_path(env_root: &Path) -> PathBuf {
    if cfg!(windows) {
        env_root.join("Scripts").join("python.exe")
    } else {
        env_root.join("bin").join("python")
    }
}

fn conda_interpreter_path(env_root: &Path) -> PathBuf {
    if cfg!(windows) {
        env_root.join("python.exe")
    } else {
        env_root.join("bin").join("python")
    }
}

/// Decide how to provision the environment.
///
/// Preference order: the configured conda executable, then micromamba on
/// PATH, then a system `python3`/`python` for plain venv creation.
pub fn find_provisioner(conda: Option<&Path>) -> Result<Provisioner> {
    if let Some(conda) = conda {
        let resolved = which::which(conda).map_err(|_| EnvError::VenvCreationFailed {
            reason: format!("configured conda executable not found: {}", conda.display()),
        })?;
        return Ok(Provisioner::Conda(resolved));
    }
    if let Ok(micromamba) = which::which("micromamba") {
        return Ok(Provisioner::Conda(micromamba));
    }
    for candidate in ["python3", "python"] {
        if let Ok(python) = which::which(candidate) {
            return Ok(Provisioner::Venv(python));
        }
    }
    Err(EnvError::InterpreterNotFound.into())
}

/// Create the packaging environment inside the work directory.
pub async fn create_packaging_env(
    work_dir: &Path,
    python_version: &str,
    provisioner: &Provisioner,
) -> Result<PythonEnv> {
    let env_root = work_dir.join(ENV_DIR_NAME);

    match provisioner {
        Provisioner::Conda(conda) => {
            log::info!(
                "Creating conda environment with Python {python_version} at {}",
                env_root.display()
            );
            let args = conda_create_args(conda, &env_root, python_version);
            run_checked(conda, &args, None).await?;
            let python = conda_interpreter_path(&env_root);
            if !python.exists() {
                return Err(EnvError::VenvCreationFailed {
                    reason: format!("no interpreter at {} after conda create", python.display()),
                }
                .into());
            }
            Ok(PythonEnv {
                root: env_root,
                python,
            })
        }
        Provisioner::Venv(base_python) => {
            log::info!("Creating venv at {}", env_root.display());
            let target = env_root.to_string_lossy().into_owned();
            run_checked(base_python, &["-m", "venv", &target], None).await?;
            let python = interpreter_path(&env_root);
            if !python.exists() {
                return Err(EnvError::VenvCreationFailed {
                    reason: format!("no interpreter at {} after venv creation", python.display()),
                }
                .into());
            }
            Ok(PythonEnv {
                root: env_root,
                python,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn site_packages_comes_from_the_interpreter() {
        let Ok(python) = which::which("python3") else {
            return;
        };
        let env = PythonEnv {
            root: python.parent().map(Path::to_path_buf).unwrap_or_default(),
            python,
        };
        let site = env.site_packages().await.expect("purelib path");
        assert!(site.is_absolute(), "got: {}", site.display());
        // Debian system pythons report dist-packages instead of site-packages
        assert!(
            site.to_string_lossy().contains("packages"),
            "got: {}",
            site.display()
        );
    }

    #[test]
    fn micromamba_create_gets_conda_forge() {
        let args = conda_create_args(
            Path::new("/opt/bin/micromamba"),
            Path::new("/work/packaging-env"),
            "3.11.5",
        );
        assert!(args.contains(&"--channel".to_string()));
        assert!(args.contains(&"conda-forge".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("python=3.11.5"));
    }

    #[test]
    fn plain_conda_create_keeps_default_channels() {
        let args = conda_create_args(
            Path::new("/opt/conda/bin/conda"),
            Path::new("/work/packaging-env"),
            "3.12.1",
        );
        assert!(!args.contains(&"--channel".to_string()));
        assert_eq!(
            args,
            vec![
                "create",
                "--yes",
                "--prefix",
                "/work/packaging-env",
                "python=3.12.1"
            ]
        );
    }

    #[test]
    fn configured_conda_is_preferred() {
        // `sh` stands in for a conda executable that exists on PATH.
        let provisioner = find_provisioner(Some(Path::new("sh"))).expect("provisioner");
        assert!(matches!(provisioner, Provisioner::Conda(_)));
    }

    #[test]
    fn missing_conda_is_an_error() {
        let err = find_provisioner(Some(Path::new("definitely-not-conda"))).expect_err("must fail");
        assert!(err.to_string().contains("not found"));
    }
}
