//! The `validate` command: configuration and environment checks.

use crate::cli::RuntimeConfig;
use crate::config::{Overrides, load_file_config};
use crate::error::{CliError, Result};
use crate::installer::{embeddable_exists, find_embeddable_python};
use crate::metadata::read_project_metadata;
use crate::python::find_provisioner;
use std::path::Path;

pub async fn execute_validate(
    project: Option<&Path>,
    file: Option<&Path>,
    config: &RuntimeConfig,
) -> Result<()> {
    let project_root = project.unwrap_or(Path::new(".")).to_path_buf();
    let file_config = load_file_config(&project_root, file)?;
    let unset = file_config.unset_fields();
    let resolved = file_config.resolve(&project_root, &Overrides::default())?;

    config.output().section("Configuration");
    config.success_println(&format!("Configuration valid for '{}'", resolved.name));
    for field in unset {
        config.output().verbose(&format!("Optional field unset: {field}"));
    }

    let mut problems = 0usize;

    match read_project_metadata(&resolved.project_root) {
        Ok(metadata) => config.println(&format!(
            "Project metadata: {} {}",
            metadata.name, metadata.version
        )),
        Err(e) => {
            problems += 1;
            config.warning_println(&format!("Project metadata: {e}"));
        }
    }

    for (label, path, required) in [
        ("Icon", &resolved.icon, true),
        ("License", &resolved.license, false),
    ] {
        if path.exists() {
            config.println(&format!("{label}: {}", path.display()));
        } else if required {
            problems += 1;
            config.warning_println(&format!("{label} missing: {}", path.display()));
        } else {
            config.println(&format!("{label} missing (installer will have none)"));
        }
    }
    if let Some(template) = &resolved.nsi_template {
        if template.exists() {
            config.println(&format!("NSI template: {}", template.display()));
        } else {
            problems += 1;
            config.warning_println(&format!("NSI template missing: {}", template.display()));
        }
    }

    match find_provisioner(resolved.conda.as_deref()) {
        Ok(provisioner) => config.println(&format!("Environment provisioner: {provisioner:?}")),
        Err(e) => {
            problems += 1;
            config.warning_println(&format!("No environment provisioner: {e}"));
        }
    }

    config.output().section("Embeddable Python");
    let http = reqwest::Client::new();
    if embeddable_exists(&http, &resolved.python_version, resolved.bitness).await {
        config.success_println(&format!(
            "python.org ships an embeddable {} ({}-bit)",
            resolved.python_version, resolved.bitness
        ));
    } else {
        problems += 1;
        config.warning_println(&format!(
            "No embeddable distribution found for Python {} (or python.org unreachable)",
            resolved.python_version
        ));
        let major_minor = resolved
            .python_version
            .splitn(3, '.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".");
        if let Some(newest) = find_embeddable_python(&http, &major_minor, resolved.bitness).await {
            config.println(&format!("Newest available on the {major_minor} line: {newest}"));
        }
    }

    if problems > 0 {
        return Err(CliError::InvalidArguments {
            reason: format!("{problems} validation problem(s) found"),
        }
        .into());
    }
    config.success_println("All checks passed");
    Ok(())
}
