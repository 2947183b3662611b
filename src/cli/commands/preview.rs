//! The `preview` command: stop right before pynsist and show the manifest.

use crate::cli::{BuildOpts, RuntimeConfig};
use crate::config::load_file_config;
use crate::error::Result;
use crate::installer::build::InstallerBuilder;

pub async fn execute_preview(opts: &BuildOpts, config: &RuntimeConfig) -> Result<()> {
    let project_root = opts.project_root();
    let resolved = load_file_config(&project_root, opts.config.as_deref())?
        .resolve(&project_root, &opts.overrides())?;

    let prepared = InstallerBuilder::new(resolved).prepare().await?;

    config.output().section("Dependency classification");
    config.println(&format!(
        "{} wheels from the index:",
        prepared.classification.pypi_wheels.len()
    ));
    for pin in &prepared.classification.pypi_wheels {
        config.indent(pin);
    }
    config.println(&format!(
        "{} vendored source packages:",
        prepared.classification.source_packages.len()
    ));
    for name in &prepared.classification.source_packages {
        config.indent(name);
    }
    if !prepared.classification.missing_wheels.is_empty() {
        config.warning_println("Pins without a wheel (vendored as source):");
        for pin in &prepared.classification.missing_wheels {
            config.indent(pin);
        }
    }

    config.output().section("pynsist.cfg");
    config.println(&prepared.pynsist.render()?);
    config.println(&format!(
        "Work directory kept at {}",
        prepared.work_dir.display()
    ));
    Ok(())
}
