//! The `build` command: run the full pipeline and report the installer.

use crate::cli::{BuildOpts, RuntimeConfig};
use crate::config::load_file_config;
use crate::error::Result;
use crate::installer::build::InstallerBuilder;

pub async fn execute_build(opts: &BuildOpts, config: &RuntimeConfig) -> Result<()> {
    let project_root = opts.project_root();
    let resolved = load_file_config(&project_root, opts.config.as_deref())?
        .resolve(&project_root, &opts.overrides())?;

    config.output().section(&format!("Building {}", resolved.name));
    config.println(&format!(
        "Python {} ({}-bit), index {}",
        resolved.python_version, resolved.bitness, resolved.pypi_server
    ));

    let built = InstallerBuilder::new(resolved).build().await?;

    config.success_println(&format!("Installer written to {}", built.path.display()));
    config.indent(&format!("size:   {} bytes", built.size_bytes));
    config.indent(&format!("sha256: {}", built.sha256));
    Ok(())
}
