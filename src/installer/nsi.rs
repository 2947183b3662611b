//! Custom NSI template rendering.
//!
//! pynsist resolves a bare `nsi_template` filename against its own
//! `nsist/` package directory, so a project-specific template gets its
//! placeholders filled in and is written into the packaging environment's
//! installed pynsist before the build runs.

use crate::error::{ManifestError, Result};
use handlebars::Handlebars;
use serde_json::json;
use std::path::Path;

/// Values substituted into a custom NSI template.
#[derive(Debug, Clone)]
pub struct NsiContext {
    /// Application name as configured
    pub app_name: String,
    /// Lowercased name, for registry keys and install paths
    pub app_name_lower: String,
    /// Title shown in the installer window
    pub window_title: String,
}

impl NsiContext {
    /// Build the substitution context for an application.
    ///
    /// The window title defaults to the bare application name.
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            app_name_lower: app_name.to_lowercase(),
            window_title: app_name.to_string(),
        }
    }
}

/// Render a template string with the given context.
pub fn render_template(template: &str, context: &NsiContext) -> Result<String> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    let data = json!({
        "APP_NAME": context.app_name,
        "APP_NAME_LOWER": context.app_name_lower,
        "WINDOW_TITLE": context.window_title,
    });
    let rendered = registry.render_template(template, &data)?;
    // NSIS tolerates LF; normalizing avoids mixed line endings when the
    // template was authored with CRLF.
    Ok(rendered.replace("\r\n", "\n"))
}

/// Render `template_path` into pynsist's template directory.
///
/// `site_packages` is the packaging environment's `site-packages`; the
/// rendered file lands in its `nsist/` package directory. Returns the bare
/// filename to reference from `nsi_template` in the pynsist configuration.
pub fn install_template(
    site_packages: &Path,
    template_path: &Path,
    context: &NsiContext,
) -> Result<String> {
    if !template_path.exists() {
        return Err(ManifestError::TemplateNotFound {
            path: template_path.to_path_buf(),
        }
        .into());
    }

    let file_name = template_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ManifestError::TemplateNotFound {
            path: template_path.to_path_buf(),
        })?;

    let template = std::fs::read_to_string(template_path)?;
    let rendered = render_template(&template, context)?;

    let target = site_packages.join("nsist").join(&file_name);
    log::info!("Installing NSI template at {}", target.display());
    std::fs::write(&target, rendered)?;

    Ok(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let context = NsiContext::new("DemoApp");
        let rendered = render_template(
            "Name \"{{WINDOW_TITLE}}\"\r\nInstallDir \"$PROGRAMFILES\\{{APP_NAME_LOWER}}\"\r\n",
            &context,
        )
        .expect("render");
        assert_eq!(
            rendered,
            "Name \"DemoApp\"\nInstallDir \"$PROGRAMFILES\\demoapp\"\n"
        );
    }

    #[test]
    fn window_title_defaults_to_app_name() {
        let context = NsiContext::new("DemoApp");
        assert_eq!(context.app_name_lower, "demoapp");
        assert_eq!(context.window_title, "DemoApp");
    }

    #[test]
    fn installs_rendered_template_under_nsist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let site_packages = dir.path().join("site-packages");
        std::fs::create_dir_all(site_packages.join("nsist")).expect("mkdir");
        let template = dir.path().join("demo.nsi");
        std::fs::write(&template, "Name \"{{APP_NAME}}\"\n").expect("write");

        let file_name =
            install_template(&site_packages, &template, &NsiContext::new("Demo"))
                .expect("install");
        assert_eq!(file_name, "demo.nsi");
        let rendered = std::fs::read_to_string(site_packages.join("nsist/demo.nsi"))
            .expect("rendered file");
        assert_eq!(rendered, "Name \"Demo\"\n");
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = install_template(
            dir.path(),
            &dir.path().join("missing.nsi"),
            &NsiContext::new("Demo"),
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("NSI template not found"));
    }
}
