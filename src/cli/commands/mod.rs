//! Command execution functions coordinating the build pipeline.

mod build;
mod cache;
mod preview;
mod validate;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use build::execute_build;
use cache::execute_cache;
use preview::execute_preview;
use validate::execute_validate;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {validation_error}"));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Build(opts) => execute_build(opts, &config).await,
        Command::Preview(opts) => execute_preview(opts, &config).await,
        Command::Validate { project, config: file } => {
            execute_validate(project.as_deref(), file.as_deref(), &config).await
        }
        Command::Cache { action } => execute_cache(action, &config),
    };

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {e}", args.command.name()));
            if config.is_verbose() {
                let suggestions = e.recovery_suggestions();
                if !suggestions.is_empty() {
                    config.println("\nRecovery suggestions:");
                    for suggestion in suggestions {
                        config.indent(&suggestion);
                    }
                }
            }
            Ok(1)
        }
    }
}
