//! Command execution.
//!
//! Each command returns an exit code; errors are reported here together with
//! their recovery suggestions.

mod build;
mod combine;
mod validate;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::packager::BuildOutcome;

use build::execute_build;
use combine::execute_combine;
use validate::execute_validate;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Build { .. } => execute_build(&args, &config).await,
        Command::Validate { .. } => execute_validate(&args, &config).await,
        Command::Combine { .. } => execute_combine(&args, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {}", args.command.name(), e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {}", suggestion));
                }
            }

            Ok(1)
        }
    }
}

/// Prints a build outcome and returns the matching exit code.
pub(super) fn report_outcome(outcome: &BuildOutcome, config: &RuntimeConfig) -> i32 {
    match outcome {
        BuildOutcome::Finalized(package) => {
            config.success_println(&format!("Created {}", package.path.display()));
            config.indent(&format!("Size: {} bytes", package.size));
            config.indent(&format!("SHA256: {}", package.checksum));
            0
        }
        BuildOutcome::Failed { stage, reason } => {
            config.error_println(&format!("Packaging failed at stage '{}'\n{}", stage, reason));
            1
        }
    }
}
