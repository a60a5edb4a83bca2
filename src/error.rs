//! Error types for kodegen_bundler_pkg operations.
//!
//! This module defines the top-level error types with actionable error messages
//! and recovery suggestions. Packaging errors live in [`crate::packager::error`].

use crate::packager::{self, Tool, Violation};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kodegen_bundler_pkg operations
pub type Result<T> = std::result::Result<T, PkgError>;

/// Main error type for all kodegen_bundler_pkg operations
#[derive(Error, Debug)]
pub enum PkgError {
    /// Packaging errors
    #[error("Packager error: {0}")]
    Packager(#[from] packager::Error),

    /// Package manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Package manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("Manifest not found at {path}")]
    NotFound {
        /// Path where the manifest was expected
        path: PathBuf,
    },

    /// Manifest could not be read
    #[error("Failed to read manifest {path}: {source}")]
    ReadFailed {
        /// Manifest path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid TOML or has unknown fields
    #[error("Failed to parse manifest {path}: {source}")]
    ParseFailed {
        /// Manifest path
        path: PathBuf,
        /// Parsing error
        #[source]
        source: toml::de::Error,
    },

    /// A path in the manifest could not be resolved
    #[error("Invalid path '{value}' in manifest field '{field}': {reason}")]
    InvalidPath {
        /// Manifest field
        field: String,
        /// Raw value
        value: String,
        /// Reason for the error
        reason: String,
    },

    /// A markdown panel file could not be read
    #[error("Failed to read {field} file {path}: {source}")]
    PanelReadFailed {
        /// Manifest field
        field: String,
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Required packaging tools are unavailable
    #[error("Required tools not found: {}", format_tools(.tools))]
    MissingTools {
        /// Tools that could not be found
        tools: Vec<Tool>,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

fn format_tools(tools: &[Tool]) -> String {
    tools
        .iter()
        .map(Tool::name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PkgError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PkgError::Packager(packager::Error::InvalidRequest { violations }) => violations
                .iter()
                .map(|violation| match violation {
                    Violation::MissingPayloadAndScripts => {
                        "Add a [[files]] entry or a preinstall/postinstall script".to_string()
                    }
                    Violation::DistributionFieldsWithoutDistribution { .. } => {
                        "Set enabled = true in [distribution] to use title, panels and backgrounds".to_string()
                    }
                    Violation::RelativeDestination { destination } => format!(
                        "Use an absolute install path such as /{}",
                        destination.display()
                    ),
                    other => format!("Fix: {}", other),
                })
                .collect(),
            PkgError::Packager(packager::Error::NoBundleFound) => vec![
                "Map an application bundle (a directory with Contents/Info.plist)".to_string(),
                "Or set allow_relocation = true".to_string(),
            ],
            PkgError::Packager(packager::Error::CommandFailed { .. }) => vec![
                "Install the Xcode command line tools: xcode-select --install".to_string(),
                "Override tool locations in the manifest [tools] table".to_string(),
            ],
            PkgError::Cli(CliError::MissingTools { .. }) => vec![
                "Packaging requires macOS with pkgbuild and productbuild available".to_string(),
                "Override tool locations in the manifest [tools] table".to_string(),
            ],
            PkgError::Manifest(ManifestError::NotFound { path }) => vec![format!(
                "Create a package manifest at {}",
                path.display()
            )],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_suggestions_follow_violations() {
        let err = PkgError::from(packager::Error::InvalidRequest {
            violations: vec![Violation::MissingPayloadAndScripts, Violation::EmptyVersion],
        });
        let suggestions = err.recovery_suggestions();
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].contains("preinstall/postinstall"));
        assert!(suggestions[1].contains("version"));
    }

    #[test]
    fn test_missing_tools_message() {
        let err = CliError::MissingTools {
            tools: vec![Tool::Pkgbuild, Tool::Productsign],
        };
        assert_eq!(err.to_string(), "Required tools not found: pkgbuild, productsign");
    }
}
