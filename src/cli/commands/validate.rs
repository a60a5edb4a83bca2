//! Validate command implementation.
//!
//! Loads a manifest, checks the resulting request and looks up the tools it
//! needs. Nothing is staged or built.

use super::build::{missing_required, required_tools};
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{PkgError, Result};
use crate::manifest::PackageManifest;
use crate::packager::Violation;
use serde::Serialize;
use std::path::PathBuf;

/// Machine readable validation result
#[derive(Debug, Serialize)]
pub(super) struct ValidationReport {
    pub manifest: PathBuf,
    pub identifier: String,
    pub version: String,
    pub output: PathBuf,
    pub distribution: bool,
    pub signed: bool,
    pub violations: Vec<Violation>,
    pub missing_tools: Vec<&'static str>,
    pub valid: bool,
}

/// Execute validate command
pub(super) async fn execute_validate(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Validate { manifest: path, json } = &args.command else {
        unreachable!("execute_validate called with non-Validate command");
    };

    let manifest = PackageManifest::load(path).await?;
    let request = manifest.to_request(None, None).await?;
    let toolchain = manifest.toolchain()?;

    let violations = request.validate();
    let missing_tools = missing_required(&toolchain, &required_tools(&request))
        .into_iter()
        .map(|tool| tool.name())
        .collect();

    let report = ValidationReport {
        manifest: path.clone(),
        identifier: request.identifier().to_string(),
        version: request.version().to_string(),
        output: request.output().to_path_buf(),
        distribution: request.as_distribution(),
        signed: request.signing_identity().is_some(),
        valid: violations.is_empty(),
        violations,
        missing_tools,
    };

    if *json {
        let json_output = serde_json::to_string_pretty(&report).map_err(PkgError::Json)?;
        println!("{}", json_output);
    } else {
        config.println(&format!(
            "📋 {} {} → {}",
            report.identifier,
            report.version,
            report.output.display()
        ));

        if !report.missing_tools.is_empty() {
            config.println("\n⚠️ Warnings:");
            config.warning_println(&format!(
                "  • Required tools not found: {}",
                report.missing_tools.join(", ")
            ));
        }

        if report.valid {
            config.success_println("Manifest is valid");
        } else {
            config.println("\n❌ Violations:");
            for violation in &report.violations {
                config.error_println(&format!("  • {}", violation));
            }
        }
    }

    Ok(if report.valid { 0 } else { 1 })
}
