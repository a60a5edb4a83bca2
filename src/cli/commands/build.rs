//! Build command implementation.

use super::report_outcome;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{CliError, Result};
use crate::manifest::PackageManifest;
use crate::packager::{self, PackageRequest, Packager, Tool, Toolchain};

/// Tools a request cannot be built without. `cp` is optional since staging
/// falls back to a native copy.
pub(super) fn required_tools(request: &PackageRequest) -> Vec<Tool> {
    let mut tools = vec![Tool::Pkgbuild];
    if request.as_distribution() {
        tools.push(Tool::Productbuild);
    }
    if request.signing_identity().is_some() {
        tools.push(Tool::Security);
        tools.push(Tool::Productsign);
    }
    tools
}

/// Required tools that cannot be found.
pub(super) fn missing_required(toolchain: &Toolchain, required: &[Tool]) -> Vec<Tool> {
    toolchain
        .missing_tools()
        .into_iter()
        .filter(|tool| required.contains(tool))
        .collect()
}

/// Execute build command
pub(super) async fn execute_build(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Build {
        manifest,
        output,
        sign,
    } = &args.command
    else {
        unreachable!("execute_build called with non-Build command");
    };

    config.verbose_println(&format!("Loading manifest {}", manifest.display()));
    let manifest = PackageManifest::load(manifest).await?;
    let request = manifest
        .to_request(output.as_deref(), sign.as_deref())
        .await?;
    let toolchain = manifest.toolchain()?;

    let violations = request.validate();
    if !violations.is_empty() {
        return Err(packager::Error::InvalidRequest { violations }.into());
    }

    let missing = missing_required(&toolchain, &required_tools(&request));
    if !missing.is_empty() {
        return Err(CliError::MissingTools { tools: missing }.into());
    }

    config.section(&format!("Packaging {} {}", request.identifier(), request.version()));
    config.info_println(&format!("Output: {}", request.output().display()));
    if request.has_payload() {
        config.verbose_println(&format!(
            "{} payload item(s) into {}",
            request.file_structure().len(),
            request.install_location()
        ));
    } else {
        config.verbose_println("Scripts-only package (no payload)");
    }
    if request.as_distribution() {
        config.verbose_println("Converting to a distribution package");
    }
    if let Some(identity) = request.signing_identity() {
        config.verbose_println(&format!("Signing as '{}'", identity));
    }

    let outcome = Packager::new().with_toolchain(toolchain).build(&request).await?;
    Ok(report_outcome(&outcome, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_tools_follow_request() {
        let flat = crate::packager::PackageRequestBuilder::new("com.example", "/tmp/a.pkg")
            .file("/tmp/src", "/opt/src")
            .build();
        assert_eq!(required_tools(&flat), vec![Tool::Pkgbuild]);

        let signed_dist = crate::packager::PackageRequestBuilder::new("com.example", "/tmp/a.pkg")
            .file("/tmp/src", "/opt/src")
            .as_distribution(true)
            .signing_identity("Installer: Me")
            .build();
        assert_eq!(
            required_tools(&signed_dist),
            vec![Tool::Pkgbuild, Tool::Productbuild, Tool::Security, Tool::Productsign]
        );
    }

    #[test]
    fn test_missing_required_ignores_optional_tools() {
        let toolchain = Toolchain::new()
            .with_tool(Tool::Pkgbuild, "/no/such/pkgbuild")
            .with_tool(Tool::Copy, "/no/such/cp");
        assert_eq!(missing_required(&toolchain, &[Tool::Pkgbuild]), vec![Tool::Pkgbuild]);
    }
}
