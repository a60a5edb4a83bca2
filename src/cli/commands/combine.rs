//! Combine command implementation.

use super::report_outcome;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::packager::{DistributionMetadata, Packager, ProductArchiveRequest};
use anyhow::Context;
use std::path::Path;

/// Reads a markdown panel given on the command line.
async fn read_panel(flag: &str, path: Option<&Path>) -> anyhow::Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read --{} file {}", flag, path.display()))?;
    Ok(Some(text))
}

/// Execute combine command
pub(super) async fn execute_combine(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Combine {
        output,
        identifier,
        version,
        sign,
        title,
        welcome,
        readme,
        license,
        background,
        background_dark,
        packages,
    } = &args.command
    else {
        unreachable!("execute_combine called with non-Combine command");
    };

    let mut request = ProductArchiveRequest::new(packages.clone(), output);
    request.identifier = identifier.clone();
    request.version = version.clone();
    request.signing_identity = sign.clone();
    request.metadata = DistributionMetadata {
        title: title.clone(),
        welcome: read_panel("welcome", welcome.as_deref()).await?,
        readme: read_panel("readme", readme.as_deref()).await?,
        license: read_panel("license", license.as_deref()).await?,
        background: background.clone(),
        background_dark: background_dark.clone(),
    };

    config.section("Combining packages");
    for package in packages {
        config.indent(&package.display().to_string());
    }

    let outcome = Packager::new().build_product_archive(&request).await?;
    Ok(report_outcome(&outcome, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_panel() {
        let dir = tempfile::tempdir().unwrap();
        let license = dir.path().join("LICENSE.md");
        std::fs::write(&license, "MIT").unwrap();

        assert_eq!(read_panel("license", None).await.unwrap(), None);
        assert_eq!(
            read_panel("license", Some(&license)).await.unwrap().as_deref(),
            Some("MIT")
        );

        let err = read_panel("welcome", Some(&dir.path().join("missing.md")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--welcome"));
    }
}
