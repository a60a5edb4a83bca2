//! Product archives from existing flat packages.
//!
//! `productbuild` combines one or more component packages into a single
//! distribution package with an installer UI.

use super::{
    BuildOutcome,
    distribution::{DistributionElements, inject_elements},
    error::{Error, Result},
    pipeline::{Packager, Stage, failed},
    request::{DistributionMetadata, Violation, output_violation, signing_identity_violation},
    resources::prepare_resources,
    sign::sign_package,
    staging::StagingTree,
    tool::ToolInvocation,
    toolchain::{Tool, Toolchain},
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Description of a product archive built from existing packages.
#[derive(Clone, Debug, Default)]
pub struct ProductArchiveRequest {
    /// Flat packages to combine, in order
    pub inputs: Vec<PathBuf>,
    /// Where the product archive is written
    pub output: PathBuf,
    /// Product identifier passed to `productbuild --synthesize`
    pub identifier: Option<String>,
    /// Product version passed to `productbuild --synthesize`
    pub version: Option<String>,
    /// Signing identity
    pub signing_identity: Option<String>,
    /// Installer UI content
    pub metadata: DistributionMetadata,
}

impl ProductArchiveRequest {
    /// Creates a request for `inputs` written to `output`.
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            ..Default::default()
        }
    }

    /// Checks the request and returns every violation.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.inputs.is_empty() {
            violations.push(Violation::NoInputPackages);
        }
        violations.extend(output_violation(&self.output));
        violations.extend(signing_identity_violation(self.signing_identity.as_deref()));
        if self.identifier.as_deref().is_some_and(|id| id.trim().is_empty()) {
            violations.push(Violation::EmptyIdentifier);
        }
        if self.version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            violations.push(Violation::EmptyVersion);
        }
        violations
    }
}

/// `productbuild --synthesize` for the given packages.
#[track_caller]
pub(crate) fn synthesize_invocation(
    toolchain: &Toolchain,
    packages: &[&Path],
    identifier: Option<&str>,
    version: Option<&str>,
    descriptor: &Path,
) -> ToolInvocation {
    let mut invocation = ToolInvocation::new(toolchain.path(Tool::Productbuild)).arg("--synthesize");
    for package in packages {
        invocation = invocation.arg("--package").arg(package);
    }
    if let Some(identifier) = identifier {
        invocation = invocation.arg("--identifier").arg(identifier);
    }
    if let Some(version) = version {
        invocation = invocation.arg("--version").arg(version);
    }
    invocation.arg(descriptor)
}

/// `productbuild --distribution` writing the product archive to `output`.
#[track_caller]
pub(crate) fn product_invocation(
    toolchain: &Toolchain,
    descriptor: &Path,
    resources_dir: &Path,
    package_dirs: &[PathBuf],
    output: &Path,
) -> ToolInvocation {
    let mut invocation = ToolInvocation::new(toolchain.path(Tool::Productbuild))
        .arg("--distribution")
        .arg(descriptor)
        .arg("--resources")
        .arg(resources_dir);
    for dir in package_dirs {
        invocation = invocation.arg("--package-path").arg(dir);
    }
    invocation.arg(output)
}

/// Distinct parent directories of `inputs`, in first-seen order.
fn package_dirs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for input in inputs {
        let dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

impl Packager {
    /// Combines existing flat packages into one product archive.
    ///
    /// Tool failures and unknown signing identities yield
    /// [`BuildOutcome::Failed`]; invalid requests and missing packages are
    /// errors.
    pub async fn build_product_archive(&self, request: &ProductArchiveRequest) -> Result<BuildOutcome> {
        let violations = request.validate();
        if !violations.is_empty() {
            return Err(Error::InvalidRequest { violations });
        }
        if let Some(missing) = request.inputs.iter().find(|input| !input.is_file()) {
            return Err(Error::PackageNotFound(missing.clone()));
        }

        log::info!(
            "Combining {} package(s) into {}",
            request.inputs.len(),
            request.output.display()
        );

        fs::remove_file(&request.output).await?;
        let tree = StagingTree::new(&request.output).await?;
        let resources = prepare_resources(&request.metadata, &tree.resources_dir()).await?;

        let descriptor = tree.distribution_xml();
        let inputs: Vec<&Path> = request.inputs.iter().map(PathBuf::as_path).collect();
        let synthesize = synthesize_invocation(
            self.toolchain(),
            &inputs,
            request.identifier.as_deref(),
            request.version.as_deref(),
            &descriptor,
        );
        if let Err(failure) = synthesize.run().await? {
            return Ok(failed(Stage::DistributionConverted, failure.to_string()));
        }

        let elements = DistributionElements::from_resources(request.metadata.title.as_deref(), &resources);
        inject_elements(&descriptor, &elements).await?;

        let build = product_invocation(
            self.toolchain(),
            &descriptor,
            &tree.resources_dir(),
            &package_dirs(&request.inputs),
            tree.artifact(),
        );
        if let Err(failure) = build.run().await? {
            return Ok(failed(Stage::DistributionConverted, failure.to_string()));
        }
        log::info!("✓ Built product archive");

        if let Some(identity) = request.signing_identity.as_deref()
            && let Err(reason) = sign_package(tree.artifact(), identity, self.toolchain()).await?
        {
            return Ok(failed(Stage::Signed, reason));
        }

        let package = self.finalize(tree.artifact(), &request.output).await?;
        Ok(BuildOutcome::Finalized(package))
    }
}

/// Combines existing flat packages into one product archive using `toolchain`.
pub async fn build_product_archive(
    request: &ProductArchiveRequest,
    toolchain: &Toolchain,
) -> Result<BuildOutcome> {
    Packager::new()
        .with_toolchain(toolchain.clone())
        .build_product_archive(request)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(invocation: &ToolInvocation) -> Vec<String> {
        invocation
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_synthesize_arguments() {
        let invocation = synthesize_invocation(
            &Toolchain::new(),
            &[Path::new("/a/One.pkg"), Path::new("/b/Two.pkg")],
            Some("com.example.suite"),
            None,
            Path::new("/tmp/distribution.xml"),
        );
        assert_eq!(invocation.program(), Path::new("/usr/bin/productbuild"));
        assert_eq!(
            args_of(&invocation),
            vec![
                "--synthesize",
                "--package", "/a/One.pkg",
                "--package", "/b/Two.pkg",
                "--identifier", "com.example.suite",
                "/tmp/distribution.xml",
            ]
        );
    }

    #[test]
    fn test_product_arguments() {
        let invocation = product_invocation(
            &Toolchain::new(),
            Path::new("/tmp/distribution.xml"),
            Path::new("/tmp/resources"),
            &[PathBuf::from("/a"), PathBuf::from("/b")],
            Path::new("/tmp/Out.pkg.product"),
        );
        assert_eq!(
            args_of(&invocation),
            vec![
                "--distribution", "/tmp/distribution.xml",
                "--resources", "/tmp/resources",
                "--package-path", "/a",
                "--package-path", "/b",
                "/tmp/Out.pkg.product",
            ]
        );
    }

    #[test]
    fn test_package_dirs_are_deduplicated() {
        let dirs = package_dirs(&[
            PathBuf::from("/a/One.pkg"),
            PathBuf::from("/a/Two.pkg"),
            PathBuf::from("Three.pkg"),
        ]);
        assert_eq!(dirs, vec![PathBuf::from("/a"), PathBuf::from(".")]);
    }

    #[test]
    fn test_empty_inputs_are_invalid() {
        let request = ProductArchiveRequest::new(Vec::new(), "Out.pkg");
        assert_eq!(request.validate(), vec![Violation::NoInputPackages]);
    }

    #[test]
    fn test_blank_identity_and_directory_output_are_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = ProductArchiveRequest::new(vec![PathBuf::from("One.pkg")], dir.path());
        request.signing_identity = Some(String::new());
        assert_eq!(
            request.validate(),
            vec![
                Violation::OutputIsDirectory {
                    output: dir.path().to_path_buf()
                },
                Violation::EmptySigningIdentity,
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_input_package() {
        let request = ProductArchiveRequest::new(vec![PathBuf::from("/no/such/One.pkg")], "Out.pkg");
        let err = build_product_archive(&request, &Toolchain::new()).await.unwrap_err();
        assert!(matches!(err, Error::PackageNotFound(p) if p == Path::new("/no/such/One.pkg")));
    }
}
