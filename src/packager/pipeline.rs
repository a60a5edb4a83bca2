//! Package build orchestration.
//!
//! [`Packager`] runs one [`PackageRequest`] through the stages below, awaiting
//! each external tool before starting the next:
//!
//! 1. Validate the request
//! 2. Stage scripts, payload files and (distribution only) installer resources
//! 3. Emit a component property list when relocation is disallowed
//! 4. `pkgbuild` the flat package
//! 5. Sign it when an identity is configured
//! 6. Convert it into a distribution when requested, then sign again
//! 7. Copy the finished package to the output path and checksum it

use super::{
    BuildOutcome, BuiltPackage,
    checksum::calculate_sha256,
    component::{find_relocatable_bundle, write_component_plist},
    distribution::{DistributionElements, inject_elements},
    error::{Error, ErrorExt, Result},
    product::{product_invocation, synthesize_invocation},
    request::PackageRequest,
    resources::{PreparedResources, prepare_resources},
    sign::sign_package,
    staging::{StagingTree, clone_or_copy, stage_files, stage_scripts},
    tool::ToolInvocation,
    toolchain::{Tool, Toolchain},
    utils::{
        clone::{ClonePolicy, VolumeProbe},
        fs,
    },
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build stages, in execution order.
///
/// A failed build reports the stage it was attempting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Request validated, staging tree created
    Init,
    /// Lifecycle scripts copied
    ScriptsStaged,
    /// Payload files copied
    FilesStaged,
    /// Installer panels and backgrounds prepared
    ResourcesStaged,
    /// Component property list written
    ComponentDescriptorEmitted,
    /// `pkgbuild` produced the flat package
    FlatPackageBuilt,
    /// Flat package signed
    Signed,
    /// Flat package converted into a product archive
    DistributionConverted,
    /// Product archive signed
    ReSigned,
    /// Package copied to its output path
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ScriptsStaged => "script staging",
            Stage::FilesStaged => "file staging",
            Stage::ResourcesStaged => "resource staging",
            Stage::ComponentDescriptorEmitted => "component descriptor",
            Stage::FlatPackageBuilt => "flat package build",
            Stage::Signed => "signing",
            Stage::DistributionConverted => "distribution conversion",
            Stage::ReSigned => "distribution signing",
            Stage::Finalized => "finalize",
        };
        f.write_str(name)
    }
}

/// Drives the packaging tools for one request at a time.
///
/// A `Packager` holds no per-build state; concurrent builds with distinct
/// output paths are independent.
#[derive(Clone)]
pub struct Packager {
    toolchain: Toolchain,
    clone_policy: Arc<dyn ClonePolicy>,
}

impl fmt::Debug for Packager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packager")
            .field("toolchain", &self.toolchain)
            .field("clone_policy", &"<dyn ClonePolicy>")
            .finish()
    }
}

impl Default for Packager {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::default(),
            clone_policy: Arc::new(VolumeProbe),
        }
    }
}

impl Packager {
    /// Creates a packager using the system tools and the volume clone probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tool paths.
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Replaces the clone capability probe.
    pub fn with_clone_policy(mut self, policy: impl ClonePolicy + 'static) -> Self {
        self.clone_policy = Arc::new(policy);
        self
    }

    /// Tool paths in use.
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Builds the package described by `request`.
    ///
    /// Returns `Err` for invalid requests, missing inputs and filesystem
    /// errors. A failing external tool or an unknown signing identity yields
    /// [`BuildOutcome::Failed`].
    pub async fn build(&self, request: &PackageRequest) -> Result<BuildOutcome> {
        let violations = request.validate();
        if !violations.is_empty() {
            return Err(Error::InvalidRequest { violations });
        }

        log::info!(
            "Building package {} ({} {})",
            request.output().display(),
            request.identifier(),
            request.version()
        );

        fs::remove_file(request.output()).await?;
        let tree = StagingTree::new(request.output()).await?;

        let has_scripts = stage_scripts(
            request.scripts(),
            request.script_resources(),
            &tree.scripts_dir(),
        )
        .await?;
        log::debug!("Stage complete: {}", Stage::ScriptsStaged);

        stage_files(
            request.file_structure(),
            &tree.build_root(),
            self.clone_policy.as_ref(),
            &self.toolchain,
        )
        .await?;
        log::debug!("Stage complete: {}", Stage::FilesStaged);

        let resources = if request.as_distribution() {
            let prepared = prepare_resources(request.distribution(), &tree.resources_dir()).await?;
            log::debug!("Stage complete: {}", Stage::ResourcesStaged);
            Some(prepared)
        } else {
            None
        };

        let component_plist = if request.has_payload() && !request.allow_relocation() {
            let bundle = find_relocatable_bundle(request.file_structure())?;
            let path = tree.component_plist();
            write_component_plist(&path, bundle, request.allow_relocation())?;
            log::debug!("Stage complete: {}", Stage::ComponentDescriptorEmitted);
            Some(path)
        } else {
            None
        };

        let pkgbuild = self.pkgbuild_invocation(request, &tree, has_scripts, component_plist.as_deref());
        if let Err(failure) = pkgbuild.run().await? {
            return Ok(failed(Stage::FlatPackageBuilt, failure.to_string()));
        }
        log::info!("✓ Built flat package");

        if let Some(identity) = request.signing_identity()
            && let Err(reason) = sign_package(tree.artifact(), identity, &self.toolchain).await?
        {
            return Ok(failed(Stage::Signed, reason));
        }

        if let Some(resources) = resources {
            if let Some(outcome) = self.convert_to_distribution(request, &tree, &resources).await? {
                return Ok(outcome);
            }

            if let Some(identity) = request.signing_identity()
                && let Err(reason) = sign_package(tree.artifact(), identity, &self.toolchain).await?
            {
                return Ok(failed(Stage::ReSigned, reason));
            }
        }

        let package = self.finalize(tree.artifact(), request.output()).await?;
        Ok(BuildOutcome::Finalized(package))
    }

    /// Builds the `pkgbuild` invocation for a staged request.
    #[track_caller]
    fn pkgbuild_invocation(
        &self,
        request: &PackageRequest,
        tree: &StagingTree,
        has_scripts: bool,
        component_plist: Option<&Path>,
    ) -> ToolInvocation {
        let mut invocation = ToolInvocation::new(self.toolchain.path(Tool::Pkgbuild))
            .arg("--identifier")
            .arg(request.identifier())
            .arg("--version")
            .arg(request.version())
            .arg("--root")
            .arg(tree.build_root());

        if has_scripts {
            invocation = invocation.arg("--scripts").arg(tree.scripts_dir());
        }

        if request.has_payload() {
            invocation = invocation
                .arg("--install-location")
                .arg(request.install_location());
            if let Some(plist) = component_plist {
                invocation = invocation.arg("--component-plist").arg(plist);
            }
        } else {
            invocation = invocation.arg("--nopayload");
        }

        invocation.arg(tree.artifact())
    }

    /// Replaces the flat package in the staging tree with a product archive.
    ///
    /// Returns `Some(outcome)` when a tool fails.
    async fn convert_to_distribution(
        &self,
        request: &PackageRequest,
        tree: &StagingTree,
        resources: &PreparedResources,
    ) -> Result<Option<BuildOutcome>> {
        let descriptor = tree.distribution_xml();
        let synthesize = synthesize_invocation(
            &self.toolchain,
            &[tree.artifact()],
            Some(request.identifier()),
            Some(request.version()),
            &descriptor,
        );
        if let Err(failure) = synthesize.run().await? {
            return Ok(Some(failed(Stage::DistributionConverted, failure.to_string())));
        }

        let elements = DistributionElements::from_resources(request.distribution().title.as_deref(), resources);
        inject_elements(&descriptor, &elements).await?;

        let product = fs::with_suffix(tree.artifact(), ".product");
        let package_dirs = vec![tree.root().to_path_buf()];
        let build = product_invocation(
            &self.toolchain,
            &descriptor,
            &tree.resources_dir(),
            &package_dirs,
            &product,
        );
        if let Err(failure) = build.run().await? {
            return Ok(Some(failed(Stage::DistributionConverted, failure.to_string())));
        }

        fs::replace_file(tree.artifact(), &product).await?;
        log::info!("✓ Converted to distribution package");
        Ok(None)
    }

    /// Copies a finished artifact to `output` and describes it.
    pub(crate) async fn finalize(&self, artifact: &Path, output: &Path) -> Result<BuiltPackage> {
        clone_or_copy(artifact, output, self.clone_policy.as_ref(), &self.toolchain).await?;

        let size = tokio::fs::metadata(output)
            .await
            .fs_context("reading artifact metadata", output)?
            .len();
        let checksum = calculate_sha256(output).await?;

        log::info!("✓ Package built: {} ({} bytes)", output.display(), size);
        Ok(BuiltPackage {
            path: PathBuf::from(output),
            size,
            checksum,
        })
    }
}

pub(crate) fn failed(stage: Stage, reason: String) -> BuildOutcome {
    log::error!("Package build failed during {}", stage);
    BuildOutcome::Failed { stage, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packager::request::{PackageRequestBuilder, Violation};
    use std::ffi::OsString;

    fn args_of(invocation: &ToolInvocation) -> Vec<String> {
        invocation
            .arguments()
            .iter()
            .map(|a: &OsString| a.to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_payload_only_arguments() {
        let request = PackageRequestBuilder::new("com.example.app", "/out/App.pkg")
            .file("App.app", "/Applications/App.app")
            .install_location("/")
            .build();
        let tree = StagingTree::new(request.output()).await.unwrap();
        let args = args_of(&Packager::new().pkgbuild_invocation(&request, &tree, false, None));

        let root = tree.build_root().to_string_lossy().into_owned();
        let artifact = tree.artifact().to_string_lossy().into_owned();
        assert_eq!(
            args,
            vec![
                "--identifier", "com.example.app",
                "--version", "1.0.0",
                "--root", root.as_str(),
                "--install-location", "/",
                artifact.as_str(),
            ]
        );
    }

    #[tokio::test]
    async fn test_scripts_only_arguments_use_nopayload() {
        let request = PackageRequestBuilder::new("com.example.app", "/out/App.pkg")
            .postinstall("post.sh")
            .build();
        let tree = StagingTree::new(request.output()).await.unwrap();
        let args = args_of(&Packager::new().pkgbuild_invocation(&request, &tree, true, None));

        let scripts = tree.scripts_dir().to_string_lossy().into_owned();
        assert!(args.windows(2).any(|w| w[0] == "--scripts" && w[1] == scripts));
        assert!(args.contains(&"--nopayload".to_string()));
        assert!(!args.contains(&"--install-location".to_string()));
        assert!(!args.contains(&"--component-plist".to_string()));
    }

    #[tokio::test]
    async fn test_component_plist_argument_follows_install_location() {
        let request = PackageRequestBuilder::new("com.example.app", "/out/App.pkg")
            .file("App.app", "/Applications/App.app")
            .allow_relocation(false)
            .build();
        let tree = StagingTree::new(request.output()).await.unwrap();
        let plist = tree.component_plist();
        let args = args_of(&Packager::new().pkgbuild_invocation(&request, &tree, false, Some(&plist)));

        let position = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert!(position("--install-location") < position("--component-plist"));
        assert_eq!(args[position("--component-plist") + 1], plist.to_string_lossy());
    }

    #[tokio::test]
    async fn test_invalid_request_runs_nothing() {
        let missing_tools = Toolchain::new()
            .with_tool(Tool::Pkgbuild, "/definitely/not/pkgbuild");
        let request = PackageRequestBuilder::new("com.example.app", "/out/App.pkg").build();

        let err = Packager::new()
            .with_toolchain(missing_tools)
            .build(&request)
            .await
            .unwrap_err();
        match err {
            Error::InvalidRequest { violations } => {
                assert_eq!(violations, vec![Violation::MissingPayloadAndScripts]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Signed.to_string(), "signing");
        assert_eq!(Stage::FlatPackageBuilt.to_string(), "flat package build");
    }
}
