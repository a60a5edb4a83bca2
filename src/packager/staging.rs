//! Staging tree assembly.
//!
//! Every build owns one scratch directory laid out as:
//!
//! ```text
//! pkg-builder-XXXXXX/
//! ├── build/             payload root handed to pkgbuild --root
//! ├── scripts/           lifecycle scripts (only when any are staged)
//! ├── resources/         installer UI panels and backgrounds
//! ├── component.plist    relocation control (optional)
//! ├── distribution.xml   synthesized distribution descriptor (optional)
//! └── <output name>      working artifact
//! ```
//!
//! The directory is removed when the tree is dropped.

use super::error::{Context, Error, Result};
use super::request::LifecycleScripts;
use super::tool::ToolInvocation;
use super::toolchain::{Tool, Toolchain};
use super::utils::{clone::ClonePolicy, fs};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory for one build.
#[derive(Debug)]
pub(crate) struct StagingTree {
    dir: TempDir,
    artifact: PathBuf,
}

impl StagingTree {
    /// Creates the scratch directory and its `build/` zone.
    ///
    /// The working artifact takes the file name of `output`.
    pub(crate) async fn new(output: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pkg-builder-")
            .tempdir()
            .map_err(|e| {
                Error::GenericError(format!(
                    "Failed to create temporary directory for package staging: {}",
                    e
                ))
            })?;

        let artifact_name = output
            .file_name()
            .with_context(|| format!("Invalid output path: {}", output.display()))?;
        let artifact = dir.path().join(artifact_name);

        let tree = Self { dir, artifact };
        fs::create_dir_all(&tree.build_root(), false).await?;
        log::debug!("Staging tree: {}", tree.root().display());
        Ok(tree)
    }

    /// Scratch directory root.
    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Payload root.
    pub(crate) fn build_root(&self) -> PathBuf {
        self.root().join("build")
    }

    /// Lifecycle scripts zone.
    pub(crate) fn scripts_dir(&self) -> PathBuf {
        self.root().join("scripts")
    }

    /// Installer UI resources zone.
    pub(crate) fn resources_dir(&self) -> PathBuf {
        self.root().join("resources")
    }

    /// Working artifact path.
    pub(crate) fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Component property list path.
    pub(crate) fn component_plist(&self) -> PathBuf {
        self.root().join("component.plist")
    }

    /// Distribution descriptor path.
    pub(crate) fn distribution_xml(&self) -> PathBuf {
        self.root().join("distribution.xml")
    }
}

/// Maps an absolute payload destination under `build_root`.
pub(crate) fn payload_path(build_root: &Path, destination: &Path) -> Result<PathBuf> {
    let relative = if destination.is_absolute() {
        destination.strip_prefix("/")?
    } else {
        destination
    };
    Ok(build_root.join(relative))
}

/// Copies `source` to `target`, cloning when the policy allows it.
///
/// A failed clone falls back to the native copy.
pub(crate) async fn clone_or_copy(
    source: &Path,
    target: &Path,
    policy: &dyn ClonePolicy,
    toolchain: &Toolchain,
) -> Result<()> {
    let parent = target
        .parent()
        .with_context(|| format!("Invalid copy destination: {}", target.display()))?;
    fs::create_dir_all(parent, false).await?;

    if policy.can_clone(source, parent) {
        let mut invocation = ToolInvocation::new(toolchain.path(Tool::Copy)).arg("-c");
        if source.is_dir() {
            invocation = invocation.arg("-R");
        }
        match invocation.arg(source).arg(target).run().await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(failure)) => log::warn!(
                "Clone copy of {} failed (exit {:?}), falling back to a native copy",
                source.display(),
                failure.code
            ),
            Err(e) => log::warn!(
                "Clone copy of {} could not start ({}), falling back to a native copy",
                source.display(),
                e
            ),
        }
        fs::remove_path(target).await?;
    }

    fs::copy_path(source, target).await
}

/// Copies every mapped source into the payload root, in mapping order.
pub(crate) async fn stage_files(
    mapping: &[(PathBuf, PathBuf)],
    build_root: &Path,
    policy: &dyn ClonePolicy,
    toolchain: &Toolchain,
) -> Result<()> {
    for (source, destination) in mapping {
        if !source.exists() {
            return Err(Error::SourceNotFound(source.clone()));
        }

        let target = payload_path(build_root, destination)?;
        log::debug!("Staging {} -> {}", source.display(), target.display());
        clone_or_copy(source, &target, policy, toolchain)
            .await
            .with_context(|| format!("staging {}", source.display()))?;
    }

    if !mapping.is_empty() {
        log::info!("✓ Staged {} payload item(s)", mapping.len());
    }
    Ok(())
}

/// Copies lifecycle scripts and their auxiliary resources into `scripts_dir`.
///
/// Scripts take their canonical names; resources keep their file names. All
/// staged files are made executable. The directory is created only when
/// something is staged. Returns whether the directory was populated.
pub(crate) async fn stage_scripts(
    scripts: &LifecycleScripts,
    resources: &[PathBuf],
    scripts_dir: &Path,
) -> Result<bool> {
    let mut staged = 0usize;

    for (slot, path) in scripts.iter() {
        if !path.exists() {
            return Err(Error::ScriptNotFound {
                script: slot.file_name(),
                path: path.to_path_buf(),
            });
        }

        let target = scripts_dir.join(slot.file_name());
        if target.exists() {
            return Err(Error::ScriptAlreadyExists(target));
        }

        fs::create_dir_all(scripts_dir, false).await?;
        fs::copy_file(path, &target).await?;
        fs::set_executable(&target).await?;
        log::debug!("Staged {} script from {}", slot, path.display());
        staged += 1;
    }

    for resource in resources {
        if !resource.exists() {
            return Err(Error::ScriptResourceNotFound(resource.clone()));
        }

        let name = resource
            .file_name()
            .with_context(|| format!("Invalid script resource path: {}", resource.display()))?;
        let target = scripts_dir.join(name);
        if target.exists() {
            return Err(Error::ScriptAlreadyExists(target));
        }

        fs::create_dir_all(scripts_dir, false).await?;
        fs::copy_path(resource, &target).await?;
        fs::set_executable(&target).await?;
        log::debug!("Staged script resource {}", resource.display());
        staged += 1;
    }

    if staged > 0 {
        log::info!("✓ Staged {} script file(s)", staged);
    }
    Ok(staged > 0)
}
