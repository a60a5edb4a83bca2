//! Package manifests.
//!
//! A manifest is a TOML file describing one package build. Relative paths are
//! resolved against the directory holding the manifest.
//!
//! ```toml
//! identifier = "com.myapp.installer"
//! version = "1.0.0"
//! output = "dist/MyApp.pkg"
//! allow_relocation = false
//!
//! [[files]]
//! source = "build/MyApp.app"
//! destination = "/Applications/MyApp.app"
//!
//! [scripts]
//! preinstall = "scripts/preinstall.sh"
//! postinstall = "scripts/postinstall.sh"
//! resources = ["scripts/helper.py"]
//!
//! [distribution]
//! enabled = true
//! title = "MyApp"
//! welcome = "# Welcome\n\nThanks for installing MyApp."
//! license = { file = "LICENSE.md" }
//! background = "art/background.png"
//!
//! [tools]
//! pkgbuild = "/usr/bin/pkgbuild"
//! ```

use crate::error::ManifestError;
use crate::packager::{
    DEFAULT_VERSION, DistributionMetadata, LifecycleScripts, PackageRequest,
    PackageRequestBuilder, Tool, Toolchain,
};
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, ManifestError>;

/// One payload entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileMapping {
    /// File or directory to copy, relative to the manifest
    pub source: PathBuf,
    /// Absolute install path inside the payload
    pub destination: PathBuf,
}

/// `[scripts]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsSection {
    /// Preinstall script
    pub preinstall: Option<PathBuf>,
    /// Preflight script
    pub preflight: Option<PathBuf>,
    /// Postinstall script
    pub postinstall: Option<PathBuf>,
    /// Postflight script
    pub postflight: Option<PathBuf>,
    /// Auxiliary files staged next to the scripts
    #[serde(default)]
    pub resources: Vec<PathBuf>,
}

/// Markdown panel content: inline text or a file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PanelSource {
    /// Inline markdown
    Text(String),
    /// Markdown file, relative to the manifest
    File {
        /// File path
        file: PathBuf,
    },
}

/// `[distribution]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistributionSection {
    /// Convert the flat package into a distribution
    #[serde(default)]
    pub enabled: bool,
    /// Installer title
    pub title: Option<String>,
    /// Welcome panel
    pub welcome: Option<PanelSource>,
    /// Read Me panel
    pub readme: Option<PanelSource>,
    /// License panel
    pub license: Option<PanelSource>,
    /// Light background image
    pub background: Option<PathBuf>,
    /// Dark background image
    pub background_dark: Option<PathBuf>,
}

/// `[tools]` table overriding tool locations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    /// pkgbuild path
    pub pkgbuild: Option<PathBuf>,
    /// productbuild path
    pub productbuild: Option<PathBuf>,
    /// productsign path
    pub productsign: Option<PathBuf>,
    /// security path
    pub security: Option<PathBuf>,
    /// cp path
    pub cp: Option<PathBuf>,
}

/// A parsed package manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManifest {
    /// Package identifier
    pub identifier: String,
    /// Package version
    #[serde(default = "default_version")]
    pub version: String,
    /// Output package path
    pub output: PathBuf,
    /// Install location
    pub install_location: Option<String>,
    /// Allow relocation of the embedded bundle
    pub allow_relocation: Option<bool>,
    /// Signing identity
    pub signing_identity: Option<String>,
    /// Payload entries, in copy order
    #[serde(default)]
    pub files: Vec<FileMapping>,
    /// Lifecycle scripts
    #[serde(default)]
    pub scripts: ScriptsSection,
    /// Distribution settings
    #[serde(default)]
    pub distribution: DistributionSection,
    /// Tool path overrides
    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl PackageManifest {
    /// Reads and parses a manifest file.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path
            .absolutize()
            .map_err(|source| ManifestError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self::parse(&text, base_dir).map_err(|source| ManifestError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses manifest text; relative paths resolve against `base_dir`.
    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> std::result::Result<Self, toml::de::Error> {
        let mut manifest: Self = toml::from_str(text)?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    /// Directory relative paths resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, field: &str, path: &Path) -> Result<PathBuf> {
        path.absolutize_from(&self.base_dir)
            .map(|p| p.into_owned())
            .map_err(|e| ManifestError::InvalidPath {
                field: field.to_string(),
                value: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn resolve_opt(&self, field: &str, path: Option<&PathBuf>) -> Result<Option<PathBuf>> {
        path.map(|p| self.resolve(field, p)).transpose()
    }

    async fn panel_text(&self, field: &str, source: Option<&PanelSource>) -> Result<Option<String>> {
        match source {
            None => Ok(None),
            Some(PanelSource::Text(text)) => Ok(Some(text.clone())),
            Some(PanelSource::File { file }) => {
                let path = self.resolve(field, file)?;
                let text = tokio::fs::read_to_string(&path).await.map_err(|source| {
                    ManifestError::PanelReadFailed {
                        field: field.to_string(),
                        path,
                        source,
                    }
                })?;
                Ok(Some(text))
            }
        }
    }

    /// Builds the package request, resolving paths and reading panel files.
    ///
    /// `output` and `signing_identity` override the manifest values.
    pub async fn to_request(
        &self,
        output: Option<&Path>,
        signing_identity: Option<&str>,
    ) -> Result<PackageRequest> {
        let output = match output {
            Some(path) => path
                .absolutize()
                .map(|p| p.into_owned())
                .map_err(|e| ManifestError::InvalidPath {
                    field: "output".to_string(),
                    value: path.display().to_string(),
                    reason: e.to_string(),
                })?,
            None => self.resolve("output", &self.output)?,
        };

        let mut builder = PackageRequestBuilder::new(self.identifier.clone(), &output)
            .version(self.version.clone());

        if let Some(location) = &self.install_location {
            builder = builder.install_location(location.clone());
        }
        if let Some(allow) = self.allow_relocation {
            builder = builder.allow_relocation(allow);
        }

        let mut mapping = Vec::with_capacity(self.files.len());
        for entry in &self.files {
            mapping.push((
                self.resolve("files.source", &entry.source)?,
                entry.destination.clone(),
            ));
        }
        builder = builder.file_structure(mapping);

        builder = builder.scripts(LifecycleScripts {
            preinstall: self.resolve_opt("scripts.preinstall", self.scripts.preinstall.as_ref())?,
            preflight: self.resolve_opt("scripts.preflight", self.scripts.preflight.as_ref())?,
            postinstall: self.resolve_opt("scripts.postinstall", self.scripts.postinstall.as_ref())?,
            postflight: self.resolve_opt("scripts.postflight", self.scripts.postflight.as_ref())?,
        });
        for resource in &self.scripts.resources {
            builder = builder.script_resource(self.resolve("scripts.resources", resource)?);
        }

        if let Some(identity) = signing_identity.or(self.signing_identity.as_deref()) {
            builder = builder.signing_identity(identity);
        }

        let section = &self.distribution;
        let metadata = DistributionMetadata {
            title: section.title.clone(),
            welcome: self.panel_text("distribution.welcome", section.welcome.as_ref()).await?,
            readme: self.panel_text("distribution.readme", section.readme.as_ref()).await?,
            license: self.panel_text("distribution.license", section.license.as_ref()).await?,
            background: self.resolve_opt("distribution.background", section.background.as_ref())?,
            background_dark: self
                .resolve_opt("distribution.background_dark", section.background_dark.as_ref())?,
        };

        Ok(builder
            .as_distribution(section.enabled)
            .distribution(metadata)
            .build())
    }

    /// Tool paths with the `[tools]` overrides applied.
    pub fn toolchain(&self) -> Result<Toolchain> {
        let overrides = [
            (Tool::Pkgbuild, "tools.pkgbuild", &self.tools.pkgbuild),
            (Tool::Productbuild, "tools.productbuild", &self.tools.productbuild),
            (Tool::Productsign, "tools.productsign", &self.tools.productsign),
            (Tool::Security, "tools.security", &self.tools.security),
            (Tool::Copy, "tools.cp", &self.tools.cp),
        ];

        let mut toolchain = Toolchain::new();
        for (tool, field, path) in overrides {
            if let Some(path) = path {
                // Bare names are looked up on PATH at spawn time.
                let path = if path.components().count() > 1 {
                    self.resolve(field, path)?
                } else {
                    path.clone()
                };
                toolchain = toolchain.with_tool(tool, path);
            }
        }
        Ok(toolchain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r##"
identifier = "com.myapp.installer"
output = "dist/MyApp.pkg"
allow_relocation = false

[[files]]
source = "build/MyApp.app"
destination = "/Applications/MyApp.app"

[[files]]
source = "/opt/tools/helper"
destination = "/usr/local/bin/helper"

[scripts]
postinstall = "scripts/post.sh"

[distribution]
enabled = true
title = "MyApp"
welcome = "# Welcome"
license = { file = "LICENSE.md" }
background = "art/bg.png"

[tools]
pkgbuild = "fake/pkgbuild"
security = "security"
"##;

    #[test]
    fn test_parse_defaults() {
        let manifest = PackageManifest::parse(
            "identifier = \"com.example\"\noutput = \"a.pkg\"\n",
            "/work",
        )
        .unwrap();
        assert_eq!(manifest.version, "1.0.0");
        assert!(manifest.files.is_empty());
        assert!(!manifest.distribution.enabled);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = PackageManifest::parse(
            "identifier = \"com.example\"\noutput = \"a.pkg\"\nbogus = 1\n",
            "/work",
        );
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_request_resolves_paths_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LICENSE.md"), "MIT").unwrap();

        let manifest = PackageManifest::parse(MANIFEST, dir.path()).unwrap();
        let request = manifest.to_request(None, None).await.unwrap();

        assert_eq!(request.output(), dir.path().join("dist/MyApp.pkg"));
        assert!(!request.allow_relocation());
        assert_eq!(
            request.file_structure(),
            &[
                (dir.path().join("build/MyApp.app"), PathBuf::from("/Applications/MyApp.app")),
                (PathBuf::from("/opt/tools/helper"), PathBuf::from("/usr/local/bin/helper")),
            ]
        );
        assert_eq!(request.scripts().postinstall.as_deref(), Some(dir.path().join("scripts/post.sh").as_path()));
        assert!(request.as_distribution());
        assert_eq!(request.distribution().title.as_deref(), Some("MyApp"));
        assert_eq!(request.distribution().welcome.as_deref(), Some("# Welcome"));
        assert_eq!(request.distribution().license.as_deref(), Some("MIT"));
        assert!(request.validate().is_empty());
    }

    #[tokio::test]
    async fn test_overrides_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LICENSE.md"), "MIT").unwrap();
        let manifest = PackageManifest::parse(MANIFEST, dir.path()).unwrap();

        let request = manifest
            .to_request(Some(Path::new("/tmp/Other.pkg")), Some("Installer: Me"))
            .await
            .unwrap();
        assert_eq!(request.output(), Path::new("/tmp/Other.pkg"));
        assert_eq!(request.signing_identity(), Some("Installer: Me"));
    }

    #[tokio::test]
    async fn test_missing_panel_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = PackageManifest::parse(MANIFEST, dir.path()).unwrap();
        let err = manifest.to_request(None, None).await.unwrap_err();
        assert!(matches!(err, ManifestError::PanelReadFailed { ref field, .. } if field == "distribution.license"));
    }

    #[test]
    fn test_toolchain_overrides() {
        let manifest = PackageManifest::parse(MANIFEST, "/work").unwrap();
        let toolchain = manifest.toolchain().unwrap();
        assert_eq!(toolchain.path(Tool::Pkgbuild), Path::new("/work/fake/pkgbuild"));
        assert_eq!(toolchain.path(Tool::Security), Path::new("security"));
        assert_eq!(toolchain.path(Tool::Productbuild), Path::new("/usr/bin/productbuild"));
    }

    #[tokio::test]
    async fn test_load_missing_manifest() {
        let err = PackageManifest::load(Path::new("/no/such/package.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }
}
