//! Package request configuration.
//!
//! A [`PackageRequest`] is the immutable description of one package build,
//! constructed through [`PackageRequestBuilder`] and checked with
//! [`PackageRequest::validate`] before anything touches the filesystem.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default package version when none is configured.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Default install location when none is configured.
pub const DEFAULT_INSTALL_LOCATION: &str = "/";

/// Lifecycle script slots understood by `pkgbuild`.
///
/// Each slot has a fixed canonical file name inside the scripts directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LifecycleScript {
    /// Runs before the payload is installed.
    Preinstall,
    /// Legacy pre-install phase.
    Preflight,
    /// Runs after the payload is installed.
    Postinstall,
    /// Legacy post-install phase.
    Postflight,
}

impl LifecycleScript {
    /// All slots in staging order.
    pub const ALL: [LifecycleScript; 4] = [
        LifecycleScript::Preinstall,
        LifecycleScript::Preflight,
        LifecycleScript::Postinstall,
        LifecycleScript::Postflight,
    ];

    /// Canonical file name inside the scripts directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            LifecycleScript::Preinstall => "preinstall",
            LifecycleScript::Preflight => "preflight",
            LifecycleScript::Postinstall => "postinstall",
            LifecycleScript::Postflight => "postflight",
        }
    }
}

impl fmt::Display for LifecycleScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Paths to the optional lifecycle scripts.
#[derive(Clone, Debug, Default)]
pub struct LifecycleScripts {
    /// Preinstall script path.
    pub preinstall: Option<PathBuf>,
    /// Preflight script path.
    pub preflight: Option<PathBuf>,
    /// Postinstall script path.
    pub postinstall: Option<PathBuf>,
    /// Postflight script path.
    pub postflight: Option<PathBuf>,
}

impl LifecycleScripts {
    /// Returns the declared path for a slot.
    pub fn get(&self, script: LifecycleScript) -> Option<&Path> {
        match script {
            LifecycleScript::Preinstall => self.preinstall.as_deref(),
            LifecycleScript::Preflight => self.preflight.as_deref(),
            LifecycleScript::Postinstall => self.postinstall.as_deref(),
            LifecycleScript::Postflight => self.postflight.as_deref(),
        }
    }

    /// Iterates over declared scripts in staging order.
    pub fn iter(&self) -> impl Iterator<Item = (LifecycleScript, &Path)> {
        LifecycleScript::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|path| (slot, path)))
    }

    /// True when no script is declared.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Content and artwork for the distribution (product archive) installer UI.
///
/// Only used when the request converts the flat package into a distribution.
#[derive(Clone, Debug, Default)]
pub struct DistributionMetadata {
    /// Installer window title.
    pub title: Option<String>,
    /// Welcome panel, markdown text.
    pub welcome: Option<String>,
    /// Read Me panel, markdown text.
    pub readme: Option<String>,
    /// License panel, markdown text.
    pub license: Option<String>,
    /// Background image for the light appearance.
    pub background: Option<PathBuf>,
    /// Background image for the dark appearance. Falls back to `background`.
    pub background_dark: Option<PathBuf>,
}

impl DistributionMetadata {
    /// Names of the fields that are set. Used for validation messages.
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.welcome.is_some() {
            fields.push("welcome");
        }
        if self.readme.is_some() {
            fields.push("readme");
        }
        if self.license.is_some() {
            fields.push("license");
        }
        if self.background.is_some() {
            fields.push("background");
        }
        if self.background_dark.is_some() {
            fields.push("background_dark");
        }
        fields
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.provided_fields().is_empty()
    }
}

/// One violated request invariant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Neither a file structure nor a preinstall/postinstall script was given.
    MissingPayloadAndScripts,
    /// The package identifier is empty.
    EmptyIdentifier,
    /// The package version is empty.
    EmptyVersion,
    /// The output path is empty.
    EmptyOutputPath,
    /// The output path has no file name component, e.g. `/` or `..`.
    OutputWithoutFileName {
        /// The offending output path
        output: PathBuf,
    },
    /// The output path is an existing directory.
    OutputIsDirectory {
        /// The offending output path
        output: PathBuf,
    },
    /// A signing identity was given but is blank.
    EmptySigningIdentity,
    /// A product archive was requested without any input package.
    NoInputPackages,
    /// A file-structure destination is not an absolute path.
    RelativeDestination {
        /// The offending destination
        destination: PathBuf,
    },
    /// The same source appears more than once in the file structure.
    DuplicateSource {
        /// The repeated source
        source: PathBuf,
    },
    /// Distribution-only fields were set without enabling distribution mode.
    DistributionFieldsWithoutDistribution {
        /// The fields that require distribution mode
        fields: Vec<&'static str>,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingPayloadAndScripts => write!(
                f,
                "no file structure, preinstall or postinstall script provided"
            ),
            Violation::EmptyIdentifier => write!(f, "package identifier is empty"),
            Violation::EmptyVersion => write!(f, "package version is empty"),
            Violation::EmptyOutputPath => write!(f, "output path is empty"),
            Violation::OutputWithoutFileName { output } => {
                write!(f, "output path {} has no file name", output.display())
            }
            Violation::OutputIsDirectory { output } => {
                write!(f, "output path {} is a directory", output.display())
            }
            Violation::EmptySigningIdentity => write!(f, "signing identity is empty"),
            Violation::NoInputPackages => write!(f, "no input packages provided"),
            Violation::RelativeDestination { destination } => write!(
                f,
                "destination {} must be an absolute path",
                destination.display()
            ),
            Violation::DuplicateSource { source } => {
                write!(f, "source {} is mapped more than once", source.display())
            }
            Violation::DistributionFieldsWithoutDistribution { fields } => write!(
                f,
                "{} require distribution mode to be enabled",
                fields.join(", ")
            ),
        }
    }
}

/// Checks that `output` names a file that may be replaced.
///
/// An existing directory is never a valid output.
pub(crate) fn output_violation(output: &Path) -> Option<Violation> {
    if output.as_os_str().is_empty() {
        Some(Violation::EmptyOutputPath)
    } else if output.file_name().is_none() {
        Some(Violation::OutputWithoutFileName {
            output: output.to_path_buf(),
        })
    } else if output.is_dir() {
        Some(Violation::OutputIsDirectory {
            output: output.to_path_buf(),
        })
    } else {
        None
    }
}

pub(crate) fn signing_identity_violation(identity: Option<&str>) -> Option<Violation> {
    identity
        .filter(|identity| identity.trim().is_empty())
        .map(|_| Violation::EmptySigningIdentity)
}

/// Immutable description of one package build.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_pkg::packager::PackageRequestBuilder;
///
/// let request = PackageRequestBuilder::new("com.myapp.installer", "Sample.pkg")
///     .file("Samples/MyApp/MyApp.app", "/Applications/MyApp.app")
///     .preinstall("Samples/MyApp/MyPreinstall.sh")
///     .postinstall("Samples/MyApp/MyPostinstall.sh")
///     .build();
///
/// assert!(request.validate().is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct PackageRequest {
    output: PathBuf,
    identifier: String,
    version: String,
    install_location: String,
    allow_relocation: bool,
    file_structure: Vec<(PathBuf, PathBuf)>,
    scripts: LifecycleScripts,
    script_resources: Vec<PathBuf>,
    signing_identity: Option<String>,
    as_distribution: bool,
    distribution: DistributionMetadata,
}

impl PackageRequest {
    /// Where the finished package is written.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Package identifier, e.g. `com.myapp.installer`.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Package version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Install location passed to `pkgbuild`.
    pub fn install_location(&self) -> &str {
        &self.install_location
    }

    /// Whether an embedded bundle may be relocated by the installer.
    pub fn allow_relocation(&self) -> bool {
        self.allow_relocation
    }

    /// Source → destination mapping in insertion order.
    pub fn file_structure(&self) -> &[(PathBuf, PathBuf)] {
        &self.file_structure
    }

    /// True when the request carries a payload.
    pub fn has_payload(&self) -> bool {
        !self.file_structure.is_empty()
    }

    /// Lifecycle scripts.
    pub fn scripts(&self) -> &LifecycleScripts {
        &self.scripts
    }

    /// Auxiliary files staged next to the lifecycle scripts.
    pub fn script_resources(&self) -> &[PathBuf] {
        &self.script_resources
    }

    /// Signing identity, if signing was requested.
    pub fn signing_identity(&self) -> Option<&str> {
        self.signing_identity.as_deref()
    }

    /// Whether the flat package is converted into a distribution.
    pub fn as_distribution(&self) -> bool {
        self.as_distribution
    }

    /// Distribution UI metadata.
    pub fn distribution(&self) -> &DistributionMetadata {
        &self.distribution
    }

    /// Checks every request invariant and returns all violations.
    ///
    /// An empty vector means the request is valid.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.file_structure.is_empty()
            && self.scripts.preinstall.is_none()
            && self.scripts.postinstall.is_none()
        {
            violations.push(Violation::MissingPayloadAndScripts);
        }

        if self.identifier.trim().is_empty() {
            violations.push(Violation::EmptyIdentifier);
        }

        if self.version.trim().is_empty() {
            violations.push(Violation::EmptyVersion);
        }

        violations.extend(output_violation(&self.output));
        violations.extend(signing_identity_violation(self.signing_identity.as_deref()));

        let mut seen: Vec<&Path> = Vec::with_capacity(self.file_structure.len());
        for (source, destination) in &self.file_structure {
            if !destination.is_absolute() {
                violations.push(Violation::RelativeDestination {
                    destination: destination.clone(),
                });
            }
            if seen.contains(&source.as_path()) {
                violations.push(Violation::DuplicateSource {
                    source: source.clone(),
                });
            } else {
                seen.push(source);
            }
        }

        if !self.as_distribution && !self.distribution.is_empty() {
            violations.push(Violation::DistributionFieldsWithoutDistribution {
                fields: self.distribution.provided_fields(),
            });
        }

        violations
    }
}

/// Builder for constructing [`PackageRequest`].
///
/// Defaults: version `1.0.0`, install location `/`, relocation allowed,
/// no scripts, no signing, distribution conversion off.
#[derive(Clone, Debug)]
pub struct PackageRequestBuilder {
    request: PackageRequest,
}

impl PackageRequestBuilder {
    /// Creates a builder for the given identifier and output path.
    pub fn new(identifier: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            request: PackageRequest {
                output: output.as_ref().to_path_buf(),
                identifier: identifier.into(),
                version: DEFAULT_VERSION.to_string(),
                install_location: DEFAULT_INSTALL_LOCATION.to_string(),
                allow_relocation: true,
                file_structure: Vec::new(),
                scripts: LifecycleScripts::default(),
                script_resources: Vec::new(),
                signing_identity: None,
                as_distribution: false,
                distribution: DistributionMetadata::default(),
            },
        }
    }

    /// Sets the package version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.request.version = version.into();
        self
    }

    /// Sets the install location.
    pub fn install_location(mut self, location: impl Into<String>) -> Self {
        self.request.install_location = location.into();
        self
    }

    /// Allows or forbids relocation of the embedded bundle.
    ///
    /// Forbidding relocation requires a bundle (`Contents/Info.plist`) in the
    /// file structure.
    pub fn allow_relocation(mut self, allow: bool) -> Self {
        self.request.allow_relocation = allow;
        self
    }

    /// Maps one source path to an absolute destination inside the payload.
    pub fn file(mut self, source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Self {
        self.request.file_structure.push((
            source.as_ref().to_path_buf(),
            destination.as_ref().to_path_buf(),
        ));
        self
    }

    /// Replaces the whole file-structure mapping.
    pub fn file_structure(mut self, mapping: Vec<(PathBuf, PathBuf)>) -> Self {
        self.request.file_structure = mapping;
        self
    }

    /// Sets the preinstall script.
    pub fn preinstall(mut self, path: impl AsRef<Path>) -> Self {
        self.request.scripts.preinstall = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the preflight script.
    pub fn preflight(mut self, path: impl AsRef<Path>) -> Self {
        self.request.scripts.preflight = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the postinstall script.
    pub fn postinstall(mut self, path: impl AsRef<Path>) -> Self {
        self.request.scripts.postinstall = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the postflight script.
    pub fn postflight(mut self, path: impl AsRef<Path>) -> Self {
        self.request.scripts.postflight = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replaces all lifecycle scripts.
    pub fn scripts(mut self, scripts: LifecycleScripts) -> Self {
        self.request.scripts = scripts;
        self
    }

    /// Adds an auxiliary file staged next to the scripts.
    pub fn script_resource(mut self, path: impl AsRef<Path>) -> Self {
        self.request
            .script_resources
            .push(path.as_ref().to_path_buf());
        self
    }

    /// Sets the signing identity.
    pub fn signing_identity(mut self, identity: impl Into<String>) -> Self {
        self.request.signing_identity = Some(identity.into());
        self
    }

    /// Enables or disables conversion into a distribution.
    pub fn as_distribution(mut self, enabled: bool) -> Self {
        self.request.as_distribution = enabled;
        self
    }

    /// Sets the installer title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.request.distribution.title = Some(title.into());
        self
    }

    /// Sets the welcome panel markdown.
    pub fn welcome(mut self, markdown: impl Into<String>) -> Self {
        self.request.distribution.welcome = Some(markdown.into());
        self
    }

    /// Sets the Read Me panel markdown.
    pub fn readme(mut self, markdown: impl Into<String>) -> Self {
        self.request.distribution.readme = Some(markdown.into());
        self
    }

    /// Sets the license panel markdown.
    pub fn license(mut self, markdown: impl Into<String>) -> Self {
        self.request.distribution.license = Some(markdown.into());
        self
    }

    /// Sets the light background image.
    pub fn background(mut self, path: impl AsRef<Path>) -> Self {
        self.request.distribution.background = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the dark background image.
    pub fn background_dark(mut self, path: impl AsRef<Path>) -> Self {
        self.request.distribution.background_dark = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replaces all distribution metadata.
    pub fn distribution(mut self, metadata: DistributionMetadata) -> Self {
        self.request.distribution = metadata;
        self
    }

    /// Finishes the request. Validation is deferred to [`PackageRequest::validate`].
    pub fn build(self) -> PackageRequest {
        self.request
    }
}
