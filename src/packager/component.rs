//! Component property list generation.
//!
//! When relocation is disallowed, `pkgbuild` is given a component property
//! list describing the embedded bundle so the installer neither relocates nor
//! downgrades it.

use super::error::{Error, Result};
use plist::Value;
use std::path::{Path, PathBuf};

/// Settings for the single bundle a component property list describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Bundle path relative to the payload root, e.g. `/Applications/MyApp.app`
    pub root_relative_bundle_path: PathBuf,
    /// Whether the installer may relocate the bundle
    pub relocatable: bool,
}

impl ComponentDescriptor {
    /// Builds the property list value: an array holding one dictionary.
    pub fn to_value(&self) -> Value {
        let mut dict = plist::Dictionary::new();
        dict.insert("BundleHasStrictIdentifier".into(), true.into());
        dict.insert("BundleIsRelocatable".into(), self.relocatable.into());
        dict.insert("BundleIsVersionChecked".into(), true.into());
        dict.insert("BundleOverwriteAction".into(), "upgrade".into());
        dict.insert(
            "RootRelativeBundlePath".into(),
            self.root_relative_bundle_path
                .to_string_lossy()
                .into_owned()
                .into(),
        );
        Value::Array(vec![Value::Dictionary(dict)])
    }
}

/// Finds the destination of the first mapped source that is a bundle.
///
/// A source is a bundle when it contains `Contents/Info.plist`.
pub fn find_relocatable_bundle(mapping: &[(PathBuf, PathBuf)]) -> Result<&Path> {
    mapping
        .iter()
        .find(|(source, _)| source.join("Contents").join("Info.plist").exists())
        .map(|(_, destination)| destination.as_path())
        .ok_or(Error::NoBundleFound)
}

/// Writes the component property list for `bundle` to `path` as XML.
pub fn write_component_plist(path: &Path, bundle: &Path, allow_relocation: bool) -> Result<()> {
    let descriptor = ComponentDescriptor {
        root_relative_bundle_path: bundle.to_path_buf(),
        relocatable: allow_relocation,
    };
    descriptor.to_value().to_file_xml(path).map_err(Error::Plist)?;
    log::info!("✓ Wrote component property list for {}", bundle.display());
    Ok(())
}
