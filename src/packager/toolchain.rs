//! Locations of the external packaging tools.

use std::path::{Path, PathBuf};

/// External tools the packager drives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tool {
    /// `pkgbuild`
    Pkgbuild,
    /// `productbuild`
    Productbuild,
    /// `productsign`
    Productsign,
    /// `security`
    Security,
    /// `cp`
    Copy,
}

impl Tool {
    /// All tools, in pipeline order.
    pub const ALL: [Tool; 5] = [
        Tool::Pkgbuild,
        Tool::Productbuild,
        Tool::Productsign,
        Tool::Security,
        Tool::Copy,
    ];

    /// Executable name.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pkgbuild => "pkgbuild",
            Tool::Productbuild => "productbuild",
            Tool::Productsign => "productsign",
            Tool::Security => "security",
            Tool::Copy => "cp",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Paths to the external tools.
///
/// Defaults to the macOS system locations. Tests and callers with custom
/// installs override individual paths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Toolchain {
    pkgbuild: PathBuf,
    productbuild: PathBuf,
    productsign: PathBuf,
    security: PathBuf,
    copy: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            pkgbuild: PathBuf::from("/usr/bin/pkgbuild"),
            productbuild: PathBuf::from("/usr/bin/productbuild"),
            productsign: PathBuf::from("/usr/bin/productsign"),
            security: PathBuf::from("/usr/bin/security"),
            copy: PathBuf::from("/bin/cp"),
        }
    }
}

impl Toolchain {
    /// Creates a toolchain pointing at the system tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path configured for a tool.
    pub fn path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Pkgbuild => &self.pkgbuild,
            Tool::Productbuild => &self.productbuild,
            Tool::Productsign => &self.productsign,
            Tool::Security => &self.security,
            Tool::Copy => &self.copy,
        }
    }

    /// Overrides the path of one tool.
    pub fn with_tool(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match tool {
            Tool::Pkgbuild => self.pkgbuild = path,
            Tool::Productbuild => self.productbuild = path,
            Tool::Productsign => self.productsign = path,
            Tool::Security => self.security = path,
            Tool::Copy => self.copy = path,
        }
        self
    }

    /// Tools whose configured path cannot be resolved to an executable.
    pub fn missing_tools(&self) -> Vec<Tool> {
        Tool::ALL
            .into_iter()
            .filter(|tool| {
                let path = self.path(*tool);
                match which::which(path) {
                    Ok(found) => {
                        log::debug!("Found {} at: {}", tool, found.display());
                        false
                    }
                    Err(e) => {
                        log::debug!("{} not found at {}: {}", tool, path.display(), e);
                        true
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_defaults() {
        let toolchain = Toolchain::new();
        assert_eq!(toolchain.path(Tool::Pkgbuild), Path::new("/usr/bin/pkgbuild"));
        assert_eq!(toolchain.path(Tool::Copy), Path::new("/bin/cp"));
    }

    #[test]
    fn test_override_single_tool() {
        let toolchain = Toolchain::new().with_tool(Tool::Security, "/tmp/fake-security");
        assert_eq!(toolchain.path(Tool::Security), Path::new("/tmp/fake-security"));
        assert_eq!(
            toolchain.path(Tool::Productsign),
            Path::new("/usr/bin/productsign")
        );
    }

    #[test]
    fn test_missing_tools_reports_nonexistent_paths() {
        let toolchain = Toolchain::new().with_tool(Tool::Pkgbuild, "/definitely/not/pkgbuild");
        assert!(toolchain.missing_tools().contains(&Tool::Pkgbuild));
    }
}
