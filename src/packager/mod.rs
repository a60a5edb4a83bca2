//! macOS installer package builder.
//!
//! Orchestrates the native packaging tools to turn an application bundle,
//! lifecycle scripts and installer UI resources into a `.pkg`:
//!
//! | Tool | Used for |
//! |------|----------|
//! | `pkgbuild` | Flat component package |
//! | `productbuild` | Distribution synthesis and product archive |
//! | `productsign` | Package signing |
//! | `security find-identity -v` | Signing identity lookup |
//! | `cp -c` | Clone-aware staging copies on APFS |
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_pkg::packager::{BuildOutcome, Packager, PackageRequestBuilder};
//!
//! # async fn example() -> kodegen_bundler_pkg::packager::Result<()> {
//! let request = PackageRequestBuilder::new("com.myapp.installer", "Sample.pkg")
//!     .file("Samples/MyApp/MyApp.app", "/Applications/MyApp.app")
//!     .as_distribution(true)
//!     .title("MyApp")
//!     .build();
//!
//! match Packager::new().build(&request).await? {
//!     BuildOutcome::Finalized(package) => {
//!         println!("Created: {} ({} bytes)", package.path.display(), package.size);
//!         println!("SHA256: {}", package.checksum);
//!     }
//!     BuildOutcome::Failed { stage, reason } => {
//!         eprintln!("{stage} failed: {reason}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod checksum;
mod component;
mod distribution;
pub mod error;
mod pipeline;
mod product;
mod request;
mod resources;
mod sign;
mod staging;
mod tool;
mod toolchain;
mod utils;

// Public re-exports
pub use checksum::calculate_sha256;
pub use component::{ComponentDescriptor, find_relocatable_bundle, write_component_plist};
pub use distribution::{DistributionElement, DistributionElements, inject_elements};
pub use error::{Error, Result};
pub use pipeline::{Packager, Stage};
pub use product::{ProductArchiveRequest, build_product_archive};
pub use request::{
    DEFAULT_INSTALL_LOCATION, DEFAULT_VERSION, DistributionMetadata, LifecycleScript,
    LifecycleScripts, PackageRequest, PackageRequestBuilder, Violation,
};
pub use resources::{BackgroundPlan, Panel, PreparedResources, render_markdown_panel};
pub use sign::identity_available;
pub use tool::{ToolFailure, ToolInvocation, ToolOutput};
pub use toolchain::{Tool, Toolchain};
pub use utils::clone::{ClonePolicy, NativeCopy, VolumeProbe};

use std::path::PathBuf;

/// A finished installer package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPackage {
    /// Final location of the package
    pub path: PathBuf,

    /// Size in bytes
    pub size: u64,

    /// SHA-256 checksum (hex encoded)
    pub checksum: String,
}

/// Result of a build that got past request validation.
///
/// External tool failures are ordinary outcomes, not errors: the pipeline
/// stops at the failing stage and reports it here.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Every stage succeeded and the package is at its output path.
    Finalized(BuiltPackage),

    /// A stage failed. Nothing was written to the output path.
    Failed {
        /// The stage that failed
        stage: Stage,
        /// Diagnostic text
        reason: String,
    },
}

impl BuildOutcome {
    /// True for [`BuildOutcome::Finalized`].
    pub fn is_finalized(&self) -> bool {
        matches!(self, BuildOutcome::Finalized(_))
    }

    /// The built package, if any.
    pub fn package(&self) -> Option<&BuiltPackage> {
        match self {
            BuildOutcome::Finalized(package) => Some(package),
            BuildOutcome::Failed { .. } => None,
        }
    }
}
