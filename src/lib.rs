//! # kodegen_bundler_pkg
//!
//! macOS installer package builder.
//!
//! Turns an application bundle, lifecycle scripts and installer UI resources
//! into a `.pkg` by driving `pkgbuild`, `productbuild` and `productsign`.
//!
//! ## Features
//!
//! - **Flat packages**: payload staging with clone-aware copies on APFS
//! - **Scripts-only packages**: `--nopayload` builds from lifecycle scripts
//! - **Distribution packages**: title, markdown panels and light/dark backgrounds
//! - **Signing**: identity lookup before every `productsign` pass
//! - **Product archives**: combine existing flat packages into one installer
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_pkg build package.toml
//! kodegen_bundler_pkg validate package.toml --json
//! kodegen_bundler_pkg combine --output Suite.pkg App.pkg Helper.pkg
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod manifest;
pub mod packager;

// Re-export main types for public API
pub use cli::Args;
pub use error::{CliError, ManifestError, PkgError, Result};
pub use manifest::PackageManifest;
pub use packager::{
    BuildOutcome, BuiltPackage, PackageRequest, PackageRequestBuilder, Packager,
    ProductArchiveRequest, Stage, Toolchain,
};
