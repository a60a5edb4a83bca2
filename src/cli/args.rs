//! Command line argument parsing and validation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// macOS installer package builder
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_pkg",
    version,
    about = "Build macOS installer packages with pkgbuild and productbuild",
    long_about = "Build macOS installer packages from a TOML package manifest.

Usage:
  kodegen_bundler_pkg build package.toml
  kodegen_bundler_pkg build package.toml --sign \"Developer ID Installer: Example (TEAMID)\"
  kodegen_bundler_pkg validate package.toml --json
  kodegen_bundler_pkg combine --output Suite.pkg App.pkg Helper.pkg"
)]
pub struct Args {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build an installer package from a manifest
    Build {
        /// Path to the package manifest
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Override the output path from the manifest
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Override the signing identity from the manifest
        #[arg(long, value_name = "IDENTITY", env = "PKG_SIGNING_IDENTITY")]
        sign: Option<String>,
    },

    /// Check a manifest without building anything
    Validate {
        /// Path to the package manifest
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Combine existing flat packages into one product archive
    Combine {
        /// Where to write the product archive
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Product identifier
        #[arg(long, value_name = "ID")]
        identifier: Option<String>,

        /// Product version
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,

        /// Signing identity
        #[arg(long, value_name = "IDENTITY", env = "PKG_SIGNING_IDENTITY")]
        sign: Option<String>,

        /// Installer title
        #[arg(long)]
        title: Option<String>,

        /// Markdown file for the Welcome panel
        #[arg(long, value_name = "FILE")]
        welcome: Option<PathBuf>,

        /// Markdown file for the Read Me panel
        #[arg(long, value_name = "FILE")]
        readme: Option<PathBuf>,

        /// Markdown file for the License panel
        #[arg(long, value_name = "FILE")]
        license: Option<PathBuf>,

        /// Background image for the light appearance
        #[arg(long, value_name = "IMAGE")]
        background: Option<PathBuf>,

        /// Background image for the dark appearance
        #[arg(long, value_name = "IMAGE")]
        background_dark: Option<PathBuf>,

        /// Flat packages to combine
        #[arg(value_name = "PKG", required = true)]
        packages: Vec<PathBuf>,
    },
}

impl Command {
    /// Name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
            Command::Validate { .. } => "validate",
            Command::Combine { .. } => "combine",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet cannot be used together".to_string());
        }

        match &self.command {
            Command::Build { manifest, sign, .. } => {
                if manifest.as_os_str().is_empty() {
                    return Err("Manifest path is required".to_string());
                }
                if sign.as_deref().is_some_and(|s| s.trim().is_empty()) {
                    return Err("Signing identity cannot be empty".to_string());
                }
            }
            Command::Validate { manifest, .. } => {
                if manifest.as_os_str().is_empty() {
                    return Err("Manifest path is required".to_string());
                }
            }
            Command::Combine { output, sign, .. } => {
                if output.as_os_str().is_empty() {
                    return Err("Output path is required".to_string());
                }
                if sign.as_deref().is_some_and(|s| s.trim().is_empty()) {
                    return Err("Signing identity cannot be empty".to_string());
                }
            }
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print info message
    pub fn info_println(&self, message: &str) {
        let _ = self.output.info(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
