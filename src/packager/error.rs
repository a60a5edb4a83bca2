//! Error types for package builds.
//!
//! Provides contextual error chaining, filesystem errors that carry the
//! offending path, and the missing-input variants raised while staging a build.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context
//! - **bail! macro**: Early return with formatted error messages
//!
//! Ordinary external tool failures are *not* errors. They are reported as a
//! [`BuildOutcome::Failed`](crate::packager::BuildOutcome) value. The variants
//! here cover invalid requests, missing inputs and broken invariants.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_pkg::packager::error::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_panel(path: &Path) -> Result<String> {
//!     let text = std::fs::read_to_string(path)
//!         .fs_context("reading welcome panel", path)?;
//!
//!     if text.trim().is_empty() {
//!         kodegen_bundler_pkg::bail!("welcome panel {} is empty", path.display());
//!     }
//!
//!     Ok(text)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

use super::request::Violation;

/// Errors returned by the packager.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "creating scripts directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// An external tool could not be started at all.
    ///
    /// A tool that starts and exits non-zero is not an error; see
    /// [`ToolFailure`](crate::packager::ToolFailure).
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// The request violates one or more invariants. Raised before any side effect.
    #[error("invalid package request: {}", format_violations(.violations))]
    InvalidRequest {
        /// Every violated invariant
        violations: Vec<Violation>,
    },

    /// A file-structure source path does not exist.
    #[error("source file does not exist: {0}")]
    SourceNotFound(PathBuf),

    /// A declared lifecycle script does not exist.
    #[error("{script} script not found: {path}")]
    ScriptNotFound {
        /// Canonical script name (preinstall, postinstall, ...)
        script: &'static str,
        /// Declared script path
        path: PathBuf,
    },

    /// A declared auxiliary script resource does not exist.
    #[error("script resource not found: {0}")]
    ScriptResourceNotFound(PathBuf),

    /// The canonical destination inside the scripts directory is already taken.
    #[error("script already exists in scripts directory: {0}")]
    ScriptAlreadyExists(PathBuf),

    /// A declared background image does not exist.
    #[error("background image not found: {0}")]
    ImageNotFound(PathBuf),

    /// A file operation found a directory where a file was expected.
    #[error("refusing to remove directory: {0}")]
    IsADirectory(PathBuf),

    /// An input package for a product archive does not exist.
    #[error("input package not found: {0}")]
    PackageNotFound(PathBuf),

    /// Relocation was disallowed but no mapped source is a bundle.
    #[error("no valid bundle (Contents/Info.plist) found in the provided file structure")]
    NoBundleFound,

    /// The synthesized distribution descriptor could not be read.
    #[error("malformed distribution descriptor: {0}")]
    Descriptor(#[from] xml::reader::Error),

    /// The mutated distribution descriptor could not be written.
    #[error("failed to write distribution descriptor: {0}")]
    DescriptorWrite(#[from] xml::writer::Error),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking directory (recursive copies).
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Property list (plist) writing error.
    #[error("{0}")]
    Plist(#[from] plist::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the packager's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying script".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::packager::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::packager::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::packager::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_context_keeps_path() {
        let err = std::fs::read("/definitely/not/here")
            .fs_context("reading panel", "/definitely/not/here")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("reading panel /definitely/not/here"));
    }

    #[test]
    fn test_option_context_becomes_generic_error() {
        let value: Option<u8> = None;
        let err = value.context("no bundle").unwrap_err();
        assert!(matches!(err, Error::GenericError(ref m) if m == "no bundle"));
    }

    #[test]
    fn test_invalid_request_lists_every_violation() {
        let err = Error::InvalidRequest {
            violations: vec![Violation::EmptyIdentifier, Violation::MissingPayloadAndScripts],
        };
        let message = err.to_string();
        assert!(message.contains("identifier"));
        assert!(message.contains("; "));
    }
}
