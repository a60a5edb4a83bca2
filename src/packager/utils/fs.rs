//! File system utilities for staging.
//!
//! Provides file operations with automatic directory creation, symlink
//! preservation and path-carrying errors.

use crate::packager::error::{Error, ErrorExt, Result};
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase && path.exists() {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path)
    } else {
        Ok(())
    }
}

/// Removes whatever sits at `path`, file or directory. Missing paths are fine.
pub async fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path)
            .await
            .fs_context("removing file", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Fs {
            context: "inspecting",
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

/// Removes the file or symlink at `path`. Missing paths are fine.
///
/// A directory is never removed; it yields [`Error::IsADirectory`].
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Err(Error::IsADirectory(path.to_path_buf())),
        Ok(_) => fs::remove_file(path)
            .await
            .fs_context("removing file", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Fs {
            context: "inspecting",
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

/// Makes a symbolic link.
#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        create_dir_all(dest_dir, false).await?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Symlinks are recreated, not followed.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a Directory")));
    }
    if let Some(parent) = to.parent() {
        create_dir_all(parent, false).await?;
    }

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        debug_assert!(entry.path().starts_with(from));
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            symlink(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
        } else if entry.file_type().is_dir() {
            create_dir_all(&dest_path, false).await?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", entry.path())?;
        }
    }

    Ok(())
}

/// Copies a file or directory tree, whichever `from` is.
pub async fn copy_path(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        copy_dir(from, to).await
    } else {
        copy_file(from, to).await
    }
}

/// Marks a file executable (`0o755`).
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("setting permissions on", path)
}

/// Marks a file executable. No-op where permission bits don't exist.
#[cfg(not(unix))]
pub async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Appends `suffix` to the full file name, e.g. `a.pkg` → `a.pkg.signed`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Moves `replacement` over `target`: the old target is deleted first, then
/// the replacement is renamed into place.
pub async fn replace_file(target: &Path, replacement: &Path) -> Result<()> {
    remove_file(target).await?;
    fs::rename(replacement, target)
        .await
        .fs_context("renaming into place", replacement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, b"hello").unwrap();

        let dst = dir.path().join("deep/nested/a.txt");
        copy_file(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_copy_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_file(dir.path(), &dir.path().join("x")).await.unwrap_err();
        assert!(err.to_string().contains("is not a file"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_dir_preserves_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("App.app");
        std::fs::create_dir_all(src.join("Contents/MacOS")).unwrap();
        std::fs::write(src.join("Contents/MacOS/app"), b"bin").unwrap();
        std::os::unix::fs::symlink("MacOS/app", src.join("Contents/current")).unwrap();

        let dst = dir.path().join("out/App.app");
        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(dst.join("Contents/MacOS/app")).unwrap(), b"bin");
        let link = std::fs::read_link(dst.join("Contents/current")).unwrap();
        assert_eq!(link, Path::new("MacOS/app"));
    }

    #[test]
    fn test_with_suffix_keeps_extension() {
        assert_eq!(
            with_suffix(Path::new("/tmp/Sample.pkg"), ".product"),
            Path::new("/tmp/Sample.pkg.product")
        );
    }

    #[tokio::test]
    async fn test_replace_file_swaps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pkg");
        let replacement = dir.path().join("pkg.signed");
        std::fs::write(&target, b"unsigned").unwrap();
        std::fs::write(&replacement, b"signed").unwrap();

        replace_file(&target, &replacement).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"signed");
        assert!(!replacement.exists());
    }

    #[tokio::test]
    async fn test_remove_file_leaves_directories_alone() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dist");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("keep.txt"), b"keep").unwrap();

        let err = remove_file(&output).await.unwrap_err();
        assert!(matches!(err, Error::IsADirectory(ref p) if p == &output));
        assert!(output.join("keep.txt").exists());

        let file = dir.path().join("old.pkg");
        std::fs::write(&file, b"old").unwrap();
        remove_file(&file).await.unwrap();
        assert!(!file.exists());
        remove_file(&file).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_path_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_path(&dir.path().join("nothing")).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_executable_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("postinstall");
        std::fs::write(&script, b"#!/bin/sh\n").unwrap();
        set_executable(&script).await.unwrap();
        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
