//! Clone-on-write capability probing.
//!
//! Staging copies go through `cp -c` only when the source and the destination
//! live on the same volume and that volume can clone files. Everything else
//! takes the native recursive copy in [`super::fs`].

use std::path::Path;

/// Decides whether a copy can use the clone-aware copy primitive.
pub trait ClonePolicy: Send + Sync {
    /// True when the volume holding `path` supports file cloning.
    fn supports_fast_clone(&self, path: &Path) -> bool;

    /// True when both paths live on the same volume.
    fn same_volume(&self, a: &Path, b: &Path) -> bool {
        same_device(a, b)
    }

    /// True when copying `source` into `destination_dir` can clone.
    fn can_clone(&self, source: &Path, destination_dir: &Path) -> bool {
        self.same_volume(source, destination_dir) && self.supports_fast_clone(source)
    }
}

/// Probes the real filesystem.
///
/// On macOS, APFS volumes support cloning. Elsewhere the answer is always no.
#[derive(Clone, Copy, Debug, Default)]
pub struct VolumeProbe;

impl ClonePolicy for VolumeProbe {
    #[cfg(target_os = "macos")]
    fn supports_fast_clone(&self, path: &Path) -> bool {
        match nix::sys::statfs::statfs(path) {
            Ok(stat) => {
                let fs_type = stat.filesystem_type_name();
                log::debug!("{} is on a {} volume", path.display(), fs_type);
                fs_type == "apfs"
            }
            Err(e) => {
                log::debug!("statfs failed for {}: {}", path.display(), e);
                false
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn supports_fast_clone(&self, _path: &Path) -> bool {
        false
    }
}

/// Never clones. Forces the native recursive copy.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeCopy;

impl ClonePolicy for NativeCopy {
    fn supports_fast_clone(&self, _path: &Path) -> bool {
        false
    }
}

#[cfg(unix)]
fn same_device(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_device(_a: &Path, _b: &Path) -> bool {
    false
}
