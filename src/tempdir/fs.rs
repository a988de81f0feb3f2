/*!
 * Filesystem Collaborator
 */

use crate::core::limits::RANDOM_SUFFIX_LEN;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem operations needed by the temp-directory lifecycle
pub trait TempFileSystem: Send + Sync {
    /// Preferred base directory (honours `TMPDIR` and friends)
    fn default_temp_dir(&self) -> PathBuf;

    /// Whether `path` is an existing, writable directory
    fn is_usable_dir(&self, path: &Path) -> bool;

    /// Create a fresh uniquely named directory under `base`
    fn make_unique_dir(&self, base: &Path, prefix: &str) -> io::Result<PathBuf>;

    /// Remove a directory tree
    fn remove_tree(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem backed by `tempfile` and `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl TempFileSystem for OsFileSystem {
    fn default_temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn is_usable_dir(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }

    #[allow(deprecated)]
    fn make_unique_dir(&self, base: &Path, prefix: &str) -> io::Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .rand_bytes(RANDOM_SUFFIX_LEN)
            .tempdir_in(base)?;
        // Removal is owned by the finalizer, not by TempDir's drop
        Ok(dir.into_path())
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}
