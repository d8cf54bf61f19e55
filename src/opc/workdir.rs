//! Scoped working directories and atomic file replacement.
//!
//! A [`WorkDir`] is acquired per load or save call and removed when dropped,
//! whichever way the call exits.

use crate::opc::error::{OpcError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

/// A working directory that is deleted on drop.
#[derive(Debug)]
pub enum WorkDir {
    /// Freshly created under the system (or a given) temp location.
    Temp(TempDir),
    /// Created at a caller-chosen path that must not exist beforehand.
    Explicit(PathBuf),
}

impl WorkDir {
    /// New directory under the system temp location.
    pub fn temp(prefix: &str) -> Result<Self> {
        Ok(WorkDir::Temp(Builder::new().prefix(prefix).tempdir()?))
    }

    /// New directory below `base`.
    pub fn temp_in(base: &Path, prefix: &str) -> Result<Self> {
        Ok(WorkDir::Temp(Builder::new().prefix(prefix).tempdir_in(base)?))
    }

    /// Create `path` as the working directory.
    ///
    /// Fails with [`OpcError::OutputConflict`] if anything already exists there;
    /// an existing directory is never reused or cleaned.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            return Err(OpcError::OutputConflict(path));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::create_dir(&path) {
            Ok(()) => Ok(WorkDir::Explicit(path)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(OpcError::OutputConflict(path))
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Use `explicit` when given, otherwise a fresh temp directory.
    pub fn acquire(explicit: Option<&Path>, prefix: &str) -> Result<Self> {
        match explicit {
            Some(path) => Self::create(path),
            None => Self::temp(prefix),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(dir) => dir.path(),
            WorkDir::Explicit(path) => path,
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let WorkDir::Explicit(path) = self
            && let Err(err) = std::fs::remove_dir_all(path.as_path())
        {
            log::warn!("failed to remove working directory {}: {}", path.display(), err);
        }
    }
}

/// Replace `dest` with `bytes` atomically.
///
/// The bytes are staged in a temp file next to `dest` and renamed over it only
/// once fully written, so a failure leaves any existing `dest` untouched.
pub fn replace_file(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = Builder::new().prefix(".vsdx-").suffix(".tmp").tempfile_in(parent)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(dest).map_err(|err| OpcError::Io(err.error))?;

    log::trace!("replaced {} ({} bytes)", dest.display(), bytes.len());
    Ok(())
}
