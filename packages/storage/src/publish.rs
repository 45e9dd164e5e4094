//! Atomic publishing of output artifacts.
//!
//! An artifact group (all statistics tables, all tiles...) is written into a
//! sibling staging directory. [`StagedDir::commit`] swaps it with the
//! published directory only once every file has been written, so readers
//! see either the previous complete group or the new one. Dropping an
//! uncommitted [`StagedDir`] removes the staging directory and leaves the
//! published directory untouched.

use std::path::{Path, PathBuf};

use crate::StorageError;

/// A staging directory that replaces `target` on commit.
#[derive(Debug)]
pub struct StagedDir {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl StagedDir {
    /// Creates a fresh, empty staging directory next to `target`.
    ///
    /// Leftovers from an interrupted run are removed first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if `target` has no file name or the staging
    /// directory cannot be created.
    pub fn create(target: &Path) -> Result<Self, StorageError> {
        let staging = sibling(target, "staging")?;
        if staging.exists() {
            log::debug!("Removing stale staging dir {}", staging.display());
            std::fs::remove_dir_all(&staging).map_err(|e| StorageError::io(&staging, e))?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| StorageError::io(&staging, e))?;

        Ok(Self {
            target: target.to_path_buf(),
            staging,
            committed: false,
        })
    }

    /// Returns the path of `name` inside the staging directory.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.staging.join(name)
    }

    /// Publishes the staging directory in place of the target.
    ///
    /// The previous target is renamed aside, the stage renamed into place,
    /// then the previous contents are deleted. If the second rename fails
    /// the previous contents are restored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if any rename fails.
    pub fn commit(mut self) -> Result<PathBuf, StorageError> {
        let backup = sibling(&self.target, "previous")?;
        if backup.exists() {
            std::fs::remove_dir_all(&backup).map_err(|e| StorageError::io(&backup, e))?;
        }
        if let Some(parent) = self.target.parent() {
            crate::paths::ensure_dir(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let had_previous = self.target.exists();
        if had_previous {
            std::fs::rename(&self.target, &backup).map_err(|e| StorageError::io(&self.target, e))?;
        }

        if let Err(e) = std::fs::rename(&self.staging, &self.target) {
            if had_previous && let Err(restore) = std::fs::rename(&backup, &self.target) {
                log::warn!(
                    "Failed to restore {} after aborted publish: {restore}",
                    self.target.display()
                );
            }
            return Err(StorageError::io(&self.staging, e));
        }
        self.committed = true;

        if had_previous && let Err(e) = std::fs::remove_dir_all(&backup) {
            log::warn!("Failed to remove {}: {e}", backup.display());
        }

        log::info!("Published {}", self.target.display());
        Ok(self.target.clone())
    }
}

impl Drop for StagedDir {
    fn drop(&mut self) {
        if self.committed || !self.staging.exists() {
            return;
        }
        log::debug!("Discarding uncommitted stage {}", self.staging.display());
        if let Err(e) = std::fs::remove_dir_all(&self.staging) {
            log::warn!("Failed to remove {}: {e}", self.staging.display());
        }
    }
}

/// Writes `contents` to `path` through a `.tmp` file and a rename.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the write or rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents).map_err(|e| StorageError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

fn sibling(target: &Path, suffix: &str) -> Result<PathBuf, StorageError> {
    let name = target
        .file_name()
        .ok_or_else(|| StorageError::InvalidPath {
            path: target.to_path_buf(),
        })?
        .to_string_lossy();
    Ok(target.with_file_name(format!(".{name}.{suffix}")))
}
