#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! On-disk layout and publishing discipline for pipeline artifacts.
//!
//! Every artifact group is staged in a temporary directory and swapped into
//! place only once complete (see [`publish`]), so a failed run never leaves
//! a half-written file where downstream consumers look for it.

pub mod paths;
pub mod publish;

use std::io::Read as _;
use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

pub use paths::DataLayout;
pub use publish::{StagedDir, write_atomic};

/// Errors that can occur while reading or publishing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem error on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A path that cannot be staged (no file name component).
    #[error("Cannot stage path without a file name: {path}")]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },
}

impl StorageError {
    /// Wraps an I/O error with the path it occurred on.
    #[must_use]
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Computes the SHA-256 hex digest of a file, streaming it in chunks.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String, StorageError> {
    let mut file = std::fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| StorageError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Computes the SHA-256 hex digest of a byte slice.
#[must_use]
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
