//! Idempotent creation of per-repository directories.
//!
//! # Invariants
//! - An existing directory is left untouched.
//! - A path occupied by a non-directory is reported, never replaced.

use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ProvisionError {
    NotADirectory(PathBuf),
    Io { path: PathBuf, source: io::Error },
}

impl Display for ProvisionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADirectory(path) => write!(f, "not a directory: {}", path.display()),
            Self::Io { path, source } => {
                write!(f, "failed to create directory {}: {source}", path.display())
            }
        }
    }
}

impl Error for ProvisionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotADirectory(_) => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Ensures `path` exists as a directory, creating missing parents.
pub fn ensure_dir(path: &Path) -> Result<(), ProvisionError> {
    if path.is_dir() {
        return Ok(());
    }
    // Dangling symlinks count as occupied.
    if path.symlink_metadata().is_ok() {
        return Err(ProvisionError::NotADirectory(path.to_path_buf()));
    }

    std::fs::create_dir_all(path).map_err(|source| ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "event=ensure_dir module=provision status=created path={}",
        path.display()
    );
    Ok(())
}

/// Requires `path` to already be a directory without creating it.
pub fn require_dir(path: &Path) -> Result<(), ProvisionError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ProvisionError::NotADirectory(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_dir, require_dir, ProvisionError};

    #[test]
    fn ensure_dir_creates_nested_path_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn ensure_dir_rejects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = ensure_dir(&file).unwrap_err();
        assert!(matches!(err, ProvisionError::NotADirectory(path) if path == file));
        assert!(file.is_file());
    }

    #[test]
    fn require_dir_never_creates() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(matches!(
            require_dir(&missing),
            Err(ProvisionError::NotADirectory(_))
        ));
        assert!(!missing.exists());
    }
}
