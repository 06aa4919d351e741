//! Repository domain model.
//!
//! # Responsibility
//! - Define the persisted `(name, program, args)` record.
//! - Derive the per-repository working and log directories.
//!
//! # Invariants
//! - `name` is the unique store key and is case-preserving.
//! - The log directory uses the lower-cased name; the working directory does not.
//! - `name` must be usable as a single path component and a single crontab token.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Reserved sync method that runs inside the mirror container image.
pub const CONTAINER_SYNC_METHOD: &str = "ustcsync";

/// Persisted sync configuration for one mirror repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Unique key; also the directory and container name suffix.
    pub name: String,
    /// Sync method, either [`CONTAINER_SYNC_METHOD`] or an executable name.
    pub program: String,
    /// Opaque argument blob handed to the program.
    pub args: String,
}

/// Validation errors for repository names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryValidationError {
    EmptyName,
    InvalidName(String),
}

impl Display for RepositoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "repository name must not be empty"),
            Self::InvalidName(name) => write!(
                f,
                "repository name `{name}` must be a single path component without whitespace"
            ),
        }
    }
}

impl Error for RepositoryValidationError {}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into(),
        }
    }

    /// Builds a repository applying the add-time argument default: the
    /// containerized method falls back to the repository name when `args`
    /// is blank.
    pub fn with_default_args(
        name: impl Into<String>,
        program: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        let mut repo = Self::new(name, program, args);
        if repo.is_containerized() && repo.args.trim().is_empty() {
            repo.args = repo.name.clone();
        }
        repo
    }

    /// Returns whether this repository uses the reserved container method.
    pub fn is_containerized(&self) -> bool {
        self.program == CONTAINER_SYNC_METHOD
    }

    /// Checks that `name` is safe to use as a directory and crontab token.
    pub fn validate(&self) -> Result<(), RepositoryValidationError> {
        validate_name(&self.name)
    }

    pub fn repo_dir(&self, repo_root: &Path) -> PathBuf {
        repo_dir(repo_root, &self.name)
    }

    pub fn log_dir(&self, log_root: &Path) -> PathBuf {
        log_dir(log_root, &self.name)
    }
}

/// Working directory of repository `name` under `repo_root`.
pub fn repo_dir(repo_root: &Path, name: &str) -> PathBuf {
    repo_root.join(name)
}

/// Log directory of repository `name` under `log_root`, lower-cased.
pub fn log_dir(log_root: &Path, name: &str) -> PathBuf {
    log_root.join(name.to_lowercase())
}

/// Validates a bare repository name.
pub fn validate_name(name: &str) -> Result<(), RepositoryValidationError> {
    if name.is_empty() {
        return Err(RepositoryValidationError::EmptyName);
    }
    let bad_char = name
        .chars()
        .any(|ch| ch == '/' || ch == '\\' || ch.is_whitespace() || ch.is_control());
    if bad_char || name == "." || name == ".." || name.starts_with('-') {
        return Err(RepositoryValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{log_dir, repo_dir, validate_name, Repository, RepositoryValidationError};
    use std::path::Path;

    #[test]
    fn log_dir_is_lower_cased_but_repo_dir_is_not() {
        let repo = Repository::new("CentOS", "ustcsync", "centos");
        assert_eq!(repo.repo_dir(Path::new("/repo")), Path::new("/repo/CentOS"));
        assert_eq!(repo.log_dir(Path::new("/log")), Path::new("/log/centos"));
        assert_eq!(repo_dir(Path::new("/r"), "A"), Path::new("/r/A"));
        assert_eq!(log_dir(Path::new("/l"), "A"), Path::new("/l/a"));
    }

    #[test]
    fn container_method_defaults_args_to_name() {
        let repo = Repository::with_default_args("debian", "ustcsync", "");
        assert_eq!(repo.args, "debian");

        let explicit = Repository::with_default_args("debian", "ustcsync", "rsync://x");
        assert_eq!(explicit.args, "rsync://x");
    }

    #[test]
    fn direct_method_keeps_empty_args() {
        let repo = Repository::with_default_args("local", "/usr/bin/true", "");
        assert_eq!(repo.args, "");
        assert!(!repo.is_containerized());
    }

    #[test]
    fn validate_rejects_path_like_names() {
        assert_eq!(validate_name(""), Err(RepositoryValidationError::EmptyName));
        for bad in ["a/b", "..", ".", "two words", "-rf", "tab\there"] {
            assert!(
                matches!(
                    validate_name(bad),
                    Err(RepositoryValidationError::InvalidName(_))
                ),
                "{bad} should be rejected"
            );
        }
        assert!(validate_name("ubuntu-ports").is_ok());
    }
}
