//! Sync process launching.
//!
//! # Responsibility
//! - Translate a repository's `(program, args)` into a concrete command line.
//! - Run sync commands detached and stop commands to completion.
//!
//! # Invariants
//! - Command lines are argument vectors; nothing is passed through a shell.
//! - Launched sync processes have stdio detached; they log into their own
//!   log directory.
//! - Method selection goes through [`LauncherRegistry`], so new methods do
//!   not touch the manager.

mod command;
mod container;
mod direct;
mod runner;

pub use command::CommandLine;
pub use container::{
    stop_command, ContainerLauncher, CONTAINER_CONF_DIR, CONTAINER_LOG_ROOT, CONTAINER_REPO_ROOT,
};
pub use direct::DirectLauncher;
pub use runner::{ProcessRunner, RecordingRunner, SystemRunner};

use crate::model::repository::Repository;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type LaunchResult<T> = Result<T, LaunchError>;

#[derive(Debug)]
pub enum LaunchError {
    /// The repository names no usable sync method.
    MissingSyncMethod(String),
    /// `program`/`args` could not be split into words.
    InvalidArgs { name: String, message: String },
    Spawn { program: String, source: io::Error },
}

impl Display for LaunchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSyncMethod(name) => {
                write!(f, "repository `{name}` has no sync method configured")
            }
            Self::InvalidArgs { name, message } => {
                write!(f, "invalid arguments for repository `{name}`: {message}")
            }
            Self::Spawn { program, source } => write!(f, "failed to start `{program}`: {source}"),
        }
    }
}

impl Error for LaunchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One way of turning a repository into a runnable command line.
pub trait SyncLauncher {
    fn command_for(&self, repo: &Repository) -> LaunchResult<CommandLine>;
}

/// Sync method name to launcher, with a fallback for arbitrary executables.
pub struct LauncherRegistry {
    methods: BTreeMap<String, Box<dyn SyncLauncher>>,
    fallback: Box<dyn SyncLauncher>,
}

impl LauncherRegistry {
    /// Registry where every program is executed directly.
    pub fn new() -> Self {
        Self {
            methods: BTreeMap::new(),
            fallback: Box::new(DirectLauncher),
        }
    }

    /// Routes repositories whose `program` equals `method` to `launcher`.
    pub fn register(&mut self, method: impl Into<String>, launcher: Box<dyn SyncLauncher>) {
        self.methods.insert(method.into(), launcher);
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn command_for(&self, repo: &Repository) -> LaunchResult<CommandLine> {
        if repo.program.trim().is_empty() {
            return Err(LaunchError::MissingSyncMethod(repo.name.clone()));
        }
        match self.methods.get(repo.program.as_str()) {
            Some(launcher) => launcher.command_for(repo),
            None => self.fallback.command_for(repo),
        }
    }
}

impl Default for LauncherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{LaunchError, LaunchResult, LauncherRegistry, SyncLauncher};
    use crate::launch::CommandLine;
    use crate::model::repository::Repository;

    struct EchoLauncher;

    impl SyncLauncher for EchoLauncher {
        fn command_for(&self, repo: &Repository) -> LaunchResult<CommandLine> {
            Ok(CommandLine::new("echo", [repo.name.clone()]))
        }
    }

    #[test]
    fn registered_method_wins_over_fallback() {
        let mut registry = LauncherRegistry::new();
        registry.register("echo-method", Box::new(EchoLauncher));

        let routed = registry
            .command_for(&Repository::new("foo", "echo-method", "ignored"))
            .unwrap();
        assert_eq!(routed, CommandLine::new("echo", ["foo"]));

        let direct = registry
            .command_for(&Repository::new("foo", "/bin/rsync", "-a src dst"))
            .unwrap();
        assert_eq!(direct, CommandLine::new("/bin/rsync", ["-a", "src", "dst"]));
        assert_eq!(registry.methods(), vec!["echo-method".to_string()]);
    }

    #[test]
    fn blank_program_is_missing_sync_method() {
        let registry = LauncherRegistry::new();
        let err = registry
            .command_for(&Repository::new("foo", "  ", ""))
            .unwrap_err();
        assert!(matches!(err, LaunchError::MissingSyncMethod(name) if name == "foo"));
    }
}
