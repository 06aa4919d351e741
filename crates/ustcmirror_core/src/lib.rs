//! Core of the mirror repository manager.
//!
//! Keeps each repository's sync configuration in SQLite, provisions its
//! directories, schedules it in the host crontab, and starts or stops its
//! sync process.

pub mod config;
pub mod context;
pub mod db;
pub mod launch;
pub mod logging;
pub mod model;
pub mod provision;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{resolve_config_path, Config, ConfigError};
pub use context::{lookup_user, ManagerContext};
pub use launch::{
    CommandLine, ContainerLauncher, DirectLauncher, LaunchError, LauncherRegistry, ProcessRunner,
    RecordingRunner, SyncLauncher, SystemRunner,
};
pub use logging::{init_logging, level_for, logging_status};
pub use model::repository::{Repository, RepositoryValidationError, CONTAINER_SYNC_METHOD};
pub use provision::{ensure_dir, ProvisionError};
pub use repo::repository_store::{RepositoryStore, SqliteRepositoryStore, StoreError, StoreResult};
pub use schedule::{MemoryScheduleTable, ScheduleEditor, ScheduleError, ScheduleTable, SystemCrontab};
pub use service::manager::{Manager, ManagerError, ManagerResult, RemoveOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
