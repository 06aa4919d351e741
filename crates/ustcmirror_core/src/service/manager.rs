//! Mirror repository lifecycle manager.
//!
//! # Responsibility
//! - Compose store, provisioning, schedule editing and launching into the
//!   `init`, `add`, `sync`, `stop`, `list` and `remove` operations.
//!
//! # Invariants
//! - No in-memory repository state; every call re-derives from the store,
//!   the filesystem and the schedule table.
//! - `add` commits the store row before touching the schedule; a schedule
//!   failure is logged and does not undo the row.
//! - `sync` never creates the working directory; only `add` does.
//! - `stop` and `remove` never return errors; failed steps are logged with
//!   the operation and repository name.

use crate::config::ConfigError;
use crate::context::ManagerContext;
use crate::db::DbError;
use crate::launch::{
    stop_command, LaunchError, LauncherRegistry, ProcessRunner, SystemRunner,
};
use crate::model::repository::{log_dir, repo_dir, validate_name, Repository, RepositoryValidationError};
use crate::provision::{ensure_dir, require_dir, ProvisionError};
use crate::repo::repository_store::{RepositoryStore, SqliteRepositoryStore, StoreError};
use crate::schedule::{managed_line, ScheduleEditor, ScheduleTable, SystemCrontab};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors surfaced by manager operations.
#[derive(Debug)]
pub enum ManagerError {
    /// The configured sync account does not exist.
    UserNotFound(String),
    UserLookup {
        user: String,
        source: nix::errno::Errno,
    },
    /// A required path is occupied by something other than a directory.
    NotADirectory(PathBuf),
    /// Unknown repository name.
    NotFound(String),
    /// No sync method configured for the repository.
    MissingSyncMethod(String),
    InvalidName(RepositoryValidationError),
    InvalidInterval(String),
    Provision(ProvisionError),
    Store(StoreError),
    Db(DbError),
    Launch(LaunchError),
    Config(ConfigError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound(user) => write!(f, "sync user not found: {user}"),
            Self::UserLookup { user, source } => {
                write!(f, "failed to look up sync user {user}: {source}")
            }
            Self::NotADirectory(path) => write!(f, "not a directory: {}", path.display()),
            Self::NotFound(name) => write!(f, "repository not found: {name}"),
            Self::MissingSyncMethod(name) => {
                write!(f, "repository `{name}` has no sync method configured")
            }
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::InvalidInterval(interval) => {
                write!(f, "invalid schedule interval `{interval}`")
            }
            Self::Provision(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Launch(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UserLookup { source, .. } => Some(source),
            Self::InvalidName(err) => Some(err),
            Self::Provision(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Launch(err) => Some(err),
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProvisionError> for ManagerError {
    fn from(value: ProvisionError) -> Self {
        match value {
            ProvisionError::NotADirectory(path) => Self::NotADirectory(path),
            other => Self::Provision(other),
        }
    }
}

impl From<StoreError> for ManagerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(name) => Self::NotFound(name),
            other => Self::Store(other),
        }
    }
}

impl From<LaunchError> for ManagerError {
    fn from(value: LaunchError) -> Self {
        match value {
            LaunchError::MissingSyncMethod(name) => Self::MissingSyncMethod(name),
            other => Self::Launch(other),
        }
    }
}

impl From<DbError> for ManagerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ConfigError> for ManagerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepositoryValidationError> for ManagerError {
    fn from(value: RepositoryValidationError) -> Self {
        Self::InvalidName(value)
    }
}

/// What `remove` managed to clean up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub log_dir_removed: bool,
    pub schedule_lines_removed: usize,
    pub row_deleted: bool,
}

/// Lifecycle manager over a store, a schedule table and a process runner.
pub struct Manager<S: RepositoryStore, T: ScheduleTable, R: ProcessRunner> {
    ctx: ManagerContext,
    store: S,
    schedule: ScheduleEditor<T>,
    launchers: LauncherRegistry,
    runner: R,
}

impl Manager<SqliteRepositoryStore, SystemCrontab, SystemRunner> {
    /// Opens the store and wires the host crontab and process runner.
    pub fn open(ctx: ManagerContext) -> ManagerResult<Self> {
        if let Some(parent) = ctx.config.db_path.parent() {
            ensure_dir(parent)?;
        }
        let store = SqliteRepositoryStore::open(&ctx.config.db_path)?;
        let schedule = ScheduleEditor::new(SystemCrontab::new(&ctx.config.crontab_bin))
            .with_lock(ctx.config.schedule_lock_path());
        Ok(Self::with_parts(ctx, store, schedule, SystemRunner))
    }

    /// Releases the store handle, reporting close failures.
    pub fn close(self) -> ManagerResult<()> {
        self.store.close()?;
        Ok(())
    }
}

impl<S: RepositoryStore, T: ScheduleTable, R: ProcessRunner> Manager<S, T, R> {
    /// Builds a manager over an unlocked schedule table.
    pub fn new(ctx: ManagerContext, store: S, table: T, runner: R) -> Self {
        Self::with_parts(ctx, store, ScheduleEditor::new(table), runner)
    }

    pub fn with_parts(
        ctx: ManagerContext,
        store: S,
        schedule: ScheduleEditor<T>,
        runner: R,
    ) -> Self {
        let launchers = ctx.launcher_registry();
        Self {
            ctx,
            store,
            schedule,
            launchers,
            runner,
        }
    }

    pub fn context(&self) -> &ManagerContext {
        &self.ctx
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schedule(&self) -> &ScheduleEditor<T> {
        &self.schedule
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Creates the repository, log and config roots.
    pub fn init(&self) -> ManagerResult<()> {
        let config = &self.ctx.config;
        for dir in [&config.repo_dir, &config.log_dir, &config.etc_dir] {
            ensure_dir(dir)?;
        }
        info!(
            "event=init module=manager status=ok repo_dir={} log_dir={} etc_dir={}",
            config.repo_dir.display(),
            config.log_dir.display(),
            config.etc_dir.display()
        );
        Ok(())
    }

    /// Registers (or re-registers) a repository and schedules it.
    ///
    /// Directories are provisioned first, then the row is upserted, then the
    /// schedule entry is installed. A schedule failure is logged only.
    pub fn add(&self, name: &str, program: &str, args: &str, interval: &str) -> ManagerResult<()> {
        validate_name(name)?;
        if program.trim().is_empty() {
            return Err(ManagerError::MissingSyncMethod(name.to_string()));
        }
        if interval.trim().is_empty() || interval.contains(['\n', '\r']) {
            return Err(ManagerError::InvalidInterval(interval.to_string()));
        }

        let repo = Repository::with_default_args(name, program, args);
        let config = &self.ctx.config;
        ensure_dir(&repo.repo_dir(&config.repo_dir))?;
        ensure_dir(&repo.log_dir(&config.log_dir))?;

        self.store.set(&repo).inspect_err(|err| {
            error!(
                "event=add module=manager status=error stage=store name={} error={}",
                name, err
            );
        })?;

        let line = managed_line(interval, &config.bin_path.to_string_lossy(), name);
        match self.schedule.add_line(name, &line) {
            Ok(()) => info!(
                "event=add module=manager status=ok name={} program={} interval={}",
                name,
                repo.program,
                interval.trim()
            ),
            Err(err) => warn!(
                "event=add module=manager status=partial stage=schedule name={} error={}",
                name, err
            ),
        }
        Ok(())
    }

    /// Starts a detached sync run for `name`.
    pub fn sync(&self, name: &str) -> ManagerResult<()> {
        validate_name(name)?;
        let repo = self.store.get(name)?;
        let config = &self.ctx.config;

        require_dir(&repo_dir(&config.repo_dir, name))?;
        // The log dir may have been removed, or created by another user.
        ensure_dir(&log_dir(&config.log_dir, name))?;

        let cmd = self.launchers.command_for(&repo)?;
        debug!("event=sync module=manager status=start name={} command={}", name, cmd);
        self.runner.spawn_detached(&cmd).inspect_err(|err| {
            error!(
                "event=sync module=manager status=error name={} error={}",
                name, err
            );
        })?;
        info!(
            "event=sync module=manager status=ok name={} program={}",
            name, repo.program
        );
        Ok(())
    }

    /// Asks the runtime to stop `syncing-<name>` within `timeout_secs`.
    ///
    /// Returns the stop tool's exit status, `None` if it could not be run
    /// or was killed by a signal.
    pub fn stop(&self, name: &str, timeout_secs: u64) -> Option<i32> {
        if let Err(err) = validate_name(name) {
            error!(
                "event=stop module=manager status=error stage=validate name={} error={}",
                name, err
            );
            return None;
        }
        let cmd = stop_command(&self.ctx.config.container_runtime, name, timeout_secs);
        debug!("event=stop module=manager status=start name={} command={}", name, cmd);
        match self.runner.run(&cmd) {
            Ok(Some(0)) => {
                debug!("event=stop module=manager status=ok name={} exit_code=0", name);
                Some(0)
            }
            Ok(code) => {
                warn!(
                    "event=stop module=manager status=error name={} exit_code={}",
                    name,
                    code.map_or_else(|| "signal".to_string(), |code| code.to_string())
                );
                code
            }
            Err(err) => {
                error!(
                    "event=stop module=manager status=error name={} error={}",
                    name, err
                );
                None
            }
        }
    }

    /// Lists `(name, program)` pairs in store order.
    pub fn list(&self) -> ManagerResult<impl Iterator<Item = (String, String)>> {
        let repos = self.store.list()?;
        Ok(repos.into_iter().map(|repo| (repo.name, repo.program)))
    }

    /// De-schedules `name` and deletes its log directory; with `purge` the
    /// store row is deleted too. Never fails: each step is logged instead.
    pub fn remove(&self, name: &str, purge: bool) -> RemoveOutcome {
        let mut outcome = RemoveOutcome::default();
        // An invalid name could resolve to the log root or its parent.
        if let Err(err) = validate_name(name) {
            error!(
                "event=remove module=manager status=error stage=validate name={} error={}",
                name, err
            );
            return outcome;
        }

        let logs = log_dir(&self.ctx.config.log_dir, name);
        match std::fs::remove_dir_all(&logs) {
            Ok(()) => outcome.log_dir_removed = true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => debug!(
                "event=remove module=manager status=skip stage=logs name={} path={}",
                name,
                logs.display()
            ),
            Err(err) => error!(
                "event=remove module=manager status=error stage=logs name={} path={} error={}",
                name,
                logs.display(),
                err
            ),
        }

        match self.schedule.remove_entry(name) {
            Ok(removed) => outcome.schedule_lines_removed = removed,
            Err(err) => error!(
                "event=remove module=manager status=error stage=schedule name={} error={}",
                name, err
            ),
        }

        if purge {
            match self.store.delete(name) {
                Ok(deleted) => outcome.row_deleted = deleted,
                Err(err) => error!(
                    "event=remove module=manager status=error stage=store name={} error={}",
                    name, err
                ),
            }
        }

        info!(
            "event=remove module=manager status=ok name={} log_dir_removed={} schedule_lines_removed={} row_deleted={}",
            name, outcome.log_dir_removed, outcome.schedule_lines_removed, outcome.row_deleted
        );
        outcome
    }
}
