use super::{CommandLine, LaunchError, LaunchResult, SyncLauncher};
use crate::model::repository::Repository;

/// Runs `program args...` as-is, with no isolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectLauncher;

impl SyncLauncher for DirectLauncher {
    fn command_for(&self, repo: &Repository) -> LaunchResult<CommandLine> {
        let joined = format!("{} {}", repo.program, repo.args);
        let words = shell_words::split(&joined).map_err(|err| LaunchError::InvalidArgs {
            name: repo.name.clone(),
            message: err.to_string(),
        })?;
        CommandLine::from_words(words).ok_or_else(|| LaunchError::MissingSyncMethod(repo.name.clone()))
    }
}
