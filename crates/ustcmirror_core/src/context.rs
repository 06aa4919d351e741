//! Process-wide context handed to every manager operation.
//!
//! # Invariants
//! - Built once per administrative command from a validated [`Config`].
//! - The sync user's uid/gid are resolved up front; an unknown account is
//!   fatal before any operation runs.

use crate::config::Config;
use crate::launch::{ContainerLauncher, LauncherRegistry};
use crate::service::manager::{ManagerError, ManagerResult};
use crate::model::repository::CONTAINER_SYNC_METHOD;
use log::debug;
use nix::unistd::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerContext {
    pub config: Config,
    pub uid: u32,
    pub gid: u32,
}

impl ManagerContext {
    /// Resolves `config.sync_user` through the host account database.
    pub fn from_config(config: Config) -> ManagerResult<Self> {
        let (uid, gid) = lookup_user(&config.sync_user)?;
        Ok(Self::with_identity(config, uid, gid))
    }

    /// Uses a known identity instead of looking the account up.
    pub fn with_identity(config: Config, uid: u32, gid: u32) -> Self {
        Self { config, uid, gid }
    }

    pub fn container_launcher(&self) -> ContainerLauncher {
        ContainerLauncher {
            runtime: self.config.container_runtime.clone(),
            image: self.config.image.clone(),
            etc_dir: self.config.etc_dir.clone(),
            repo_root: self.config.repo_dir.clone(),
            log_root: self.config.log_dir.clone(),
            bind_addr: self.config.bind_addr.clone(),
            uid: self.uid,
            gid: self.gid,
        }
    }

    /// Registry with the reserved container method wired to this context.
    pub fn launcher_registry(&self) -> LauncherRegistry {
        let mut registry = LauncherRegistry::new();
        registry.register(CONTAINER_SYNC_METHOD, Box::new(self.container_launcher()));
        registry
    }
}

/// Returns `(uid, gid)` of account `name`.
pub fn lookup_user(name: &str) -> ManagerResult<(u32, u32)> {
    let user = User::from_name(name)
        .map_err(|source| ManagerError::UserLookup {
            user: name.to_string(),
            source,
        })?
        .ok_or_else(|| ManagerError::UserNotFound(name.to_string()))?;
    debug!(
        "event=user_lookup module=context status=ok user={} uid={} gid={}",
        name, user.uid, user.gid
    );
    Ok((user.uid.as_raw(), user.gid.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::lookup_user;
    use crate::service::manager::ManagerError;

    #[test]
    fn root_account_resolves_to_zero() {
        assert_eq!(lookup_user("root").unwrap(), (0, 0));
    }

    #[test]
    fn unknown_account_is_user_not_found() {
        let err = lookup_user("ustcmirror-no-such-user").unwrap_err();
        assert!(matches!(err, ManagerError::UserNotFound(user) if user == "ustcmirror-no-such-user"));
    }
}
