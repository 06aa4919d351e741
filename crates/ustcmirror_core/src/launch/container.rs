use super::{CommandLine, LaunchError, LaunchResult, SyncLauncher};
use crate::model::repository::{log_dir, repo_dir, Repository};
use std::path::PathBuf;

/// Mount point of the shared, read-only sync configuration.
pub const CONTAINER_CONF_DIR: &str = "/opt/ustcsync/etc";
/// Parent of the per-repository working directory mount.
pub const CONTAINER_REPO_ROOT: &str = "/srv/repo";
/// Parent of the per-repository log directory mount.
pub const CONTAINER_LOG_ROOT: &str = "/opt/ustcsync/log";

const BIND_ADDRESS_ENV: &str = "BIND_ADDRESS";
const CONTAINER_NAME_PREFIX: &str = "syncing-";

/// Runs the mirror image under a container runtime.
///
/// The container is named `syncing-<name>` so [`stop_command`] can target it,
/// shares the host network, and runs as the sync user's uid/gid.
#[derive(Debug, Clone)]
pub struct ContainerLauncher {
    pub runtime: String,
    pub image: String,
    pub etc_dir: PathBuf,
    pub repo_root: PathBuf,
    pub log_root: PathBuf,
    pub bind_addr: String,
    pub uid: u32,
    pub gid: u32,
}

pub(crate) fn container_name(name: &str) -> String {
    format!("{CONTAINER_NAME_PREFIX}{name}")
}

impl SyncLauncher for ContainerLauncher {
    fn command_for(&self, repo: &Repository) -> LaunchResult<CommandLine> {
        let name = repo.name.as_str();
        let trailing = shell_words::split(&repo.args).map_err(|err| LaunchError::InvalidArgs {
            name: name.to_string(),
            message: err.to_string(),
        })?;

        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{CONTAINER_CONF_DIR}:ro", self.etc_dir.display()),
            "-v".to_string(),
            format!(
                "{}:{CONTAINER_REPO_ROOT}/{name}",
                repo_dir(&self.repo_root, name).display()
            ),
            "-v".to_string(),
            format!(
                "{}:{CONTAINER_LOG_ROOT}/{name}",
                log_dir(&self.log_root, name).display()
            ),
            "-e".to_string(),
            format!("{BIND_ADDRESS_ENV}={}", self.bind_addr),
            "-u".to_string(),
            format!("{}:{}", self.uid, self.gid),
            "--name".to_string(),
            container_name(name),
            "--net=host".to_string(),
            self.image.clone(),
        ];
        args.extend(trailing);

        Ok(CommandLine {
            program: self.runtime.clone(),
            args,
        })
    }
}

/// Graceful stop of the `syncing-<name>` container; the runtime kills it
/// once `timeout_secs` elapse.
pub fn stop_command(runtime: &str, name: &str, timeout_secs: u64) -> CommandLine {
    CommandLine::new(
        runtime,
        [
            "stop".to_string(),
            "-t".to_string(),
            timeout_secs.to_string(),
            container_name(name),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::{stop_command, ContainerLauncher};
    use crate::launch::{CommandLine, SyncLauncher};
    use crate::model::repository::Repository;
    use std::path::PathBuf;

    fn launcher() -> ContainerLauncher {
        ContainerLauncher {
            runtime: "docker".to_string(),
            image: "ustclug/mirror:latest".to_string(),
            etc_dir: PathBuf::from("/etc"),
            repo_root: PathBuf::from("/repo"),
            log_root: PathBuf::from("/log"),
            bind_addr: "10.0.0.1".to_string(),
            uid: 1000,
            gid: 1000,
        }
    }

    #[test]
    fn container_command_matches_launch_contract() {
        let cmd = launcher()
            .command_for(&Repository::new("foo", "ustcsync", "bar"))
            .unwrap();
        assert_eq!(
            cmd.to_string(),
            "docker run --rm -v /etc:/opt/ustcsync/etc:ro -v /repo/foo:/srv/repo/foo \
             -v /log/foo:/opt/ustcsync/log/foo -e BIND_ADDRESS=10.0.0.1 -u 1000:1000 \
             --name syncing-foo --net=host ustclug/mirror:latest bar"
        );
    }

    #[test]
    fn log_mount_uses_lower_cased_host_dir() {
        let cmd = launcher()
            .command_for(&Repository::new("CPAN", "ustcsync", "cpan --delete"))
            .unwrap();
        assert!(cmd
            .args
            .contains(&"/log/cpan:/opt/ustcsync/log/CPAN".to_string()));
        assert!(cmd.args.contains(&"/repo/CPAN:/srv/repo/CPAN".to_string()));
        assert_eq!(&cmd.args[cmd.args.len() - 2..], ["cpan", "--delete"]);
    }

    #[test]
    fn stop_targets_deterministic_container_name() {
        assert_eq!(
            stop_command("docker", "foo", 0),
            CommandLine::new("docker", ["stop", "-t", "0", "syncing-foo"])
        );
    }
}
