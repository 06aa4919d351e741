//! CLI argument parsing and command dispatch

use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;
use ustcmirror_core::{
    init_logging, level_for, resolve_config_path, Config, Manager, ManagerContext, ProcessRunner,
    RepositoryStore, ScheduleTable, CONTAINER_SYNC_METHOD,
};

/// Manage scheduled mirror repository syncs
#[derive(Parser, Debug)]
#[command(name = "ustcmirror")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: $USTCMIRROR_CONFIG or /etc/ustcmirror/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Initialize environment
    Init,
    /// Add a new repository
    Add(AddArgs),
    /// Start container to sync
    Sync(NameArg),
    /// Stop container
    Stop(StopArgs),
    /// List repositories
    List,
    /// Remove repository
    Remove(RemoveArgs),
}

#[derive(Args, Debug, PartialEq, Eq)]
struct NameArg {
    /// Repository name
    name: String,
}

#[derive(Args, Debug, PartialEq, Eq)]
struct AddArgs {
    /// Sync method
    #[arg(short, long, default_value = CONTAINER_SYNC_METHOD)]
    program: String,

    /// Arguments passed to program
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    args: String,

    /// Sync interval
    #[arg(short, long, default_value = "@hourly")]
    interval: String,

    /// Repository name
    name: String,
}

#[derive(Args, Debug, PartialEq, Eq)]
struct StopArgs {
    /// Seconds to wait before the container is killed
    #[arg(short, long, default_value_t = 60)]
    timeout: u64,

    /// Repository name
    name: String,
}

#[derive(Args, Debug, PartialEq, Eq)]
struct RemoveArgs {
    /// Also delete the stored program and arguments
    #[arg(long)]
    purge: bool,

    /// Repository name
    name: String,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<ExitCode> {
        let Some(command) = self.command else {
            Cli::command().print_help()?;
            return Ok(ExitCode::from(1));
        };

        let config_path = resolve_config_path(self.config.as_deref());
        let config = Config::load(&config_path)?;
        init_logging(level_for(self.verbose), config.log_file_dir.as_deref())
            .map_err(|err| anyhow!(err))?;
        debug!(
            "event=config_load module=cli status=ok path={}",
            config_path.display()
        );

        let ctx = ManagerContext::from_config(config)?;
        let manager = Manager::open(ctx)?;
        let outcome = dispatch(&manager, command);
        let closed = manager.close();
        outcome?;
        closed?;
        Ok(ExitCode::SUCCESS)
    }
}

fn dispatch<S, T, R>(manager: &Manager<S, T, R>, command: Commands) -> Result<()>
where
    S: RepositoryStore,
    T: ScheduleTable,
    R: ProcessRunner,
{
    match command {
        Commands::Init => manager.init()?,
        Commands::Add(args) => {
            manager.add(&args.name, &args.program, &args.args, &args.interval)?
        }
        Commands::Sync(args) => manager.sync(&args.name)?,
        Commands::Stop(args) => {
            manager.stop(&args.name, args.timeout);
        }
        Commands::List => {
            for (name, program) in manager.list()? {
                println!("{name} {program}");
            }
        }
        Commands::Remove(args) => {
            manager.remove(&args.name, args.purge);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AddArgs, Cli, Commands, RemoveArgs, StopArgs};
    use clap::Parser;
    use std::path::PathBuf;
    use ustcmirror_core::{
        Config, Manager, ManagerContext, MemoryScheduleTable, RecordingRunner,
        SqliteRepositoryStore,
    };

    #[test]
    fn add_defaults_match_container_method() {
        let cli = Cli::try_parse_from(["ustcmirror", "add", "debian"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Add(AddArgs {
                program: "ustcsync".to_string(),
                args: String::new(),
                interval: "@hourly".to_string(),
                name: "debian".to_string(),
            }))
        );
    }

    #[test]
    fn add_accepts_hyphenated_args_and_cron_interval() {
        let cli = Cli::try_parse_from([
            "ustcmirror",
            "add",
            "-p",
            "/usr/bin/rsync",
            "-a",
            "-av --delete",
            "-i",
            "*/10 * * * *",
            "gnu",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Add(args)) => {
                assert_eq!(args.args, "-av --delete");
                assert_eq!(args.interval, "*/10 * * * *");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn stop_default_timeout_is_sixty_seconds() {
        let cli = Cli::try_parse_from(["ustcmirror", "stop", "foo"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Stop(StopArgs {
                timeout: 60,
                name: "foo".to_string(),
            }))
        );
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ustcmirror",
            "remove",
            "--purge",
            "foo",
            "-v",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(
            cli.command,
            Some(Commands::Remove(RemoveArgs {
                purge: true,
                name: "foo".to_string(),
            }))
        );
    }

    #[test]
    fn no_subcommand_parses_to_none() {
        let cli = Cli::try_parse_from(["ustcmirror"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn dispatch_add_then_list() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        let config = Config {
            bin_path: PathBuf::from("/usr/local/bin/ustcmirror"),
            sync_user: "mirror".to_string(),
            repo_dir: dir.join("repo"),
            log_dir: dir.join("log"),
            etc_dir: dir.join("etc"),
            bind_addr: "127.0.0.1".to_string(),
            db_path: dir.join("repos.db"),
            image: "ustclug/mirror:latest".to_string(),
            container_runtime: "docker".to_string(),
            crontab_bin: PathBuf::from("crontab"),
            lock_path: None,
            log_file_dir: None,
        };
        let manager = Manager::new(
            ManagerContext::with_identity(config, 1000, 1000),
            SqliteRepositoryStore::open_in_memory().unwrap(),
            MemoryScheduleTable::default(),
            RecordingRunner::default(),
        );

        let add = Cli::try_parse_from(["ustcmirror", "add", "foo"]).unwrap();
        super::dispatch(&manager, add.command.unwrap()).unwrap();
        let list = Cli::try_parse_from(["ustcmirror", "list"]).unwrap();
        super::dispatch(&manager, list.command.unwrap()).unwrap();

        assert!(dir.join("repo/foo").is_dir());
        assert_eq!(
            manager.schedule().table().contents(),
            "# ustcmirror: foo\n@hourly /usr/local/bin/ustcmirror sync foo\n"
        );
    }
}
