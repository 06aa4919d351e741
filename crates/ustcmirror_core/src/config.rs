//! Configuration file loading and validation.
//!
//! # Responsibility
//! - Locate and parse the TOML configuration.
//! - Reject configurations the manager cannot run with (relative paths,
//!   blank user or bind address) before any operation starts.
//!
//! # Invariants
//! - Every configured path is absolute after `validate` succeeds.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "USTCMIRROR_CONFIG";
/// Configuration file used when neither flag nor environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ustcmirror/config.toml";

const DEFAULT_IMAGE: &str = "ustclug/mirror:latest";
const DEFAULT_RUNTIME: &str = "docker";
const DEFAULT_CRONTAB_BIN: &str = "crontab";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, message: String },
    RelativePath { field: &'static str, path: PathBuf },
    EmptyValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
            Self::RelativePath { field, path } => write!(
                f,
                "config field `{field}` must be an absolute path, got `{}`",
                path.display()
            ),
            Self::EmptyValue(field) => write!(f, "config field `{field}` must not be empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Validated inputs of the manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Launcher written into schedule lines (`<bin_path> sync <name>`).
    pub bin_path: PathBuf,
    /// Account whose uid/gid the sync container runs as.
    pub sync_user: String,
    pub repo_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Shared configuration mounted read-only into containers.
    pub etc_dir: PathBuf,
    pub bind_addr: String,
    pub db_path: PathBuf,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_runtime")]
    pub container_runtime: String,
    #[serde(default = "default_crontab_bin")]
    pub crontab_bin: PathBuf,
    /// Advisory lock guarding schedule edits; defaults next to `db_path`.
    #[serde(default)]
    pub lock_path: Option<PathBuf>,
    /// Optional directory for rotated copies of the manager's own log.
    #[serde(default)]
    pub log_file_dir: Option<PathBuf>,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_runtime() -> String {
    DEFAULT_RUNTIME.to_string()
}

fn default_crontab_bin() -> PathBuf {
    PathBuf::from(DEFAULT_CRONTAB_BIN)
}

impl Config {
    /// Reads, parses and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    /// Parses and validates TOML text; `origin` only labels errors.
    pub fn parse(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_user.trim().is_empty() {
            return Err(ConfigError::EmptyValue("sync_user"));
        }
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::EmptyValue("bind_addr"));
        }
        if self.container_runtime.trim().is_empty() {
            return Err(ConfigError::EmptyValue("container_runtime"));
        }
        if self.image.trim().is_empty() {
            return Err(ConfigError::EmptyValue("image"));
        }

        let mut required: Vec<(&'static str, &Path)> = vec![
            ("bin_path", self.bin_path.as_path()),
            ("repo_dir", self.repo_dir.as_path()),
            ("log_dir", self.log_dir.as_path()),
            ("etc_dir", self.etc_dir.as_path()),
            ("db_path", self.db_path.as_path()),
        ];
        if let Some(path) = &self.lock_path {
            required.push(("lock_path", path.as_path()));
        }
        if let Some(path) = &self.log_file_dir {
            required.push(("log_file_dir", path.as_path()));
        }
        for (field, path) in required {
            if !path.is_absolute() {
                return Err(ConfigError::RelativePath {
                    field,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Lock file for schedule edits.
    pub fn schedule_lock_path(&self) -> PathBuf {
        match &self.lock_path {
            Some(path) => path.clone(),
            None => {
                let mut name = self.db_path.as_os_str().to_owned();
                name.push(".crontab.lock");
                PathBuf::from(name)
            }
        }
    }
}

/// Picks the config file: explicit flag, then `USTCMIRROR_CONFIG`, then the default.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    resolve_config_path_with(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn resolve_config_path_with(explicit: Option<&Path>, from_env: Option<PathBuf>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or(from_env.filter(|path| !path.as_os_str().is_empty()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::{resolve_config_path_with, Config, ConfigError, DEFAULT_CONFIG_PATH};
    use std::path::{Path, PathBuf};

    const SAMPLE: &str = r#"
bin_path = "/usr/local/bin/ustcmirror"
sync_user = "mirror"
repo_dir = "/srv/repo"
log_dir = "/var/log/ustcmirror"
etc_dir = "/etc/ustcsync"
bind_addr = "10.0.0.1"
db_path = "/var/lib/ustcmirror/repos.db"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = Config::parse(SAMPLE, Path::new("sample.toml")).unwrap();
        assert_eq!(config.sync_user, "mirror");
        assert_eq!(config.image, "ustclug/mirror:latest");
        assert_eq!(config.container_runtime, "docker");
        assert_eq!(config.crontab_bin, PathBuf::from("crontab"));
        assert_eq!(
            config.schedule_lock_path(),
            PathBuf::from("/var/lib/ustcmirror/repos.db.crontab.lock")
        );
    }

    #[test]
    fn missing_field_is_parse_error() {
        let raw = SAMPLE.replace("bind_addr = \"10.0.0.1\"\n", "");
        let err = Config::parse(&raw, Path::new("sample.toml")).unwrap_err();
        match err {
            ConfigError::Parse { message, .. } => assert!(message.contains("bind_addr")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn relative_paths_are_rejected() {
        let raw = SAMPLE.replace("/srv/repo", "srv/repo");
        let err = Config::parse(&raw, Path::new("sample.toml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RelativePath {
                field: "repo_dir",
                ..
            }
        ));
    }

    #[test]
    fn blank_user_is_rejected() {
        let raw = SAMPLE.replace("\"mirror\"", "\"  \"");
        assert!(matches!(
            Config::parse(&raw, Path::new("sample.toml")),
            Err(ConfigError::EmptyValue("sync_user"))
        ));
    }

    #[test]
    fn config_path_precedence() {
        let flag = Path::new("/flag.toml");
        assert_eq!(
            resolve_config_path_with(Some(flag), Some(PathBuf::from("/env.toml"))),
            PathBuf::from("/flag.toml")
        );
        assert_eq!(
            resolve_config_path_with(None, Some(PathBuf::from("/env.toml"))),
            PathBuf::from("/env.toml")
        );
        assert_eq!(
            resolve_config_path_with(None, Some(PathBuf::new())),
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
    }
}
