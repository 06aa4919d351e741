//! Host crontab access and an in-memory stand-in.

use super::{ScheduleError, ScheduleResult, ScheduleTable};
use log::debug;
use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

const NO_CRONTAB_MARKER: &str = "no crontab for";

/// The invoking user's crontab, driven through the `crontab` tool.
#[derive(Debug, Clone)]
pub struct SystemCrontab {
    bin: PathBuf,
}

impl SystemCrontab {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    fn tool_name(&self) -> String {
        self.bin.display().to_string()
    }

    fn failure(&self, output: &Output) -> ScheduleError {
        ScheduleError::ToolFailed {
            tool: self.tool_name(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

impl Default for SystemCrontab {
    fn default() -> Self {
        Self::new("crontab")
    }
}

impl ScheduleTable for SystemCrontab {
    fn read(&self) -> ScheduleResult<String> {
        let output = Command::new(&self.bin).arg("-l").output()?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        if String::from_utf8_lossy(&output.stderr).contains(NO_CRONTAB_MARKER) {
            debug!("event=crontab_read module=schedule status=empty");
            return Ok(String::new());
        }
        Err(self.failure(&output))
    }

    fn replace(&self, contents: &str) -> ScheduleResult<()> {
        // The temp file is unlinked on drop, whichever way this returns.
        let mut staged = tempfile::NamedTempFile::new()?;
        staged.write_all(contents.as_bytes())?;
        staged.flush()?;

        let output = Command::new(&self.bin).arg(staged.path()).output()?;
        if !output.status.success() {
            return Err(self.failure(&output));
        }
        debug!(
            "event=crontab_replace module=schedule status=ok bytes={}",
            contents.len()
        );
        Ok(())
    }
}

/// In-process table used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryScheduleTable {
    contents: RefCell<String>,
    fail_writes: bool,
}

impl MemoryScheduleTable {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: RefCell::new(contents.into()),
            fail_writes: false,
        }
    }

    /// A table whose `replace` always fails, leaving contents untouched.
    pub fn read_only(contents: impl Into<String>) -> Self {
        Self {
            contents: RefCell::new(contents.into()),
            fail_writes: true,
        }
    }

    pub fn contents(&self) -> String {
        self.contents.borrow().clone()
    }
}

impl ScheduleTable for MemoryScheduleTable {
    fn read(&self) -> ScheduleResult<String> {
        Ok(self.contents())
    }

    fn replace(&self, contents: &str) -> ScheduleResult<()> {
        if self.fail_writes {
            return Err(ScheduleError::ToolFailed {
                tool: "memory".to_string(),
                status: Some(1),
                stderr: "table is read-only".to_string(),
            });
        }
        *self.contents.borrow_mut() = contents.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryScheduleTable, ScheduleTable, SystemCrontab};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn fake_crontab(dir: &Path, script: &str) -> SystemCrontab {
        let bin = dir.join("crontab");
        std::fs::write(&bin, script).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        SystemCrontab::new(bin)
    }

    #[test]
    fn missing_crontab_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let crontab = fake_crontab(
            dir.path(),
            "#!/bin/sh\necho 'no crontab for mirror' >&2\nexit 1\n",
        );
        assert_eq!(crontab.read().unwrap(), "");
    }

    #[test]
    fn other_read_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let crontab = fake_crontab(dir.path(), "#!/bin/sh\necho 'denied' >&2\nexit 2\n");
        let err = crontab.read().unwrap_err();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn replace_installs_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("installed");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"-l\" ]; then cat '{0}'; else cp \"$1\" '{0}'; fi\n",
            installed.display()
        );
        let crontab = fake_crontab(dir.path(), &script);

        crontab.replace("@hourly /bin/true\n").unwrap();
        assert_eq!(crontab.read().unwrap(), "@hourly /bin/true\n");
    }

    #[test]
    fn read_only_memory_table_keeps_contents() {
        let table = MemoryScheduleTable::read_only("# keep\n");
        assert!(table.replace("").is_err());
        assert_eq!(table.contents(), "# keep\n");
    }
}
