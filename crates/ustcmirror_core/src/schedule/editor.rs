//! Locked read-modify-write over a [`ScheduleTable`].

use super::lines::{remove_entry, retain_lines, upsert_entry};
use super::{ScheduleError, ScheduleResult, ScheduleTable};
use log::debug;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Adds and removes repository entries in a recurring-job table.
pub struct ScheduleEditor<T: ScheduleTable> {
    table: T,
    lock_path: Option<PathBuf>,
}

impl<T: ScheduleTable> ScheduleEditor<T> {
    pub fn new(table: T) -> Self {
        Self {
            table,
            lock_path: None,
        }
    }

    /// Serializes edits across processes with an exclusive `flock` on `path`.
    pub fn with_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Installs `line` as the entry of `name`, replacing any previous one.
    pub fn add_line(&self, name: &str, line: &str) -> ScheduleResult<()> {
        self.edit(|table| (upsert_entry(table, name, line), 1))?;
        Ok(())
    }

    /// Removes the entry of `name`; returns the number of lines removed.
    pub fn remove_entry(&self, name: &str) -> ScheduleResult<usize> {
        self.edit(|table| remove_entry(table, name))
    }

    /// Removes every non-comment line matching `predicate`.
    pub fn remove_lines(&self, predicate: impl Fn(&str) -> bool) -> ScheduleResult<usize> {
        self.edit(|table| retain_lines(table, &predicate))
    }

    fn edit(&self, change: impl FnOnce(&str) -> (String, usize)) -> ScheduleResult<usize> {
        let _guard = match &self.lock_path {
            Some(path) => Some(lock_exclusive(path)?),
            None => None,
        };

        let current = self.table.read()?;
        let (updated, changed) = change(&current);
        if updated == current {
            debug!("event=schedule_edit module=schedule status=unchanged");
            return Ok(0);
        }
        self.table.replace(&updated)?;
        debug!(
            "event=schedule_edit module=schedule status=ok changed_lines={}",
            changed
        );
        Ok(changed)
    }
}

fn lock_exclusive(path: &Path) -> ScheduleResult<Flock<File>> {
    let lock_err = |source| ScheduleError::Lock {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(lock_err)?;
    Flock::lock(file, FlockArg::LockExclusive)
        .map_err(|(_, errno)| lock_err(std::io::Error::from(errno)))
}

#[cfg(test)]
mod tests {
    use super::ScheduleEditor;
    use crate::schedule::{managed_line, MemoryScheduleTable, ScheduleTable};

    #[test]
    fn add_then_remove_round_trips_table() {
        let original = "# header\n@reboot /bin/true\n";
        let editor = ScheduleEditor::new(MemoryScheduleTable::new(original));

        editor
            .add_line("pypi", &managed_line("@hourly", "/bin/um", "pypi"))
            .unwrap();
        assert!(editor
            .table()
            .contents()
            .contains("@hourly /bin/um sync pypi\n"));

        assert_eq!(editor.remove_entry("pypi").unwrap(), 1);
        assert_eq!(editor.table().contents(), original);
    }

    #[test]
    fn failed_write_leaves_table_untouched() {
        let editor = ScheduleEditor::new(MemoryScheduleTable::read_only("# a\n"));
        assert!(editor
            .add_line("x", &managed_line("@daily", "/bin/um", "x"))
            .is_err());
        assert_eq!(editor.table().read().unwrap(), "# a\n");
    }

    #[test]
    fn remove_of_absent_entry_skips_write() {
        let editor = ScheduleEditor::new(MemoryScheduleTable::read_only("# only comments\n"));
        assert_eq!(editor.remove_entry("ghost").unwrap(), 0);
    }

    #[test]
    fn locked_edits_succeed_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let editor = ScheduleEditor::new(MemoryScheduleTable::default())
            .with_lock(dir.path().join("crontab.lock"));

        editor
            .add_line("a", &managed_line("@hourly", "/bin/um", "a"))
            .unwrap();
        editor
            .add_line("b", &managed_line("@hourly", "/bin/um", "b"))
            .unwrap();
        assert_eq!(editor.remove_lines(|line| line.ends_with("sync a")).unwrap(), 1);
        assert!(dir.path().join("crontab.lock").exists());
    }
}
