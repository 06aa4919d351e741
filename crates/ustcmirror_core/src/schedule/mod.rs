//! Recurring-job table editing.
//!
//! # Responsibility
//! - Add and remove the one scheduling entry owned by each repository.
//! - Leave unrelated lines, comments included, byte-for-byte intact.
//!
//! # Invariants
//! - Every edit is a full read-modify-write of the table; the write step
//!   replaces the table wholesale through the table tool.
//! - Edits from concurrent administrative commands are serialized by an
//!   advisory lock when a lock path is configured.
//! - Managed entries are tagged with a marker comment naming the repository.

mod crontab;
mod editor;
mod lines;

pub use crontab::{MemoryScheduleTable, SystemCrontab};
pub use editor::ScheduleEditor;
pub use lines::{
    is_managed_line_for, managed_line, marker_line, remove_entry, retain_lines, upsert_entry,
    MARKER_PREFIX,
};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[derive(Debug)]
pub enum ScheduleError {
    Io(io::Error),
    ToolFailed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    Lock {
        path: PathBuf,
        source: io::Error,
    },
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "schedule table i/o failed: {err}"),
            Self::ToolFailed {
                tool,
                status,
                stderr,
            } => match status {
                Some(code) => write!(f, "`{tool}` exited with status {code}: {stderr}"),
                None => write!(f, "`{tool}` was terminated by a signal: {stderr}"),
            },
            Self::Lock { path, source } => {
                write!(f, "failed to lock {}: {source}", path.display())
            }
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::ToolFailed { .. } => None,
            Self::Lock { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for ScheduleError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Whole-table access to the host recurring-job table.
pub trait ScheduleTable {
    /// Returns the full current table; a missing table reads as empty.
    fn read(&self) -> ScheduleResult<String>;
    /// Replaces the full table with `contents`.
    fn replace(&self, contents: &str) -> ScheduleResult<()>;
}

impl<T: ScheduleTable + ?Sized> ScheduleTable for &T {
    fn read(&self) -> ScheduleResult<String> {
        (**self).read()
    }

    fn replace(&self, contents: &str) -> ScheduleResult<()> {
        (**self).replace(contents)
    }
}
