//! Repository store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the durable `name -> (program, args)` mapping.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `set` is an upsert: the latest `(program, args)` for a name wins.
//! - `get` reports unknown names as `StoreError::NotFound`, never as an empty row.
//! - The owned connection is released on drop; `close` surfaces close errors.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::repository::Repository;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const REPOSITORY_SELECT_SQL: &str = "SELECT name, program, args FROM repositories";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error for repository persistence and lookups.
#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "repository not found: {name}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable mapping from repository name to its sync configuration.
pub trait RepositoryStore {
    fn get(&self, name: &str) -> StoreResult<Repository>;
    fn set(&self, repo: &Repository) -> StoreResult<()>;
    /// Returns every row in the backing store's default order.
    fn list(&self) -> StoreResult<Vec<Repository>>;
    /// Deletes one row; returns whether a row existed.
    fn delete(&self, name: &str) -> StoreResult<bool>;
}

/// SQLite-backed repository store owning its connection.
pub struct SqliteRepositoryStore {
    conn: Connection,
}

impl SqliteRepositoryStore {
    /// Opens (and migrates) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a migrated in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps a connection that has already been migrated.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Releases the underlying handle, reporting close failures.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))
    }
}

impl RepositoryStore for SqliteRepositoryStore {
    fn get(&self, name: &str) -> StoreResult<Repository> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REPOSITORY_SELECT_SQL} WHERE name = ?1;"))?;
        stmt.query_row([name], parse_repository_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn set(&self, repo: &Repository) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO repositories (name, program, args)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                program = excluded.program,
                args = excluded.args;",
            params![repo.name, repo.program, repo.args],
        )?;
        debug!(
            "event=store_set module=store status=ok name={} program={}",
            repo.name, repo.program
        );
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Repository>> {
        let mut stmt = self.conn.prepare(&format!("{REPOSITORY_SELECT_SQL};"))?;
        let rows = stmt.query_map([], parse_repository_row)?;
        let mut repos = Vec::new();
        for row in rows {
            repos.push(row?);
        }
        Ok(repos)
    }

    fn delete(&self, name: &str) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM repositories WHERE name = ?1;", [name])?;
        Ok(changed > 0)
    }
}

// Rows written by older tooling may carry NULL program/args.
fn parse_repository_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    Ok(Repository {
        name: row.get("name")?,
        program: row.get::<_, Option<String>>("program")?.unwrap_or_default(),
        args: row.get::<_, Option<String>>("args")?.unwrap_or_default(),
    })
}
