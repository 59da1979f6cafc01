//! SQLite key/value backend.
//!
//! The unit lives in a two-column table keyed by unit name, the same layout
//! mobile key/value storage uses on disk. Several units (for example one per
//! user profile) can share a database file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use super::backend::{BackendError, CollectionBackend, DEFAULT_UNIT_NAME};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS unit_storage (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
)";

/// Error raised while opening a [`SqliteBackend`].
#[derive(Debug, Error)]
pub enum SqliteBackendError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the storage table failed.
    #[error("failed to initialise unit storage table: {source}")]
    Schema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

/// Stores the unit as one row of a SQLite table.
#[derive(Debug)]
pub struct SqliteBackend {
    connection: Mutex<Connection>,
    unit: String,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`, storing the default unit.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteBackendError> {
        Self::open_unit(path, DEFAULT_UNIT_NAME)
    }

    /// Open (or create) the database at `path`, storing the unit `unit`.
    pub fn open_unit(
        path: impl AsRef<Path>,
        unit: impl Into<String>,
    ) -> Result<Self, SqliteBackendError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteBackendError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection, unit)
    }

    /// Use a private in-memory database.
    pub fn open_in_memory(unit: impl Into<String>) -> Result<Self, SqliteBackendError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteBackendError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection, unit)
    }

    fn from_connection(
        connection: Connection,
        unit: impl Into<String>,
    ) -> Result<Self, SqliteBackendError> {
        connection
            .execute(CREATE_TABLE, [])
            .map_err(|source| SqliteBackendError::Schema { source })?;
        Ok(Self {
            connection: Mutex::new(connection),
            unit: unit.into(),
        })
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, BackendError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| BackendError::from("SQLite connection lock poisoned"))?;
        Ok(op(&guard)?)
    }
}

impl CollectionBackend for SqliteBackend {
    fn unit_name(&self) -> &str {
        &self.unit
    }

    fn read(&self) -> Result<Option<Vec<u8>>, BackendError> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM unit_storage WHERE key = ?1",
                params![self.unit],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
        })
    }

    fn write(&self, bytes: &[u8]) -> Result<(), BackendError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO unit_storage (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![self.unit, bytes],
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn units_are_isolated_by_name() {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("storage.db");
        let first = SqliteBackend::open_unit(&db, "first").expect("open first");
        let second = SqliteBackend::open_unit(&db, "second").expect("open second");

        first.write(b"[1]").expect("write first");
        assert!(second.read().expect("read second").is_none());
        assert_eq!(first.read().expect("read first").as_deref(), Some(&b"[1]"[..]));
    }

    #[rstest]
    fn write_replaces_previous_unit() {
        let backend = SqliteBackend::open_in_memory("unit").expect("open");
        backend.write(b"[1]").expect("first write");
        backend.write(b"[2]").expect("second write");
        assert_eq!(backend.read().expect("read").as_deref(), Some(&b"[2]"[..]));
    }
}
