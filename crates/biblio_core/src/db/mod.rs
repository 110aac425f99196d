//! Catalog database: connection bootstrap, the schema registry and [`Store`].
//!
//! A catalog file is only handed to repositories once `foreign_keys` is on
//! and its schema has been brought to the newest registered version. Files
//! written by a newer build are refused rather than downgraded, since the
//! tombstone and audit columns of a later schema cannot be interpreted here.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod store;

pub use open::{open_db, open_db_in_memory};
pub use store::Store;

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or upgrade a catalog database.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused the file, a pragma or a migration statement.
    Sqlite(rusqlite::Error),
    /// `PRAGMA user_version` is ahead of the bundled migrations.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "catalog storage error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "catalog schema v{db_version} was written by a newer build; \
                 this build reads up to v{latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
