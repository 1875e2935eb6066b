//! Database connection management.
//!
//! A hop repository is bound to exactly one SQLite database. Opening it
//! enables WAL and creates the `hop_release`/`hop_patch` bookkeeping tables
//! when they are missing.

use std::path::Path;

use diesel::{sql_query, Connection, RunQueryDsl, SqliteConnection};
use tracing::trace;

use crate::{error::Result, migration::apply_migrations};

/// Database connection wrapper with migration support.
pub struct DbConnection {
    conn: SqliteConnection,
}

impl DbConnection {
    /// Opens a database connection and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        trace!(path = %path_str, "opening database");
        let mut conn = SqliteConnection::establish(&path_str)?;

        // WAL mode for better concurrent access
        sql_query("PRAGMA journal_mode = WAL;").execute(&mut conn)?;

        apply_migrations(&mut conn)?;

        Ok(Self { conn })
    }

    /// Opens a private in-memory database with the bookkeeping tables.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = SqliteConnection::establish(":memory:")?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl std::ops::Deref for DbConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl std::ops::DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
