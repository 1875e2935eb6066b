//! Error types for hop-db.

use miette::Diagnostic;
use thiserror::Error;

/// Database error type for hop-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(hop_db::connection),
        help("Check the `database` entry in .hop/local.toml and that the file is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(code(hop_db::query))]
    QueryError(String),

    #[error("Database migration failed: {0}")]
    #[diagnostic(
        code(hop_db::migration),
        help("The hop bookkeeping tables may be corrupted")
    )]
    MigrationError(String),

    #[error("Unknown release status: {0}")]
    #[diagnostic(
        code(hop_db::invalid_status),
        help("hop_release.status must be one of applied, failed, reverted")
    )]
    InvalidStatus(String),
}

impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(_, info) => {
                DbError::QueryError(info.message().to_string())
            }
            other => DbError::QueryError(other.to_string()),
        }
    }
}

impl From<diesel::result::ConnectionError> for DbError {
    fn from(err: diesel::result::ConnectionError) -> Self {
        DbError::ConnectionError(err.to_string())
    }
}

/// Result type alias for hop-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
