//! Error types for the storage layer.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Database error types.
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    /// SQLite/sqlx error
    #[error("Database error: {0}")]
    #[diagnostic(code(rolegate_db::sqlx))]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(rolegate_db::migration))]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error (creating the database directory)
    #[error("IO error: {0}")]
    #[diagnostic(code(rolegate_db::io))]
    Io(#[from] std::io::Error),

    /// The address is already bound to another member.
    #[error("Address {address} is already bound to another member")]
    #[diagnostic(
        code(rolegate_db::address_taken),
        help("The other member has to log out before this address can be reused")
    )]
    AddressTaken { address: String },

    /// A stored value could not be decoded.
    #[error("Invalid data: {message}")]
    #[diagnostic(code(rolegate_db::invalid_data))]
    InvalidData { message: String },
}

impl DbError {
    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Whether a sqlx error is a UNIQUE constraint violation.
    pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }
}
