//! Error types for pgbulk-postgres

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Database error type
#[derive(Error, Debug)]
pub enum DbError {
    /// Schema, type mapping or encoding problem raised before reaching the server
    #[error(transparent)]
    Core(#[from] pgbulk_core::Error),

    #[error("connection failure: {0}")]
    ConnectionFailure(#[source] sqlx::Error),

    /// The binary COPY stream failed; nothing from it was committed
    #[error("COPY into {table} aborted: {reason}")]
    CopyAborted {
        table: String,
        reason: String,
        source: Option<sqlx::Error>,
    },

    #[error("statement failed: {statement}: {source}")]
    SqlExecution {
        statement: String,
        source: sqlx::Error,
    },

    #[error("not found: {table} with key {key}")]
    NotFound { table: String, key: String },
}

impl DbError {
    /// Sort a driver error into connection trouble or a failed statement.
    pub fn from_sqlx(err: sqlx::Error, statement: &str) -> Self {
        if is_connection_error(&err) {
            Self::ConnectionFailure(err)
        } else {
            Self::SqlExecution {
                statement: statement.to_owned(),
                source: err,
            }
        }
    }

    pub fn copy_aborted(
        table: impl Into<String>,
        reason: impl Into<String>,
        source: Option<sqlx::Error>,
    ) -> Self {
        Self::CopyAborted {
            table: table.into(),
            reason: reason.into(),
            source,
        }
    }

    pub fn is_invalid_entity(&self) -> bool {
        matches!(self, Self::Core(pgbulk_core::Error::InvalidEntity { .. }))
    }

    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, Self::Core(pgbulk_core::Error::UnsupportedType { .. }))
    }

    pub fn is_copy_aborted(&self) -> bool {
        matches!(self, Self::CopyAborted { .. })
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailure(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<pgbulk_core::EncodeError> for DbError {
    fn from(err: pgbulk_core::EncodeError) -> Self {
        Self::Core(err.into())
    }
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
