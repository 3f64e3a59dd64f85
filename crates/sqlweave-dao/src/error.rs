//! Error types for the session and statement layers.

use sqlweave_core::{DslError, ParseError, RenderError};
use thiserror::Error;

use crate::catalog::StatementKind;

/// Errors raised by a concrete database driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The connection was already closed.
    #[error("connection is closed")]
    Closed,

    /// Driver failure outside sqlx.
    #[error("driver failure: {0}")]
    Failed(String),
}

/// Errors raised while completing a transaction.
#[derive(Debug, Error)]
pub enum TxError {
    /// Commit could not complete.
    #[error("commit failed: {0}")]
    CommitFailed(DriverError),

    /// Rollback could not complete.
    #[error("rollback failed: {0}")]
    RollbackFailed(DriverError),

    /// Work failed and the rollback it triggered failed as well.
    #[error("rollback failed ({rollback}) while handling: {cause}")]
    RollbackAfterFailure {
        rollback: Box<TxError>,
        cause: Box<DaoError>,
    },

    /// Completion was requested with no transaction active.
    #[error("no transaction is active")]
    NotInTransaction,

    /// The connection could not be released after completion.
    #[error("release failed after completion: {0}")]
    ReleaseFailed(DriverError),
}

/// Umbrella error for DAO operations.
#[derive(Debug, Error)]
pub enum DaoError {
    /// Template parse error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Template render error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Predicate builder error.
    #[error("predicate error: {0}")]
    Dsl(#[from] DslError),

    /// Execution-time driver error.
    #[error("database error: {0}")]
    Driver(#[from] DriverError),

    /// Transaction completion error.
    #[error("transaction error: {0}")]
    Tx(#[from] TxError),

    /// No connection could be obtained from the source.
    #[error("could not acquire a connection: {0}")]
    Acquire(DriverError),

    /// No statement registered under this id.
    #[error("unknown statement `{0}`")]
    UnknownStatement(String),

    /// A statement was used against its registered kind.
    #[error("statement `{id}` is registered as {actual}, not {expected}")]
    StatementKind {
        id: String,
        expected: StatementKind,
        actual: StatementKind,
    },

    /// No dialect registered under this name.
    #[error("unknown dialect `{0}`")]
    UnknownDialect(String),

    /// A caller-supplied row mapper rejected a row.
    #[error("row mapping failed: {0}")]
    MapRow(String),

    /// Statement file could not be read.
    #[error("statement file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for DAO operations.
pub type Result<T> = std::result::Result<T, DaoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_driver_render_differently() {
        let acquire = DaoError::Acquire(DriverError::Closed);
        let driver = DaoError::Driver(DriverError::Closed);
        assert_eq!(
            acquire.to_string(),
            "could not acquire a connection: connection is closed"
        );
        assert_eq!(driver.to_string(), "database error: connection is closed");
    }

    #[test]
    fn test_rollback_after_failure_names_both_causes() {
        let err = TxError::RollbackAfterFailure {
            rollback: Box::new(TxError::RollbackFailed(DriverError::Failed(
                "broken pipe".to_string(),
            ))),
            cause: Box::new(DaoError::MapRow("missing column".to_string())),
        };
        let text = err.to_string();
        assert!(text.contains("broken pipe"));
        assert!(text.contains("missing column"));
    }

    #[test]
    fn test_statement_kind_message() {
        let err = DaoError::StatementKind {
            id: "users.insert".to_string(),
            expected: StatementKind::Query,
            actual: StatementKind::Update,
        };
        assert_eq!(
            err.to_string(),
            "statement `users.insert` is registered as update, not query"
        );
    }
}
