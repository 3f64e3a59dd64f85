//! Connection seam between the session layer and a concrete database.
//!
//! The session code never sees sqlx. It talks to these traits, which a
//! backend implements once; tests substitute a scripted driver.

use async_trait::async_trait;

use sqlweave_core::Value;

use crate::error::DriverError;
use crate::row::Row;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    /// Whatever the backend defaults to.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Settings for one unit of work.
///
/// Recorded by `begin` and applied to the first connection bound inside
/// that transaction.
#[derive(Debug, Clone, Default)]
pub struct TxDefinition {
    pub name: String,
    pub isolation: Isolation,
    pub read_only: bool,
}

impl TxDefinition {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Hands out connections, typically from a pool.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn DriverConnection>, DriverError>;
}

/// One live database connection.
#[async_trait]
pub trait DriverConnection: Send {
    /// Puts the connection in manual-commit mode per `definition`.
    async fn configure(&mut self, definition: &TxDefinition) -> Result<(), DriverError>;

    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Runs a statement, returning the affected-row count.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError>;

    /// Runs a query, returning all rows.
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Returns the connection to wherever it came from, undoing any
    /// transaction state still open on it.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

impl std::fmt::Debug for dyn DriverConnection + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DriverConnection")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builder() {
        let definition = TxDefinition::named("monthly-rollup")
            .isolation(Isolation::Serializable)
            .read_only(true);
        assert_eq!(definition.name, "monthly-rollup");
        assert_eq!(definition.isolation, Isolation::Serializable);
        assert!(definition.read_only);
    }

    #[test]
    fn test_default_isolation() {
        assert_eq!(TxDefinition::default().isolation, Isolation::Default);
    }
}
