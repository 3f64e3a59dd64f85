//! Transaction completion callbacks.

use async_trait::async_trait;

use crate::driver::DriverConnection;
use crate::error::DriverError;

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    RolledBack,
}

/// Callback run while the session completes a transaction.
///
/// Callbacks fire in registration order. Every `complete` is attempted even
/// after one fails, and `after_completion` runs for every callback on every
/// path, so resources registered here are always released.
#[async_trait]
pub trait TxSynchronization: Send {
    /// Drives this resource's part of the commit or rollback.
    async fn complete(
        &mut self,
        connection: &mut dyn DriverConnection,
        outcome: TxOutcome,
    ) -> Result<(), DriverError>;

    /// Runs after the completion phase, successful or not.
    async fn after_completion(&mut self, outcome: TxOutcome) {
        let _ = outcome;
    }
}

/// Drives the bound connection's own commit or rollback.
pub(crate) struct ConnectionSynchronization;

#[async_trait]
impl TxSynchronization for ConnectionSynchronization {
    async fn complete(
        &mut self,
        connection: &mut dyn DriverConnection,
        outcome: TxOutcome,
    ) -> Result<(), DriverError> {
        match outcome {
            TxOutcome::Committed => connection.commit().await,
            TxOutcome::RolledBack => connection.rollback().await,
        }
    }
}
