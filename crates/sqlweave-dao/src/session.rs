//! Logical execution context for a unit of work.
//!
//! A session is created per unit of work and threaded through DAO calls.
//! It owns at most one [`ConnectionHolder`] and an ordered list of
//! completion callbacks. Acquire and release are strictly paired; the
//! release phase of a completing transaction runs no matter how the
//! completion phase went.

use std::mem;

use tracing::{debug, info, warn};

use crate::driver::{ConnectionSource, DriverConnection, TxDefinition};
use crate::error::{DaoError, DriverError, Result, TxError};
use crate::holder::ConnectionHolder;
use crate::tx::{ConnectionSynchronization, TxOutcome, TxSynchronization};

#[derive(Default)]
pub struct SqlSession {
    holder: Option<ConnectionHolder>,
    depth: usize,
    definition: Option<TxDefinition>,
    synchronizations: Vec<Box<dyn TxSynchronization>>,
    synchronization_active: bool,
}

impl SqlSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn holder(&self) -> Option<&ConnectionHolder> {
        self.holder.as_ref()
    }

    /// Opens a transaction, or joins the one already open.
    ///
    /// Only the outermost `begin` records the definition; nested calls are
    /// logical continuations of the same unit of work and only deepen the
    /// counter that the matching `commit`/`rollback` unwinds.
    pub fn begin(&mut self, definition: TxDefinition) {
        if self.depth == 0 {
            info!(
                name = %definition.name,
                read_only = definition.read_only,
                "Beginning transaction"
            );
            self.definition = Some(definition);
            self.synchronization_active = true;
        } else {
            debug!(depth = self.depth + 1, "Joining active transaction");
        }
        self.depth += 1;
    }

    /// Commits the current transaction.
    ///
    /// Nested calls only unwind the depth counter; the outermost call
    /// drives the registered callbacks and then releases the connection.
    pub async fn commit(&mut self) -> std::result::Result<(), TxError> {
        match self.depth {
            0 => Err(TxError::NotInTransaction),
            1 => {
                self.depth = 0;
                info!("Committing transaction");
                self.complete(TxOutcome::Committed).await
            }
            _ => {
                self.depth -= 1;
                debug!(depth = self.depth, "Deferring commit to the outermost caller");
                Ok(())
            }
        }
    }

    /// Rolls back the current transaction. Depth rules as [`SqlSession::commit`].
    pub async fn rollback(&mut self) -> std::result::Result<(), TxError> {
        match self.depth {
            0 => Err(TxError::NotInTransaction),
            1 => {
                self.depth = 0;
                info!("Rolling back transaction");
                self.complete(TxOutcome::RolledBack).await
            }
            _ => {
                self.depth -= 1;
                debug!(depth = self.depth, "Deferring rollback to the outermost caller");
                Ok(())
            }
        }
    }

    /// Adds a completion callback to the current transaction.
    pub fn register_synchronization(
        &mut self,
        synchronization: Box<dyn TxSynchronization>,
    ) -> std::result::Result<(), TxError> {
        if !self.synchronization_active {
            return Err(TxError::NotInTransaction);
        }
        self.synchronizations.push(synchronization);
        Ok(())
    }

    /// Hands out the session's connection, fetching one if needed.
    ///
    /// Inside a transaction the first acquisition fetches, configures per
    /// the recorded definition, and binds the connection for everything
    /// nested within; later acquisitions reuse it. A source or configure
    /// failure leaves the session unbound.
    pub async fn acquire(
        &mut self,
        source: &dyn ConnectionSource,
    ) -> Result<&mut (dyn DriverConnection + 'static)> {
        let reusable = self
            .holder
            .as_ref()
            .is_some_and(|holder| holder.has_connection() || holder.is_synchronized());

        if reusable {
            if self
                .holder
                .as_ref()
                .is_some_and(|holder| !holder.has_connection())
            {
                // a synchronized holder gave its connection up early
                debug!("Refetching connection for synchronized holder");
                let mut connection = source.acquire().await.map_err(DaoError::Acquire)?;
                if let Some(definition) = &self.definition {
                    connection
                        .configure(definition)
                        .await
                        .map_err(DaoError::Acquire)?;
                }
                if let Some(holder) = self.holder.as_mut() {
                    holder.attach(connection);
                }
            }
            if let Some(holder) = self.holder.as_mut() {
                holder.retain();
            }
            return self.connection();
        }

        let mut connection = source.acquire().await.map_err(DaoError::Acquire)?;
        let transactional = self.depth > 0;
        if transactional {
            let definition = self.definition.clone().unwrap_or_default();
            connection
                .configure(&definition)
                .await
                .map_err(DaoError::Acquire)?;
        }
        let mut holder = ConnectionHolder::new(connection);
        holder.retain();
        if transactional {
            holder.mark_synchronized();
            self.synchronizations
                .push(Box::new(ConnectionSynchronization));
            debug!("Bound connection to active transaction");
        }
        self.holder = Some(holder);
        self.connection()
    }

    /// Gives back one acquisition.
    ///
    /// The connection is physically closed only when the count reaches zero
    /// outside a transaction. A synchronized holder keeps its connection
    /// for the completion phase regardless of the count.
    pub async fn release(&mut self) -> Result<()> {
        let Some(holder) = self.holder.as_mut() else {
            return Ok(());
        };
        holder.release();
        if holder.is_synchronized() || holder.in_use() {
            return Ok(());
        }
        debug!("Closing connection after last release");
        if let Some(mut holder) = self.holder.take() {
            if let Some(connection) = holder.detach() {
                connection.close().await.map_err(DaoError::Driver)?;
            }
        }
        Ok(())
    }

    /// Runs the two completion phases and resets transaction state.
    ///
    /// Phase one drives every callback, remembering the first failure.
    /// Phase two always runs: `after_completion` on every callback, then
    /// unbind and physically close the connection, then clear the
    /// definition and registry. A captured failure is returned only after
    /// phase two finishes.
    async fn complete(&mut self, outcome: TxOutcome) -> std::result::Result<(), TxError> {
        let mut synchronizations = mem::take(&mut self.synchronizations);
        let mut failure: Option<TxError> = None;

        for synchronization in &mut synchronizations {
            let Some(connection) = self
                .holder
                .as_mut()
                .and_then(ConnectionHolder::connection_mut)
            else {
                break;
            };
            if let Err(err) = synchronization.complete(connection, outcome).await {
                warn!(error = %err, "Completion callback failed");
                if failure.is_none() {
                    failure = Some(match outcome {
                        TxOutcome::Committed => TxError::CommitFailed(err),
                        TxOutcome::RolledBack => TxError::RollbackFailed(err),
                    });
                }
            }
        }

        for synchronization in &mut synchronizations {
            synchronization.after_completion(outcome).await;
        }
        if let Some(mut holder) = self.holder.take() {
            holder.clear();
            if let Some(connection) = holder.detach() {
                if let Err(err) = connection.close().await {
                    warn!(error = %err, "Connection close failed during release");
                    if failure.is_none() {
                        failure = Some(TxError::ReleaseFailed(err));
                    }
                }
            }
        }
        self.definition = None;
        self.synchronization_active = false;

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn connection(&mut self) -> Result<&mut (dyn DriverConnection + 'static)> {
        self.holder
            .as_mut()
            .and_then(ConnectionHolder::connection_mut)
            .ok_or(DaoError::Driver(DriverError::Closed))
    }
}

impl std::fmt::Debug for SqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSession")
            .field("holder", &self.holder)
            .field("depth", &self.depth)
            .field("synchronizations", &self.synchronizations.len())
            .finish()
    }
}
