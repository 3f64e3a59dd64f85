//! Reference-counted wrapper around a bound connection.

use crate::driver::DriverConnection;

/// Tracks how many callers the session has handed one connection to.
///
/// The count pairs acquires with releases. A holder marked synchronized
/// belongs to a transaction and keeps its place until completion, even if
/// the count reaches zero or the connection is taken away in the meantime.
pub struct ConnectionHolder {
    connection: Option<Box<dyn DriverConnection>>,
    ref_count: usize,
    synchronized: bool,
}

impl ConnectionHolder {
    #[must_use]
    pub fn new(connection: Box<dyn DriverConnection>) -> Self {
        Self {
            connection: Some(connection),
            ref_count: 0,
            synchronized: false,
        }
    }

    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    #[must_use]
    pub fn in_use(&self) -> bool {
        self.ref_count > 0
    }

    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    pub(crate) fn retain(&mut self) {
        self.ref_count += 1;
    }

    pub(crate) fn release(&mut self) {
        self.ref_count = self.ref_count.saturating_sub(1);
    }

    pub(crate) fn mark_synchronized(&mut self) {
        self.synchronized = true;
    }

    pub(crate) fn attach(&mut self, connection: Box<dyn DriverConnection>) {
        self.connection = Some(connection);
    }

    pub(crate) fn connection_mut(&mut self) -> Option<&mut (dyn DriverConnection + 'static)> {
        self.connection.as_deref_mut()
    }

    /// Takes the connection out, leaving the holder empty.
    pub(crate) fn detach(&mut self) -> Option<Box<dyn DriverConnection>> {
        self.connection.take()
    }

    /// Resets count and synchronization after transaction completion.
    pub(crate) fn clear(&mut self) {
        self.ref_count = 0;
        self.synchronized = false;
    }
}

impl std::fmt::Debug for ConnectionHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHolder")
            .field("has_connection", &self.has_connection())
            .field("ref_count", &self.ref_count)
            .field("synchronized", &self.synchronized)
            .finish()
    }
}
