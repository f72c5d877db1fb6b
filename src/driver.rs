use async_trait::async_trait;

use crate::config::ConnectionParams;
use crate::error::SqlPoolError;
use crate::results::{ExecOutcome, ResultSet};
use crate::types::RowValues;

/// Factory for physical database connections.
///
/// The pool treats the driver as opaque: any implementation of this pair of
/// traits is a valid backing driver, whatever its wire protocol. See
/// [`crate::sqlite::SqliteDriver`] for the bundled implementation.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    type Connection: DriverConnection;

    /// Open one physical connection.
    ///
    /// # Errors
    /// Returns `SqlPoolError::ConnectFailed` if the connection cannot be
    /// established.
    async fn connect(&self, params: &ConnectionParams)
    -> Result<Self::Connection, SqlPoolError>;
}

/// Capability set required of a physical connection.
///
/// Closing a connection is dropping it; drivers that need an explicit
/// shutdown handshake perform it in their `Drop` impl.
#[async_trait]
pub trait DriverConnection: Send + 'static {
    /// Lightweight liveness check.
    async fn ping(&mut self) -> Result<(), SqlPoolError>;

    /// Parse and cache a statement on this connection without executing it.
    async fn prepare(&mut self, sql: &str) -> Result<(), SqlPoolError>;

    /// Run a SELECT with positionally bound parameters.
    async fn query(&mut self, sql: &str, params: &[RowValues])
    -> Result<ResultSet, SqlPoolError>;

    /// Run a mutation with positionally bound parameters.
    async fn exec(&mut self, sql: &str, params: &[RowValues])
    -> Result<ExecOutcome, SqlPoolError>;

    /// Open a transaction on this connection.
    async fn begin(&mut self) -> Result<(), SqlPoolError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<(), SqlPoolError>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<(), SqlPoolError>;
}
