use futures_util::future::BoxFuture;

use crate::driver::{Driver, DriverConnection};
use crate::error::SqlPoolError;
use crate::executor::Executor;
use crate::pool::PooledConnection;
use crate::results::{ExecOutcome, ResultSet, Row};
use crate::types::RowValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// An in-flight transaction bound exclusively to one pooled connection.
///
/// `commit` and `rollback` consume the transaction, so the open → committed
/// and open → rolled-back transitions are terminal at the type level: no
/// statement can run after either. The bound connection goes back to the
/// pool exactly once, when the transaction is resolved (or dropped).
///
/// A failing statement does **not** roll the transaction back by itself;
/// resolve it explicitly, or use [`Executor::transaction`] which does so on
/// any error. Dropping a still-open transaction discards its connection so
/// uncommitted state never leaks back into the pool.
pub struct Transaction<D: Driver> {
    lease: Option<PooledConnection<D>>,
    state: TxState,
}

impl<D: Driver> Executor<D> {
    /// Open a transaction on an exclusively held connection.
    ///
    /// # Errors
    /// `BeginFailed` if no connection can be acquired or the driver rejects
    /// the begin.
    pub async fn begin(&self) -> Result<Transaction<D>, SqlPoolError> {
        let mut lease = self
            .pool()
            .acquire()
            .await
            .map_err(|err| SqlPoolError::BeginFailed(err.to_string()))?;
        lease.connection_mut().begin().await?;
        tracing::trace!("transaction started");
        Ok(Transaction {
            lease: Some(lease),
            state: TxState::Open,
        })
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// This is the single rollback-on-any-failure call site; step code inside
    /// `f` just propagates errors. If the rollback itself fails it is logged
    /// and the original error is still the one returned — a rollback failure
    /// never masks its cause.
    ///
    /// ```rust,no_run
    /// # use sqlpool::{Executor, RowValues, SqlPoolError, sqlite::SqliteDriver};
    /// # async fn demo(executor: Executor<SqliteDriver>) -> Result<(), SqlPoolError> {
    /// let moved = executor
    ///     .transaction(|tx| {
    ///         Box::pin(async move {
    ///             let out = tx
    ///                 .exec("UPDATE account SET owner = ?1 WHERE id = ?2",
    ///                       &[RowValues::Text("bo".into()), RowValues::Int(7)])
    ///                 .await?;
    ///             if out.rows_affected != 1 {
    ///                 return Err(SqlPoolError::ExecFailed(
    ///                     "expected exactly one row updated".into(),
    ///                 ));
    ///             }
    ///             Ok(out.rows_affected)
    ///         })
    ///     })
    ///     .await?;
    /// # let _ = moved;
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    /// The error from `f`, or `BeginFailed`/`CommitFailed` from the
    /// transaction lifecycle.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, SqlPoolError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut Transaction<D>) -> BoxFuture<'t, Result<T, SqlPoolError>>
            + Send,
    {
        let mut tx = self.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        "rollback failed; reporting the original error"
                    );
                }
                Err(err)
            }
        }
    }
}

impl<D: Driver> Transaction<D> {
    fn conn_mut(&mut self) -> Result<&mut D::Connection, SqlPoolError> {
        if self.state != TxState::Open {
            return Err(SqlPoolError::ExecFailed(
                "transaction is no longer open".into(),
            ));
        }
        self.lease
            .as_mut()
            .map(PooledConnection::connection_mut)
            .ok_or_else(|| SqlPoolError::ExecFailed("transaction is no longer open".into()))
    }

    /// Run a query on the bound connection.
    ///
    /// # Errors
    /// `QueryFailed` if the statement fails.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlPoolError> {
        self.conn_mut()?.query(sql, params).await
    }

    /// Run a query expected to match at most one row on the bound
    /// connection. As with [`Executor::query_one`], the driver fetches the
    /// full result first, so constrain the query.
    ///
    /// # Errors
    /// `QueryFailed` if the statement fails.
    pub async fn query_one(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, SqlPoolError> {
        let result_set = self.query(sql, params).await?;
        Ok(result_set.into_rows().into_iter().next())
    }

    /// Run a mutation on the bound connection.
    ///
    /// # Errors
    /// `ExecFailed` if the statement fails.
    pub async fn exec(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, SqlPoolError> {
        self.conn_mut()?.exec(sql, params).await
    }

    /// Commit and release the bound connection.
    ///
    /// On a driver-rejected commit the transaction is rolled back before the
    /// connection can be reused; if that rollback also fails the connection
    /// is discarded. Either way the commit error is the one reported.
    ///
    /// # Errors
    /// `CommitFailed` if the driver rejects the commit.
    pub async fn commit(mut self) -> Result<(), SqlPoolError> {
        let outcome = self.conn_mut()?.commit().await;
        match outcome {
            Ok(()) => {
                self.state = TxState::Committed;
                tracing::trace!("transaction committed");
                Ok(())
            }
            Err(err) => {
                if let Ok(conn) = self.conn_mut() {
                    if let Err(rollback_err) = conn.rollback().await {
                        tracing::error!(
                            error = %rollback_err,
                            "rollback after failed commit also failed; discarding connection"
                        );
                        if let Some(lease) = self.lease.as_mut() {
                            lease.mark_broken();
                        }
                    }
                }
                self.state = TxState::RolledBack;
                Err(err)
            }
        }
    }

    /// Roll back and release the bound connection.
    ///
    /// # Errors
    /// `RollbackFailed` if the driver rejects the rollback; the connection
    /// is discarded rather than recycled in that case.
    pub async fn rollback(mut self) -> Result<(), SqlPoolError> {
        let outcome = self.conn_mut()?.rollback().await;
        self.state = TxState::RolledBack;
        match outcome {
            Ok(()) => {
                tracing::trace!("transaction rolled back");
                Ok(())
            }
            Err(err) => {
                if let Some(lease) = self.lease.as_mut() {
                    lease.mark_broken();
                }
                Err(err)
            }
        }
    }
}

impl<D: Driver> Drop for Transaction<D> {
    fn drop(&mut self) {
        if self.state == TxState::Open
            && let Some(lease) = self.lease.as_mut()
        {
            // No async rollback is possible here; discard the connection so
            // the open transaction never re-enters the pool.
            lease.mark_broken();
            tracing::warn!("transaction dropped while open; discarding its connection");
        }
    }
}
