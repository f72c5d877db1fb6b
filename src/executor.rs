use std::sync::Arc;

use crate::driver::{Driver, DriverConnection};
use crate::error::SqlPoolError;
use crate::pool::{Pool, PooledConnection};
use crate::results::{ExecOutcome, ResultSet, Row};
use crate::types::RowValues;

/// User-facing API over a [`Pool`].
///
/// Every operation binds arguments positionally; there is no code path that
/// splices caller-supplied values into the SQL text.
pub struct Executor<D: Driver> {
    pool: Pool<D>,
}

impl<D: Driver> Clone for Executor<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<D: Driver> Executor<D> {
    pub fn new(pool: Pool<D>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<D> {
        &self.pool
    }

    /// Run a query expected to match at most one row.
    ///
    /// The connection is leased for the duration of the call and released
    /// unconditionally, error or not. Zero matching rows is `Ok(None)`, not
    /// an error.
    ///
    /// The driver fetches the full result before the first row is taken, so
    /// constrain the query (key lookup, `LIMIT 1`) rather than relying on
    /// this method to stop early.
    ///
    /// # Errors
    /// `QueryFailed` if the statement fails, or an acquire failure from the
    /// pool.
    pub async fn query_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, SqlPoolError> {
        let mut lease = self.pool.acquire().await?;
        let result_set = lease.connection_mut().query(sql, params).await?;
        Ok(result_set.into_rows().into_iter().next())
    }

    /// Run a query and return a forward-only cursor over its rows.
    ///
    /// The cursor owns the connection lease; it is released when the cursor
    /// is exhausted, explicitly closed, or dropped — whichever happens
    /// first. The cursor cannot be restarted.
    ///
    /// # Errors
    /// `QueryFailed` if the statement fails, or an acquire failure from the
    /// pool.
    pub async fn query_many(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowCursor<D>, SqlPoolError> {
        let mut lease = self.pool.acquire().await?;
        let result_set = lease.connection_mut().query(sql, params).await?;
        Ok(RowCursor::new(lease, result_set))
    }

    /// Run a mutation and report rows affected plus any generated id.
    ///
    /// # Errors
    /// `ExecFailed` if the statement fails, or an acquire failure from the
    /// pool.
    pub async fn exec(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, SqlPoolError> {
        let mut lease = self.pool.acquire().await?;
        lease.connection_mut().exec(sql, params).await
    }

    /// Prepare a statement bound to a leased connection.
    ///
    /// Repeated `query`/`exec` calls on the returned handle reuse the same
    /// physical connection and its statement cache. The connection only goes
    /// back to the pool when the handle is closed or dropped, so holding many
    /// open statements starves the pool.
    ///
    /// # Errors
    /// `QueryFailed` if the statement cannot be prepared, or an acquire
    /// failure from the pool.
    pub async fn prepare(&self, sql: &str) -> Result<PreparedStatement<D>, SqlPoolError> {
        let mut lease = self.pool.acquire().await?;
        lease.connection_mut().prepare(sql).await?;
        Ok(PreparedStatement {
            lease,
            sql: Arc::from(sql),
        })
    }
}

/// Forward-only, non-restartable cursor over a query's rows.
///
/// Holds the connection lease until exhausted, closed, or dropped.
pub struct RowCursor<D: Driver> {
    lease: Option<PooledConnection<D>>,
    rows: std::vec::IntoIter<Row>,
}

impl<D: Driver> RowCursor<D> {
    fn new(lease: PooledConnection<D>, result_set: ResultSet) -> Self {
        let rows = result_set.into_rows().into_iter();
        let mut cursor = Self {
            lease: Some(lease),
            rows,
        };
        // An empty result releases the connection up front.
        if cursor.rows.len() == 0 {
            cursor.lease = None;
        }
        cursor
    }

    /// Rows not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Release the backing connection without consuming the remaining rows.
    pub fn close(mut self) {
        self.lease = None;
        tracing::trace!("row cursor closed early");
    }
}

impl<D: Driver> Iterator for RowCursor<D> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let row = self.rows.next();
        if self.rows.len() == 0 {
            // Fully consumed: hand the connection back immediately rather
            // than waiting for the cursor itself to be dropped.
            self.lease = None;
        }
        row
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// A statement bound to one leased connection, reusable with varying
/// arguments.
///
/// Dropping the handle (or calling [`PreparedStatement::close`]) returns the
/// connection to the pool; the driver keeps the parsed statement in its
/// per-connection cache.
pub struct PreparedStatement<D: Driver> {
    lease: PooledConnection<D>,
    sql: Arc<str>,
}

impl<D: Driver> PreparedStatement<D> {
    /// The SQL text this statement was prepared from.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Run the statement as a query.
    ///
    /// # Errors
    /// `QueryFailed` if execution fails.
    pub async fn query(&mut self, params: &[RowValues]) -> Result<ResultSet, SqlPoolError> {
        let sql = Arc::clone(&self.sql);
        self.lease.connection_mut().query(&sql, params).await
    }

    /// Run the statement as a query expected to match at most one row.
    ///
    /// # Errors
    /// `QueryFailed` if execution fails.
    pub async fn query_one(&mut self, params: &[RowValues]) -> Result<Option<Row>, SqlPoolError> {
        let result_set = self.query(params).await?;
        Ok(result_set.into_rows().into_iter().next())
    }

    /// Run the statement as a mutation.
    ///
    /// # Errors
    /// `ExecFailed` if execution fails.
    pub async fn exec(&mut self, params: &[RowValues]) -> Result<ExecOutcome, SqlPoolError> {
        let sql = Arc::clone(&self.sql);
        self.lease.connection_mut().exec(&sql, params).await
    }

    /// Return the bound connection to the pool.
    pub fn close(self) {}
}
