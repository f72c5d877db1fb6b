//! SQLite driver backed by `rusqlite`.
//!
//! `rusqlite` is synchronous and in-process, so the async capability methods
//! complete without suspending. Only `ConnectionParams::database` is read
//! (as a file path, or `:memory:`); the network fields are ignored.

mod params;
mod query;

use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, ToSql};

use crate::config::ConnectionParams;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlPoolError;
use crate::results::{ExecOutcome, ResultSet};
use crate::types::RowValues;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Driver opening file-backed (or in-memory) SQLite connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<SqliteConnection, SqlPoolError> {
        let conn = if params.database == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&params.database)
        }
        .map_err(|e| SqlPoolError::ConnectFailed(e.to_string()))?;

        // Concurrent pool members share one database file; wait out the
        // writer lock instead of surfacing SQLITE_BUSY immediately.
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| SqlPoolError::ConnectFailed(e.to_string()))?;
        conn.set_prepared_statement_cache_capacity(params.statement_cache_capacity);

        Ok(SqliteConnection { conn })
    }
}

/// One physical SQLite connection.
pub struct SqliteConnection {
    conn: Connection,
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    async fn ping(&mut self) -> Result<(), SqlPoolError> {
        self.conn
            .query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| SqlPoolError::ConnectFailed(e.to_string()))
    }

    async fn prepare(&mut self, sql: &str) -> Result<(), SqlPoolError> {
        // Parsing the statement warms rusqlite's per-connection cache; later
        // query/exec calls with the same SQL reuse the compiled statement.
        self.conn
            .prepare_cached(sql)
            .map(|_| ())
            .map_err(|e| SqlPoolError::QueryFailed(e.to_string()))
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlPoolError> {
        let values = params::to_sqlite_values(params);
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| SqlPoolError::QueryFailed(e.to_string()))?;
        query::build_result_set(&mut stmt, &values)
    }

    async fn exec(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, SqlPoolError> {
        let values = params::to_sqlite_values(params);
        // SQLite keeps the rowid of the most recent INSERT per connection, so
        // a snapshot from before the statement tells whether this statement
        // generated one; UPDATE and DELETE leave it untouched.
        let rowid_before = self.conn.last_insert_rowid();
        let rows_affected = {
            let mut stmt = self
                .conn
                .prepare_cached(sql)
                .map_err(|e| SqlPoolError::ExecFailed(e.to_string()))?;
            let refs: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
            stmt.execute(&refs[..])
                .map_err(|e| SqlPoolError::ExecFailed(e.to_string()))?
        };
        let rowid_after = self.conn.last_insert_rowid();
        let last_insert_id =
            (rows_affected > 0 && rowid_after != rowid_before).then_some(rowid_after);
        Ok(ExecOutcome {
            rows_affected: rows_affected as u64,
            last_insert_id,
        })
    }

    async fn begin(&mut self) -> Result<(), SqlPoolError> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| SqlPoolError::BeginFailed(e.to_string()))
    }

    async fn commit(&mut self) -> Result<(), SqlPoolError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| SqlPoolError::CommitFailed(e.to_string()))
    }

    async fn rollback(&mut self) -> Result<(), SqlPoolError> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| SqlPoolError::RollbackFailed(e.to_string()))
    }
}
