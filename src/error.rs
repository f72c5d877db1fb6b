use std::time::Duration;

use thiserror::Error;

/// Typed failures surfaced by the engine.
///
/// "No rows" is deliberately absent: single-row lookups return
/// `Ok(None)` rather than an error.
#[derive(Debug, Error)]
pub enum SqlPoolError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to establish database connection: {0}")]
    ConnectFailed(String),

    #[error("no connection became available within {0:?}")]
    PoolExhausted(Duration),

    #[error("connection pool is shut down")]
    PoolClosed,

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("statement execution failed: {0}")]
    ExecFailed(String),

    #[error("failed to begin transaction: {0}")]
    BeginFailed(String),

    #[error("failed to commit transaction: {0}")]
    CommitFailed(String),

    #[error("failed to roll back transaction: {0}")]
    RollbackFailed(String),

    #[error("parameter conversion error: {0}")]
    Parameter(String),
}
