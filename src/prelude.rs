//! Convenient single-line import of the common surface.
//!
//! ```rust
//! use sqlpool::prelude::*;
//! ```

pub use crate::config::{ConnectionParams, PoolConfig};
pub use crate::driver::{Driver, DriverConnection};
pub use crate::error::SqlPoolError;
pub use crate::executor::{Executor, PreparedStatement, RowCursor};
pub use crate::pool::{Pool, PoolStatus, PooledConnection};
pub use crate::results::{ExecOutcome, ResultSet, Row};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
pub use crate::transaction::Transaction;
pub use crate::types::RowValues;
