//! Connection-pooled SQL execution over pluggable async drivers.
//!
//! The crate keeps a bounded set of physical connections alive and multiplexes
//! short-lived queries, mutations, and transactions over them, so callers get
//! connection reuse, parameter binding, and rollback-on-failure transactions
//! without touching driver-specific APIs.
//!
//! - [`Pool`] owns the physical connections: bounded capacity, idle recycling,
//!   liveness checks at lease time, and a background reaper for stale idles.
//! - [`Executor`] is the query surface: `query_one`, `query_many`, `exec`,
//!   `prepare`, and `transaction`.
//! - [`Driver`](driver::Driver) is the seam for backends; the `sqlite` feature
//!   (on by default) ships [`sqlite::SqliteDriver`].
//!
//! ```rust,no_run
//! use sqlpool::{ConnectionParams, Executor, Pool, PoolConfig, RowValues};
//! use sqlpool::sqlite::SqliteDriver;
//!
//! # async fn demo() -> Result<(), sqlpool::SqlPoolError> {
//! let pool = Pool::connect(
//!     SqliteDriver,
//!     ConnectionParams::for_database("app.db"),
//!     PoolConfig::default(),
//! )
//! .await?;
//! let executor = Executor::new(pool);
//!
//! let row = executor
//!     .query_one(
//!         "SELECT id, name FROM user WHERE id = ?1",
//!         &[RowValues::Int(1)],
//!     )
//!     .await?;
//! if let Some(row) = row {
//!     println!("name = {:?}", row.get("name"));
//! }
//! # Ok(()) }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod pool;
pub mod prelude;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod transaction;
pub mod types;

pub use config::{ConnectionParams, PoolConfig};
pub use error::SqlPoolError;
pub use executor::{Executor, PreparedStatement, RowCursor};
pub use pool::{Pool, PoolStatus, PooledConnection};
pub use results::{ExecOutcome, ResultSet, Row};
pub use transaction::Transaction;
pub use types::RowValues;
