use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlPoolError;

/// Parameters for opening one physical connection.
///
/// Immutable after construction. File-backed drivers (such as the bundled
/// SQLite driver) only read `database`; network drivers use the full set.
/// Credentials are supplied by the caller, never discovered here.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name, or the file path for file-backed drivers.
    pub database: String,
    /// Capacity of the per-connection prepared-statement cache.
    pub statement_cache_capacity: usize,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            statement_cache_capacity: 16,
        }
    }
}

impl ConnectionParams {
    /// Parameters for a file-backed database (only `database` is meaningful).
    #[must_use]
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("statement_cache_capacity", &self.statement_cache_capacity)
            .finish()
    }
}

/// Connection pool sizing and lifecycle limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of physical connections, leased plus idle.
    pub max_size: usize,
    /// Idle connections beyond this count are closed instead of parked.
    pub max_idle: usize,
    /// Default wait for [`crate::Pool::acquire`] before `PoolExhausted`.
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed by the reaper.
    pub idle_timeout: Duration,
    /// Connections older than this are closed on release instead of recycled.
    pub max_lifetime: Duration,
    /// Ping a connection at lease time; a failing one is replaced once,
    /// transparently.
    pub test_on_acquire: bool,
    /// How often the background reaper scans the idle set.
    pub reap_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            max_idle: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            test_on_acquire: true,
            reap_interval: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_size(mut self, count: usize) -> Self {
        self.max_size = count;
        self
    }

    #[must_use]
    pub fn max_idle(mut self, count: usize) -> Self {
        self.max_idle = count;
        self
    }

    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn test_on_acquire(mut self, enabled: bool) -> Self {
        self.test_on_acquire = enabled;
        self
    }

    #[must_use]
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Validate the configuration before building a pool from it.
    ///
    /// # Errors
    /// Returns `SqlPoolError::Config` for a zero-sized pool or an idle cap
    /// larger than the pool itself.
    pub fn validate(&self) -> Result<(), SqlPoolError> {
        if self.max_size == 0 {
            return Err(SqlPoolError::Config(
                "max_size must be greater than 0".into(),
            ));
        }
        if self.max_idle > self.max_size {
            return Err(SqlPoolError::Config(
                "max_idle cannot be greater than max_size".into(),
            ));
        }
        Ok(())
    }
}
