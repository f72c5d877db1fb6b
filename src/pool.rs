use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{ConnectionParams, PoolConfig};
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlPoolError;

/// Bounded pool of physical connections for one driver.
///
/// Cloning is cheap; all clones share the same pool. There is no hidden
/// global instance — construct one with [`Pool::connect`] and pass it to
/// whatever needs it.
pub struct Pool<D: Driver> {
    inner: Arc<PoolInner<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Physical connections alive, leased plus idle.
    pub total: usize,
    /// Connections parked and available for lease.
    pub idle: usize,
    /// Connections currently leased out.
    pub leased: usize,
    /// Configured capacity.
    pub max_size: usize,
}

struct IdleEntry<C> {
    conn: C,
    created_at: Instant,
    idle_since: Instant,
}

struct PoolInner<D: Driver> {
    driver: D,
    params: ConnectionParams,
    config: PoolConfig,
    /// Permits bound the number of leases; total never exceeds `max_size`
    /// because a new connection is only created while holding a permit and
    /// no idle connection is available.
    semaphore: Semaphore,
    idle: Mutex<VecDeque<IdleEntry<D::Connection>>>,
    total: AtomicUsize,
    closed: AtomicBool,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<D: Driver> Pool<D> {
    /// Build a pool, verifying reachability by opening and pinging one
    /// connection (which is then parked idle), and start the background
    /// idle reaper.
    ///
    /// # Errors
    /// Returns `SqlPoolError::Config` for an invalid configuration or
    /// `SqlPoolError::ConnectFailed` if the probe connection cannot be
    /// established.
    pub async fn connect(
        driver: D,
        params: ConnectionParams,
        config: PoolConfig,
    ) -> Result<Self, SqlPoolError> {
        config.validate()?;
        let inner = Arc::new(PoolInner {
            semaphore: Semaphore::new(config.max_size),
            driver,
            params,
            config,
            idle: Mutex::new(VecDeque::new()),
            total: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            reaper: Mutex::new(None),
        });

        let mut conn = inner.driver.connect(&inner.params).await?;
        conn.ping().await?;
        inner.total.store(1, Ordering::Release);
        let now = Instant::now();
        inner.lock_idle().push_back(IdleEntry {
            conn,
            created_at: now,
            idle_since: now,
        });

        let handle = inner.spawn_reaper();
        *lock_poison_free(&inner.reaper) = Some(handle);

        tracing::debug!(max_size = inner.config.max_size, "connection pool ready");
        Ok(Self { inner })
    }

    /// Lease a connection, waiting up to the configured `acquire_timeout`.
    ///
    /// # Errors
    /// `PoolExhausted` if the pool stays saturated past the timeout,
    /// `PoolClosed` after shutdown, `ConnectFailed` if a replacement
    /// connection cannot be created.
    pub async fn acquire(&self) -> Result<PooledConnection<D>, SqlPoolError> {
        self.acquire_timeout(self.inner.config.acquire_timeout).await
    }

    /// Lease a connection, waiting at most `timeout`.
    ///
    /// # Errors
    /// See [`Pool::acquire`].
    pub async fn acquire_timeout(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection<D>, SqlPoolError> {
        let inner = &*self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(SqlPoolError::PoolClosed);
        }

        let permit = tokio::time::timeout(timeout, inner.semaphore.acquire())
            .await
            .map_err(|_| SqlPoolError::PoolExhausted(timeout))?
            .map_err(|_| SqlPoolError::PoolClosed)?;
        // The permit travels with the lease from here on; the guard hands it
        // back if this future errors out or is dropped mid-await.
        permit.forget();
        let mut guard = PermitGuard {
            inner,
            counted: false,
            armed: true,
        };

        while let Some(entry) = inner.pop_idle() {
            guard.counted = true;
            let mut conn = entry.conn;
            if !inner.config.test_on_acquire {
                guard.armed = false;
                return Ok(PooledConnection::new(
                    Arc::clone(&self.inner),
                    conn,
                    entry.created_at,
                ));
            }
            match conn.ping().await {
                Ok(()) => {
                    guard.armed = false;
                    tracing::trace!("leased idle connection");
                    return Ok(PooledConnection::new(
                        Arc::clone(&self.inner),
                        conn,
                        entry.created_at,
                    ));
                }
                Err(err) => {
                    // Broken at lease time: discard it and recreate once,
                    // transparently to the caller.
                    inner.total.fetch_sub(1, Ordering::AcqRel);
                    guard.counted = false;
                    drop(conn);
                    tracing::debug!(error = %err, "replacing broken idle connection");
                    break;
                }
            }
        }

        match inner.driver.connect(&inner.params).await {
            Ok(conn) => {
                inner.total.fetch_add(1, Ordering::AcqRel);
                guard.armed = false;
                tracing::trace!("leased newly created connection");
                Ok(PooledConnection::new(
                    Arc::clone(&self.inner),
                    conn,
                    Instant::now(),
                ))
            }
            Err(err) => Err(err),
        }
    }

    /// Shut the pool down: close all idle connections, fail pending and
    /// future `acquire` calls with `PoolClosed`, stop the reaper. Leased
    /// connections are closed when released.
    pub fn close(&self) {
        let inner = &*self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.semaphore.close();
        if let Some(handle) = lock_poison_free(&inner.reaper).take() {
            handle.abort();
        }
        let drained: Vec<_> = inner.lock_idle().drain(..).collect();
        if !drained.is_empty() {
            inner.total.fetch_sub(drained.len(), Ordering::AcqRel);
        }
        drop(drained);
        tracing::debug!("connection pool closed");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Current occupancy snapshot.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let idle = self.inner.lock_idle().len();
        let total = self.inner.total.load(Ordering::Acquire);
        PoolStatus {
            total,
            idle,
            leased: total.saturating_sub(idle),
            max_size: self.inner.config.max_size,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl<D: Driver> PoolInner<D> {
    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<IdleEntry<D::Connection>>> {
        lock_poison_free(&self.idle)
    }

    /// Pop the most recently used idle connection, discarding any whose
    /// lifetime has expired along the way.
    fn pop_idle(&self) -> Option<IdleEntry<D::Connection>> {
        let mut idle = self.lock_idle();
        while let Some(entry) = idle.pop_back() {
            if entry.created_at.elapsed() >= self.config.max_lifetime {
                self.total.fetch_sub(1, Ordering::AcqRel);
                tracing::trace!("closing idle connection past max lifetime");
                continue;
            }
            return Some(entry);
        }
        None
    }

    /// Synchronous release path, driven by `PooledConnection::drop`.
    fn return_conn(&self, conn: D::Connection, created_at: Instant, broken: bool) {
        let expired = created_at.elapsed() >= self.config.max_lifetime;
        if broken || expired {
            self.total.fetch_sub(1, Ordering::AcqRel);
            if broken {
                tracing::debug!("closing broken connection instead of recycling");
            } else {
                tracing::trace!("closing connection on release");
            }
            drop(conn);
        } else {
            let mut idle = self.lock_idle();
            // The closed check must happen under the idle lock: `close`
            // drains the idle queue after setting the flag, so a connection
            // parked here without the check could outlive the shutdown.
            if self.closed.load(Ordering::Acquire) || idle.len() >= self.config.max_idle {
                drop(idle);
                self.total.fetch_sub(1, Ordering::AcqRel);
                tracing::trace!("closing released connection instead of parking it");
                drop(conn);
            } else {
                idle.push_back(IdleEntry {
                    conn,
                    created_at,
                    idle_since: Instant::now(),
                });
            }
        }
        self.semaphore.add_permits(1);
    }

    /// Close idle connections that sat too long, outlived their lifetime, or
    /// exceed the idle cap. Leased connections are never touched — they are
    /// not in the idle list.
    fn reap_idle(&self) {
        let closed = {
            let mut idle = self.lock_idle();
            let before = idle.len();
            idle.retain(|entry| {
                entry.created_at.elapsed() < self.config.max_lifetime
                    && entry.idle_since.elapsed() < self.config.idle_timeout
            });
            while idle.len() > self.config.max_idle {
                // Oldest first.
                idle.pop_front();
            }
            before - idle.len()
        };
        if closed > 0 {
            self.total.fetch_sub(closed, Ordering::AcqRel);
            tracing::debug!(closed, "reaped idle connections");
        }
    }

    fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let interval = self.config.reap_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it.
            tick.tick().await;
            loop {
                tick.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.closed.load(Ordering::Acquire) {
                    break;
                }
                inner.reap_idle();
            }
        })
    }
}

/// Restores the forgotten semaphore permit (and the total count, once a
/// connection is in hand) when an acquire bails out or its future is dropped
/// between the permit grant and the finished lease.
struct PermitGuard<'a, D: Driver> {
    inner: &'a PoolInner<D>,
    counted: bool,
    armed: bool,
}

impl<D: Driver> Drop for PermitGuard<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            if self.counted {
                self.inner.total.fetch_sub(1, Ordering::AcqRel);
            }
            self.inner.semaphore.add_permits(1);
        }
    }
}

/// Exclusive lease on one physical connection.
///
/// Returning the connection happens in `Drop`, exactly once, on every exit
/// path — there is no separate release call to forget or to call twice.
pub struct PooledConnection<D: Driver> {
    conn: Option<D::Connection>,
    pool: Arc<PoolInner<D>>,
    created_at: Instant,
    broken: bool,
}

impl<D: Driver> PooledConnection<D> {
    fn new(pool: Arc<PoolInner<D>>, conn: D::Connection, created_at: Instant) -> Self {
        Self {
            conn: Some(conn),
            pool,
            created_at,
            broken: false,
        }
    }

    /// Mutable access to the underlying driver connection.
    pub fn connection_mut(&mut self) -> &mut D::Connection {
        self.conn
            .as_mut()
            .expect("BUG: PooledConnection used after return to pool")
    }

    /// Flag the connection so the pool closes it instead of recycling it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl<D: Driver> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_conn(conn, self.created_at, self.broken);
        }
    }
}

fn lock_poison_free<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
