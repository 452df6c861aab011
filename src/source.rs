//! Pooled connection source.
//!
//! A `ConnectionSource` hands out one ready-to-use connection per query
//! call. Absence of a connection (pool exhaustion, unreachable server, a
//! lazily-constructed pool whose target never came up) is a legitimate,
//! non-fatal state: `acquire` logs the cause and returns `None`, and callers
//! treat it as "no rows, no match". The source never retries and owns no
//! pooling policy of its own; limits and timeouts come from the pool it
//! wraps.

use sqlx::pool::PoolConnection;
use sqlx::{Database, Pool};

/// Wraps an `sqlx` pool behind the acquire-or-absent contract.
pub struct ConnectionSource<DB: Database> {
    pool: Pool<DB>,
}

impl<DB: Database> ConnectionSource<DB> {
    /// Wraps an existing pool. The pool's sizing and timeout policy is the
    /// caller's.
    pub fn new(pool: Pool<DB>) -> Self {
        Self { pool }
    }

    /// Acquires a connection, or reports absence.
    ///
    /// The connection is released back to the pool when the returned guard
    /// drops, on every exit path.
    pub async fn acquire(&self) -> Option<PoolConnection<DB>> {
        match self.pool.acquire().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "connection source yielded no connection");
                None
            }
        }
    }

    /// The wrapped pool.
    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    /// Closes the wrapped pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl<DB: Database> std::fmt::Debug for ConnectionSource<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSource")
            .field("size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}
