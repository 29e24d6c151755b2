//! SQLite-backed session store.
//!
//! Several broker processes can share one database file. Consume-once is a
//! single `DELETE ... RETURNING` statement, which SQLite executes atomically
//! under its write lock, so two processes can never both receive the same
//! challenge. All database operations run in `spawn_blocking` to avoid
//! blocking the async runtime.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authbroker_common::auth::pkce::PkceChallenge;
use authbroker_common::time::{Clock, SystemClock};
use authbroker_core::SessionStore;
use authbroker_domain::{BrokerError, Result, SessionId};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use tracing::{debug, info};

use crate::errors::{map_join_error, InfraError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pkce_sessions (
    session_key   TEXT PRIMARY KEY NOT NULL,
    payload       TEXT NOT NULL,
    expires_at_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pkce_sessions_expires_at ON pkce_sessions (expires_at_ms);
";

type SqlitePool = Pool<SqliteConnectionManager>;

/// Session store persisted in a SQLite file
pub struct SqliteSessionStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteSessionStore {
    /// Open (creating if needed) the database at `path`
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the pool cannot be built or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> Result<Self> {
        Self::with_clock(path, pool_size, Arc::new(SystemClock))
    }

    /// Like [`SqliteSessionStore::open`] with an injected clock
    ///
    /// # Errors
    /// See [`SqliteSessionStore::open`].
    pub fn with_clock(
        path: impl AsRef<Path>,
        pool_size: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(InfraError::from)?;

        let conn = pool.get().map_err(InfraError::from)?;
        conn.execute_batch(SCHEMA).map_err(InfraError::from)?;

        info!(db_path = %path.display(), pool_size, "SQLite session store ready");
        Ok(Self { pool, clock })
    }

    /// Run `op` on a pooled connection off the async runtime
    ///
    /// `op` receives the current time in epoch milliseconds, captured before
    /// the task is spawned.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, i64) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let now_ms = epoch_millis(self.clock.millis_since_epoch());

        task::spawn_blocking(move || -> Result<T> {
            let conn: PooledConnection<SqliteConnectionManager> =
                pool.get().map_err(InfraError::from)?;
            op(&conn, now_ms)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save(&self, id: &SessionId, challenge: &PkceChallenge, ttl: Duration) -> Result<()> {
        let key = id.store_key();
        let payload = serde_json::to_string(challenge).map_err(InfraError::from)?;
        let ttl_ms = epoch_millis(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));

        self.run(move |conn, now_ms| {
            conn.execute(
                "INSERT INTO pkce_sessions (session_key, payload, expires_at_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_key) DO UPDATE
                 SET payload = excluded.payload, expires_at_ms = excluded.expires_at_ms",
                params![key, payload, now_ms.saturating_add(ttl_ms)],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }

    async fn consume_once(&self, id: &SessionId) -> Result<PkceChallenge> {
        let key = id.store_key();

        let (payload, expires_at_ms) = self
            .run(move |conn, _| {
                conn.query_row(
                    "DELETE FROM pkce_sessions WHERE session_key = ?1
                     RETURNING payload, expires_at_ms",
                    params![key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()
                .map_err(|e| InfraError::from(e).into())
            })
            .await?
            .ok_or(BrokerError::SessionNotFound)?;

        if expires_at_ms <= epoch_millis(self.clock.millis_since_epoch()) {
            debug!(session_id = %id, "Consumed session had already expired");
            return Err(BrokerError::SessionNotFound);
        }

        serde_json::from_str(&payload).map_err(|e| InfraError::from(e).into())
    }

    async fn exists(&self, id: &SessionId) -> Result<bool> {
        let key = id.store_key();

        self.run(move |conn, now_ms| {
            conn.query_row(
                "SELECT 1 FROM pkce_sessions WHERE session_key = ?1 AND expires_at_ms > ?2",
                params![key, now_ms],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(|e| InfraError::from(e).into())
        })
        .await
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let key = id.store_key();

        self.run(move |conn, _| {
            conn.execute("DELETE FROM pkce_sessions WHERE session_key = ?1", params![key])
                .map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }

    async fn ttl_remaining(&self, id: &SessionId) -> Result<Duration> {
        let key = id.store_key();

        self.run(move |conn, now_ms| {
            let expires_at_ms = conn
                .query_row(
                    "SELECT expires_at_ms FROM pkce_sessions
                     WHERE session_key = ?1 AND expires_at_ms > ?2",
                    params![key, now_ms],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .map_err(InfraError::from)?
                .ok_or(BrokerError::SessionNotFound)?;

            let remaining = u64::try_from(expires_at_ms - now_ms).unwrap_or(0);
            Ok(Duration::from_millis(remaining))
        })
        .await
    }

    async fn purge_expired(&self) -> Result<usize> {
        self.run(|conn, now_ms| {
            conn.execute("DELETE FROM pkce_sessions WHERE expires_at_ms <= ?1", params![now_ms])
                .map_err(|e| InfraError::from(e).into())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.run(|conn, _| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }
}

fn epoch_millis(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
