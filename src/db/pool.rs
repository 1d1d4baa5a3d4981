use crate::config::QueryConfig;
use crate::types::Dialect;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{MySql, Pool, Postgres, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;
pub type PgPool = Pool<Postgres>;
pub type MySqlPool = Pool<MySql>;

/// A bounded pool for one registered connection, tagged by dialect.
#[derive(Clone, Debug)]
pub enum DbPool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
    MySql(MySqlPool),
}

impl DbPool {
    /// Open a pool from a decrypted URI. At least one connection is
    /// established before returning, so unreachable databases fail here.
    pub async fn connect(
        dialect: Dialect,
        uri: &str,
        cfg: &QueryConfig,
    ) -> Result<Self, sqlx::Error> {
        let max = cfg.max_connections();
        let acquire = cfg.acquire_timeout();
        let pool = match dialect {
            Dialect::Sqlite => {
                let opts = SqliteConnectOptions::from_str(uri)?;
                DbPool::Sqlite(
                    SqlitePoolOptions::new()
                        .max_connections(max)
                        .min_connections(0)
                        .acquire_timeout(acquire)
                        .test_before_acquire(true)
                        .connect_with(opts)
                        .await?,
                )
            }
            Dialect::Postgres => {
                let opts = PgConnectOptions::from_str(uri)?;
                DbPool::Postgres(
                    PgPoolOptions::new()
                        .max_connections(max)
                        .min_connections(0)
                        .acquire_timeout(acquire)
                        .test_before_acquire(true)
                        .connect_with(opts)
                        .await?,
                )
            }
            Dialect::Mysql => {
                let opts = MySqlConnectOptions::from_str(uri)?;
                DbPool::MySql(
                    MySqlPoolOptions::new()
                        .max_connections(max)
                        .min_connections(0)
                        .acquire_timeout(acquire)
                        .test_before_acquire(true)
                        .connect_with(opts)
                        .await?,
                )
            }
        };
        Ok(pool)
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DbPool::Sqlite(_) => Dialect::Sqlite,
            DbPool::Postgres(_) => Dialect::Postgres,
            DbPool::MySql(_) => Dialect::Mysql,
        }
    }

    pub async fn close(&self) {
        match self {
            DbPool::Sqlite(p) => p.close().await,
            DbPool::Postgres(p) => p.close().await,
            DbPool::MySql(p) => p.close().await,
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            DbPool::Sqlite(p) => p.is_closed(),
            DbPool::Postgres(p) => p.is_closed(),
            DbPool::MySql(p) => p.is_closed(),
        }
    }
}

/// A short-lived pool handed out by the vault for one unit of work.
///
/// Callers finish with [`ConnectionHandle::close`] on every exit path;
/// [`ConnectionHandle::scoped`] does that for them.
#[derive(Debug)]
pub struct ConnectionHandle {
    name: String,
    pool: DbPool,
}

impl ConnectionHandle {
    pub fn new(name: impl Into<String>, pool: DbPool) -> Self {
        Self {
            name: name.into(),
            pool,
        }
    }

    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!(connection = %self.name, "connection pool closed");
    }

    /// Run `work` against the pool, then close it whatever the outcome.
    pub async fn scoped<T, E, F, Fut>(self, work: F) -> Result<T, E>
    where
        F: FnOnce(DbPool) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = work(self.pool.clone()).await;
        self.close().await;
        result
    }
}
