use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sqlx::{Column, Executor, MySql, Postgres, Sqlite};
use tracing::{debug, warn};

use crate::db::DbPool;
use crate::db::values::{self, bind_params, column_names};
use crate::error::NexusError;
use crate::service::vault::CredentialVault;
use crate::types::QueryResult;

/// Runs statements that already passed the safety gate.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    vault: Arc<CredentialVault>,
}

impl QueryExecutor {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self { vault }
    }

    /// Execute one parameterized statement and materialize every row.
    ///
    /// The statement is not re-validated. The pool is closed before
    /// returning, on success and on failure.
    pub async fn run_readonly(
        &self,
        name: &str,
        sql: &str,
        params: &[Value],
        timeout: Duration,
    ) -> Result<QueryResult, NexusError> {
        let handle = self.vault.open(name).await?;
        let result = handle
            .scoped(|pool| async move {
                match tokio::time::timeout(timeout, execute(&pool, sql, params)).await {
                    Ok(res) => res.map_err(|e| NexusError::Execution(e.to_string())),
                    Err(_) => Err(NexusError::Execution(format!(
                        "query timed out after {}s",
                        timeout.as_secs_f64()
                    ))),
                }
            })
            .await;

        match &result {
            Ok(r) => debug!(connection = %name, rows = r.rows.len(), "query executed"),
            Err(e) => warn!(connection = %name, error = %e, "query failed"),
        }
        result
    }
}

fn described<C: Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

async fn execute(pool: &DbPool, sql: &str, params: &[Value]) -> Result<QueryResult, sqlx::Error> {
    match pool {
        DbPool::Sqlite(p) => {
            let mut conn = p.acquire().await?;
            let args = bind_params::<Sqlite>(params).map_err(sqlx::Error::Encode)?;
            let rows = sqlx::query_with(sql, args).fetch_all(&mut *conn).await?;
            let columns = match rows.first() {
                Some(first) => column_names(first),
                None => described((&mut *conn).describe(sql).await?.columns()),
            };
            Ok(QueryResult {
                columns,
                rows: rows.iter().map(values::sqlite_row).collect(),
            })
        }
        DbPool::Postgres(p) => {
            let mut conn = p.acquire().await?;
            let args = bind_params::<Postgres>(params).map_err(sqlx::Error::Encode)?;
            let rows = sqlx::query_with(sql, args).fetch_all(&mut *conn).await?;
            let columns = match rows.first() {
                Some(first) => column_names(first),
                None => described((&mut *conn).describe(sql).await?.columns()),
            };
            Ok(QueryResult {
                columns,
                rows: rows.iter().map(values::postgres_row).collect(),
            })
        }
        DbPool::MySql(p) => {
            let mut conn = p.acquire().await?;
            let args = bind_params::<MySql>(params).map_err(sqlx::Error::Encode)?;
            let rows = sqlx::query_with(sql, args).fetch_all(&mut *conn).await?;
            let columns = match rows.first() {
                Some(first) => column_names(first),
                None => described((&mut *conn).describe(sql).await?.columns()),
            };
            Ok(QueryResult {
                columns,
                rows: rows.iter().map(values::mysql_row).collect(),
            })
        }
    }
}
