use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::db::schema::reflect;
use crate::error::NexusError;
use crate::service::vault::CredentialVault;
use crate::types::SchemaSnapshot;

/// Reflected schemas keyed by connection name.
///
/// No eviction: an entry lives until it is refreshed or invalidated.
/// Concurrent first fetches for one name may both reflect; the last
/// write wins.
#[derive(Debug)]
pub struct SchemaCache {
    vault: Arc<CredentialVault>,
    entries: RwLock<HashMap<String, Arc<SchemaSnapshot>>>,
}

impl SchemaCache {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self {
            vault,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn fetch(
        &self,
        name: &str,
        refresh: bool,
    ) -> Result<Arc<SchemaSnapshot>, NexusError> {
        if !refresh && let Some(hit) = self.cached(name) {
            debug!(connection = %name, "schema cache hit");
            return Ok(hit);
        }

        let handle = self.vault.open(name).await?;
        let snapshot = handle
            .scoped(|pool| async move {
                reflect(&pool)
                    .await
                    .map_err(|e| NexusError::Reflection(e.to_string()))
            })
            .await?;
        let snapshot = Arc::new(snapshot);

        info!(
            connection = %name,
            tables = snapshot.len(),
            refresh,
            "schema reflected"
        );
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    pub fn cached(&self, name: &str) -> Option<Arc<SchemaSnapshot>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn invalidate(&self, name: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::service::cipher::VaultCipher;
    use crate::types::ConnectionProfile;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_db(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "sqlnexus-schema-{tag}-{}-{nanos}.sqlite",
            std::process::id()
        ));
        path
    }

    async fn exec(path: &PathBuf, sql: &str) {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .expect("open sqlite");
        sqlx::query(sql).execute(&pool).await.expect("seed sqlite");
        pool.close().await;
    }

    fn cache_for(path: &PathBuf) -> SchemaCache {
        let vault = Arc::new(CredentialVault::new(
            VaultCipher::generate(),
            QueryConfig::default(),
        ));
        vault
            .save(&ConnectionProfile::sqlite("local", path.display().to_string()))
            .expect("save profile");
        SchemaCache::new(vault)
    }

    #[tokio::test]
    async fn reflects_tables_and_typed_columns() {
        let path = temp_db("reflect");
        exec(&path, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)").await;
        let cache = cache_for(&path);

        let snapshot = cache.fetch("local", false).await.unwrap();
        assert_eq!(
            snapshot.get("t"),
            Some(&vec!["id (INTEGER)".to_string(), "name (TEXT)".to_string()])
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn second_fetch_returns_cached_snapshot() {
        let path = temp_db("cached");
        exec(&path, "CREATE TABLE t (id INTEGER)").await;
        let cache = cache_for(&path);

        let first = cache.fetch("local", false).await.unwrap();
        exec(&path, "CREATE TABLE later (x TEXT)").await;
        let second = cache.fetch("local", false).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!second.contains_key("later"));

        let refreshed = cache.fetch("local", true).await.unwrap();
        assert!(refreshed.contains_key("later"));
        assert!(Arc::ptr_eq(&refreshed, &cache.cached("local").unwrap()));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn invalidate_forces_reflection() {
        let path = temp_db("invalidate");
        exec(&path, "CREATE TABLE t (id INTEGER)").await;
        let cache = cache_for(&path);

        let first = cache.fetch("local", false).await.unwrap();
        assert!(cache.invalidate("local"));
        assert!(cache.cached("local").is_none());
        let second = cache.fetch("local", false).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn unknown_connection_propagates_not_found() {
        let path = temp_db("unknown");
        let cache = cache_for(&path);
        let err = cache.fetch("missing", false).await.unwrap_err();
        assert!(matches!(err, NexusError::NotFound(_)));
    }
}
