use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::NexusError;
use crate::service::cipher::VaultCipher;
use crate::service::executor::QueryExecutor;
use crate::service::safety::{DenylistGate, SqlGate};
use crate::service::schema_cache::SchemaCache;
use crate::service::sql_generator::SqlGenerator;
use crate::service::vault::CredentialVault;
use crate::types::{AskRequest, AskResponse, ConnectResponse, ConnectionProfile, SchemaSnapshot};

/// Service state shared by every request handler.
///
/// Sequences vault, schema cache, generator, safety gate and executor.
/// Each stage returns a classified `NexusError`; only generation has a
/// fallback.
pub struct Assistant {
    vault: Arc<CredentialVault>,
    schemas: SchemaCache,
    executor: QueryExecutor,
    generator: SqlGenerator,
    gate: Box<dyn SqlGate>,
    query_timeout: Duration,
}

impl Assistant {
    pub fn from_config(cfg: &Config) -> Result<Self, NexusError> {
        let cipher = VaultCipher::from_config(cfg.basic.vault_key.as_deref())?;
        let vault = Arc::new(CredentialVault::new(cipher, cfg.query.clone()));
        let generator = SqlGenerator::new(cfg.llm.clone())?;
        Ok(Self::new(
            vault,
            generator,
            Box::new(DenylistGate),
            cfg.query.timeout(),
        ))
    }

    pub fn new(
        vault: Arc<CredentialVault>,
        generator: SqlGenerator,
        gate: Box<dyn SqlGate>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            schemas: SchemaCache::new(vault.clone()),
            executor: QueryExecutor::new(vault.clone()),
            vault,
            generator,
            gate,
            query_timeout,
        }
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Save, then verify. A failed verification leaves the saved entry.
    pub async fn connect(&self, profile: ConnectionProfile) -> Result<ConnectResponse, NexusError> {
        self.vault.save(&profile)?;
        let name = profile.name.as_str();
        // The new profile may point somewhere else entirely.
        self.schemas.invalidate(name);
        if let Err(e) = self.vault.verify(name).await {
            warn!(
                connection = %name,
                error = %e,
                kept = self.vault.contains(name),
                "connection test failed"
            );
            return Err(e);
        }
        info!(connection = %name, "connected");
        Ok(ConnectResponse::connected(name))
    }

    pub async fn schema(
        &self,
        name: &str,
        refresh: bool,
    ) -> Result<Arc<SchemaSnapshot>, NexusError> {
        self.schemas.fetch(name, refresh).await
    }

    pub async fn ask(&self, req: AskRequest) -> Result<AskResponse, NexusError> {
        let name = req.connection_name.as_str();
        let schema = self.schemas.fetch(name, false).await?;

        let sql = self.generator.generate(&schema, &req.question).await;
        info!(connection = %name, sql = %sql, "Generated SQL");

        if !self.gate.is_safe(&sql) {
            warn!(connection = %name, sql = %sql, "generated SQL rejected by safety gate");
            return Err(NexusError::UnsafeSql);
        }

        let result = self
            .executor
            .run_readonly(name, &sql, &[], self.query_timeout)
            .await?;
        Ok(AskResponse::new(sql, result))
    }
}
