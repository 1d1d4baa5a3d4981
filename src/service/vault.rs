use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};
use url::Url;

use crate::config::QueryConfig;
use crate::db::{ConnectionHandle, DbPool};
use crate::error::NexusError;
use crate::service::cipher::VaultCipher;
use crate::types::{ConnectionProfile, Dialect};

/// Opaque ciphertext of an assembled connection URI.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedCredential(String);

impl fmt::Debug for EncryptedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptedCredential(..)")
    }
}

impl EncryptedCredential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Registry of encrypted connection URIs, keyed by connection name.
///
/// Entries live as long as the vault; a later `save` under the same name
/// replaces the earlier one.
#[derive(Debug)]
pub struct CredentialVault {
    cipher: VaultCipher,
    pool_cfg: QueryConfig,
    entries: RwLock<HashMap<String, EncryptedCredential>>,
}

impl CredentialVault {
    pub fn new(cipher: VaultCipher, pool_cfg: QueryConfig) -> Self {
        Self {
            cipher,
            pool_cfg,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Encrypt the profile's URI and store it under `profile.name`, as given.
    pub fn save(&self, profile: &ConnectionProfile) -> Result<(), NexusError> {
        let name = profile.name.as_str();
        if name.trim().is_empty() {
            return Err(NexusError::InvalidProfile("name must not be empty".to_string()));
        }
        let uri = build_uri(profile)?;
        let token = EncryptedCredential(self.cipher.encrypt(&uri)?);
        let replaced = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), token)
            .is_some();
        info!(
            connection = %name,
            dialect = %profile.dialect,
            replaced,
            "credential saved"
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn credential(&self, name: &str) -> Result<EncryptedCredential, NexusError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| NexusError::NotFound(name.to_string()))
    }

    fn decrypt_uri(&self, name: &str) -> Result<String, NexusError> {
        let token = self.credential(name)?;
        self.cipher.decrypt(token.as_str())
    }

    /// Decrypt the stored URI and open a bounded pool for it.
    pub async fn open(&self, name: &str) -> Result<ConnectionHandle, NexusError> {
        let uri = self.decrypt_uri(name)?;
        let dialect = dialect_of(&uri)?;
        debug!(connection = %name, uri = %redact(&uri), "opening connection pool");
        let pool = DbPool::connect(dialect, &uri, &self.pool_cfg)
            .await
            .map_err(|e| NexusError::Connection(e.to_string()))?;
        Ok(ConnectionHandle::new(name, pool))
    }

    /// Open a connection and run `SELECT 1`.
    pub async fn verify(&self, name: &str) -> Result<bool, NexusError> {
        let handle = self.open(name).await?;
        handle
            .scoped(|pool| async move {
                let probe = match &pool {
                    DbPool::Sqlite(p) => sqlx::query("SELECT 1").execute(p).await.map(|_| ()),
                    DbPool::Postgres(p) => sqlx::query("SELECT 1").execute(p).await.map(|_| ()),
                    DbPool::MySql(p) => sqlx::query("SELECT 1").execute(p).await.map(|_| ()),
                };
                probe.map_err(|e| NexusError::Connection(e.to_string()))
            })
            .await?;
        Ok(true)
    }
}

/// Assemble the driver URI for a profile. User names and passwords are
/// percent-encoded.
pub fn build_uri(profile: &ConnectionProfile) -> Result<String, NexusError> {
    match profile.dialect {
        Dialect::Sqlite => {
            let path = required(&profile.sqlite_path, "sqlite_path")?;
            Ok(format!("sqlite://{path}"))
        }
        dialect @ (Dialect::Postgres | Dialect::Mysql) => {
            let host = required(&profile.host, "host")?;
            let username = required(&profile.username, "username")?;
            let database = required(&profile.database, "database")?;
            let port = profile.port.or(dialect.default_port());

            let mut url = Url::parse(&format!("{}://localhost", dialect.scheme()))
                .map_err(|e| NexusError::InvalidProfile(e.to_string()))?;
            url.set_host(Some(host))
                .map_err(|e| NexusError::InvalidProfile(format!("host: {e}")))?;
            url.set_port(port)
                .map_err(|_| NexusError::InvalidProfile("port".to_string()))?;
            url.set_username(username)
                .map_err(|_| NexusError::InvalidProfile("username".to_string()))?;
            url.set_password(profile.password.as_deref())
                .map_err(|_| NexusError::InvalidProfile("password".to_string()))?;
            url.set_path(database);
            Ok(url.to_string())
        }
    }
}

fn required<'a>(field: &'a Option<String>, label: &str) -> Result<&'a str, NexusError> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NexusError::InvalidProfile(format!("missing required field `{label}`")))
}

fn dialect_of(uri: &str) -> Result<Dialect, NexusError> {
    let scheme = uri.split_once("://").map(|(s, _)| s).unwrap_or_default();
    match scheme {
        "sqlite" => Ok(Dialect::Sqlite),
        "postgres" | "postgresql" => Ok(Dialect::Postgres),
        "mysql" => Ok(Dialect::Mysql),
        _ => Err(NexusError::Crypto("stored credential has an unknown scheme".to_string())),
    }
}

/// URI with any password replaced by `***`, safe for logs.
pub fn redact(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => uri.to_string(),
    }
}
