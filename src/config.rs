use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Placeholder query used whenever SQL generation is unavailable.
pub const FALLBACK_SQL: &str = "SELECT 1 AS demo;";

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Process-wide configuration, read once at startup.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| {
        eprintln!("invalid configuration, falling back to defaults: {e}");
        Config::default()
    })
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub llm: LlmConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    /// Base64 encoded 32-byte key. A fresh key is generated when absent.
    pub vault_key: Option<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            vault_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub timeout_secs: u64,
    pub pool_size: u32,
    pub max_overflow: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            pool_size: 3,
            max_overflow: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs.max(1))
    }

    /// Upper bound on open connections per pool.
    pub fn max_connections(&self) -> u32 {
        (self.pool_size + self.max_overflow).max(1)
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `SQLNEXUS_*` env vars.
    /// `GOOGLE_API_KEY` and `VAULT_KEY` are honored as raw variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(
                Env::raw()
                    .only(&["GOOGLE_API_KEY"])
                    .map(|_| "llm.api_key".into()),
            )
            .merge(
                Env::raw()
                    .only(&["VAULT_KEY"])
                    .map(|_| "basic.vault_key".into()),
            )
            .merge(Env::prefixed("SQLNEXUS_").split("__"))
    }
}
