use serde::{Deserialize, Serialize};
use std::fmt;

/// Database engine family; decides URI shape and introspection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    #[serde(alias = "postgresql")]
    Postgres,
    Mysql,
}

impl Dialect {
    pub fn scheme(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
        }
    }

    pub fn default_port(self) -> Option<u16> {
        match self {
            Dialect::Sqlite => None,
            Dialect::Postgres => Some(5432),
            Dialect::Mysql => Some(3306),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Body of `POST /connect`. Which fields are required depends on `dialect`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    pub dialect: Dialect,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("sqlite_path", &self.sqlite_path)
            .finish()
    }
}

impl ConnectionProfile {
    pub fn sqlite(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dialect: Dialect::Sqlite,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            sqlite_path: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub status: String,
    pub name: String,
}

impl ConnectResponse {
    pub fn connected(name: impl Into<String>) -> Self {
        Self {
            status: "connected".to_string(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Body of `POST /ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub connection_name: String,
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_accepts_postgresql_alias() {
        let d: Dialect = serde_json::from_str(r#""postgresql""#).unwrap();
        assert_eq!(d, Dialect::Postgres);
        assert!(serde_json::from_str::<Dialect>(r#""oracle""#).is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let mut p = ConnectionProfile::sqlite("local", "/tmp/x.db");
        p.password = Some("hunter2".into());
        let dbg = format!("{p:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("***"));
    }
}
