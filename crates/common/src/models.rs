use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sluice_error::{find_closest_match, ErrorCode, ErrorContext, SluiceError};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

// Custom Serde logic for SecretString
fn serialize_secret<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(SecretString::from))
}

/// Identity of a registered data source. Unique per registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub i64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SourceId {
    fn from(id: i64) -> Self {
        SourceId(id)
    }
}

/// Supported relational engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    MySql,
    Sqlite,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [EngineKind::Postgres, EngineKind::MySql, EngineKind::Sqlite];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::MySql => "mysql",
            EngineKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(EngineKind::Postgres),
            "mysql" | "mariadb" => Ok(EngineKind::MySql),
            "sqlite" | "sqlite3" => Ok(EngineKind::Sqlite),
            other => {
                let supported: Vec<String> =
                    Self::ALL.iter().map(|k| k.as_str().to_string()).collect();
                let mut err = SluiceError::new(
                    ErrorCode::UnsupportedEngine,
                    format!("Engine '{}' is not supported", s),
                )
                .with_context(ErrorContext::Engine {
                    requested: s.to_string(),
                    supported: supported.clone(),
                });
                if let Some(closest) = find_closest_match(other, &supported) {
                    err = err.with_hint(format!("Did you mean '{}'?", closest));
                }
                Err(err)
            }
        }
    }
}

/// Connection parameters of one registered data source.
///
/// Owned by the surrounding CRUD layer; treated as immutable for the duration of one
/// execution. The password is the already-decrypted plaintext.
#[derive(Debug, Clone)]
pub struct DataSourceDescriptor {
    pub id: SourceId,
    pub engine: EngineKind,
    pub host: String,
    pub port: Option<u16>,
    /// Database name, or the database file path for SQLite.
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub public: bool,
}

impl DataSourceDescriptor {
    pub fn new(id: impl Into<SourceId>, engine: EngineKind, database: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            engine,
            host: String::new(),
            port: None,
            database: database.into(),
            username: String::new(),
            password: SecretString::from(String::new()),
            public: false,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = SecretString::from(password.into());
        self
    }

    pub fn connection_context(&self) -> ErrorContext {
        ErrorContext::Connection {
            source_id: self.id.0,
            engine: self.engine.to_string(),
            host: (!self.host.is_empty()).then(|| self.host.clone()),
            port: self.port,
        }
    }
}

/// A data source as written in `sources.yaml`.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct SourceConfig {
    pub id: i64,

    #[validate(length(min = 1))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub source_type: String,

    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[validate(length(min = 1))]
    pub database: String,

    #[serde(default)]
    pub username: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub password: Option<SecretString>,

    #[serde(default)]
    pub public: bool,
}

impl TryFrom<&SourceConfig> for DataSourceDescriptor {
    type Error = SluiceError;

    fn try_from(config: &SourceConfig) -> Result<Self, Self::Error> {
        let engine: EngineKind = config.source_type.parse()?;
        Ok(DataSourceDescriptor {
            id: SourceId(config.id),
            engine,
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
            username: config.username.clone(),
            password: config
                .password
                .clone()
                .unwrap_or_else(|| SecretString::from(String::new())),
            public: config.public,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct SourcesConfig {
    #[validate(nested)]
    pub sources: Vec<SourceConfig>,
}

impl SourcesConfig {
    pub fn descriptors(&self) -> sluice_error::Result<Vec<DataSourceDescriptor>> {
        self.sources.iter().map(DataSourceDescriptor::try_from).collect()
    }

    pub fn find(&self, id: i64) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}
