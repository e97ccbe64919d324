use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};

pub const DEFAULT_DB_TYPE: &str = "mongodb";
pub const DEFAULT_MONGODB_DATABASE: &str = "users_service";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Backend selection and connection parameters.
///
/// Only the fields relevant to `db_type` are read by the backend factory.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "type", default = "default_db_type")]
    pub db_type: String,
    /// Relational connection URL for any dialect
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub mysql_url: Option<String>,
    #[serde(default)]
    pub sqlite_url: Option<String>,
    #[serde(default)]
    pub mongodb_uri: Option<String>,
    #[serde(default)]
    pub mongodb_db: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: default_db_type(),
            url: None,
            postgres_url: None,
            mysql_url: None,
            sqlite_url: None,
            mongodb_uri: None,
            mongodb_db: None,
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a relational backend reachable at `url`
    pub fn relational(db_type: &str, url: impl Into<String>) -> Self {
        Self {
            db_type: db_type.to_string(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Configuration for the document store
    pub fn document(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            db_type: DEFAULT_DB_TYPE.to_string(),
            mongodb_uri: Some(uri.into()),
            mongodb_db: Some(database.into()),
            ..Self::default()
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_type() -> String {
    DEFAULT_DB_TYPE.to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    30
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> AppResult<Self> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Err(AppError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content, |key| std::env::var(key).ok())
    }

    /// Parse YAML content, expanding `${VAR}` and `${VAR:-default}` references first
    pub fn from_yaml<F>(content: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup)?;
        serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Overlay environment variables on top of the current values
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;

        if let Some(db_type) = lookup("DB_TYPE") {
            db.db_type = db_type;
        }
        override_string(&mut db.url, lookup("DATABASE_URL"));
        override_string(&mut db.postgres_url, lookup("POSTGRES_URL"));
        override_string(&mut db.mysql_url, lookup("MYSQL_URL"));
        override_string(&mut db.sqlite_url, lookup("SQLITE_URL"));
        override_string(&mut db.mongodb_uri, lookup("MONGODB_URI"));
        override_string(&mut db.mongodb_db, lookup("MONGODB_DB"));

        if let Some(value) = lookup("DB_MAX_CONNECTIONS") {
            db.max_connections = parse_number("DB_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("DB_CONNECTION_TIMEOUT") {
            db.connection_timeout = parse_number("DB_CONNECTION_TIMEOUT", &value)?;
        }

        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(value) = lookup("PORT") {
            self.server.port = parse_number("PORT", &value)?;
        }

        Ok(())
    }
}

fn override_string(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        *target = Some(value);
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        AppError::Configuration(format!("{} must be a number, got '{}'", key, value))
    })
}

fn expand_env_vars<F>(content: &str, lookup: &F) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            // Unterminated reference, keep it verbatim
            expanded.push_str(&rest[start..]);
            return Ok(expanded);
        };

        let expr = &after[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };

        let value = match (lookup(name), default) {
            (Some(value), _) => value,
            (None, Some(default)) => default.to_string(),
            (None, None) => {
                return Err(AppError::Configuration(format!(
                    "Environment variable {} not found and no default provided",
                    name
                )))
            }
        };

        expanded.push_str(&value);
        rest = &after[end + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}
