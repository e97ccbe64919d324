use crate::config::{DatabaseConfig, DEFAULT_MONGODB_DATABASE};
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserUpdate};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod database;
pub mod document;

use database::{SqlBackend, SqlBackendConfig, SqlDialect};
use document::{MongoBackend, MongoBackendConfig};

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    MongoDb,
    PostgreSQL,
    MySQL,
    SQLite,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::MongoDb => write!(f, "mongodb"),
            BackendType::PostgreSQL => write!(f, "postgresql"),
            BackendType::MySQL => write!(f, "mysql"),
            BackendType::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for BackendType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongodb" => Ok(BackendType::MongoDb),
            "postgresql" | "postgres" => Ok(BackendType::PostgreSQL),
            "mysql" => Ok(BackendType::MySQL),
            "sqlite" => Ok(BackendType::SQLite),
            _ => Err(AppError::Configuration(format!(
                "Unknown database type: {}. Supported types: mongodb, postgresql, mysql, sqlite",
                s
            ))),
        }
    }
}

/// Storage contract for user records
///
/// Every backend (document store or relational engine) implements this
/// trait. A single instance is shared by all request handlers, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait UserBackend: Send + Sync {
    /// Establish connectivity and prepare storage. Idempotent.
    async fn connect(&self) -> AppResult<()>;

    /// Release backend resources. No-op when not connected.
    async fn disconnect(&self) -> AppResult<()>;

    /// Report live connectivity. Never fails; errors become `false`.
    async fn health_check(&self) -> bool;

    /// Insert a new user and return it with its assigned identifier
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;

    /// All users in the backend's natural scan order
    async fn get_all_users(&self) -> AppResult<Vec<User>>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Apply the supplied fields to the user owning `email`.
    /// Returns `None` when no such user exists.
    async fn update_user(&self, email: &str, update: &UserUpdate) -> AppResult<Option<User>>;

    /// Returns whether a user was removed
    async fn delete_user(&self, email: &str) -> AppResult<bool>;
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Select and construct the backend named by `config.db_type`.
    ///
    /// The returned backend is not connected yet; the caller invokes
    /// [`UserBackend::connect`] during startup.
    pub fn create(config: &DatabaseConfig) -> AppResult<Arc<dyn UserBackend>> {
        let backend_type: BackendType = config.db_type.parse()?;
        tracing::info!("Creating {} backend", backend_type);

        let backend: Arc<dyn UserBackend> = match backend_type {
            BackendType::MongoDb => {
                let uri = config.mongodb_uri.clone().ok_or_else(|| {
                    AppError::Configuration("MONGODB_URI is required for mongodb".to_string())
                })?;
                let database = config
                    .mongodb_db
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string());
                Arc::new(MongoBackend::new(MongoBackendConfig::new(uri, database)))
            }
            BackendType::PostgreSQL => {
                Arc::new(Self::sql_backend(config, SqlDialect::Postgres, &config.postgres_url)?)
            }
            BackendType::MySQL => {
                Arc::new(Self::sql_backend(config, SqlDialect::MySql, &config.mysql_url)?)
            }
            BackendType::SQLite => {
                Arc::new(Self::sql_backend(config, SqlDialect::Sqlite, &config.sqlite_url)?)
            }
        };

        Ok(backend)
    }

    fn sql_backend(
        config: &DatabaseConfig,
        dialect: SqlDialect,
        dialect_url: &Option<String>,
    ) -> AppResult<SqlBackend> {
        let url = config
            .url
            .as_ref()
            .or(dialect_url.as_ref())
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "DATABASE_URL or {} is required for {}",
                    dialect.url_env_var(),
                    dialect
                ))
            })?;

        let backend_config = SqlBackendConfig::new(dialect, url)
            .with_max_connections(config.max_connections)
            .with_connection_timeout(config.connection_timeout);
        backend_config.validate()?;

        Ok(SqlBackend::new(backend_config))
    }
}
