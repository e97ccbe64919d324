use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Row};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::config::SqlBackendConfig;
use super::dialect::{redact_url, SqlDialect, USERS_TABLE};
use super::schema::init_user_schema;
use super::user_update::{ColumnValue, UserUpdateProcessor};
use crate::backend::UserBackend;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserUpdate};

/// Relational backend for PostgreSQL, MySQL and SQLite
///
/// All three dialects go through the sqlx `Any` driver; the pool is opened
/// on `connect` and the users table is created on first connect.
pub struct SqlBackend {
    config: SqlBackendConfig,
    pool: RwLock<Option<AnyPool>>,
}

impl SqlBackend {
    pub fn new(config: SqlBackendConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.config.dialect
    }

    /// Clone of the live pool handle
    async fn pool(&self) -> AppResult<AnyPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Connection(format!("{} database is not connected", self.dialect())))
    }

    fn select_by_email_sql(&self) -> String {
        format!(
            "SELECT id, name, email, age FROM {} WHERE email = {}",
            USERS_TABLE,
            self.dialect().placeholder(1)
        )
    }

    async fn fetch_user_by_email(&self, pool: &AnyPool, email: &str) -> AppResult<Option<User>> {
        let sql = self.select_by_email_sql();

        let row = sqlx::query::<Any>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_database_error(e, "fetch user"))?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl UserBackend for SqlBackend {
    async fn connect(&self) -> AppResult<()> {
        let mut guard = self.pool.write().await;
        if guard.is_some() {
            return Ok(());
        }

        sqlx::any::install_default_drivers();

        let dialect = self.dialect();
        let mut options = AnyPoolOptions::new()
            .max_connections(self.config.effective_max_connections())
            .acquire_timeout(Duration::from_secs(self.config.connection_timeout));
        if self.config.is_memory_database() {
            // The database lives only as long as its single connection
            options = options.min_connections(1).idle_timeout(None).max_lifetime(None);
        }

        let pool = options
            .connect(&self.config.connect_url())
            .await
            .map_err(|e| {
                error!("Failed to connect to {} database: {}", dialect, e);
                AppError::Connection(format!("Failed to connect to {}: {}", dialect, e))
            })?;

        if let Err(e) = init_user_schema(&pool, dialect).await {
            error!("Failed to prepare {} schema: {}", dialect, e);
            pool.close().await;
            return Err(AppError::Connection(e.to_string()));
        }

        info!(
            "{} database connected successfully: {}",
            dialect,
            redact_url(&self.config.connection_url)
        );
        *guard = Some(pool);
        Ok(())
    }

    async fn disconnect(&self) -> AppResult<()> {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            info!("{} database connection closed", self.dialect());
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let Ok(pool) = self.pool().await else {
            return false;
        };
        sqlx::query::<Any>("SELECT 1").execute(&pool).await.is_ok()
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let pool = self.pool().await?;

        if self.fetch_user_by_email(&pool, &user.email).await?.is_some() {
            return Err(AppError::Duplicate(
                "User with this email already exists".to_string(),
            ));
        }

        let dialect = self.dialect();
        let sql = format!(
            "INSERT INTO {} (name, email, age) VALUES ({}, {}, {})",
            USERS_TABLE,
            dialect.placeholder(1),
            dialect.placeholder(2),
            dialect.placeholder(3)
        );

        sqlx::query::<Any>(&sql)
            .bind(user.name.as_str())
            .bind(user.email.as_str())
            .bind(user.age)
            .execute(&pool)
            .await
            .map_err(|e| map_database_error(e, "create user"))?;

        self.fetch_user_by_email(&pool, &user.email)
            .await?
            .ok_or_else(|| AppError::Storage("Created user could not be read back".to_string()))
    }

    async fn get_all_users(&self) -> AppResult<Vec<User>> {
        let pool = self.pool().await?;
        let sql = format!("SELECT id, name, email, age FROM {}", USERS_TABLE);

        let rows = sqlx::query::<Any>(&sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| map_database_error(e, "list users"))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let pool = self.pool().await?;
        self.fetch_user_by_email(&pool, email).await
    }

    async fn update_user(&self, email: &str, update: &UserUpdate) -> AppResult<Option<User>> {
        let pool = self.pool().await?;

        let Some(existing) = self.fetch_user_by_email(&pool, email).await? else {
            return Ok(None);
        };

        let Some(prepared) = UserUpdateProcessor::prepare(self.dialect(), email, update)? else {
            return Ok(Some(existing));
        };

        if let Some(new_email) = update.new_email() {
            if new_email != email && self.fetch_user_by_email(&pool, new_email).await?.is_some() {
                return Err(AppError::Duplicate(
                    "User with this email already exists".to_string(),
                ));
            }
        }

        let mut query = sqlx::query::<Any>(&prepared.sql);
        for value in prepared.values {
            query = match value {
                ColumnValue::Text(text) => query.bind(text),
                ColumnValue::Integer(number) => query.bind(number),
            };
        }
        query
            .execute(&pool)
            .await
            .map_err(|e| map_database_error(e, "update user"))?;

        let current_email = update.new_email().unwrap_or(email);
        self.fetch_user_by_email(&pool, current_email).await
    }

    async fn delete_user(&self, email: &str) -> AppResult<bool> {
        let pool = self.pool().await?;
        let sql = format!(
            "DELETE FROM {} WHERE email = {}",
            USERS_TABLE,
            self.dialect().placeholder(1)
        );

        let result = sqlx::query::<Any>(&sql)
            .bind(email)
            .execute(&pool)
            .await
            .map_err(|e| map_database_error(e, "delete user"))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Convert a users row into a record keyed by column name
fn row_to_user(row: &AnyRow) -> AppResult<User> {
    let id: i64 = row.try_get("id").map_err(|e| decode_error("id", e))?;
    let name: String = row.try_get("name").map_err(|e| decode_error("name", e))?;
    let email: String = row.try_get("email").map_err(|e| decode_error("email", e))?;
    let age: Option<i64> = row.try_get("age").map_err(|e| decode_error("age", e))?;

    Ok(User {
        id: id.to_string(),
        name,
        email,
        age,
    })
}

fn decode_error(column: &str, error: sqlx::Error) -> AppError {
    AppError::Storage(format!("Failed to read column {}: {}", column, error))
}

/// Map sqlx errors onto the storage error taxonomy
pub fn map_database_error(error: sqlx::Error, context: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Duplicate("User with this email already exists".to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::Connection(format!("Failed to {}: {}", context, error))
        }
        _ => AppError::Storage(format!("Failed to {}: {}", context, error)),
    }
}
