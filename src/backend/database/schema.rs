use crate::error::{AppError, AppResult};
use sqlx::AnyPool;

use super::dialect::SqlDialect;
#[cfg(test)]
use super::dialect::USERS_TABLE;

/// Create the users table if it does not exist yet
///
/// Safe to run on every connect.
pub async fn init_user_schema(pool: &AnyPool, dialect: SqlDialect) -> AppResult<()> {
    let sql = dialect.create_users_table();

    sqlx::query(&sql)
        .execute(pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create users table: {}", e)))?;

    Ok(())
}

/// Drop the users table (for cleanup/testing)
#[cfg(test)]
pub async fn drop_user_schema(pool: &AnyPool) -> AppResult<()> {
    let sql = format!("DROP TABLE IF EXISTS {}", USERS_TABLE);
    sqlx::query(&sql)
        .execute(pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to drop users table: {}", e)))?;
    Ok(())
}
