use super::dialect::{SqlDialect, USERS_TABLE};
use crate::error::{AppError, AppResult};
use crate::models::UserUpdate;

/// A value bound to one column of a SET clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Text(String),
    Integer(Option<i64>),
}

/// UPDATE statement built from the supplied fields only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUserUpdate {
    pub sql: String,
    /// Bind values in placeholder order; the email key comes last
    pub values: Vec<ColumnValue>,
}

/// Shared logic turning a partial update into SQL
pub struct UserUpdateProcessor;

impl UserUpdateProcessor {
    /// Build `UPDATE users SET ... WHERE email = ?`.
    ///
    /// Returns `None` when the update carries no fields.
    pub fn prepare(
        dialect: SqlDialect,
        email: &str,
        update: &UserUpdate,
    ) -> AppResult<Option<PreparedUserUpdate>> {
        let mut columns: Vec<(&str, ColumnValue)> = Vec::new();

        match &update.name {
            Some(Some(name)) => columns.push(("name", ColumnValue::Text(name.clone()))),
            Some(None) => return Err(AppError::Validation("name cannot be null".to_string())),
            None => {}
        }
        match &update.email {
            Some(Some(new_email)) => {
                columns.push(("email", ColumnValue::Text(new_email.clone())))
            }
            Some(None) => return Err(AppError::Validation("email cannot be null".to_string())),
            None => {}
        }
        if let Some(age) = update.age {
            columns.push(("age", ColumnValue::Integer(age)));
        }

        if columns.is_empty() {
            return Ok(None);
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = {}", column, dialect.placeholder(i + 1)))
            .collect();

        let sql = format!(
            "UPDATE {} SET {} WHERE email = {}",
            USERS_TABLE,
            assignments.join(", "),
            dialect.placeholder(columns.len() + 1)
        );

        let mut values: Vec<ColumnValue> = columns.into_iter().map(|(_, v)| v).collect();
        values.push(ColumnValue::Text(email.to_string()));

        Ok(Some(PreparedUserUpdate { sql, values }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_has_no_statement() {
        let prepared =
            UserUpdateProcessor::prepare(SqlDialect::Sqlite, "a@example.com", &UserUpdate::default())
                .unwrap();
        assert!(prepared.is_none());
    }

    #[test]
    fn test_single_field_update() {
        let update = UserUpdate::default().age(31);
        let prepared = UserUpdateProcessor::prepare(SqlDialect::Postgres, "john@example.com", &update)
            .unwrap()
            .unwrap();

        assert_eq!(prepared.sql, "UPDATE users SET age = $1 WHERE email = $2");
        assert_eq!(
            prepared.values,
            vec![
                ColumnValue::Integer(Some(31)),
                ColumnValue::Text("john@example.com".to_string())
            ]
        );
    }

    #[test]
    fn test_all_fields_update() {
        let update = UserUpdate::default()
            .name("Jane")
            .email("jane@example.com")
            .clear_age();
        let prepared = UserUpdateProcessor::prepare(SqlDialect::MySql, "john@example.com", &update)
            .unwrap()
            .unwrap();

        assert_eq!(
            prepared.sql,
            "UPDATE users SET name = ?, email = ?, age = ? WHERE email = ?"
        );
        assert_eq!(prepared.values.len(), 4);
        assert_eq!(prepared.values[2], ColumnValue::Integer(None));
        assert_eq!(
            prepared.values[3],
            ColumnValue::Text("john@example.com".to_string())
        );
    }

    #[test]
    fn test_null_required_column_is_rejected() {
        let update = UserUpdate {
            name: Some(None),
            ..UserUpdate::default()
        };
        let result = UserUpdateProcessor::prepare(SqlDialect::Sqlite, "a@example.com", &update);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
