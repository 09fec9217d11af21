use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::error::{AppError, AppResult};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    U64(u64),
    Decimal(Decimal),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Text)
    }
}

impl From<Option<Decimal>> for SqlValue {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Decimal)
    }
}

/// Binds every [`SqlValue`] to any sqlx query builder, in order.
macro_rules! bind_all {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values.iter().cloned() {
            query = match value {
                $crate::utils::db_utils::SqlValue::Text(v) => query.bind(v),
                $crate::utils::db_utils::SqlValue::U64(v) => query.bind(v),
                $crate::utils::db_utils::SqlValue::Decimal(v) => query.bind(v),
                $crate::utils::db_utils::SqlValue::Bool(v) => query.bind(v),
                $crate::utils::db_utils::SqlValue::Date(v) => query.bind(v),
                $crate::utils::db_utils::SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }};
}
pub(crate) use bind_all;

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build UPDATE SQL from column/value pairs
/// ===============================
pub fn build_update_sql(
    table: &str,
    columns: Vec<(&str, SqlValue)>,
    id_column: &str,
    id_value: u64,
) -> AppResult<SqlUpdate> {
    if columns.is_empty() {
        return Err(AppError::bad_request("No fields provided for update"));
    }

    let set_clause = columns
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let query = bind_all!(sqlx::query(&update.sql), update.values);
    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// ===============================
/// WHERE clause built from optional filters
/// ===============================
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition whose `?` placeholders take `values` in order.
    pub fn push(&mut self, condition: impl Into<String>, values: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.into());
        self.values.extend(values);
    }

    /// `WHERE a AND b`, or empty when there are no conditions.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_sql_lists_columns_then_id() {
        let update = build_update_sql(
            "employees",
            vec![
                ("first_name", SqlValue::Text("Asha".into())),
                ("last_name", SqlValue::from(None::<String>)),
            ],
            "id",
            7,
        )
        .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE employees SET first_name = ?, last_name = ? WHERE id = ?"
        );
        assert_eq!(update.values.len(), 3);
        assert_eq!(update.values[1], SqlValue::Null);
        assert_eq!(update.values[2], SqlValue::U64(7));
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(build_update_sql("employees", vec![], "id", 1).is_err());
    }

    #[test]
    fn filters_join_with_and() {
        let mut filters = Filters::new();
        assert_eq!(filters.where_clause(), "");

        filters.push(
            "(employee_code LIKE ? OR phone LIKE ?)",
            [SqlValue::Text("%11%".into()), SqlValue::Text("%11%".into())],
        );
        filters.push("is_draft = ?", [SqlValue::Bool(false)]);
        assert_eq!(
            filters.where_clause(),
            "WHERE (employee_code LIKE ? OR phone LIKE ?) AND is_draft = ?"
        );
        assert_eq!(filters.values.len(), 3);
    }
}
