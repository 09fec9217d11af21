use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RelievingLetter {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub releaving_date: NaiveDate,
    /// Company the employee was placed in, if any.
    pub placed_in_company: Option<String>,
    pub letter_file: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
