use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct HikeLetter {
    pub id: u64,
    pub employee_id: u64,
    /// Letter date as entered by HR.
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Always the first day of the month after `date`.
    #[schema(value_type = String, format = "date")]
    pub hike_start_date: NaiveDate,
    pub employee_code: Option<String>,
    #[schema(value_type = String, example = "240000.00")]
    pub old_package: Decimal,
    #[schema(value_type = String, example = "300000.00")]
    pub new_package: Decimal,
    pub hike_letter_file: Option<String>,
}
