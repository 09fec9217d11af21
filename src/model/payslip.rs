use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Which letter the salary figure is taken from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BasedOn {
    Offer,
    Hike,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Payslip {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "offer")]
    pub based_on: String,
    pub offer_letter_id: Option<u64>,
    pub hike_letter_id: Option<u64>,
    #[schema(example = "November 2025")]
    pub month_year: String,
    pub days_worked: u32,
    #[schema(value_type = String, example = "20000.00")]
    pub gross_salary: Decimal,
    #[schema(value_type = String, example = "200.00")]
    pub deductions: Decimal,
    #[schema(value_type = String, example = "19800.00")]
    pub net_salary: Decimal,
    pub payslip_file: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
