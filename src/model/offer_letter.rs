use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct OfferLetter {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = Option<String>, format = "date", example = "2025-11-20")]
    pub offer_date: Option<NaiveDate>,
    /// Path relative to the media root.
    #[schema(example = "offer_letters/Offer_STPL1125001_Asha_Rao.docx")]
    pub file: String,
    #[schema(example = "STPL1125001")]
    pub employee_code: Option<String>,
    pub series_number: Option<u32>,
    #[schema(value_type = String, format = "date-time")]
    pub date_created: DateTime<Utc>,
}
