pub mod employee;
pub mod hike_letter;
pub mod offer_letter;
pub mod payslip;
pub mod relieving_letter;

use actix_web::{HttpResponse, http::header};
use chrono::NaiveDate;

use crate::documents::{self, DocumentStore};
use crate::error::{AppError, AppResult};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Parses a `YYYY-MM-DD` form value; `missing` is the message for a blank one.
pub fn parse_date(raw: Option<&str>, missing: &str) -> AppResult<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(AppError::bad_request(missing));
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid date format."))
}

/// Streams a stored document back as an attachment.
pub async fn docx_download(store: &DocumentStore, relative: &str) -> AppResult<HttpResponse> {
    let file_name = relative
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("document.docx")
        .to_string();
    let bytes = documents::read(store, relative.to_string()).await?;

    Ok(HttpResponse::Ok()
        .content_type(DOCX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ))
        .body(bytes))
}
