use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{docx_download, employee::fetch_employee, offer_letter::find_offer_letter, parse_date},
    documents::{self, Context, DocumentKind, DocumentStore, safe_file_stem},
    error::{AppError, AppResult},
    model::{employee::Employee, offer_letter::OfferLetter, relieving_letter::RelievingLetter},
    salary::format::{long_date, ordinal_date},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RelievingLetterReq {
    #[schema(example = "2026-06-30", format = "date")]
    pub releaving_date: Option<String>,
    /// Client company the employee was placed with, if any.
    #[schema(example = "Acme Corp")]
    pub placed_in_company: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RelievingLetterResponse {
    pub relieving_letter: RelievingLetter,
    pub file_exists: bool,
}

async fn find_relieving_letter(
    pool: &MySqlPool,
    employee_id: u64,
) -> AppResult<Option<RelievingLetter>> {
    Ok(sqlx::query_as::<_, RelievingLetter>(
        r#"
        SELECT id, employee_id, releaving_date, placed_in_company, letter_file, created_at
        FROM relieving_letters
        WHERE employee_id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?)
}

/// Relieving may not precede the joining (offer) date.
fn check_after_joining(date: NaiveDate, offer: &OfferLetter) -> AppResult<()> {
    match offer.offer_date {
        Some(joined) if date < joined => Err(AppError::bad_request(format!(
            "Relieving date cannot be before joining date ({}).",
            long_date(joined)
        ))),
        _ => Ok(()),
    }
}

pub fn relieving_context(
    employee: &Employee,
    offer: &OfferLetter,
    date: NaiveDate,
    placed_in_company: Option<&str>,
) -> Context {
    Context::new()
        .text("employee_first_name", &employee.first_name)
        .text("employee_name", employee.full_name())
        .text("designation", employee.designation_or("N/A"))
        .text(
            "emp_code",
            offer.employee_code.as_deref().unwrap_or("N/A"),
        )
        .text(
            "offer_date",
            offer.offer_date.map(ordinal_date).unwrap_or_default(),
        )
        .text("releaving_date", ordinal_date(date))
        .text("releaving_day", date.format("%A").to_string())
        .text("placed_in_company", placed_in_company.unwrap_or(""))
        .flag("has_placed_company", placed_in_company.is_some())
}

pub fn relieving_file_name(employee: &Employee, offer: &OfferLetter) -> String {
    let code = offer.employee_code.as_deref().unwrap_or("N/A");
    format!(
        "Relieving_{}_{}.docx",
        safe_file_stem(code),
        safe_file_stem(&employee.full_name())
    )
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/relieving-letter",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = RelievingLetterReq,
    responses(
        (status = 200, description = "Relieving letter written", body = Object, example = json!({
            "message": "Relieving letter generated successfully.",
            "file": "releaving_letters/Relieving_STPL1125001_Asha_Rao.docx"
        })),
        (status = 400, description = "No offer letter, missing date or date before joining"),
        (status = 404, description = "Employee not found"),
        (status = 423, description = "Close the previously opened letter in Word and try again.")
    ),
    tag = "Relieving Letter",
    security(("bearer_auth" = []))
)]
pub async fn generate_relieving_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
    payload: web::Json<RelievingLetterReq>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let offer = find_offer_letter(pool.get_ref(), employee.id)
        .await?
        .ok_or_else(|| {
            AppError::bad_request("Cannot generate relieving letter: No offer letter found.")
        })?;

    let date = parse_date(payload.releaving_date.as_deref(), "Please select relieving date.")?;
    check_after_joining(date, &offer)?;

    let placed_in_company = payload
        .placed_in_company
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let previous = find_relieving_letter(pool.get_ref(), employee.id)
        .await?
        .and_then(|r| r.letter_file);

    let file = documents::generate_replacing(
        &store,
        DocumentKind::RelievingLetter,
        relieving_context(&employee, &offer, date, placed_in_company),
        relieving_file_name(&employee, &offer),
        previous,
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO relieving_letters (employee_id, releaving_date, placed_in_company, letter_file)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            releaving_date = VALUES(releaving_date),
            placed_in_company = VALUES(placed_in_company),
            letter_file = VALUES(letter_file)
        "#,
    )
    .bind(employee.id)
    .bind(date)
    .bind(placed_in_company)
    .bind(&file)
    .execute(pool.get_ref())
    .await?;

    info!(employee_id = employee.id, %date, "Relieving letter written");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Relieving letter generated successfully.",
        "file": file,
    })))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/relieving-letter",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Relieving letter metadata", body = RelievingLetterResponse),
        (status = 404, description = "No relieving letter found for this employee.")
    ),
    tag = "Relieving Letter",
    security(("bearer_auth" = []))
)]
pub async fn get_relieving_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let relieving_letter = find_relieving_letter(pool.get_ref(), employee.id)
        .await?
        .ok_or_else(|| AppError::not_found("No relieving letter found for this employee."))?;

    let file_exists = relieving_letter
        .letter_file
        .as_deref()
        .is_some_and(|f| store.exists(f));
    Ok(HttpResponse::Ok().json(RelievingLetterResponse {
        relieving_letter,
        file_exists,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/relieving-letter/download",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "The relieving letter document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "No relieving letter or file missing")
    ),
    tag = "Relieving Letter",
    security(("bearer_auth" = []))
)]
pub async fn download_relieving_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let file = find_relieving_letter(pool.get_ref(), employee.id)
        .await?
        .and_then(|r| r.letter_file)
        .ok_or_else(|| AppError::not_found("No relieving letter found for this employee."))?;
    docx_download(&store, &file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::TemplateValue;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee() -> Employee {
        Employee {
            id: 7,
            first_name: "Asha".into(),
            last_name: Some("Rao".into()),
            email: "asha@example.com".into(),
            phone: None,
            address: None,
            designation: Some("Engineer".into()),
            package_per_annum: None,
            package_per_month: None,
            is_draft: false,
            employee_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn offer() -> OfferLetter {
        OfferLetter {
            id: 1,
            employee_id: 7,
            offer_date: Some(date(2025, 11, 20)),
            file: "offer_letters/x.docx".into(),
            employee_code: Some("STPL1125001".into()),
            series_number: Some(1),
            date_created: Utc::now(),
        }
    }

    #[test]
    fn cannot_relieve_before_joining() {
        let err = check_after_joining(date(2025, 11, 19), &offer()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Relieving date cannot be before joining date (20 November 2025)."
        );
        assert!(check_after_joining(date(2025, 11, 20), &offer()).is_ok());
    }

    #[test]
    fn context_with_and_without_placement() {
        let e = employee();
        let o = offer();
        let ctx = relieving_context(&e, &o, date(2026, 6, 30), Some("Acme Corp"));
        assert_eq!(
            ctx.get("releaving_date"),
            Some(&TemplateValue::Text("30th June 2026".into()))
        );
        assert_eq!(
            ctx.get("releaving_day"),
            Some(&TemplateValue::Text("Tuesday".into()))
        );
        assert_eq!(
            ctx.get("offer_date"),
            Some(&TemplateValue::Text("20th November 2025".into()))
        );
        assert_eq!(ctx.get("has_placed_company"), Some(&TemplateValue::Flag(true)));

        let ctx = relieving_context(&e, &o, date(2026, 6, 30), None);
        assert_eq!(ctx.get("has_placed_company"), Some(&TemplateValue::Flag(false)));
        assert_eq!(
            ctx.get("placed_in_company"),
            Some(&TemplateValue::Text(String::new()))
        );
    }

    #[test]
    fn file_name() {
        assert_eq!(
            relieving_file_name(&employee(), &offer()),
            "Relieving_STPL1125001_Asha_Rao.docx"
        );
    }
}
