use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{docx_download, employee::fetch_employee, offer_letter::find_offer_letter, parse_date},
    config::Config,
    documents::{self, Context, DocumentKind, DocumentStore, safe_file_stem},
    error::{AppError, AppResult},
    model::{employee::Employee, hike_letter::HikeLetter, offer_letter::OfferLetter},
    salary::{
        SalaryBreakup,
        format::{first_day_of_next_month, indian_format, long_date, month_year},
        round_money,
        words::package_in_words,
    },
    utils::employee_code::fallback_code,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct HikeLetterReq {
    #[serde(default, deserialize_with = "crate::model::employee::string_or_number")]
    #[schema(value_type = Option<String>, example = "300000")]
    pub new_package_annual: Option<String>,
    #[schema(example = "2026-03-15", format = "date")]
    pub date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HikeLetterInfo {
    pub employee_id: u64,
    pub employee_name: String,
    pub designation: String,
    #[schema(value_type = String, example = "240000.00")]
    pub old_package: Decimal,
    /// Earliest date a new hike letter may carry.
    #[schema(value_type = String, format = "date")]
    pub min_date: NaiveDate,
    pub hike_letter: Option<HikeLetter>,
    pub file_exists: bool,
}

pub async fn find_hike_letter(pool: &MySqlPool, employee_id: u64) -> AppResult<Option<HikeLetter>> {
    Ok(sqlx::query_as::<_, HikeLetter>(
        r#"
        SELECT id, employee_id, date, hike_start_date, employee_code,
               old_package, new_package, hike_letter_file
        FROM hike_letters
        WHERE employee_id = ?
        ORDER BY hike_start_date DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?)
}

/// Employee code printed on letters: the offer letter's, else a code
/// derived from the employee id.
pub fn letter_code(company: &str, employee: &Employee, offer: Option<&OfferLetter>) -> String {
    offer
        .and_then(|o| o.employee_code.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_code(company, employee.id))
}

/// A hike may not predate the last hike's start, or else the offer date.
pub fn min_hike_date(
    last_hike: Option<&HikeLetter>,
    offer: Option<&OfferLetter>,
    today: NaiveDate,
) -> NaiveDate {
    last_hike
        .map(|h| h.hike_start_date)
        .or_else(|| offer.and_then(|o| o.offer_date))
        .unwrap_or(today)
}

pub struct HikeTerms<'a> {
    pub employee: &'a Employee,
    pub code: &'a str,
    pub date: NaiveDate,
    pub hike_start_date: NaiveDate,
    pub old_package: Decimal,
    pub new_package: Decimal,
}

pub fn hike_context(terms: &HikeTerms<'_>) -> Context {
    let old = SalaryBreakup::annual(terms.old_package);
    let new = SalaryBreakup::annual(terms.new_package);

    Context::new()
        .text("date", long_date(terms.date))
        .text("employee_name", terms.employee.full_name())
        .text("employee_code", terms.code)
        .text("designation", terms.employee.designation_or(""))
        .text("hike_start_date", long_date(terms.hike_start_date))
        .text("old_package", indian_format(terms.old_package))
        .text("new_package", indian_format(terms.new_package))
        .text("old_basic", indian_format(old.basic))
        .text("old_hra", indian_format(old.hra))
        .text("old_conveyance", indian_format(old.conveyance))
        .text("old_perf", indian_format(old.performance_incentives))
        .text("old_special", indian_format(old.special_allowance))
        .text("new_basic", indian_format(new.basic))
        .text("new_hra", indian_format(new.hra))
        .text("new_conveyance", indian_format(new.conveyance))
        .text("new_perf", indian_format(new.performance_incentives))
        .text("new_special", indian_format(new.special_allowance))
        .text("hike_month_year", month_year(terms.hike_start_date))
        .text("new_package_words", package_in_words(terms.new_package))
}

pub fn hike_file_name(employee: &Employee, code: &str) -> String {
    format!("{}_{code}_hike_letter.docx", safe_file_stem(&employee.full_name()))
}

fn parse_package(raw: &str) -> AppResult<Decimal> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|_| AppError::bad_request("Enter a valid package amount."))?;
    if value.is_sign_negative() || value.is_zero() {
        return Err(AppError::bad_request("Enter a valid package amount."));
    }
    Ok(round_money(value))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/hike-letter",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Current package and hike letter, if any", body = HikeLetterInfo),
        (status = 404, description = "Employee not found")
    ),
    tag = "Hike Letter",
    security(("bearer_auth" = []))
)]
pub async fn get_hike_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let offer = find_offer_letter(pool.get_ref(), employee.id).await?;
    let hike_letter = find_hike_letter(pool.get_ref(), employee.id).await?;

    let min_date = min_hike_date(hike_letter.as_ref(), offer.as_ref(), Local::now().date_naive());
    let file_exists = hike_letter
        .as_ref()
        .and_then(|h| h.hike_letter_file.as_deref())
        .is_some_and(|f| store.exists(f));

    Ok(HttpResponse::Ok().json(HikeLetterInfo {
        employee_id: employee.id,
        employee_name: employee.full_name(),
        designation: employee.designation_or("").to_string(),
        old_package: employee.package_per_annum.unwrap_or_default(),
        min_date,
        hike_letter,
        file_exists,
    }))
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/hike-letter",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = HikeLetterReq,
    responses(
        (status = 200, description = "Hike letter written", body = Object, example = json!({
            "message": "Hike generated Successfully!",
            "file": "hike_letters/Asha_Rao_STPL1125001_hike_letter.docx"
        })),
        (status = 400, description = "Missing input or date before the allowed minimum"),
        (status = 404, description = "Employee not found"),
        (status = 423, description = "Old hike letter is OPENED. Please close it and try again.")
    ),
    tag = "Hike Letter",
    security(("bearer_auth" = []))
)]
pub async fn generate_hike_letter(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
    payload: web::Json<HikeLetterReq>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;

    let (Some(raw_package), Some(raw_date)) = (
        payload.new_package_annual.as_deref().filter(|s| !s.trim().is_empty()),
        payload.date.as_deref().filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(AppError::bad_request("Please provide date and new package."));
    };
    let new_package = parse_package(raw_package)?;
    let date = parse_date(Some(raw_date), "Please provide date and new package.")?;

    let offer = find_offer_letter(pool.get_ref(), employee.id).await?;
    let last_hike = find_hike_letter(pool.get_ref(), employee.id).await?;
    let min_date = min_hike_date(last_hike.as_ref(), offer.as_ref(), Local::now().date_naive());
    if date < min_date {
        return Err(AppError::bad_request(format!(
            "Hike date cannot be before {min_date}"
        )));
    }

    let code = letter_code(&config.employee_code_prefix, &employee, offer.as_ref());
    let terms = HikeTerms {
        employee: &employee,
        code: &code,
        date,
        hike_start_date: first_day_of_next_month(date),
        old_package: employee.package_per_annum.unwrap_or_default(),
        new_package,
    };

    let file = documents::generate(
        &store,
        DocumentKind::HikeLetter,
        hike_context(&terms),
        hike_file_name(&employee, &code),
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO hike_letters
            (employee_id, date, hike_start_date, employee_code, old_package, new_package, hike_letter_file)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            date = VALUES(date),
            hike_start_date = VALUES(hike_start_date),
            employee_code = VALUES(employee_code),
            old_package = VALUES(old_package),
            new_package = VALUES(new_package),
            hike_letter_file = VALUES(hike_letter_file)
        "#,
    )
    .bind(employee.id)
    .bind(terms.date)
    .bind(terms.hike_start_date)
    .bind(&code)
    .bind(terms.old_package)
    .bind(terms.new_package)
    .bind(&file)
    .execute(pool.get_ref())
    .await?;

    info!(
        employee_id = employee.id,
        hike_start = %terms.hike_start_date,
        "Hike letter written"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Hike generated Successfully!",
        "file": file,
    })))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/hike-letter/download",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "The hike letter document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "No hike letter or file missing")
    ),
    tag = "Hike Letter",
    security(("bearer_auth" = []))
)]
pub async fn download_hike_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let file = find_hike_letter(pool.get_ref(), path.into_inner())
        .await?
        .and_then(|h| h.hike_letter_file)
        .ok_or_else(|| AppError::not_found("Hike letter not found."))?;
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
            package_per_annum: Some(Decimal::from(240000)),
            package_per_month: Some(Decimal::from(20000)),
            is_draft: false,
            employee_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn offer(code: Option<&str>, on: Option<NaiveDate>) -> OfferLetter {
        OfferLetter {
            id: 1,
            employee_id: 7,
            offer_date: on,
            file: "offer_letters/x.docx".into(),
            employee_code: code.map(str::to_string),
            series_number: None,
            date_created: Utc::now(),
        }
    }

    fn hike(start: NaiveDate) -> HikeLetter {
        HikeLetter {
            id: 1,
            employee_id: 7,
            date: start,
            hike_start_date: start,
            employee_code: None,
            old_package: Decimal::from(200000),
            new_package: Decimal::from(240000),
            hike_letter_file: None,
        }
    }

    fn text<'a>(ctx: &'a Context, key: &str) -> &'a str {
        match ctx.get(key) {
            Some(TemplateValue::Text(s)) => s,
            other => panic!("{key}: unexpected {other:?}"),
        }
    }

    #[test]
    fn code_falls_back_to_employee_id() {
        let e = employee();
        assert_eq!(letter_code("STPL", &e, None), "STPL007");
        assert_eq!(
            letter_code("STPL", &e, Some(&offer(Some("STPL1125001"), None))),
            "STPL1125001"
        );
        assert_eq!(letter_code("STPL", &e, Some(&offer(None, None))), "STPL007");
    }

    #[test]
    fn minimum_date_prefers_last_hike_then_offer() {
        let today = date(2026, 1, 10);
        let o = offer(None, Some(date(2025, 11, 20)));
        let h = hike(date(2026, 4, 1));
        assert_eq!(min_hike_date(Some(&h), Some(&o), today), date(2026, 4, 1));
        assert_eq!(min_hike_date(None, Some(&o), today), date(2025, 11, 20));
        assert_eq!(min_hike_date(None, None, today), today);
    }

    #[test]
    fn context_compares_old_and_new_breakup() {
        let e = employee();
        let terms = HikeTerms {
            employee: &e,
            code: "STPL1125001",
            date: date(2026, 3, 15),
            hike_start_date: first_day_of_next_month(date(2026, 3, 15)),
            old_package: Decimal::from(240000),
            new_package: Decimal::from(300000),
        };
        let ctx = hike_context(&terms);

        assert_eq!(text(&ctx, "date"), "15 March 2026");
        assert_eq!(text(&ctx, "hike_start_date"), "01 April 2026");
        assert_eq!(text(&ctx, "hike_month_year"), "April 2026");
        assert_eq!(text(&ctx, "old_basic"), "1,08,000.00");
        assert_eq!(text(&ctx, "new_basic"), "1,35,000.00");
        assert_eq!(text(&ctx, "new_hra"), "67,500.00");
        assert_eq!(text(&ctx, "new_conveyance"), "14,400.00");
        assert_eq!(text(&ctx, "new_perf"), "49,860.00");
        assert_eq!(text(&ctx, "new_special"), "33,240.00");
        assert_eq!(text(&ctx, "new_package"), "3,00,000.00");
        assert_eq!(text(&ctx, "new_package_words"), "3 Lakhs Per Annum");
        assert_eq!(text(&ctx, "employee_name"), "Asha Rao");
    }

    #[test]
    fn file_name_uses_full_name() {
        assert_eq!(
            hike_file_name(&employee(), "STPL1125001"),
            "Asha_Rao_STPL1125001_hike_letter.docx"
        );
    }

    #[test]
    fn package_must_be_positive() {
        assert_eq!(parse_package("300000").unwrap(), Decimal::from(300000));
        assert!(parse_package("-1").is_err());
        assert!(parse_package("abc").is_err());
    }
}
