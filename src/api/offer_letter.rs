use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{docx_download, employee::fetch_employee, parse_date},
    config::Config,
    documents::{self, Context, DocumentKind, DocumentStore, safe_file_stem},
    error::{AppError, AppResult},
    model::{employee::Employee, offer_letter::OfferLetter},
    salary::{
        SalaryBreakup,
        format::{indian_format, offer_date},
        monthly_from_annual, round_money,
        words::ctc_in_words,
    },
    utils::employee_code::{self, ManualCode},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CodeMode {
    /// Next free series number.
    #[default]
    Auto,
    /// HR types the full code.
    Manual,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OfferLetterReq {
    #[schema(example = "2025-11-20", format = "date")]
    pub offer_date: Option<String>,
    #[serde(default)]
    pub code_mode: CodeMode,
    #[schema(example = "STPL1125042")]
    pub final_employee_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfferLetterResponse {
    pub offer_letter: OfferLetter,
    /// False when the row exists but the document was removed from disk.
    pub file_exists: bool,
}

pub async fn find_offer_letter(pool: &MySqlPool, employee_id: u64) -> AppResult<Option<OfferLetter>> {
    Ok(sqlx::query_as::<_, OfferLetter>(
        r#"
        SELECT id, employee_id, offer_date, file, employee_code, series_number, date_created
        FROM offer_letters
        WHERE employee_id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?)
}

/// Yearly and monthly CTC of an employee.
///
/// The monthly figure wins; without one it is derived from the annual
/// package. The annual figure is always twelve months.
pub fn offer_amounts(employee: &Employee) -> (Decimal, Decimal) {
    let per_month = match employee.package_per_month {
        Some(m) if !m.is_zero() => m,
        _ => monthly_from_annual(employee.package_per_annum.unwrap_or_default()),
    };
    let per_annum = round_money(per_month * Decimal::from(12));
    (per_annum, per_month)
}

pub fn offer_context(employee: &Employee, code: &str, date: NaiveDate) -> Context {
    let (per_annum, per_month) = offer_amounts(employee);
    let annual = SalaryBreakup::annual(per_annum);
    let monthly = SalaryBreakup::monthly_of(&annual, per_month);
    let zero = indian_format(Decimal::ZERO);

    Context::new()
        .text("date", offer_date(date))
        .text("first_name", &employee.first_name)
        .text("last_name", employee.last_name_or_empty())
        .raw(
            "address",
            documents::template::line_breaks(employee.address.as_deref().unwrap_or("")),
        )
        .text("designation", employee.designation_or(""))
        .text("package_per_month", indian_format(per_month))
        .text("package_per_annum", indian_format(per_annum))
        .text("Basic_annum", indian_format(annual.basic))
        .text("HRA_annum", indian_format(annual.hra))
        .text("Conveyance_annum", indian_format(annual.conveyance))
        .text(
            "Performance_Incentives_annum",
            indian_format(annual.performance_incentives),
        )
        .text("Special_Allowance_annum", indian_format(annual.special_allowance))
        .text("PF_Employer_annum", zero.clone())
        .text("Variable_Pay_annum", zero.clone())
        .text("Target_Incentives_annum", zero)
        .text("Basic_month", indian_format(monthly.basic))
        .text("HRA_month", indian_format(monthly.hra))
        .text("Conveyance_month", indian_format(monthly.conveyance))
        .text(
            "Performance_Incentives_month",
            indian_format(monthly.performance_incentives),
        )
        .text("Special_Allowance_month", indian_format(monthly.special_allowance))
        .text("Total_CTC_annum", indian_format(per_annum))
        .text("Total_CTC_month", indian_format(per_month))
        .text("Total_CTC_words", ctc_in_words(per_annum))
        .text("employee_code", code)
}

pub fn offer_file_name(employee: &Employee, code: &str) -> String {
    let name = format!("{}_{}", employee.first_name, employee.last_name_or_empty());
    format!("Offer_{code}_{}.docx", safe_file_stem(&name))
}

/// Picks the employee code for a new letter: kept from an earlier letter,
/// typed by HR, or the next in the series.
async fn resolve_code(
    pool: &MySqlPool,
    company: &str,
    existing: Option<&OfferLetter>,
    req: &OfferLetterReq,
    date: NaiveDate,
) -> AppResult<(String, Option<u32>, bool)> {
    if let Some(old) = existing.and_then(|o| o.employee_code.as_deref()) {
        if employee_code::is_company_code(company, old) {
            let code = old.trim().to_string();
            let series = employee_code::series_of(company, &code);
            return Ok((code, series, true));
        }
    }

    let prefix = employee_code::month_prefix(company, date);
    match req.code_mode {
        CodeMode::Manual => {
            let manual = ManualCode::parse(req.final_employee_code.as_deref(), &prefix)?;
            let used = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM offer_letters WHERE employee_code LIKE CONCAT('%', ?)",
            )
            .bind(&manual.series)
            .fetch_one(pool)
            .await?;
            if used > 0 {
                return Err(AppError::conflict(format!(
                    "Series {} already used.",
                    manual.series
                )));
            }
            let series = manual.series_number();
            Ok((manual.code, series, false))
        }
        CodeMode::Auto => {
            let codes = sqlx::query_scalar::<_, String>(
                "SELECT employee_code FROM offer_letters \
                 WHERE employee_code IS NOT NULL AND employee_code <> ''",
            )
            .fetch_all(pool)
            .await?;
            let series = employee_code::next_series(company, codes.iter().map(String::as_str));
            Ok((employee_code::format_code(&prefix, series), Some(series), false))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/offer-letter",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = OfferLetterReq,
    responses(
        (status = 200, description = "Offer letter written", body = Object, example = json!({
            "message": "Offer letter generated successfully: STPL1125001",
            "employee_code": "STPL1125001",
            "file": "offer_letters/Offer_STPL1125001_Asha_Rao.docx"
        })),
        (status = 400, description = "Missing date or bad manual code"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Series already used"),
        (status = 423, description = "File is open. Close it and try again.")
    ),
    tag = "Offer Letter",
    security(("bearer_auth" = []))
)]
pub async fn generate_offer_letter(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
    payload: web::Json<OfferLetterReq>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let date = parse_date(payload.offer_date.as_deref(), "Please select offer date.")?;

    let existing = find_offer_letter(pool.get_ref(), employee.id).await?;
    let (code, series, regenerated) = resolve_code(
        pool.get_ref(),
        &config.employee_code_prefix,
        existing.as_ref(),
        &payload,
        date,
    )
    .await?;

    let ctx = offer_context(&employee, &code, date);
    let file = documents::generate(
        &store,
        DocumentKind::OfferLetter,
        ctx,
        offer_file_name(&employee, &code),
    )
    .await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO offer_letters (employee_id, offer_date, file, employee_code, series_number)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            offer_date = VALUES(offer_date),
            file = VALUES(file),
            employee_code = VALUES(employee_code),
            series_number = VALUES(series_number)
        "#,
    )
    .bind(employee.id)
    .bind(date)
    .bind(&file)
    .bind(&code)
    .bind(series)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE employees SET employee_code = ? WHERE id = ?")
        .bind(&code)
        .bind(employee.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let action = if regenerated { "re-generated" } else { "generated" };
    info!(employee_id = employee.id, %code, regenerated, "Offer letter written");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Offer letter {action} successfully: {code}"),
        "employee_code": code,
        "file": file,
    })))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/offer-letter",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Offer letter metadata", body = OfferLetterResponse),
        (status = 404, description = "No offer letter")
    ),
    tag = "Offer Letter",
    security(("bearer_auth" = []))
)]
pub async fn get_offer_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let offer_letter = find_offer_letter(pool.get_ref(), employee.id)
        .await?
        .ok_or_else(|| AppError::not_found("Offer letter not found."))?;

    let file_exists = store.exists(&offer_letter.file);
    Ok(HttpResponse::Ok().json(OfferLetterResponse {
        offer_letter,
        file_exists,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/offer-letter/download",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "The offer letter document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "No offer letter or file missing")
    ),
    tag = "Offer Letter",
    security(("bearer_auth" = []))
)]
pub async fn download_offer_letter(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let offer_letter = find_offer_letter(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Offer letter not found."))?;
    docx_download(&store, &offer_letter.file).await
}
