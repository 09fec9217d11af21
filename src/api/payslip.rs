use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{
        docx_download, employee::fetch_employee, hike_letter::find_hike_letter,
        offer_letter::find_offer_letter,
    },
    config::Config,
    documents::{self, Context, DocumentKind, DocumentStore, safe_file_stem},
    error::{AppError, AppResult},
    model::{
        employee::{Employee, string_or_number},
        hike_letter::HikeLetter,
        offer_letter::OfferLetter,
        payslip::{BasedOn, Payslip},
    },
    salary::{
        SalaryBreakup,
        format::{indian_format, long_date, month_year, pay_period},
        monthly_from_annual,
        words::rupees_in_words,
    },
};

const PAYSLIP_COLUMNS: &str = "id, employee_id, based_on, offer_letter_id, hike_letter_id, \
     month_year, days_worked, gross_salary, deductions, net_salary, payslip_file, created_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayslipReq {
    #[schema(example = "offer")]
    pub based_on: Option<String>,
    #[schema(example = "2025-11-30", format = "date")]
    pub payslip_date: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[schema(value_type = Option<String>, example = "30")]
    pub days_worked: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PayslipQuery {
    /// `November 2025` or `2025-11`.
    pub month: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayslipListResponse {
    /// The requested month's payslip, else the newest.
    pub selected: Option<Payslip>,
    pub file_exists: bool,
    pub payslips: Vec<Payslip>,
}

/// Monthly pay derived from an annual package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayFigures {
    pub breakup: SalaryBreakup,
    pub gross: Decimal,
    pub deductions: Decimal,
    pub net: Decimal,
}

impl PayFigures {
    /// Full month's pay; days worked do not prorate it.
    pub fn compute(annual: Decimal, deductions: Decimal) -> Self {
        let monthly = monthly_from_annual(annual);
        let breakup = SalaryBreakup::monthly(monthly);
        Self {
            gross: monthly,
            deductions,
            net: monthly - deductions,
            breakup,
        }
    }
}

/// Where the salary comes from, after checking the date against it.
struct Basis<'a> {
    based_on: BasedOn,
    annual: Decimal,
    offer: Option<&'a OfferLetter>,
    hike: Option<&'a HikeLetter>,
}

fn choose_basis<'a>(
    based_on: BasedOn,
    date: NaiveDate,
    employee: &Employee,
    offer: Option<&'a OfferLetter>,
    hike: Option<&'a HikeLetter>,
) -> AppResult<Basis<'a>> {
    match based_on {
        BasedOn::Offer => {
            if offer.and_then(|o| o.offer_date).is_some_and(|start| date < start) {
                return Err(AppError::bad_request("Date cannot be before offer date."));
            }
            Ok(Basis {
                based_on,
                annual: employee.package_per_annum.unwrap_or_default(),
                offer,
                hike: None,
            })
        }
        BasedOn::Hike => {
            let hike = hike.ok_or_else(|| AppError::bad_request("No hike letter found."))?;
            if date < hike.hike_start_date {
                return Err(AppError::bad_request("Date cannot be before hike start date."));
            }
            Ok(Basis {
                based_on,
                annual: hike.new_package,
                offer: None,
                hike: Some(hike),
            })
        }
    }
}

fn employee_code_for(basis: &Basis<'_>) -> String {
    let code = match basis.based_on {
        BasedOn::Offer => basis.offer.and_then(|o| o.employee_code.clone()),
        BasedOn::Hike => basis.hike.and_then(|h| h.employee_code.clone()),
    };
    code.filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "N/A".to_string())
}

pub struct PayslipTerms<'a> {
    pub employee: &'a Employee,
    pub employee_code: &'a str,
    pub date: NaiveDate,
    pub days_worked: u32,
    pub date_of_joining: Option<NaiveDate>,
    pub figures: &'a PayFigures,
}

pub fn payslip_context(terms: &PayslipTerms<'_>) -> Context {
    let month = month_year(terms.date);
    let b = &terms.figures.breakup;

    Context::new()
        .text("employee_name", terms.employee.full_name())
        .text("designation", terms.employee.designation_or("N/A"))
        .text("emp_code", terms.employee_code)
        .text("monthyearhyp", month.replace(' ', "-"))
        .text("monthyear", month)
        .text("period", pay_period(terms.date))
        .text("days", terms.days_worked.to_string())
        .text(
            "date_of_joining",
            terms.date_of_joining.map(long_date).unwrap_or_default(),
        )
        .text("Basic", indian_format(b.basic))
        .text("HRA", indian_format(b.hra))
        .text("Conveyance", indian_format(b.conveyance))
        .text("Performance", indian_format(b.performance_incentives))
        .text("Special_Allowance", indian_format(b.special_allowance))
        .text("Total_Addition", indian_format(terms.figures.gross))
        .text("Deductions", indian_format(terms.figures.deductions))
        .text("Net_Salary", indian_format(terms.figures.net))
        .text("Net_Salary_Words", rupees_in_words(terms.figures.net))
}

pub fn payslip_file_name(employee: &Employee, month: &str) -> String {
    let name = format!("{}_{}", employee.first_name, employee.last_name_or_empty());
    format!(
        "Payslip_{}_{}.docx",
        safe_file_stem(&name),
        month.replace(' ', "_")
    )
}

fn parse_days(raw: &str) -> AppResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(days) if days <= 31 => Ok(days),
        _ => Err(AppError::bad_request("Days worked must be a number between 0 and 31.")),
    }
}

/// Accepts `November 2025` as stored, or `2025-11`.
fn month_filter(raw: &str) -> String {
    let raw = raw.trim();
    NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .map(month_year)
        .unwrap_or_else(|_| raw.to_string())
}

async fn list_payslips(pool: &MySqlPool, employee_id: u64) -> AppResult<Vec<Payslip>> {
    let sql = format!(
        "SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE employee_id = ? \
         ORDER BY created_at DESC, id DESC"
    );
    Ok(sqlx::query_as::<_, Payslip>(&sql)
        .bind(employee_id)
        .fetch_all(pool)
        .await?)
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/payslips",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = PayslipReq,
    responses(
        (status = 200, description = "Payslip written", body = Object, example = json!({
            "message": "Payslip for November 2025 generated successfully!",
            "file": "payslips/Payslip_Asha_Rao_November_2025.docx"
        })),
        (status = 400, description = "Missing fields, bad date or no hike letter"),
        (status = 404, description = "Employee not found"),
        (status = 423, description = "Close the open file and try again.")
    ),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
pub async fn generate_payslip(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
    payload: web::Json<PayslipReq>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;

    let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let (Some(based_on), Some(raw_date), Some(raw_days)) = (
        present(&payload.based_on),
        present(&payload.payslip_date),
        present(&payload.days_worked),
    ) else {
        return Err(AppError::bad_request("Please fill all fields."));
    };

    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid date."))?;
    let days_worked = parse_days(&raw_days)?;
    let based_on =
        BasedOn::from_str(&based_on).map_err(|_| AppError::bad_request("Invalid selection."))?;

    let offer = find_offer_letter(pool.get_ref(), employee.id).await?;
    let hike = find_hike_letter(pool.get_ref(), employee.id).await?;
    let basis = choose_basis(based_on, date, &employee, offer.as_ref(), hike.as_ref())?;

    let figures = PayFigures::compute(basis.annual, config.payslip_deduction);
    let code = employee_code_for(&basis);
    let month = month_year(date);

    let ctx = payslip_context(&PayslipTerms {
        employee: &employee,
        employee_code: &code,
        date,
        days_worked,
        date_of_joining: offer.as_ref().and_then(|o| o.offer_date),
        figures: &figures,
    });
    let file = documents::generate(
        &store,
        DocumentKind::Payslip,
        ctx,
        payslip_file_name(&employee, &month),
    )
    .await?;

    sqlx::query(
        r#"
        INSERT INTO payslips
            (employee_id, based_on, offer_letter_id, hike_letter_id, month_year, days_worked,
             gross_salary, deductions, net_salary, payslip_file)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            based_on = VALUES(based_on),
            offer_letter_id = VALUES(offer_letter_id),
            hike_letter_id = VALUES(hike_letter_id),
            days_worked = VALUES(days_worked),
            gross_salary = VALUES(gross_salary),
            deductions = VALUES(deductions),
            net_salary = VALUES(net_salary),
            payslip_file = VALUES(payslip_file)
        "#,
    )
    .bind(employee.id)
    .bind(basis.based_on.as_ref())
    .bind(basis.offer.map(|o| o.id))
    .bind(basis.hike.map(|h| h.id))
    .bind(&month)
    .bind(days_worked)
    .bind(figures.gross)
    .bind(figures.deductions)
    .bind(figures.net)
    .bind(&file)
    .execute(pool.get_ref())
    .await?;

    info!(employee_id = employee.id, %month, based_on = %basis.based_on, "Payslip written");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Payslip for {month} generated successfully!"),
        "file": file,
    })))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/payslips",
    params(("employee_id", Path, description = "Employee ID"), PayslipQuery),
    responses(
        (status = 200, description = "Payslips newest first", body = PayslipListResponse),
        (status = 404, description = "Employee not found")
    ),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
pub async fn get_payslips(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<u64>,
    query: web::Query<PayslipQuery>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    let payslips = list_payslips(pool.get_ref(), employee.id).await?;

    let selected = match query.month.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(raw) => {
            let wanted = month_filter(raw);
            payslips.iter().find(|p| p.month_year == wanted).cloned()
        }
        None => payslips.first().cloned(),
    };
    let file_exists = selected
        .as_ref()
        .and_then(|p| p.payslip_file.as_deref())
        .is_some_and(|f| store.exists(f));

    Ok(HttpResponse::Ok().json(PayslipListResponse {
        selected,
        file_exists,
        payslips,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/payslips/{payslip_id}/download",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("payslip_id", Path, description = "Payslip ID")
    ),
    responses(
        (status = 200, description = "The payslip document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "No such payslip or file missing")
    ),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
pub async fn download_payslip(
    pool: web::Data<MySqlPool>,
    store: web::Data<DocumentStore>,
    path: web::Path<(u64, u64)>,
) -> AppResult<HttpResponse> {
    let (employee_id, payslip_id) = path.into_inner();
    let file = sqlx::query_scalar::<_, Option<String>>(
        "SELECT payslip_file FROM payslips WHERE id = ? AND employee_id = ?",
    )
    .bind(payslip_id)
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await?
    .flatten()
    .ok_or_else(|| AppError::not_found("Payslip not found."))?;

    docx_download(&store, &file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::TemplateValue;
    use chrono::Utc;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn employee() -> Employee {
        Employee {
            id: 7,
            first_name: "Asha".into(),
            last_name: Some("Rao".into()),
            email: "asha@example.com".into(),
            phone: None,
            address: None,
            designation: None,
            package_per_annum: Some(d("240000")),
            package_per_month: Some(d("20000")),
            is_draft: false,
            employee_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn offer() -> OfferLetter {
        OfferLetter {
            id: 11,
            employee_id: 7,
            offer_date: Some(date(2025, 11, 20)),
            file: "offer_letters/x.docx".into(),
            employee_code: Some("STPL1125001".into()),
            series_number: Some(1),
            date_created: Utc::now(),
        }
    }

    fn hike() -> HikeLetter {
        HikeLetter {
            id: 21,
            employee_id: 7,
            date: date(2026, 3, 15),
            hike_start_date: date(2026, 4, 1),
            employee_code: Some("STPL1125001".into()),
            old_package: d("240000"),
            new_package: d("300000"),
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
    fn figures_use_full_month_and_flat_deduction() {
        let f = PayFigures::compute(d("240000"), d("200"));
        assert_eq!(f.gross, d("20000.00"));
        assert_eq!(f.net, d("19800.00"));
        assert_eq!(f.breakup.basic, d("9000.00"));
        assert_eq!(f.breakup.conveyance, d("1200"));
        assert_eq!(f.breakup.performance_incentives, d("3180.00"));
    }

    #[test]
    fn offer_basis_rejects_dates_before_joining() {
        let e = employee();
        let o = offer();
        let err = choose_basis(BasedOn::Offer, date(2025, 11, 1), &e, Some(&o), None)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Date cannot be before offer date.");

        let basis = choose_basis(BasedOn::Offer, date(2025, 11, 30), &e, Some(&o), None).unwrap();
        assert_eq!(basis.annual, d("240000"));
        assert_eq!(employee_code_for(&basis), "STPL1125001");
    }

    #[test]
    fn hike_basis_needs_a_hike_letter() {
        let e = employee();
        let err = choose_basis(BasedOn::Hike, date(2026, 4, 30), &e, None, None)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "No hike letter found.");

        let h = hike();
        let err = choose_basis(BasedOn::Hike, date(2026, 3, 31), &e, None, Some(&h))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Date cannot be before hike start date.");

        let basis = choose_basis(BasedOn::Hike, date(2026, 4, 30), &e, None, Some(&h)).unwrap();
        assert_eq!(basis.annual, d("300000"));
        assert!(basis.offer.is_none());
    }

    #[test]
    fn missing_code_renders_na() {
        let e = employee();
        let basis = choose_basis(BasedOn::Offer, date(2025, 11, 30), &e, None, None).unwrap();
        assert_eq!(employee_code_for(&basis), "N/A");
    }

    #[test]
    fn context_fields() {
        let e = employee();
        let figures = PayFigures::compute(d("240000"), d("200"));
        let ctx = payslip_context(&PayslipTerms {
            employee: &e,
            employee_code: "STPL1125001",
            date: date(2025, 11, 30),
            days_worked: 28,
            date_of_joining: Some(date(2025, 11, 20)),
            figures: &figures,
        });

        assert_eq!(text(&ctx, "monthyear"), "November 2025");
        assert_eq!(text(&ctx, "monthyearhyp"), "November-2025");
        assert_eq!(text(&ctx, "period"), "01/11/2025 To 30/11/2025");
        assert_eq!(text(&ctx, "days"), "28");
        assert_eq!(text(&ctx, "designation"), "N/A");
        assert_eq!(text(&ctx, "date_of_joining"), "20 November 2025");
        assert_eq!(text(&ctx, "Total_Addition"), "20,000.00");
        assert_eq!(text(&ctx, "Net_Salary"), "19,800.00");
        assert_eq!(
            text(&ctx, "Net_Salary_Words"),
            "Nineteen Thousand, Eight Hundred Rupees Only"
        );
    }

    #[test]
    fn file_name_and_month_filter() {
        assert_eq!(
            payslip_file_name(&employee(), "November 2025"),
            "Payslip_Asha_Rao_November_2025.docx"
        );
        assert_eq!(month_filter("2025-11"), "November 2025");
        assert_eq!(month_filter("November 2025"), "November 2025");
    }

    #[test]
    fn days_are_bounded() {
        assert_eq!(parse_days("30").unwrap(), 30);
        assert!(parse_days("32").is_err());
        assert!(parse_days("-1").is_err());
        assert!(parse_days("ten").is_err());
    }
}
