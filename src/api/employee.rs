use actix_web::{HttpResponse, http::header, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    model::employee::{Employee, EmployeeForm, EmployeeInput, SubmitAction},
    utils::db_utils::{Filters, SqlValue, bind_all, build_update_sql, execute_update},
};

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, email, phone, address, designation, \
     package_per_annum, package_per_month, is_draft, employee_code, created_at, updated_at";

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Matches employee code or phone.
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UniqueQuery {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UniqueResponse {
    pub email_exists: bool,
    pub phone_exists: bool,
}

/// Loads an employee or fails with 404.
pub async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> AppResult<Employee> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))
}

fn clean_form(form: &EmployeeForm) -> AppResult<EmployeeInput> {
    form.clean().map_err(|fields| {
        let message = if form.action == SubmitAction::Draft {
            "First Name and Email are required to save a draft."
        } else {
            "Please correct the highlighted errors before final submission."
        };
        AppError::invalid_fields(message, fields)
    })
}

async fn contact_taken(
    pool: &MySqlPool,
    column: &str,
    value: &str,
    final_only: bool,
    exclude_id: Option<u64>,
) -> AppResult<bool> {
    let mut filters = Filters::new();
    filters.push(
        format!("LOWER({column}) = LOWER(?)"),
        [SqlValue::Text(value.to_string())],
    );
    if final_only {
        filters.push("is_draft = ?", [SqlValue::Bool(false)]);
    }
    if let Some(id) = exclude_id {
        filters.push("id <> ?", [SqlValue::U64(id)]);
    }

    let sql = format!(
        "SELECT COUNT(*) FROM employees {}",
        filters.where_clause()
    );
    let count = bind_all!(sqlx::query_scalar::<_, i64>(&sql), filters.values)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Email and phone must not belong to another finalized employee.
async fn ensure_unique_contact(
    pool: &MySqlPool,
    input: &EmployeeInput,
    exclude_id: Option<u64>,
) -> AppResult<()> {
    let email_exists = contact_taken(pool, "email", &input.email, true, exclude_id).await?;
    let phone_exists = match &input.phone {
        Some(phone) => contact_taken(pool, "phone", phone, true, exclude_id).await?,
        None => false,
    };

    match (email_exists, phone_exists) {
        (true, true) => Err(AppError::conflict(
            "Both email and phone number already exist.",
        )),
        (true, false) => Err(AppError::conflict("Email already exists.")),
        (false, true) => Err(AppError::conflict("Phone number already exists.")),
        (false, false) => Ok(()),
    }
}

#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = EmployeeForm,
    responses(
        (status = 201, description = "Employee saved", body = Object, example = json!({
            "message": "Employee details saved successfully.",
            "id": 1
        })),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email or phone already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    pool: web::Data<MySqlPool>,
    payload: web::Json<EmployeeForm>,
) -> AppResult<HttpResponse> {
    let input = clean_form(&payload)?;
    if !input.is_draft {
        ensure_unique_contact(pool.get_ref(), &input, None).await?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (first_name, last_name, email, phone, address, designation,
         package_per_annum, package_per_month, is_draft)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(&input.designation)
    .bind(input.package_per_annum)
    .bind(input.package_per_month)
    .bind(input.is_draft)
    .execute(pool.get_ref())
    .await?;

    let id = result.last_insert_id();
    info!(employee_id = id, draft = input.is_draft, "Employee created");

    let message = if input.is_draft {
        "Draft saved successfully."
    } else {
        "Employee details saved successfully."
    };
    Ok(HttpResponse::Created().json(json!({ "message": message, "id": id })))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list, newest first", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut filters = Filters::new();
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let like = format!("%{}%", search.to_lowercase());
        filters.push(
            "(LOWER(employee_code) LIKE ? OR LOWER(phone) LIKE ?)",
            [SqlValue::Text(like.clone()), SqlValue::Text(like)],
        );
    }
    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
    debug!(sql = %count_sql, "Counting employees");
    let total = bind_all!(sqlx::query_scalar::<_, i64>(&count_sql), filters.values)
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} \
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");
    let data = bind_all!(sqlx::query_as::<_, Employee>(&data_sql), filters.values)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = EmployeeForm,
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee details updated successfully."
        })),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Email or phone already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<EmployeeForm>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    fetch_employee(pool.get_ref(), employee_id).await?;

    let input = clean_form(&payload)?;
    if !input.is_draft {
        ensure_unique_contact(pool.get_ref(), &input, Some(employee_id)).await?;
    }

    let update = build_update_sql(
        "employees",
        vec![
            ("first_name", SqlValue::Text(input.first_name.clone())),
            ("last_name", input.last_name.clone().into()),
            ("email", SqlValue::Text(input.email.clone())),
            ("phone", input.phone.clone().into()),
            ("address", input.address.clone().into()),
            ("designation", input.designation.clone().into()),
            ("package_per_annum", input.package_per_annum.into()),
            ("package_per_month", input.package_per_month.into()),
            ("is_draft", SqlValue::Bool(input.is_draft)),
        ],
        "id",
        employee_id,
    )?;
    execute_update(pool.get_ref(), update).await?;

    info!(employee_id, draft = input.is_draft, "Employee updated");
    let message = if input.is_draft {
        "Draft updated successfully."
    } else {
        "Employee details updated successfully."
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Deleted with letters and payslips", body = Object, example = json!({
            "message": "Employee Asha Rao deleted successfully."
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    info!(employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!(
            "Employee {} {} deleted successfully.",
            employee.first_name,
            employee.last_name_or_empty()
        )
    })))
}

#[utoipa::path(
    get,
    path = "/api/employees/check-unique",
    params(UniqueQuery),
    responses((status = 200, description = "Whether any employee already uses the email or phone", body = UniqueResponse)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn check_unique(
    pool: web::Data<MySqlPool>,
    query: web::Query<UniqueQuery>,
) -> AppResult<HttpResponse> {
    let email = query.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let phone = query.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let email_exists = match email {
        Some(email) => contact_taken(pool.get_ref(), "email", email, false, None).await?,
        None => false,
    };
    let phone_exists = match phone {
        Some(phone) => contact_taken(pool.get_ref(), "phone", phone, false, None).await?,
        None => false,
    };

    Ok(HttpResponse::Ok().json(UniqueResponse {
        email_exists,
        phone_exists,
    }))
}

const EXPORT_HEADER: [&str; 12] = [
    "ID",
    "Employee Code",
    "First Name",
    "Last Name",
    "Email",
    "Phone",
    "Address",
    "Designation",
    "Package Per Annum",
    "Package Per Month",
    "Status",
    "Created At",
];

/// Renders employees as CSV, header row first.
pub fn employees_csv(employees: &[Employee]) -> AppResult<Vec<u8>> {
    let csv_error = |e: csv::Error| AppError::internal(format!("csv export failed: {e}"));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER).map_err(csv_error)?;

    for e in employees {
        let money = |v: Option<rust_decimal::Decimal>| v.map(|d| d.to_string()).unwrap_or_default();
        writer
            .write_record([
                e.id.to_string(),
                e.employee_code.clone().unwrap_or_default(),
                e.first_name.clone(),
                e.last_name.clone().unwrap_or_default(),
                e.email.clone(),
                e.phone.clone().unwrap_or_default(),
                e.address.clone().unwrap_or_default(),
                e.designation.clone().unwrap_or_default(),
                money(e.package_per_annum),
                money(e.package_per_month),
                if e.is_draft { "Draft" } else { "Final" }.to_string(),
                e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::internal(format!("csv export failed: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/employees/export",
    responses((status = 200, description = "All employees as CSV", content_type = "text/csv")),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn export_employees(pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at DESC, id DESC");
    let employees = sqlx::query_as::<_, Employee>(&sql)
        .fetch_all(pool.get_ref())
        .await?;

    let body = employees_csv(&employees)?;
    info!(rows = employees.len(), "Employees exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"employees.csv\"",
        ))
        .body(body))
}
