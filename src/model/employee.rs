use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::error::FieldErrors;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "first_name": "Asha",
        "last_name": "Rao",
        "email": "asha.rao@example.com",
        "phone": "9876543210",
        "address": "12 MG Road\nBengaluru",
        "designation": "Software Engineer",
        "package_per_annum": "240000.00",
        "package_per_month": "20000.00",
        "is_draft": false,
        "employee_code": "STPL1125001",
        "created_at": "2025-11-20T09:30:00Z",
        "updated_at": "2025-11-20T09:30:00Z"
    })
)]
pub struct Employee {
    pub id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub designation: Option<String>,
    #[schema(value_type = Option<String>)]
    pub package_per_annum: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub package_per_month: Option<Decimal>,
    pub is_draft: bool,
    pub employee_code: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// `First Last`, or just the first name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name.as_deref().unwrap_or(""))
            .trim()
            .to_string()
    }

    pub fn last_name_or_empty(&self) -> &str {
        self.last_name.as_deref().unwrap_or("")
    }

    pub fn designation_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.designation.as_deref().unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmitAction {
    /// Save with only first name and email.
    #[default]
    Draft,
    /// Complete record, every mandatory field checked.
    Final,
}

/// Accepts a JSON string or number and keeps its text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Employee data as submitted. Every field is raw text until cleaned.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmployeeForm {
    #[schema(example = "Asha")]
    pub first_name: Option<String>,
    #[schema(example = "Rao")]
    pub last_name: Option<String>,
    #[schema(example = "asha.rao@example.com")]
    pub email: Option<String>,
    #[schema(example = "9876543210")]
    pub phone: Option<String>,
    #[schema(example = "12 MG Road\nBengaluru")]
    pub address: Option<String>,
    #[schema(example = "Software Engineer")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[schema(value_type = Option<String>, example = "240000")]
    pub package_per_annum: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[schema(value_type = Option<String>, example = "20000")]
    pub package_per_month: Option<String>,
    #[serde(default)]
    pub action: SubmitAction,
}

/// Cleaned employee data ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeInput {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub designation: Option<String>,
    pub package_per_annum: Option<Decimal>,
    pub package_per_month: Option<Decimal>,
    pub is_draft: bool,
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

const PACKAGE_MAX_DIGITS: u32 = 10;
const PACKAGE_DECIMAL_PLACES: u32 = 2;

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `package_per_annum` -> `Package Per Annum`
fn field_title(field: &str) -> String {
    field
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &Option<String>, max: usize) {
    if let Some(v) = value {
        if v.chars().count() > max {
            push_error(
                errors,
                field,
                format!("Ensure this value has at most {max} characters (it has {}).", v.chars().count()),
            );
        }
    }
}

fn parse_package(errors: &mut FieldErrors, field: &str, raw: &Option<String>) -> Option<Decimal> {
    let text = blank_to_none(raw)?;
    let value = match Decimal::from_str(&text) {
        Ok(v) => v,
        Err(_) => {
            push_error(errors, field, "Enter a number.");
            return None;
        }
    };

    if value.is_sign_negative() && !value.is_zero() {
        push_error(errors, field, "Ensure this value is greater than or equal to 0.");
        return None;
    }

    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale > PACKAGE_DECIMAL_PLACES {
        push_error(
            errors,
            field,
            format!("Ensure that there are no more than {PACKAGE_DECIMAL_PLACES} decimal places."),
        );
        return None;
    }

    let whole_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;
    if whole_digits + PACKAGE_DECIMAL_PLACES > PACKAGE_MAX_DIGITS {
        push_error(
            errors,
            field,
            format!("Ensure that there are no more than {PACKAGE_MAX_DIGITS} digits in total."),
        );
        return None;
    }

    Some(value)
}

impl EmployeeForm {
    /// Validates the form for its `action`.
    ///
    /// First name and email are always required. A final submission also
    /// requires phone, designation, address and both packages; last name is
    /// never required.
    pub fn clean(&self) -> Result<EmployeeInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = blank_to_none(&self.first_name);
        let last_name = blank_to_none(&self.last_name);
        let email = blank_to_none(&self.email);
        let phone = blank_to_none(&self.phone);
        let address = blank_to_none(&self.address);
        let designation = blank_to_none(&self.designation);

        if first_name.is_none() {
            push_error(&mut errors, "first_name", "First Name is required");
        }
        if email.is_none() {
            push_error(&mut errors, "email", "Email is required");
        }

        check_length(&mut errors, "first_name", &first_name, 100);
        check_length(&mut errors, "last_name", &last_name, 100);
        check_length(&mut errors, "email", &email, 254);
        check_length(&mut errors, "phone", &phone, 15);
        check_length(&mut errors, "designation", &designation, 100);

        let package_per_annum = parse_package(&mut errors, "package_per_annum", &self.package_per_annum);
        let package_per_month = parse_package(&mut errors, "package_per_month", &self.package_per_month);

        let is_draft = self.action == SubmitAction::Draft;

        if !is_draft {
            if let Some(e) = &email {
                if !EMAIL_RE.is_match(e) {
                    push_error(&mut errors, "email", "Enter a valid email address.");
                }
            }

            let present = |field: &str| -> bool {
                match field {
                    "first_name" => first_name.is_some(),
                    "email" => email.is_some(),
                    "phone" => phone.is_some(),
                    "designation" => designation.is_some(),
                    "address" => address.is_some(),
                    // a zero package counts as missing
                    "package_per_annum" => package_per_annum.is_some_and(|p| !p.is_zero()),
                    "package_per_month" => package_per_month.is_some_and(|p| !p.is_zero()),
                    _ => true,
                }
            };

            for field in [
                "first_name",
                "email",
                "phone",
                "designation",
                "address",
                "package_per_annum",
                "package_per_month",
            ] {
                if !present(field) {
                    push_error(
                        &mut errors,
                        field,
                        format!("{} is required for final submission", field_title(field)),
                    );
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(EmployeeInput {
            first_name: first_name.unwrap_or_default(),
            last_name,
            email: email.unwrap_or_default(),
            phone,
            address,
            designation,
            package_per_annum,
            package_per_month,
            is_draft,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn final_form() -> EmployeeForm {
        EmployeeForm {
            first_name: Some("Asha".into()),
            last_name: None,
            email: Some("asha@example.com".into()),
            phone: Some("9876543210".into()),
            address: Some("12 MG Road".into()),
            designation: Some("Engineer".into()),
            package_per_annum: Some("240000".into()),
            package_per_month: Some("20000".into()),
            action: SubmitAction::Final,
        }
    }

    #[test]
    fn draft_needs_only_name_and_email() {
        let form = EmployeeForm {
            first_name: Some("  Asha ".into()),
            email: Some("asha@example.com".into()),
            phone: Some("   ".into()),
            ..Default::default()
        };
        let input = form.clean().unwrap();
        assert!(input.is_draft);
        assert_eq!(input.first_name, "Asha");
        assert_eq!(input.phone, None);
        assert_eq!(input.package_per_annum, None);
    }

    #[test]
    fn draft_without_email_fails() {
        let form = EmployeeForm {
            first_name: Some("Asha".into()),
            ..Default::default()
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(errors["email"], vec!["Email is required".to_string()]);
        assert!(!errors.contains_key("first_name"));
    }

    #[test]
    fn final_submission_is_accepted() {
        let input = final_form().clean().unwrap();
        assert!(!input.is_draft);
        assert_eq!(input.last_name, None);
        assert_eq!(input.package_per_annum, Some(Decimal::from(240000)));
    }

    #[test]
    fn final_submission_reports_every_missing_field() {
        let form = EmployeeForm {
            first_name: Some("Asha".into()),
            email: Some("asha@example.com".into()),
            action: SubmitAction::Final,
            ..Default::default()
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors["phone"],
            vec!["Phone is required for final submission".to_string()]
        );
        assert_eq!(
            errors["package_per_annum"],
            vec!["Package Per Annum is required for final submission".to_string()]
        );
        assert!(errors.contains_key("designation"));
        assert!(errors.contains_key("address"));
        assert!(errors.contains_key("package_per_month"));
        assert!(!errors.contains_key("last_name"));
    }

    #[test]
    fn final_submission_without_first_name_reports_both_messages() {
        let mut form = final_form();
        form.first_name = None;
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors["first_name"],
            vec![
                "First Name is required".to_string(),
                "First Name is required for final submission".to_string()
            ]
        );
    }

    #[test]
    fn zero_package_is_missing_for_final() {
        let mut form = final_form();
        form.package_per_month = Some("0".into());
        let errors = form.clean().unwrap_err();
        assert!(errors.contains_key("package_per_month"));
    }

    #[test]
    fn malformed_email_rejected_on_final() {
        let mut form = final_form();
        form.email = Some("not-an-email".into());
        let errors = form.clean().unwrap_err();
        assert_eq!(errors["email"], vec!["Enter a valid email address.".to_string()]);
    }

    #[test]
    fn package_precision_limits() {
        let mut form = final_form();
        form.package_per_annum = Some("1000.123".into());
        form.package_per_month = Some("123456789.00".into());
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors["package_per_annum"][0],
            "Ensure that there are no more than 2 decimal places."
        );
        assert_eq!(
            errors["package_per_month"][0],
            "Ensure that there are no more than 10 digits in total."
        );
    }

    #[test]
    fn package_must_be_numeric() {
        let mut form = final_form();
        form.package_per_annum = Some("lots".into());
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors["package_per_annum"],
            vec![
                "Enter a number.".to_string(),
                "Package Per Annum is required for final submission".to_string()
            ]
        );
    }

    #[test]
    fn negative_package_rejected() {
        let mut form = final_form();
        form.package_per_month = Some("-5".into());
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors["package_per_month"][0],
            "Ensure this value is greater than or equal to 0."
        );
    }

    #[test]
    fn packages_accept_json_numbers() {
        let form: EmployeeForm = serde_json::from_value(serde_json::json!({
            "first_name": "Asha",
            "email": "asha@example.com",
            "package_per_annum": 240000,
            "package_per_month": "20000.50",
        }))
        .unwrap();
        let input = form.clean().unwrap();
        assert_eq!(input.package_per_annum, Some(Decimal::from(240000)));
        assert_eq!(input.package_per_month, Some(Decimal::new(2000050, 2)));
        assert!(input.is_draft);
    }

    #[test]
    fn field_titles() {
        assert_eq!(field_title("package_per_annum"), "Package Per Annum");
        assert_eq!(field_title("phone"), "Phone");
    }

    #[test]
    fn full_name_without_last_name() {
        let employee = Employee {
            id: 1,
            first_name: "Asha".into(),
            last_name: None,
            email: "a@b.c".into(),
            phone: None,
            address: None,
            designation: None,
            package_per_annum: None,
            package_per_month: None,
            is_draft: true,
            employee_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(employee.full_name(), "Asha");
    }
}
