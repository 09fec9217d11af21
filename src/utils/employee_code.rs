//! Employee code series.
//!
//! Codes look like `STPL1125007`: the company prefix, the month and
//! two-digit year of the offer date, then a series number that is global
//! across months and padded to three digits below 1000.

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};

/// Length of the `MMYY` part that follows the company prefix.
const MONTH_YEAR_LEN: usize = 4;
/// Shortest series accepted when scanning existing codes.
const MIN_SERIES_LEN: usize = 3;

/// `<company><MM><YY>` for an offer date.
pub fn month_prefix(company: &str, date: NaiveDate) -> String {
    format!("{}{}", company, date.format("%m%y"))
}

pub fn is_company_code(company: &str, code: &str) -> bool {
    code.trim().starts_with(company)
}

/// Series number of a well-formed code, `None` for anything else.
pub fn series_of(company: &str, code: &str) -> Option<u32> {
    let code = code.trim();
    if !code.starts_with(company) || code.len() < company.len() + MONTH_YEAR_LEN + MIN_SERIES_LEN {
        return None;
    }
    let series = code.get(company.len() + MONTH_YEAR_LEN..)?;
    if series.is_empty() || !series.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    series.parse().ok()
}

/// One past the highest series among `codes`; malformed codes are skipped.
pub fn next_series<'a>(company: &str, codes: impl IntoIterator<Item = &'a str>) -> u32 {
    codes
        .into_iter()
        .filter_map(|code| series_of(company, code))
        .max()
        .unwrap_or(0)
        + 1
}

pub fn format_code(month_prefix: &str, series: u32) -> String {
    if series < 1000 {
        format!("{month_prefix}{series:03}")
    } else {
        format!("{month_prefix}{series}")
    }
}

/// Code used when an employee has no offer letter yet.
pub fn fallback_code(company: &str, employee_id: u64) -> String {
    format!("{company}{employee_id:03}")
}

/// A manually entered code, checked against the offer date's prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualCode {
    pub code: String,
    pub series: String,
}

impl ManualCode {
    pub fn parse(raw: Option<&str>, month_prefix: &str) -> AppResult<Self> {
        let code = raw.unwrap_or("").trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::bad_request("Enter employee code in manual mode."));
        }
        if !code.starts_with(month_prefix) {
            return Err(AppError::bad_request(format!(
                "Code must start with {month_prefix}"
            )));
        }
        let series = code[month_prefix.len()..].to_string();
        if series.is_empty() || !series.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::bad_request("Invalid series number."));
        }
        Ok(Self { code, series })
    }

    pub fn series_number(&self) -> Option<u32> {
        self.series.parse().ok()
    }
}
