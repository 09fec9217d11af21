//! Formatting of money and dates as they appear in letters.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::round_money;

/// Indian digit grouping with two decimals: `240000` -> `2,40,000.00`.
pub fn indian_format(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let grouped = if int_part.len() <= 3 {
        int_part.to_string()
    } else {
        let (head, last_three) = int_part.split_at(int_part.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, pair) = rest.split_at(rest.len() - 2);
            groups.push(pair);
            rest = left;
        }
        if !rest.is_empty() {
            groups.push(rest);
        }
        groups.reverse();
        format!("{},{}", groups.join(","), last_three)
    };

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// English ordinal suffix for a day of the month.
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `20th November, 2025`, the offer letter date line.
pub fn offer_date(date: NaiveDate) -> String {
    format!(
        "{}{} {}",
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B, %Y")
    )
}

/// `20th November 2025`
pub fn ordinal_date(date: NaiveDate) -> String {
    format!(
        "{}{} {}",
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B %Y")
    )
}

/// `05 November 2025`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

/// `November 2025`
pub fn month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn first_day_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_day_of_next_month(date).pred_opt().unwrap_or(date)
}

/// Pay period line of a payslip: `01/11/2025 To 30/11/2025`.
pub fn pay_period(date: NaiveDate) -> String {
    let last = last_day_of_month(date);
    format!(
        "01/{:02}/{} To {:02}/{:02}/{}",
        date.month(),
        date.year(),
        last.day(),
        date.month(),
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn indian_grouping() {
        assert_eq!(indian_format(d("0")), "0.00");
        assert_eq!(indian_format(d("999")), "999.00");
        assert_eq!(indian_format(d("1000")), "1,000.00");
        assert_eq!(indian_format(d("240000")), "2,40,000.00");
        assert_eq!(indian_format(d("1234567.5")), "12,34,567.50");
        assert_eq!(indian_format(d("123456789.123")), "12,34,56,789.12");
    }

    #[test]
    fn indian_grouping_negative() {
        assert_eq!(indian_format(d("-875")), "-875.00");
        assert_eq!(indian_format(d("-123456")), "-1,23,456.00");
    }

    #[test]
    fn suffixes() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(4), "th");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(21), "st");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn letter_dates() {
        assert_eq!(offer_date(date(2025, 11, 20)), "20th November, 2025");
        assert_eq!(ordinal_date(date(2025, 11, 1)), "1st November 2025");
        assert_eq!(long_date(date(2025, 11, 5)), "05 November 2025");
        assert_eq!(month_year(date(2025, 11, 5)), "November 2025");
    }

    #[test]
    fn month_boundaries() {
        assert_eq!(first_day_of_next_month(date(2025, 12, 15)), date(2026, 1, 1));
        assert_eq!(first_day_of_next_month(date(2025, 1, 31)), date(2025, 2, 1));
        assert_eq!(last_day_of_month(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(last_day_of_month(date(2025, 2, 10)), date(2025, 2, 28));
    }

    #[test]
    fn payslip_period() {
        assert_eq!(pay_period(date(2025, 11, 14)), "01/11/2025 To 30/11/2025");
        assert_eq!(pay_period(date(2025, 12, 1)), "01/12/2025 To 31/12/2025");
    }
}
