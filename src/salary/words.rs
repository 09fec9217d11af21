//! Amounts in words, Indian English.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::round_money;

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 3] = [(10_000_000, "crore"), (100_000, "lakh"), (1_000, "thousand")];

/// Lower-case cardinal, e.g. `240050` -> `two lakh, forty thousand and fifty`.
///
/// Larger groups are separated by `", "`; a trailing part below one hundred
/// is joined with `" and "`.
pub fn cardinal(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    if n < 100 {
        let tens = TENS[(n / 10) as usize];
        return match n % 10 {
            0 => tens.to_string(),
            unit => format!("{}-{}", tens, ONES[unit as usize]),
        };
    }
    if n < 1000 {
        let head = format!("{} hundred", ONES[(n / 100) as usize]);
        return match n % 100 {
            0 => head,
            rest => format!("{} and {}", head, cardinal(rest)),
        };
    }

    let (scale, name) = SCALES
        .iter()
        .copied()
        .find(|(scale, _)| n >= *scale)
        .unwrap_or((1_000, "thousand"));
    let head = format!("{} {}", cardinal(n / scale), name);
    match n % scale {
        0 => head,
        rest if rest < 100 => format!("{} and {}", head, cardinal(rest)),
        rest => format!("{}, {}", head, cardinal(rest)),
    }
}

/// Capitalises the first letter of every word, where anything that is not
/// a letter starts a new word (`forty-five` -> `Forty-Five`).
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Cardinal words of the whole-rupee part, `minus ...` when negative.
fn whole_rupees(amount: Decimal) -> String {
    let whole = amount.trunc();
    let words = cardinal(whole.abs().to_u64().unwrap_or(0));
    if whole < Decimal::ZERO {
        format!("minus {words}")
    } else {
        words
    }
}

/// Offer letter CTC line: `Two Lakh Forty Thousand Indian Rupees Only`.
pub fn ctc_in_words(amount: Decimal) -> String {
    let titled = title_case(&whole_rupees(amount)).replace(',', "");
    let collapsed = titled.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{collapsed} Indian Rupees Only")
}

/// Payslip net pay line: `Nineteen Thousand, Eight Hundred Rupees Only`.
pub fn rupees_in_words(amount: Decimal) -> String {
    format!("{} Rupees Only", title_case(&whole_rupees(amount)))
}

/// Short package description for hike letters: `2.4 Lakhs Per Annum`.
pub fn package_in_words(amount: Decimal) -> String {
    let crore = Decimal::from(10_000_000u64);
    let lakh = Decimal::from(100_000u64);
    let thousand = Decimal::from(1_000u64);

    let (value, unit) = if amount >= crore {
        (amount / crore, "Crores")
    } else if amount >= lakh {
        (amount / lakh, "Lakhs")
    } else {
        (amount / thousand, "Thousand")
    };

    format!("{} {} Per Annum", round_money(value).normalize(), unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn small_numbers() {
        assert_eq!(cardinal(0), "zero");
        assert_eq!(cardinal(7), "seven");
        assert_eq!(cardinal(19), "nineteen");
        assert_eq!(cardinal(40), "forty");
        assert_eq!(cardinal(45), "forty-five");
        assert_eq!(cardinal(100), "one hundred");
        assert_eq!(cardinal(123), "one hundred and twenty-three");
    }

    #[test]
    fn indian_scales() {
        assert_eq!(cardinal(1005), "one thousand and five");
        assert_eq!(cardinal(1150), "one thousand, one hundred and fifty");
        assert_eq!(cardinal(100_000), "one lakh");
        assert_eq!(cardinal(240_000), "two lakh, forty thousand");
        assert_eq!(cardinal(240_050), "two lakh, forty thousand and fifty");
        assert_eq!(
            cardinal(12_345_678),
            "one crore, twenty-three lakh, forty-five thousand, six hundred and seventy-eight"
        );
        assert_eq!(cardinal(1_500_000_000), "one hundred and fifty crore");
    }

    #[test]
    fn titles() {
        assert_eq!(title_case("forty-five"), "Forty-Five");
        assert_eq!(
            title_case("two lakh, forty thousand and fifty"),
            "Two Lakh, Forty Thousand And Fifty"
        );
    }

    #[test]
    fn ctc_line_drops_commas() {
        assert_eq!(
            ctc_in_words(d("240000.00")),
            "Two Lakh Forty Thousand Indian Rupees Only"
        );
    }

    #[test]
    fn net_pay_line_keeps_commas() {
        assert_eq!(
            rupees_in_words(d("19800.00")),
            "Nineteen Thousand, Eight Hundred Rupees Only"
        );
        assert_eq!(rupees_in_words(d("999.99")), "Nine Hundred And Ninety-Nine Rupees Only");
    }

    #[test]
    fn negative_net_pay_keeps_its_sign() {
        assert_eq!(rupees_in_words(d("-200.00")), "Minus Two Hundred Rupees Only");
        assert_eq!(rupees_in_words(d("-0.50")), "Zero Rupees Only");
    }

    #[test]
    fn package_descriptions() {
        assert_eq!(package_in_words(d("240000")), "2.4 Lakhs Per Annum");
        assert_eq!(package_in_words(d("1000000")), "10 Lakhs Per Annum");
        assert_eq!(package_in_words(d("15000000")), "1.5 Crores Per Annum");
        assert_eq!(package_in_words(d("75000")), "75 Thousand Per Annum");
        assert_eq!(package_in_words(d("333333")), "3.33 Lakhs Per Annum");
    }
}
