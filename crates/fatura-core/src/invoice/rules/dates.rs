//! Date extraction for Turkish invoices.

use chrono::{Datelike, NaiveDate};

use super::patterns::{DUE_DATE_RULES, ISSUE_DATE_RULES};
use super::{Cascade, FieldExtractor};

/// Two-digit years up to this value are read as 20xx, above it as 19xx.
const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

/// Explicit templates tried when the day-first reading fails.
const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d-%m-%y", "%d/%m/%y",
];

/// Which date the extractor looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Issue,
    Due,
}

impl DateKind {
    fn rules(&self) -> &'static Cascade {
        match self {
            DateKind::Issue => &ISSUE_DATE_RULES,
            DateKind::Due => &DUE_DATE_RULES,
        }
    }
}

/// Date field extractor.
pub struct DateExtractor {
    kind: DateKind,
}

impl DateExtractor {
    pub fn new(kind: DateKind) -> Self {
        Self { kind }
    }

    pub fn issue() -> Self {
        Self::new(DateKind::Issue)
    }

    pub fn due() -> Self {
        Self::new(DateKind::Due)
    }
}

impl FieldExtractor for DateExtractor {
    type Output = Option<NaiveDate>;

    fn extract(&self, text: &str) -> Self::Output {
        self.kind
            .rules()
            .first(text, |s| parse_date(s).filter(|d| is_plausible(*d)))
    }
}

/// Extract the issue or due date from text.
pub fn extract_date(text: &str, kind: DateKind) -> Option<NaiveDate> {
    DateExtractor::new(kind).extract(text)
}

/// Parse a numeric date, preferring day-first order.
///
/// `d/m/y` is read first; `m/d/y` only when the day-first reading is not a
/// calendar date. A four-digit leading component is read as `y/m/d`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    parse_numeric(s).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    })
}

fn parse_numeric(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['-', '/', '.']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    if first.len() == 4 {
        let year = first.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, second.parse().ok()?, third.parse().ok()?);
    }

    let a: u32 = first.parse().ok()?;
    let b: u32 = second.parse().ok()?;
    let year = expand_year(third)?;

    NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
}

fn expand_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    match s.len() {
        2 if year <= TWO_DIGIT_YEAR_PIVOT => Some(2000 + year),
        2 => Some(1900 + year),
        4 => Some(year),
        _ => None,
    }
}

/// Whether a parsed date falls in a plausible invoice range.
pub fn is_plausible(date: NaiveDate) -> bool {
    (1950..=2100).contains(&date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_day_first() {
        assert_eq!(parse_date("05/03/2024"), date(2024, 3, 5));
        assert_eq!(parse_date("15.01.2024"), date(2024, 1, 15));
        assert_eq!(parse_date("1-2-24"), date(2024, 2, 1));
    }

    #[test]
    fn test_parse_month_first_fallback() {
        assert_eq!(parse_date("03/25/2024"), date(2024, 3, 25));
        assert_eq!(parse_date("31/31/2024"), None);
    }

    #[test]
    fn test_parse_year_first() {
        assert_eq!(parse_date("2024-01-15"), date(2024, 1, 15));
        assert_eq!(parse_date("2024/13/01"), None);
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse_date("01/01/50"), date(2050, 1, 1));
        assert_eq!(parse_date("01/01/51"), date(1951, 1, 1));
    }

    #[test]
    fn test_issue_date_labels() {
        let text = "Fatura Tarihi: 15-01-2024 Son Ödeme Tarihi: 14-02-2024";
        assert_eq!(extract_date(text, DateKind::Issue), date(2024, 1, 15));
        assert_eq!(extract_date(text, DateKind::Due), date(2024, 2, 14));
    }

    #[test]
    fn test_due_keyword_does_not_satisfy_issue() {
        assert_eq!(extract_date("Son Ödeme Tarihi: 14.02.2024", DateKind::Issue), None);
        assert_eq!(extract_date("Due Date: 14/02/2024", DateKind::Issue), None);
        assert_eq!(extract_date("Vade: 14/02/2024", DateKind::Issue), None);
    }

    #[test]
    fn test_generic_date_after_vetoed_occurrence() {
        let text = "Due Date: 14/02/2024 Date: 15/01/2024";
        assert_eq!(extract_date(text, DateKind::Issue), date(2024, 1, 15));
        assert_eq!(extract_date(text, DateKind::Due), date(2024, 2, 14));
    }

    #[test]
    fn test_english_labels() {
        let text = "Invoice Date: 2024-03-01\nDue Date: 2024-03-31";
        assert_eq!(extract_date(text, DateKind::Issue), date(2024, 3, 1));
        assert_eq!(extract_date(text, DateKind::Due), date(2024, 3, 31));
    }

    #[test]
    fn test_invalid_date_is_none() {
        assert_eq!(extract_date("Fatura Tarihi: 45-45-2024", DateKind::Issue), None);
        assert_eq!(extract_date("no dates here", DateKind::Due), None);
    }

    #[test]
    fn test_plausibility() {
        assert!(is_plausible(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(!is_plausible(NaiveDate::from_ymd_opt(1024, 1, 1).unwrap()));
    }
}
