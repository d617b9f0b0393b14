//! Locale-ambiguous number parsing.
//!
//! Turkish invoices write `1.234,56`; English ones write `1,234.56`. The role
//! of each separator is inferred from position and digit count.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CURRENCY: Regex = Regex::new(r"(?i)TRY|TL|USD|EUR|[₺$€£]").unwrap();
}

/// Parse an amount whose decimal separator may be `.` or `,`.
///
/// - Both separators present: the one occurring last is the decimal point.
/// - A single kind of separator: it is a decimal point only when exactly two
///   digits follow its last occurrence; otherwise it groups thousands.
///
/// Returns `None` for anything that does not reduce to a finite number.
///
/// ```
/// use fatura_core::invoice::rules::parse_locale_number;
///
/// assert_eq!(parse_locale_number("1.234,56"), Some(1234.56));
/// assert_eq!(parse_locale_number("1,234.56"), Some(1234.56));
/// assert_eq!(parse_locale_number("1.234"), Some(1234.0));
/// ```
pub fn parse_locale_number(input: &str) -> Option<f64> {
    let stripped = CURRENCY.replace_all(input, "");
    let cleaned: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    // Trailing punctuation picked up from the surrounding sentence.
    let cleaned = cleaned.trim_end_matches(['.', ',']);

    if cleaned.is_empty()
        || !cleaned.chars().any(|c| c.is_ascii_digit())
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '+' | '-'))
    {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(comma)) => resolve_single_separator(cleaned, comma, ','),
        (Some(dot), None) => resolve_single_separator(cleaned, dot, '.'),
        (None, None) => cleaned.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rewrite a string containing only one kind of separator.
fn resolve_single_separator(s: &str, last: usize, separator: char) -> String {
    let tail = &s[last + separator.len_utf8()..];
    let is_decimal = tail.len() == 2 && tail.chars().all(|c| c.is_ascii_digit());

    if is_decimal {
        let integer: String = s[..last].chars().filter(|&c| c != separator).collect();
        format!("{}.{}", integer, tail)
    } else {
        s.chars().filter(|&c| c != separator).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_separator_conventions() {
        assert_eq!(parse_locale_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_locale_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_locale_number("944,00"), Some(944.0));
        assert_eq!(parse_locale_number("944.00"), Some(944.0));
        assert_eq!(parse_locale_number("1.234"), Some(1234.0));
        assert_eq!(parse_locale_number("1,234"), Some(1234.0));
        assert_eq!(parse_locale_number("12.345.678,90"), Some(12345678.9));
        assert_eq!(parse_locale_number("1.234.567"), Some(1234567.0));
    }

    #[test]
    fn test_single_digit_tail_is_grouping() {
        assert_eq!(parse_locale_number("12,5"), Some(125.0));
        assert_eq!(parse_locale_number("12.5"), Some(125.0));
    }

    #[test]
    fn test_currency_and_whitespace() {
        assert_eq!(parse_locale_number("1.456,78 TL"), Some(1456.78));
        assert_eq!(parse_locale_number("₺ 275,00"), Some(275.0));
        assert_eq!(parse_locale_number("$1,234.56"), Some(1234.56));
        assert_eq!(parse_locale_number(" 100,00. "), Some(100.0));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_locale_number(""), None);
        assert_eq!(parse_locale_number("   "), None);
        assert_eq!(parse_locale_number("TL"), None);
        assert_eq!(parse_locale_number("abc"), None);
        assert_eq!(parse_locale_number("inf"), None);
        assert_eq!(parse_locale_number("NaN"), None);
        assert_eq!(parse_locale_number("1-2"), None);
        assert_eq!(parse_locale_number(".,"), None);
    }
}
