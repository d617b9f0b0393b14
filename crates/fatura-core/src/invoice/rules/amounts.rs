//! Amount extraction for Turkish invoices.

use tracing::debug;

use crate::models::invoice::Amounts;

use super::number::parse_locale_number;
use super::patterns::{CURRENCY_AMOUNT, SUBTOTAL_RULES, TAX_RULES, TOTAL_RULES};
use super::FieldExtractor;

/// Smallest trailing currency amount accepted as the grand total.
pub const POSITIONAL_TOTAL_FLOOR: f64 = 50.0;

/// Amount field extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Amounts;

    fn extract(&self, text: &str) -> Self::Output {
        let mut amounts = Amounts {
            subtotal: SUBTOTAL_RULES.first(text, positive_amount).unwrap_or(0.0),
            tax: TAX_RULES.first(text, positive_amount).unwrap_or(0.0),
            total: TOTAL_RULES.first(text, positive_amount).unwrap_or(0.0),
        };

        if amounts.total == 0.0 && amounts.subtotal > 0.0 {
            amounts.total = amounts.subtotal + amounts.tax;
            debug!("total: derived from subtotal and tax");
        }

        if amounts.total == 0.0 {
            if let Some(total) = last_currency_amount(text) {
                amounts.total = total;
                debug!("total: taken from trailing currency amount");
            }
        }

        amounts
    }
}

/// Extract subtotal, tax and total from invoice text.
pub fn extract_amounts(text: &str) -> Amounts {
    AmountExtractor::new().extract(text)
}

fn positive_amount(candidate: &str) -> Option<f64> {
    parse_locale_number(candidate).filter(|v| *v > 0.0)
}

/// Last currency-suffixed amount above [`POSITIONAL_TOTAL_FLOOR`].
fn last_currency_amount(text: &str) -> Option<f64> {
    let candidates: Vec<&str> = CURRENCY_AMOUNT
        .captures_iter(text)
        .filter_map(|caps| caps.name("value"))
        .map(|m| m.as_str())
        .collect();

    candidates
        .into_iter()
        .rev()
        .filter_map(parse_locale_number)
        .find(|v| *v > POSITIONAL_TOTAL_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn amounts(subtotal: f64, tax: f64, total: f64) -> Amounts {
        Amounts {
            subtotal,
            tax,
            total,
        }
    }

    #[test]
    fn test_turkish_summary_block() {
        let text = "Mal Hizmet Toplam Tutarı: 1.234,56 TL KDV Tutarı: 222,22 TL Ödenecek Tutar: 1.456,78 TL";
        assert_eq!(extract_amounts(text), amounts(1234.56, 222.22, 1456.78));
    }

    #[test]
    fn test_amount_before_keyword() {
        let text = "1.000,00 TL KDV Matrahı\nHesaplanan KDV (%20): 200,00\n1.200,00 TL TOPLAM";
        assert_eq!(extract_amounts(text), amounts(1000.0, 200.0, 1200.0));
    }

    #[test]
    fn test_total_label_outranks_preceding_amount() {
        let text = "Ara Toplam 500,00 TL KDV 90,00 TL Toplam 590,00 TL";
        let result = extract_amounts(text);
        assert_eq!(result.total, 590.0);
        assert_eq!(result, amounts(500.0, 90.0, 590.0));
    }

    #[test]
    fn test_tax_printed_with_rate() {
        let text = "Mal Hizmet Toplam Tutarı 100,00 TL KDV (%20) 20,00 TL";
        assert_eq!(extract_amounts(text), amounts(100.0, 20.0, 120.0));

        let text = "Mal Hizmet Toplam Tutarı 1.000,00 TL Hesaplanan KDV %20 200,00 TL";
        assert_eq!(extract_amounts(text), amounts(1000.0, 200.0, 1200.0));
    }

    #[test]
    fn test_english_labels() {
        let text = "Subtotal: $1,000.00\nVAT (18%): $180.00\nGrand Total: $1,180.00";
        assert_eq!(extract_amounts(text), amounts(1000.0, 180.0, 1180.0));
    }

    #[test]
    fn test_derived_total() {
        let text = "Ara Toplam: 500,00 TL\nKDV Tutarı: 100,00 TL";
        let result = extract_amounts(text);
        assert_eq!(result, amounts(500.0, 100.0, 600.0));
        assert_eq!(result.total, result.subtotal + result.tax);
    }

    #[test]
    fn test_derived_total_without_tax() {
        let text = "KDV Matrahı: 750,00";
        assert_eq!(extract_amounts(text), amounts(750.0, 0.0, 750.0));
    }

    #[test]
    fn test_positional_fallback() {
        let text = "Abonelik ücreti 12,50 TL\nHizmet bedeli\n275,00 TL";
        assert_eq!(extract_amounts(text).total, 275.0);
    }

    #[test]
    fn test_positional_fallback_skips_small_trailing_amounts() {
        let text = "Fatura bedeli 320,00 TL Damga vergisi 4,50 TL";
        assert_eq!(extract_amounts(text).total, 320.0);
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let text = "Ödenecek Tutar: 0,00 TL Genel Toplam: 99,90 TL";
        assert_eq!(extract_amounts(text).total, 99.9);
    }

    #[test]
    fn test_no_amounts() {
        assert_eq!(extract_amounts("Teşekkür ederiz"), Amounts::default());
        assert_eq!(extract_amounts(""), Amounts::default());
        assert_eq!(extract_amounts("Toplam 40,00 TL"), amounts(0.0, 0.0, 40.0));
    }
}
