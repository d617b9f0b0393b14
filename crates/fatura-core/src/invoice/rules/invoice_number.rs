//! Invoice number extraction.

use super::patterns::INVOICE_NUMBER_RULES;
use super::FieldExtractor;

/// Words that the labeled rules can capture instead of a real number.
const NOISE_TOKENS: &[&str] = &[
    "FATURA", "INVOICE", "NO", "NUMBER", "NUMARA", "NUMARASI", "E-FATURA", "TARIH", "TARIHI",
    "DATE",
];

const MIN_LENGTH: usize = 4;

/// Invoice number extractor.
pub struct InvoiceNumberExtractor;

impl InvoiceNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InvoiceNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = Option<String>;

    fn extract(&self, text: &str) -> Self::Output {
        INVOICE_NUMBER_RULES.first(text, accept_invoice_number)
    }
}

/// Extract the invoice number from text.
pub fn extract_invoice_number(text: &str) -> Option<String> {
    InvoiceNumberExtractor::new().extract(text)
}

fn accept_invoice_number(candidate: &str) -> Option<String> {
    let value = candidate.trim().trim_matches('-');
    let upper = value.to_uppercase();

    if NOISE_TOKENS.contains(&upper.as_str()) || value.chars().count() < MIN_LENGTH {
        return None;
    }

    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_labeled_number() {
        assert_eq!(
            extract_invoice_number("e-FATURA Fatura No: ABC2024000000001 Tarih: 15.01.2024"),
            Some("ABC2024000000001".to_string())
        );
        assert_eq!(
            extract_invoice_number("Invoice Number: INV-20240042"),
            Some("INV-20240042".to_string())
        );
    }

    #[test]
    fn test_ettn_wins() {
        let text = "Fatura No: ABC2024000000001 ETTN: 3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        assert_eq!(
            extract_invoice_number(text),
            Some("3f2504e0-4f89-11d3-9a0c-0305e82c3301".to_string())
        );
    }

    #[test]
    fn test_series_shapes() {
        assert_eq!(
            extract_invoice_number("e-Arşiv EMR2025000000035 tarihli"),
            Some("EMR2025000000035".to_string())
        );
        assert_eq!(
            extract_invoice_number("seri 48Q2025000000267"),
            Some("48Q2025000000267".to_string())
        );
    }

    #[test]
    fn test_noise_advances_cascade() {
        // The labeled rule captures the heading word; the series rule still finds the number.
        let text = "FATURA NO FATURA TARIHI 15.01.2024 GIB2024000000123";
        assert_eq!(
            extract_invoice_number(text),
            Some("GIB2024000000123".to_string())
        );
    }

    #[test]
    fn test_generic_number() {
        assert_eq!(
            extract_invoice_number("Belge Numara: 2024-000123"),
            Some("2024-000123".to_string())
        );
    }

    #[test]
    fn test_no_number() {
        assert_eq!(extract_invoice_number("Toplam 100,00 TL"), None);
        assert_eq!(extract_invoice_number(""), None);
    }
}
